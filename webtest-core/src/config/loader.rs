//! # Configuration Loading
//!
//! Layers defaults, an optional TOML file and environment variables into a
//! validated [`HarnessConfig`].

use crate::{
    config::{schema::HarnessConfig, validator::ConfigValidator},
    Error, Result,
};
use std::{
    env,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

/// File names probed in every search path, in order
const CONFIG_FILE_NAMES: [&str; 2] = ["webtest.toml", ".webtest.toml"];

/// Separator between nesting levels in prefixed environment variables
const ENV_SEPARATOR: &str = "__";

/// Configuration loader with support for multiple sources
pub struct ConfigLoader {
    search_paths: Vec<PathBuf>,
    env_prefix: String,
    env_source: Option<Vec<(String, String)>>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        let mut search_paths = vec![PathBuf::from("."), PathBuf::from("./config")];
        if let Some(dir) = dirs::config_dir() {
            search_paths.push(dir.join("webtest"));
        }

        Self { search_paths, env_prefix: "WEBTEST".to_string(), env_source: None }
    }

    /// Add a search path for configuration files
    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Search only the given directory
    pub fn with_only_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths = vec![path.as_ref().to_path_buf()];
        self
    }

    /// Set the environment variable prefix
    pub fn with_env_prefix<S: AsRef<str>>(mut self, prefix: S) -> Self {
        self.env_prefix = prefix.as_ref().to_string();
        self
    }

    /// Read variables from `vars` instead of the process environment
    pub fn with_env_vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env_source = Some(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    /// Load configuration from all available sources
    pub fn load(&self) -> Result<HarnessConfig> {
        info!("Loading configuration from multiple sources");

        let mut config_value = toml::Value::try_from(HarnessConfig::default())?;
        debug!("Applied default configuration");

        if let Some(config_path) = self.find_config_file() {
            let file_config = self.load_config_file(&config_path)?;
            merge_config(&mut config_value, file_config);
            info!("Loaded configuration file: {}", config_path.display());
        } else {
            debug!("No configuration file found in search paths");
        }

        self.apply_env_vars(&mut config_value)?;
        debug!("Applied environment variables");

        let config: HarnessConfig = config_value
            .try_into()
            .map_err(|e| Error::configuration(format!("Failed to deserialize config: {e}")))?;

        ConfigValidator::validate(&config)?;

        info!("Configuration loaded and validated successfully");
        Ok(config)
    }

    /// Load configuration from a specific file, without environment overrides
    pub fn load_from_file<P: AsRef<Path>>(&self, path: P) -> Result<HarnessConfig> {
        let path = path.as_ref();
        info!("Loading configuration from file: {}", path.display());

        let mut config_value = toml::Value::try_from(HarnessConfig::default())?;
        merge_config(&mut config_value, self.load_config_file(path)?);

        let config: HarnessConfig = config_value
            .try_into()
            .map_err(|e| Error::configuration(format!("Failed to parse config file: {e}")))?;

        ConfigValidator::validate(&config)?;
        Ok(config)
    }

    /// Find the first available configuration file
    fn find_config_file(&self) -> Option<PathBuf> {
        for search_path in &self.search_paths {
            for config_name in CONFIG_FILE_NAMES {
                let config_path = search_path.join(config_name);
                if config_path.is_file() {
                    debug!("Found config file: {}", config_path.display());
                    return Some(config_path);
                }
            }
        }

        None
    }

    /// Load configuration from a TOML file
    fn load_config_file(&self, path: &Path) -> Result<toml::Value> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        content.parse::<toml::Value>().map_err(|e| {
            Error::configuration(format!("Failed to parse config file {}: {}", path.display(), e))
        })
    }

    fn env_vars(&self) -> Vec<(String, String)> {
        match &self.env_source {
            Some(vars) => vars.clone(),
            None => env::vars().collect(),
        }
    }

    /// Apply `PREFIX__SECTION__FIELD` variables, then the legacy
    /// `API_URL` / `API_KEY` pair
    fn apply_env_vars(&self, config: &mut toml::Value) -> Result<()> {
        let prefix = format!("{}{}", self.env_prefix, ENV_SEPARATOR);
        let vars = self.env_vars();
        let mut applied = 0usize;

        for (key, value) in &vars {
            let Some(path) = key.strip_prefix(&prefix) else {
                continue;
            };
            let parts: Vec<String> =
                path.split(ENV_SEPARATOR).map(|part| part.to_lowercase()).collect();
            let parts: Vec<&str> = parts.iter().map(String::as_str).collect();
            set_nested_value(config, &parts, value)?;
            applied += 1;
        }

        for (key, value) in &vars {
            let target: &[&str] = match key.as_str() {
                "API_URL" => &["api", "base_url"],
                "API_KEY" => &["api", "api_key"],
                _ => continue,
            };
            set_nested_value(config, target, value)?;
            applied += 1;
        }

        debug!("Applied {} environment variables", applied);
        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Merge `override_value` into `base`, recursing into tables
fn merge_config(base: &mut toml::Value, override_value: toml::Value) {
    match (base, override_value) {
        (toml::Value::Table(base_table), toml::Value::Table(override_table)) => {
            for (key, value) in override_table {
                match base_table.get_mut(&key) {
                    Some(existing) if existing.is_table() && value.is_table() => {
                        merge_config(existing, value);
                    },
                    Some(existing) => *existing = value,
                    None => {
                        base_table.insert(key, value);
                    },
                }
            }
        },
        (base, value) => *base = value,
    }
}

/// Set a nested value, coercing the string to the type already present
fn set_nested_value(config: &mut toml::Value, parts: &[&str], value: &str) -> Result<()> {
    let Some((last, parents)) = parts.split_last() else {
        return Ok(());
    };

    let mut current = config;
    for part in parents {
        let toml::Value::Table(table) = current else {
            return Err(Error::configuration(format!("Cannot set {} below a scalar", parts.join("."))));
        };
        current = table
            .entry(part.to_string())
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }

    let toml::Value::Table(table) = current else {
        return Err(Error::configuration(format!("Cannot set {} below a scalar", parts.join("."))));
    };

    let parsed = coerce_env_value(table.get(*last), value)
        .map_err(|e| Error::configuration(format!("Invalid value for {}: {e}", parts.join("."))))?;
    table.insert(last.to_string(), parsed);
    Ok(())
}

fn coerce_env_value(existing: Option<&toml::Value>, value: &str) -> std::result::Result<toml::Value, String> {
    match existing {
        Some(toml::Value::Boolean(_)) => {
            value.parse::<bool>().map(toml::Value::Boolean).map_err(|e| e.to_string())
        },
        Some(toml::Value::Integer(_)) => {
            value.parse::<i64>().map(toml::Value::Integer).map_err(|e| e.to_string())
        },
        Some(toml::Value::Float(_)) => {
            value.parse::<f64>().map(toml::Value::Float).map_err(|e| e.to_string())
        },
        _ => Ok(toml::Value::String(value.to_string())),
    }
}
