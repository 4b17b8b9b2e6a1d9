//! Fixture record persistence for test data management.
//!
//! [`TestDataManager`] owns an ordered collection of JSON records and mirrors
//! it to a backing document. The document is rewritten in full after every
//! mutation (temporary file + rename), so after a [`clear`] it is identical to
//! the document of any other empty collection.
//!
//! [`clear`]: TestDataManager::clear

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use webtest_core::config::DataConfig;
use webtest_core::{Error, Result};

/// A fixture record: string keys to arbitrary JSON values, in insertion order
pub type TestDataRecord = Map<String, Value>;

/// Identifier field used unless another one is configured
pub const DEFAULT_ID_FIELD: &str = "id";

/// Counters describing what a manager has done since it was opened
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistenceStats {
    /// Records loaded from the backing document at open
    pub records_loaded: u64,
    /// Records created
    pub records_created: u64,
    /// Records removed individually
    pub records_removed: u64,
    /// Calls to `clear`
    pub clears: u64,
    /// Full rewrites of the backing document
    pub documents_written: u64,
}

/// JSON-backed fixture store
#[derive(Debug)]
pub struct TestDataManager {
    /// Backing document
    path: PathBuf,
    /// Name of the identifier field
    id_field: String,
    /// Records in insertion order
    records: Vec<TestDataRecord>,
    /// Next generated identifier
    next_id: u64,
    /// Activity counters
    stats: PersistenceStats,
}

impl TestDataManager {
    /// Open the collection stored at `path`, using `"id"` as identifier field.
    ///
    /// A missing file yields an empty collection; the file is created on the
    /// first mutation. A file that is not a JSON array of objects is an error.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_id_field(path, DEFAULT_ID_FIELD).await
    }

    /// Open the collection stored at `path` with a custom identifier field
    pub async fn open_with_id_field<P: AsRef<Path>>(path: P, id_field: impl Into<String>) -> Result<Self> {
        let id_field = id_field.into();
        if id_field.is_empty() {
            return Err(Error::configuration("Identifier field name must not be empty"));
        }

        let path = path.as_ref().to_path_buf();
        let records = load_records(&path).await?;
        check_identifiers(&path, &records, &id_field)?;

        let next_id = records
            .iter()
            .filter_map(|record| record.get(&id_field).and_then(Value::as_u64))
            .max()
            .map_or(1, |max| max.saturating_add(1));

        info!("Opened test data at {} with {} records", path.display(), records.len());

        let stats = PersistenceStats { records_loaded: records.len() as u64, ..Default::default() };
        Ok(Self { path, id_field, records, next_id, stats })
    }

    /// Open the collection described by `config`
    pub async fn from_config(config: &DataConfig) -> Result<Self> {
        Self::open_with_id_field(&config.data_file, config.id_field.clone()).await
    }

    /// Store a new record.
    ///
    /// `record` must be a JSON object. When it has no identifier (or a `null`
    /// one) the next free counter value is assigned. The returned record has
    /// the identifier as its first field.
    pub async fn create_test_data(&mut self, record: Value) -> Result<TestDataRecord> {
        let fields = match record {
            Value::Object(fields) => fields,
            other => {
                return Err(Error::configuration(format!(
                    "Test data must be a JSON object, got {}",
                    json_kind(&other)
                )))
            },
        };

        let id = match fields.get(&self.id_field) {
            None | Some(Value::Null) => Value::from(self.generate_id()?),
            Some(explicit) => {
                if self.contains_id(explicit) {
                    return Err(Error::configuration(format!(
                        "Duplicate {} {} in test data collection",
                        self.id_field, explicit
                    )));
                }
                if let Some(n) = explicit.as_u64() {
                    self.next_id = self.next_id.max(n.saturating_add(1));
                }
                explicit.clone()
            },
        };

        let mut stored = Map::with_capacity(fields.len() + 1);
        stored.insert(self.id_field.clone(), id);
        for (key, value) in fields {
            if key != self.id_field {
                stored.insert(key, value);
            }
        }

        self.records.push(stored.clone());
        if let Err(err) = self.persist().await {
            self.records.pop();
            return Err(err);
        }

        self.stats.records_created += 1;
        debug!("Created test data {}={}", self.id_field, stored[&self.id_field]);
        Ok(stored)
    }

    /// First record, in insertion order, whose `key` field equals `value`
    pub fn get_test_data(&self, key: &str, value: impl Into<Value>) -> Option<&TestDataRecord> {
        let value = value.into();
        self.records.iter().find(|record| record.get(key) == Some(&value))
    }

    /// Like [`get_test_data`](Self::get_test_data) but absent records are an error
    pub fn require_test_data(&self, key: &str, value: impl Into<Value>) -> Result<&TestDataRecord> {
        let value = value.into();
        self.records
            .iter()
            .find(|record| record.get(key) == Some(&value))
            .ok_or_else(|| Error::NotFound {
                message: format!("No test data with {key}={value} in {}", self.path.display()),
            })
    }

    /// Every record whose `key` field equals `value`, in insertion order
    pub fn find_all(&self, key: &str, value: impl Into<Value>) -> Vec<&TestDataRecord> {
        let value = value.into();
        self.records.iter().filter(|record| record.get(key) == Some(&value)).collect()
    }

    /// Remove the record with identifier `id`, returning it if it existed
    pub async fn remove_test_data(&mut self, id: impl Into<Value>) -> Result<Option<TestDataRecord>> {
        let id = id.into();
        let Some(index) = self.records.iter().position(|record| record.get(&self.id_field) == Some(&id))
        else {
            return Ok(None);
        };

        let removed = self.records.remove(index);
        if let Err(err) = self.persist().await {
            self.records.insert(index, removed);
            return Err(err);
        }

        self.stats.records_removed += 1;
        debug!("Removed test data {}={}", self.id_field, id);
        Ok(Some(removed))
    }

    /// Remove every record and rewrite the backing document as empty.
    ///
    /// Also restarts identifier generation, so a cleared manager behaves like
    /// one opened on an empty document.
    pub async fn clear(&mut self) -> Result<()> {
        let previous = std::mem::take(&mut self.records);
        if let Err(err) = self.persist().await {
            self.records = previous;
            return Err(err);
        }

        self.next_id = 1;
        self.stats.clears += 1;
        info!("Cleared {} test records from {}", previous.len(), self.path.display());
        Ok(())
    }

    /// All records in insertion order
    pub fn records(&self) -> &[TestDataRecord] {
        &self.records
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the collection is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Backing document path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Identifier field name
    pub fn id_field(&self) -> &str {
        &self.id_field
    }

    /// Activity counters
    pub fn stats(&self) -> &PersistenceStats {
        &self.stats
    }

    fn contains_id(&self, id: &Value) -> bool {
        self.records.iter().any(|record| record.get(&self.id_field) == Some(id))
    }

    fn generate_id(&mut self) -> Result<u64> {
        let mut candidate = self.next_id;
        while self.contains_id(&Value::from(candidate)) {
            match candidate.checked_add(1) {
                Some(next) => candidate = next,
                None => {
                    candidate = self.smallest_unused_id()?;
                    break;
                },
            }
        }

        self.next_id = candidate.saturating_add(1);
        Ok(candidate)
    }

    /// Lowest positive integer no record uses as identifier
    fn smallest_unused_id(&self) -> Result<u64> {
        let taken: HashSet<u64> = self
            .records
            .iter()
            .filter_map(|record| record.get(&self.id_field).and_then(Value::as_u64))
            .collect();
        (1..=u64::MAX)
            .find(|id| !taken.contains(id))
            .ok_or_else(|| Error::configuration("Identifier space exhausted"))
    }

    /// Rewrite the whole backing document from memory
    async fn persist(&mut self) -> Result<()> {
        let mut document = serde_json::to_string_pretty(&self.records)
            .map_err(|e| Error::persistence(format!("Failed to encode test data: {e}")))?;
        document.push('\n');

        write_atomically(&self.path, document.as_bytes()).await?;
        self.stats.documents_written += 1;
        Ok(())
    }
}

async fn load_records(path: &Path) -> Result<Vec<TestDataRecord>> {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("No test data file at {}, starting empty", path.display());
            return Ok(Vec::new());
        },
        Err(e) => {
            return Err(Error::persistence(format!("Failed to read {}: {e}", path.display())));
        },
    };

    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    serde_json::from_str::<Vec<TestDataRecord>>(&content).map_err(|e| {
        Error::persistence(format!(
            "Malformed test data file {} (expected a JSON array of objects): {e}",
            path.display()
        ))
    })
}

fn check_identifiers(path: &Path, records: &[TestDataRecord], id_field: &str) -> Result<()> {
    let mut seen = HashSet::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        let id = match record.get(id_field) {
            None | Some(Value::Null) => {
                return Err(Error::persistence(format!(
                    "Record {index} in {} has no {id_field}",
                    path.display()
                )));
            },
            Some(id) => id,
        };

        if !seen.insert(id.to_string()) {
            return Err(Error::persistence(format!(
                "Duplicate {id_field} {id} in {}",
                path.display()
            )));
        }
    }
    Ok(())
}

async fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.map_err(|e| {
            Error::persistence(format!("Failed to create directory {}: {e}", parent.display()))
        })?;
    }

    let mut tmp_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    let result = async {
        let mut file = fs::File::create(&tmp_path).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&tmp_path, path).await
    }
    .await;

    if let Err(e) = result {
        if let Err(cleanup) = fs::remove_file(&tmp_path).await {
            if cleanup.kind() != ErrorKind::NotFound {
                warn!("Failed to remove {}: {cleanup}", tmp_path.display());
            }
        }
        return Err(Error::persistence(format!("Failed to write {}: {e}", path.display())));
    }
    Ok(())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
