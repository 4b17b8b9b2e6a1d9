//! Integration tests for the web API client
//!
//! The client is driven through a [`MockTransport`], so every test checks
//! both what the client returned and exactly which request it sent.

use anyhow::Result;
use futures::future::join_all;
use webtest_tests::prelude::*;

const BASE_URL: &str = "https://api.example.com";
const API_KEY: &str = "test_key";

fn client(mock: &MockTransport) -> WebApiClient {
    init_test_logging(&LoggingConfig::default());
    WebApiClient::new(BASE_URL, Some(API_KEY.to_string()), mock.shared())
}

/// Answers `GET items/{n}` with `{"id": n, "name": "Item n"}`
struct ItemEcho;

#[async_trait]
impl Transport for ItemEcho {
    async fn execute(&self, request: HttpRequest) -> std::result::Result<HttpResponse, TransportError> {
        let id: u64 = request
            .url
            .rsplit('/')
            .next()
            .and_then(|last| last.parse().ok())
            .ok_or_else(|| TransportError::Request { message: format!("unexpected url {}", request.url) })?;
        Ok(HttpResponse::json_body(200, &json!({"id": id, "name": format!("Item {id}")})))
    }
}

#[test]
fn test_init_with_api_key() {
    let client = client(&MockTransport::new());

    assert_eq!(client.base_url(), BASE_URL);
    assert_eq!(client.api_key(), Some(API_KEY));
    assert_eq!(client.headers().get("Authorization").map(String::as_str), Some("Bearer test_key"));
}

#[test]
fn test_init_without_api_key() {
    let client = WebApiClient::new(BASE_URL, None, MockTransport::new().shared());

    assert!(client.api_key().is_none());
    assert!(!client.headers().contains_key("Authorization"));
}

#[tokio::test]
async fn test_get_method() -> Result<()> {
    let mock = MockTransport::new();
    mock.respond_json(200, &json!({"id": 1, "name": "Test"}));

    let result = measure_performance("test_get_method", client(&mock).get("items/1", &[])).await?;

    assert_eq!(result, json!({"id": 1, "name": "Test"}));
    let request = mock.last_request().expect("request recorded");
    assert_eq!(request.method, HttpMethod::Get);
    assert_eq!(request.url, format!("{BASE_URL}/items/1"));
    assert!(request.query.is_empty());
    assert_eq!(request.header("Authorization"), Some("Bearer test_key"));
    assert_eq!(mock.call_count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_get_with_params() -> Result<()> {
    let mock = MockTransport::new();
    mock.respond_json(200, &json!({"users": [{"username": "user1"}, {"username": "user2"}], "total": 2}));

    let result = client(&mock).get("users", &[("page", "1"), ("per_page", "10")]).await?;

    assert_eq!(result["total"], 2);
    assert_eq!(result["users"][0]["username"], "user1");
    let request = mock.last_request().expect("request recorded");
    assert_eq!(request.url, format!("{BASE_URL}/users"));
    assert_eq!(
        request.query,
        vec![("page".to_string(), "1".to_string()), ("per_page".to_string(), "10".to_string())]
    );
    Ok(())
}

#[tokio::test]
async fn test_post_method() -> Result<()> {
    let mock = MockTransport::new();
    mock.respond_json(201, &json!({"id": 2, "name": "New Item", "created_at": "2025-06-17T14:27:00Z"}));
    let data = json!({"name": "New Item", "description": "Test description"});

    let result = client(&mock).post("items", &data).await?;

    assert_eq!(result["name"], data["name"]);
    assert!(result.get("id").is_some());
    assert!(result.get("created_at").is_some());
    let request = mock.last_request().expect("request recorded");
    assert_eq!(request.method, HttpMethod::Post);
    assert_eq!(request.url, format!("{BASE_URL}/items"));
    assert_eq!(request.body, Some(data));
    Ok(())
}

#[tokio::test]
async fn test_put_method() -> Result<()> {
    let mock = MockTransport::new();
    mock.respond_json(200, &json!({"id": 1, "name": "Updated Item"}));
    let data = json!({"name": "Updated Item"});

    let result = client(&mock).put("items/1", &data).await?;

    assert_eq!(result, json!({"id": 1, "name": "Updated Item"}));
    let request = mock.last_request().expect("request recorded");
    assert_eq!(request.method, HttpMethod::Put);
    assert_eq!(request.url, format!("{BASE_URL}/items/1"));
    assert_eq!(request.body, Some(data));
    Ok(())
}

#[tokio::test]
async fn test_delete_method() -> Result<()> {
    let mock = MockTransport::new();
    mock.respond_with(HttpResponse::new(204));

    let status = client(&mock).delete("items/1").await?;

    assert_eq!(status, 204);
    let request = mock.last_request().expect("request recorded");
    assert_eq!(request.method, HttpMethod::Delete);
    assert_eq!(request.url, format!("{BASE_URL}/items/1"));
    assert!(request.body.is_none());
    Ok(())
}

#[tokio::test]
async fn test_http_error_status() -> Result<()> {
    for (status, endpoint) in [(404, "items/999"), (400, "items/invalid")] {
        let mock = MockTransport::new();
        mock.respond_with(HttpResponse::new(status));

        let err = client(&mock).get(endpoint, &[]).await.unwrap_err();
        match err {
            Error::Http { status: got, .. } => assert_eq!(got, status),
            other => panic!("expected an HTTP error, got {other:?}"),
        }
        assert_eq!(mock.call_count(), 1);
    }
    Ok(())
}

#[tokio::test]
async fn test_transport_error_handling() -> Result<()> {
    let cases = [
        TransportError::connection("Connection refused"),
        TransportError::timeout("Request timed out"),
        TransportError::Request { message: "invalid header".to_string() },
    ];

    for expected in cases {
        let mock = MockTransport::new();
        mock.fail_with(expected.clone());

        let err = client(&mock).get("items/1", &[]).await.unwrap_err();
        assert_eq!(err.as_transport(), Some(&expected));
        assert_eq!(mock.call_count(), 1, "no retries without a retry policy");
    }
    Ok(())
}

#[tokio::test]
async fn test_response_schema() -> Result<()> {
    let mock = MockTransport::new();
    mock.respond_json(
        200,
        &json!({
            "id": 1,
            "name": "Test Item",
            "created_at": "2025-06-17T14:27:00Z",
            "updated_at": "2025-06-17T14:27:00Z",
            "properties": {"color": "blue", "size": "medium"}
        }),
    );

    let result = client(&mock).get("items/1", &[]).await?;

    assert!(result["id"].is_i64());
    assert!(result["name"].is_string());
    assert!(result["created_at"].is_string());
    assert!(result["updated_at"].is_string());
    assert!(result["properties"].is_object());
    Ok(())
}

#[tokio::test]
async fn test_concurrent_requests() -> Result<()> {
    let client = WebApiClient::new(BASE_URL, None, SharedTransport::new(ItemEcho));

    let results = join_all((0..10).map(|i| {
        let client = client.clone();
        async move { client.get(&format!("items/{i}"), &[]).await }
    }))
    .await;

    assert_eq!(results.len(), 10);
    for (i, result) in results.into_iter().enumerate() {
        let item = result?;
        assert_eq!(item["id"], i as u64);
        assert_eq!(item["name"], format!("Item {i}"));
    }
    Ok(())
}

/// Retries exhaust against a dead network and never reach the server
#[tokio::test]
async fn test_retries_exhausted_under_total_loss() -> Result<()> {
    let mock = MockTransport::new();
    let client = client(&mock).with_retry(RetryConfig { max_attempts: 3, base_delay_ms: 1 });

    let guard = NetworkConditionSimulator::install(client.transport(), NetworkConditionSpec::disconnected())?;
    let err = client.get("items/1", &[]).await.unwrap_err();
    let stats = guard.restore();

    assert!(err.is_connection());
    assert_eq!(stats.intercepted, 3);
    assert_eq!(mock.call_count(), 0);
    Ok(())
}

/// Retries recover from simulated packet loss
#[tokio::test]
async fn test_retries_recover_from_partial_loss() -> Result<()> {
    let mock = MockTransport::new().with_fallback(HttpResponse::json_body(200, &json!({"ok": true})));
    let client = client(&mock).with_retry(RetryConfig { max_attempts: 5, base_delay_ms: 1 });

    let spec = NetworkConditionSpec::lossy(0.5)?;
    let guard = NetworkConditionSimulator::install_seeded(client.transport(), spec, 1234)?;
    let mut successes = 0u64;
    for _ in 0..20 {
        if client.get("health", &[]).await.is_ok() {
            successes += 1;
        }
    }
    let stats = guard.restore();

    info!("{} of 20 calls succeeded after {} attempts", successes, stats.intercepted);
    assert_eq!(stats.forwarded, successes);
    assert_eq!(mock.call_count() as u64, stats.forwarded);
    assert!(stats.intercepted > 20, "some attempts should have been retried");
    assert!(successes >= 15, "retries should absorb most of the loss");
    Ok(())
}

/// Client settings come from the layered configuration
#[tokio::test]
async fn test_client_from_config() -> Result<()> {
    let temp_dir = tempfile::TempDir::new()?;
    let config = ConfigLoader::new()
        .with_only_path(temp_dir.path())
        .with_env_vars([("API_URL", "http://localhost:8080"), ("API_KEY", "12345")])
        .load()?;

    let mock = MockTransport::new();
    let client = WebApiClient::from_config(&config.api, mock.shared());
    client.get("auth/status", &[]).await?;

    let request = mock.last_request().expect("request recorded");
    assert_eq!(request.url, "http://localhost:8080/auth/status");
    assert_eq!(request.header("Authorization"), Some("Bearer 12345"));
    Ok(())
}
