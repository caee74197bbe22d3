//! Gateway against a mock inference service over real HTTP

use std::time::Duration;

use inferlink::config::GatewayConfig;
use inferlink::gateway::{Gateway, QueryOptions};
use inferlink::types::ErrorKind;
use mockito::{Matcher, Server};
use serde_json::json;

const PATH: &str = "/v1/chat/completions";

fn config(base_url: String) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.backend.base_url = base_url;
    config.retry.initial_delay_ms = 10;
    config.retry.max_delay_ms = 20;
    config.retry.jitter_max_ms = 0;
    config.throttle.min_spacing_ms = 0;
    config.timeout_ms = 2_000;
    config
}

#[tokio::test]
async fn test_success_is_parsed_and_cached() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", PATH)
        .match_body(Matcher::PartialJson(json!({
            "messages": [
                {"role": "system", "content": inferlink::constants::prompts::DEFAULT_SYSTEM_PROMPT},
                {"role": "user", "content": "Summarize page X"}
            ],
            "temperature": 0.5
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"response":"A page about X","metadata":{"model":"local-7b","tokens":12}}"#)
        .expect(1)
        .create_async()
        .await;

    let gateway = Gateway::from_config(&config(format!("{}/v1", server.url()))).unwrap();
    let options = QueryOptions::default().with_temperature(0.5);

    let first = gateway
        .query("Summarize page X", None, options.clone())
        .await
        .unwrap();
    assert_eq!(first.text, "A page about X");
    assert_eq!(first.metadata.model_id.as_deref(), Some("local-7b"));
    assert!(!first.was_cached());

    let second = gateway
        .query("Summarize page X", None, options)
        .await
        .unwrap();
    assert!(second.was_cached());

    mock.assert_async().await;
}

#[tokio::test]
async fn test_rate_limit_exhausts_retries_and_keeps_hint() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", PATH)
        .with_status(429)
        .with_header("retry-after", "7")
        .with_body("too many requests")
        .expect(3)
        .create_async()
        .await;

    let gateway = Gateway::from_config(&config(format!("{}/v1", server.url()))).unwrap();
    let err = gateway
        .query("p", None, QueryOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::RateLimited);
    assert_eq!(err.metadata.attempt_count, 3);
    assert_eq!(err.metadata.status_code, Some(429));
    assert_eq!(err.metadata.retry_after, Some(Duration::from_secs(7)));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_server_error_is_retried() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", PATH)
        .with_status(503)
        .expect(3)
        .create_async()
        .await;

    let gateway = Gateway::from_config(&config(format!("{}/v1", server.url()))).unwrap();
    let err = gateway
        .query("p", None, QueryOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::ServerError);
    assert_eq!(gateway.cache_stats().size, 0);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_missing_response_field_is_invalid_and_not_retried() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", PATH)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"text":"wrong field"}"#)
        .expect(1)
        .create_async()
        .await;

    let gateway = Gateway::from_config(&config(format!("{}/v1", server.url()))).unwrap();
    let err = gateway
        .query("p", None, QueryOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::InvalidResponse);
    assert_eq!(err.metadata.attempt_count, 1);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_client_status_is_unknown_and_not_retried() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", PATH)
        .with_status(404)
        .expect(1)
        .create_async()
        .await;

    let gateway = Gateway::from_config(&config(format!("{}/v1", server.url()))).unwrap();
    let err = gateway
        .query("p", None, QueryOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::Unknown);
    assert_eq!(err.metadata.status_code, Some(404));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_api_key_sent_as_bearer_token() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", PATH)
        .match_header("authorization", "Bearer sk-test")
        .with_status(200)
        .with_body(r#"{"response":"ok"}"#)
        .expect(1)
        .create_async()
        .await;

    let mut config = config(format!("{}/v1", server.url()));
    config.backend.api_key = Some("sk-test".to_string());
    let gateway = Gateway::from_config(&config).unwrap();

    let response = gateway
        .query("p", None, QueryOptions::default())
        .await
        .unwrap();
    assert_eq!(response.text, "ok");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_connection_refused() {
    let gateway = Gateway::from_config(&config("http://127.0.0.1:1/v1".to_string())).unwrap();
    let err = gateway
        .query("p", None, QueryOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::ConnectionError);
    assert_eq!(err.metadata.attempt_count, 1);
}

const EMBEDDINGS_PATH: &str = "/v1/embeddings";

#[tokio::test]
async fn test_embedding_is_fetched_once_and_cached() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", EMBEDDINGS_PATH)
        .match_body(Matcher::Json(json!({
            "input": "async runtimes",
            "model": "text-embedding-ada-002"
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"object":"list","data":[{"object":"embedding","index":0,"embedding":[0.25,-0.5,1.0]}]}"#)
        .expect(1)
        .create_async()
        .await;

    let gateway = Gateway::from_config(&config(format!("{}/v1", server.url()))).unwrap();

    let first = gateway.generate_embedding("async runtimes").await.unwrap();
    assert_eq!(first, vec![0.25, -0.5, 1.0]);
    let second = gateway.generate_embedding("async runtimes").await.unwrap();
    assert_eq!(second, first);

    mock.assert_async().await;
}

#[tokio::test]
async fn test_embedding_server_error_is_retried() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", EMBEDDINGS_PATH)
        .with_status(502)
        .expect(3)
        .create_async()
        .await;

    let gateway = Gateway::from_config(&config(format!("{}/v1", server.url()))).unwrap();
    let err = gateway.generate_embedding("text").await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::ServerError);
    assert_eq!(err.metadata.attempt_count, 3);
    assert_eq!(err.metadata.status_code, Some(502));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_empty_embedding_is_invalid_response() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", EMBEDDINGS_PATH)
        .with_status(200)
        .with_body(r#"{"data":[{"embedding":[]}]}"#)
        .expect(1)
        .create_async()
        .await;

    let gateway = Gateway::from_config(&config(format!("{}/v1", server.url()))).unwrap();
    let err = gateway.generate_embedding("text").await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::InvalidResponse);
    assert_eq!(gateway.embedding_cache_stats().size, 0);
    mock.assert_async().await;
}
