//! Inference Backend
//!
//! The seam between the gateway and the external inference service. A backend
//! performs exactly one attempt per call and reports failures as raw
//! [`Failure`]s; classification and retries happen above it.
//!
//! [`HttpBackend`] speaks the chat-completions and embeddings wire formats
//! over `reqwest` and structurally validates every reply before returning it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::GatewayConfig;
use crate::types::{Failure, GatewayError, Request, Response, ResponseMetadata, Result};

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Body of `POST <base>/chat/completions`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    /// System message first, then the user prompt
    pub fn from_request(request: &Request, system_prompt: &str) -> Self {
        let mut messages = Vec::with_capacity(2);
        if !system_prompt.is_empty() {
            messages.push(ChatMessage::system(system_prompt));
        }
        messages.push(ChatMessage::user(request.prompt()));

        Self {
            messages,
            context: request.context().cloned(),
            temperature: request.temperature(),
            max_tokens: request.max_tokens(),
        }
    }

    /// Content of the last user message
    pub fn user_prompt(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }
}

#[derive(Debug, Deserialize)]
struct WireReply {
    response: String,
    #[serde(default)]
    metadata: Option<WireMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireMetadata {
    confidence: Option<f64>,
    processing_time: Option<f64>,
    model: Option<String>,
    tokens: Option<u64>,
}

/// Decode and structurally validate a reply body.
///
/// A missing `response`, a wrong field type, or an out-of-range metadata
/// value is an `InvalidPayload` failure.
pub fn parse_reply(body: &str) -> std::result::Result<Response, Failure> {
    let reply: WireReply = serde_json::from_str(body)
        .map_err(|e| Failure::InvalidPayload(format!("malformed reply: {}", e)))?;

    let metadata = match reply.metadata {
        Some(meta) => validate_metadata(meta)?,
        None => ResponseMetadata::default(),
    };

    Ok(Response::new(reply.response).with_metadata(metadata))
}

fn validate_metadata(meta: WireMetadata) -> std::result::Result<ResponseMetadata, Failure> {
    if let Some(confidence) = meta.confidence
        && !(0.0..=1.0).contains(&confidence)
    {
        return Err(Failure::InvalidPayload(format!(
            "metadata.confidence must be within [0, 1], got {}",
            confidence
        )));
    }

    if let Some(processing_time) = meta.processing_time
        && !(processing_time.is_finite() && processing_time > 0.0)
    {
        return Err(Failure::InvalidPayload(format!(
            "metadata.processingTime must be positive, got {}",
            processing_time
        )));
    }

    if meta.tokens == Some(0) {
        return Err(Failure::InvalidPayload(
            "metadata.tokens must be positive".to_string(),
        ));
    }

    Ok(ResponseMetadata {
        confidence: meta.confidence,
        processing_time_ms: meta.processing_time,
        model_id: meta.model,
        token_count: meta.tokens,
        was_cached: None,
    })
}

/// Body of `POST <base>/embeddings`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    pub input: String,
    pub model: String,
}

impl EmbeddingRequest {
    pub fn new(input: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            model: model.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireEmbeddingReply {
    data: Vec<WireEmbedding>,
}

#[derive(Debug, Deserialize)]
struct WireEmbedding {
    embedding: Vec<f32>,
}

/// Decode an embeddings reply and return the first vector.
///
/// No data, an empty vector, a non-numeric component or one that overflows
/// `f32` is an `InvalidPayload` failure.
pub fn parse_embedding(body: &str) -> std::result::Result<Vec<f32>, Failure> {
    let reply: WireEmbeddingReply = serde_json::from_str(body)
        .map_err(|e| Failure::InvalidPayload(format!("malformed embedding reply: {}", e)))?;

    let embedding = reply
        .data
        .into_iter()
        .next()
        .map(|item| item.embedding)
        .ok_or_else(|| Failure::InvalidPayload("embedding reply has no data".to_string()))?;

    if embedding.is_empty() {
        return Err(Failure::InvalidPayload(
            "embedding vector is empty".to_string(),
        ));
    }
    if let Some(idx) = embedding.iter().position(|v| !v.is_finite()) {
        return Err(Failure::InvalidPayload(format!(
            "embedding component {} is not finite",
            idx
        )));
    }

    Ok(embedding)
}

// =============================================================================
// Backend Trait
// =============================================================================

/// One attempt against the inference service
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    async fn send(&self, request: &CompletionRequest) -> std::result::Result<Response, Failure>;

    async fn embed(&self, request: &EmbeddingRequest) -> std::result::Result<Vec<f32>, Failure>;

    fn name(&self) -> &str;
}

pub type SharedBackend = Arc<dyn InferenceBackend>;

// =============================================================================
// HTTP Backend
// =============================================================================

pub struct HttpBackend {
    endpoint: String,
    embeddings_endpoint: String,
    /// Never exposed in logs or debug output
    api_key: Option<SecretString>,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| GatewayError::Http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: config.backend.endpoint(),
            embeddings_endpoint: config.backend.embeddings_endpoint(),
            api_key: config
                .backend
                .api_key
                .as_ref()
                .filter(|key| !key.is_empty())
                .map(|key| SecretString::from(key.clone())),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn embeddings_endpoint(&self) -> &str {
        &self.embeddings_endpoint
    }

    /// POST a JSON body and return the success body as text
    async fn post<B: Serialize + Sync>(
        &self,
        url: &str,
        body: &B,
    ) -> std::result::Result<String, Failure> {
        let mut builder = self.client.post(url).json(body);
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", key.expose_secret()));
        }

        let response = builder.send().await.map_err(transport_failure)?;
        let status = response.status();

        if !status.is_success() {
            let retry_after = retry_after(response.headers());
            let body = response.text().await.unwrap_or_default();
            debug!(status = status.as_u16(), "Inference service returned error status");
            return Err(Failure::Status {
                code: status.as_u16(),
                retry_after,
                body,
            });
        }

        response.text().await.map_err(transport_failure)
    }
}

#[async_trait]
impl InferenceBackend for HttpBackend {
    async fn send(&self, request: &CompletionRequest) -> std::result::Result<Response, Failure> {
        let body = self.post(&self.endpoint, request).await?;
        parse_reply(&body)
    }

    async fn embed(&self, request: &EmbeddingRequest) -> std::result::Result<Vec<f32>, Failure> {
        let body = self.post(&self.embeddings_endpoint, request).await?;
        parse_embedding(&body)
    }

    fn name(&self) -> &str {
        "http"
    }
}

fn transport_failure(err: reqwest::Error) -> Failure {
    let message = err.to_string();
    if err.is_timeout() {
        Failure::Timeout {
            message,
            source: Some(Box::new(err)),
        }
    } else if err.is_connect() {
        Failure::Connect {
            message,
            source: Some(Box::new(err)),
        }
    } else {
        Failure::Other {
            message,
            source: Some(Box::new(err)),
        }
    }
}

/// Only the `Retry-After: <seconds>` form is understood
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let raw = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();
    raw.parse::<u64>().ok().map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;
    use serde_json::json;

    #[test]
    fn test_completion_request_shape() {
        let request = Request::new("Summarize page X")
            .with_temperature(Some(0.5))
            .with_max_tokens(Some(64));
        let body = CompletionRequest::from_request(&request, "You are helpful.");

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            json!({
                "messages": [
                    {"role": "system", "content": "You are helpful."},
                    {"role": "user", "content": "Summarize page X"}
                ],
                "temperature": 0.5,
                "max_tokens": 64
            })
        );
        assert_eq!(body.user_prompt(), Some("Summarize page X"));
    }

    #[test]
    fn test_completion_request_carries_context() {
        let request = Request::new("p").with_context(Some(json!({"existingTags": ["rust"]})));
        let body = CompletionRequest::from_request(&request, "");

        assert_eq!(body.messages.len(), 1);
        assert_eq!(body.context, Some(json!({"existingTags": ["rust"]})));
    }

    #[test]
    fn test_parse_reply_with_metadata() {
        let response = parse_reply(
            r#"{"response":"ok","metadata":{"confidence":0.9,"processingTime":120,"model":"local-7b","tokens":42,"retryCount":0}}"#,
        )
        .unwrap();

        assert_eq!(response.text, "ok");
        assert_eq!(response.metadata.confidence, Some(0.9));
        assert_eq!(response.metadata.processing_time_ms, Some(120.0));
        assert_eq!(response.metadata.model_id.as_deref(), Some("local-7b"));
        assert_eq!(response.metadata.token_count, Some(42));
        assert!(!response.was_cached());
    }

    #[test]
    fn test_parse_reply_without_metadata() {
        let response = parse_reply(r#"{"response":"plain"}"#).unwrap();
        assert_eq!(response.text, "plain");
        assert_eq!(response.metadata, ResponseMetadata::default());
    }

    #[test]
    fn test_parse_reply_rejects_malformed() {
        let cases = [
            r#"{"metadata":{}}"#,
            r#"{"response":42}"#,
            r#"{"response":"x","metadata":{"confidence":1.5}}"#,
            r#"{"response":"x","metadata":{"processingTime":-3}}"#,
            r#"{"response":"x","metadata":{"tokens":0}}"#,
            r#"{"response":"x","metadata":{"tokens":"many"}}"#,
            r#"{"response":"x","metadata":{"model":7}}"#,
            "not json",
        ];
        for body in cases {
            assert!(
                matches!(parse_reply(body), Err(Failure::InvalidPayload(_))),
                "expected invalid payload for {}",
                body
            );
        }
    }

    #[test]
    fn test_embedding_request_shape() {
        let body = EmbeddingRequest::new("async runtimes", "text-embedding-ada-002");
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"input": "async runtimes", "model": "text-embedding-ada-002"})
        );
    }

    #[test]
    fn test_parse_embedding_takes_first_vector() {
        let embedding = parse_embedding(
            r#"{"data":[{"embedding":[0.5,-1,2.25],"index":0},{"embedding":[9]}],"model":"m"}"#,
        )
        .unwrap();
        assert_eq!(embedding, vec![0.5, -1.0, 2.25]);
    }

    #[test]
    fn test_parse_embedding_rejects_malformed() {
        let cases = [
            r#"{"data":[]}"#,
            r#"{"data":[{"embedding":[]}]}"#,
            r#"{"data":[{"embedding":[0.1,"x"]}]}"#,
            r#"{"data":[{"embedding":[0.1,null]}]}"#,
            r#"{"data":[{"embedding":[1e300]}]}"#,
            r#"{"data":[{}]}"#,
            r#"{"embedding":[0.1]}"#,
            "not json",
        ];
        for body in cases {
            assert!(
                matches!(parse_embedding(body), Err(Failure::InvalidPayload(_))),
                "expected invalid payload for {}",
                body
            );
        }
    }

    #[test]
    fn test_retry_after_seconds() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after(&headers), None);

        headers.insert(RETRY_AFTER, HeaderValue::from_static(" 12 "));
        assert_eq!(retry_after(&headers), Some(Duration::from_secs(12)));

        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(retry_after(&headers), None);
    }

    #[test]
    fn test_http_backend_endpoint() {
        let mut config = GatewayConfig::default();
        config.backend.base_url = "http://127.0.0.1:9/v1".to_string();
        let backend = HttpBackend::new(&config).unwrap();
        assert_eq!(backend.endpoint(), "http://127.0.0.1:9/v1/chat/completions");
        assert_eq!(backend.embeddings_endpoint(), "http://127.0.0.1:9/v1/embeddings");
        assert_eq!(backend.name(), "http");
    }
}
