//! Gateway Response
//!
//! Validated reply from the inference service, as handed to callers and as
//! stored in the response cache.

use serde::{Deserialize, Serialize};

/// Reply text plus optional diagnostics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub text: String,
    #[serde(default)]
    pub metadata: ResponseMetadata,
}

/// Diagnostics reported by the service, plus the cache flag set by the gateway
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    /// Model confidence in [0, 1]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Server-side processing time (positive)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    /// Tokens consumed (positive)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_count: Option<u64>,
    /// Set to `true` when served from the response cache
    #[serde(skip_serializing_if = "Option::is_none")]
    pub was_cached: Option<bool>,
}

impl Response {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: ResponseMetadata::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: ResponseMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Copy handed out on a cache hit
    pub fn mark_cached(mut self) -> Self {
        self.metadata.was_cached = Some(true);
        self
    }

    pub fn was_cached(&self) -> bool {
        self.metadata.was_cached.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_cached() {
        let response = Response::new("hello");
        assert!(!response.was_cached());
        assert!(response.mark_cached().was_cached());
    }

    #[test]
    fn test_serializes_camel_case_and_skips_empty() {
        let response = Response::new("hi").with_metadata(ResponseMetadata {
            model_id: Some("local-7b".into()),
            processing_time_ms: Some(12.5),
            ..Default::default()
        });
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["metadata"]["modelId"], "local-7b");
        assert_eq!(json["metadata"]["processingTimeMs"], 12.5);
        assert!(json["metadata"].get("wasCached").is_none());
    }
}
