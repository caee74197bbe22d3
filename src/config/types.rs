//! Configuration Types
//!
//! All configuration structures with defaults matching the documented gateway
//! behavior. Every section is `#[serde(default)]` so partial files merge cleanly.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{cache, network, prompts, retry, throttle};
use crate::types::{GatewayError, Result};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Configuration version
    pub version: String,

    /// Inference service connection
    pub backend: BackendConfig,

    /// Retry and backoff policy
    pub retry: RetryConfig,

    /// Outbound request pacing
    pub throttle: ThrottleConfig,

    /// Response cache bounds
    pub cache: CacheConfig,

    /// Per-attempt network timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            backend: BackendConfig::default(),
            retry: RetryConfig::default(),
            throttle: ThrottleConfig::default(),
            cache: CacheConfig::default(),
            timeout_ms: network::DEFAULT_TIMEOUT_MS,
        }
    }
}

impl GatewayConfig {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `GatewayError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        if self.cache.max_entries == 0 {
            return Err(GatewayError::Config(
                "cache.max_entries must be greater than 0".to_string(),
            ));
        }

        if self.timeout_ms == 0 {
            return Err(GatewayError::Config(
                "timeout_ms must be greater than 0".to_string(),
            ));
        }

        if self.retry.initial_delay_ms > self.retry.max_delay_ms {
            return Err(GatewayError::Config(format!(
                "retry.initial_delay_ms ({}) must not exceed retry.max_delay_ms ({})",
                self.retry.initial_delay_ms, self.retry.max_delay_ms
            )));
        }

        url::Url::parse(&self.backend.base_url).map_err(|e| {
            GatewayError::Config(format!(
                "backend.base_url '{}' is not a valid URL: {}",
                self.backend.base_url, e
            ))
        })?;

        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

// =============================================================================
// Backend Configuration
// =============================================================================

/// Inference service connection settings
///
/// The API key is never serialized and is redacted in debug output. The HTTP
/// backend converts it to a `SecretString` for runtime protection.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL; `/chat/completions` and `/embeddings` are appended
    pub base_url: String,
    /// Bearer token, if the service requires one
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// System message sent ahead of every prompt
    pub system_prompt: String,
    /// Model named in embedding requests
    pub embedding_model: String,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("system_prompt", &self.system_prompt)
            .field("embedding_model", &self.embedding_model)
            .finish()
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: network::DEFAULT_BASE_URL.to_string(),
            api_key: None,
            system_prompt: prompts::DEFAULT_SYSTEM_PROMPT.to_string(),
            embedding_model: network::DEFAULT_EMBEDDING_MODEL.to_string(),
        }
    }
}

impl BackendConfig {
    /// Full completions endpoint
    pub fn endpoint(&self) -> String {
        self.join(network::COMPLETIONS_PATH)
    }

    pub fn embeddings_endpoint(&self) -> String {
        self.join(network::EMBEDDINGS_PATH)
    }

    fn join(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

// =============================================================================
// Retry Configuration
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry, doubled for each later one
    pub initial_delay_ms: u64,
    /// Cap on the exponential part of the delay
    pub max_delay_ms: u64,
    /// Uniform jitter added on top, in `[0, jitter_max_ms]`
    pub jitter_max_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: retry::DEFAULT_MAX_RETRIES,
            initial_delay_ms: retry::INITIAL_DELAY_MS,
            max_delay_ms: retry::MAX_DELAY_MS,
            jitter_max_ms: retry::JITTER_MAX_MS,
        }
    }
}

impl RetryConfig {
    /// Total attempts allowed, including the first one
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

// =============================================================================
// Throttle Configuration
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottleConfig {
    /// Minimum spacing between two outbound sends
    pub min_spacing_ms: u64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            min_spacing_ms: throttle::MIN_SPACING_MS,
        }
    }
}

impl ThrottleConfig {
    pub fn min_spacing(&self) -> Duration {
        Duration::from_millis(self.min_spacing_ms)
    }
}

// =============================================================================
// Cache Configuration
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Capacity; least-recently-accessed entries are evicted beyond it
    pub max_entries: usize,
    /// Lifetime measured from insertion
    pub ttl_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: cache::MAX_ENTRIES,
            ttl_ms: cache::TTL_MS,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }
}
