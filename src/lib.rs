//! inferlink - Resilient Inference Gateway
//!
//! Shields application services from an unreliable, rate-limited
//! language-model inference service. Every outbound call goes through one
//! request lifecycle: response cache, request validation, global throttle,
//! bounded retries with backoff, and a closed error taxonomy.
//!
//! ## Core Features
//!
//! - **Response Cache**: LRU with lazy TTL expiry, keyed by a canonical fingerprint
//! - **Request Throttle**: Process-wide minimum spacing between sends
//! - **Retry Scheduler**: Exponential backoff with jitter, retryable kinds only
//! - **Error Classification**: Every failure maps to exactly one [`ErrorKind`]
//! - **Bookmark Helpers**: Analysis, tags, search and categorization prompts
//!
//! ## Quick Start
//!
//! ```ignore
//! use inferlink::{ConfigLoader, Gateway, QueryOptions};
//!
//! let config = ConfigLoader::load()?;
//! let gateway = Gateway::from_config(&config)?;
//! let response = gateway
//!     .query("Summarize page X", None, QueryOptions::default())
//!     .await?;
//! ```
//!
//! ## Modules
//!
//! - [`gateway`]: Cache, throttle, retry scheduler, backends and the facade
//! - [`types`]: Requests, responses and the error taxonomy
//! - [`bookmark`]: Domain records, prompt builders and reply parsers
//! - [`config`]: Layered configuration

pub mod bookmark;
pub mod cli;
pub mod config;
pub mod constants;
pub mod gateway;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

// Configuration
pub use config::{ConfigLoader, GatewayConfig};

// Error Types
pub use types::error::{ClassifiedError, ErrorKind, GatewayError, QueryResult, Result};

// Request/Response
pub use types::{CacheKey, Request, Response, ResponseMetadata};

// =============================================================================
// Gateway Re-exports
// =============================================================================

pub use gateway::{
    CacheStats, Gateway, HttpBackend, InferenceBackend, MetricsSummary, QueryOptions,
    SharedBackend,
};

pub use bookmark::{Bookmark, CategorySuggestion};
