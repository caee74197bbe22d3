//! Unified Error Type System
//!
//! Centralized error types for the gateway.
//! Every failure that reaches a caller is mapped into a closed taxonomy of
//! [`ErrorKind`]s so retry decisions and HTTP status mapping stay mechanical.
//!
//! ## Error Kinds
//!
//! - **Timeout**: No reply within the time limit (retry)
//! - **ConnectionError**: Service refused or unreachable (fail)
//! - **RateLimited**: Upstream 429 (wait and retry)
//! - **ServerError**: Upstream 5xx (retry with backoff)
//! - **InvalidResponse**: Reply failed structural validation (fail)
//! - **ValidationError**: Request rejected locally before any I/O (fail)
//! - **Unknown**: Anything unrecognized (fail)
//!
//! ## Layers
//!
//! - [`Failure`] is the raw signal produced by a backend attempt
//! - [`ErrorClassifier`] turns a `Failure` into a [`ClassifiedError`]
//! - [`GatewayError`] is the application error for config, I/O and parsing

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Boxed error used as the cause of a raw failure
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

// =============================================================================
// Error Kinds
// =============================================================================

/// Closed taxonomy of gateway failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The service did not answer in time
    Timeout,
    /// Connection refused or host unreachable
    ConnectionError,
    /// Upstream rate limit (HTTP 429)
    RateLimited,
    /// Upstream failure (HTTP 5xx)
    ServerError,
    /// Reply is missing required fields or has wrong types
    InvalidResponse,
    /// Request failed local validation
    ValidationError,
    /// Unrecognized failure
    Unknown,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout => write!(f, "TIMEOUT"),
            Self::ConnectionError => write!(f, "CONNECTION_ERROR"),
            Self::RateLimited => write!(f, "RATE_LIMITED"),
            Self::ServerError => write!(f, "SERVER_ERROR"),
            Self::InvalidResponse => write!(f, "INVALID_RESPONSE"),
            Self::ValidationError => write!(f, "VALIDATION_ERROR"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl ErrorKind {
    /// All kinds, in declaration order
    pub const ALL: [ErrorKind; 7] = [
        Self::Timeout,
        Self::ConnectionError,
        Self::RateLimited,
        Self::ServerError,
        Self::InvalidResponse,
        Self::ValidationError,
        Self::Unknown,
    ];

    /// Check if a failure of this kind is worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout | Self::RateLimited | Self::ServerError)
    }

    /// Failure caused by the caller's input
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::ValidationError)
    }

    /// Failure caused by the inference service or the path to it
    pub fn is_upstream_failure(&self) -> bool {
        matches!(
            self,
            Self::Timeout | Self::ConnectionError | Self::ServerError | Self::RateLimited
        )
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::Timeout => "LLM_TIMEOUT",
            Self::ConnectionError => "LLM_CONNECTION_ERROR",
            Self::RateLimited => "LLM_RATE_LIMIT",
            Self::ServerError => "LLM_MODEL_ERROR",
            Self::InvalidResponse => "LLM_INVALID_RESPONSE",
            Self::ValidationError => "LLM_VALIDATION_ERROR",
            Self::Unknown => "LLM_UNKNOWN_ERROR",
        }
    }

    /// Suggested HTTP status for the routing layer
    pub fn status_hint(&self) -> u16 {
        match self {
            Self::Timeout => 504,
            Self::ConnectionError | Self::ServerError | Self::InvalidResponse => 502,
            Self::RateLimited => 429,
            Self::ValidationError => 400,
            Self::Unknown => 500,
        }
    }

    /// Human-readable summary used as the message prefix
    pub fn summary(&self) -> &'static str {
        match self {
            Self::Timeout => "No response from the AI model: time limit exceeded",
            Self::ConnectionError => "Connection to the AI model failed",
            Self::RateLimited => "Request limit for the AI model exceeded",
            Self::ServerError => "AI model error",
            Self::InvalidResponse => "Invalid response from the AI model",
            Self::ValidationError => "Invalid input data",
            Self::Unknown => "Unknown error while communicating with the AI model",
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            Self::Timeout => 0,
            Self::ConnectionError => 1,
            Self::RateLimited => 2,
            Self::ServerError => 3,
            Self::InvalidResponse => 4,
            Self::ValidationError => 5,
            Self::Unknown => 6,
        }
    }
}

// =============================================================================
// Classified Error
// =============================================================================

/// Typed diagnostic metadata carried by every classified error
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorMetadata {
    /// Attempts made before the error was surfaced
    pub attempt_count: u32,
    /// Wait suggested by the upstream service (`Retry-After`)
    pub retry_after: Option<Duration>,
    /// HTTP status returned by the upstream service
    pub status_code: Option<u16>,
}

/// The only error type that crosses the gateway boundary
#[derive(Debug, Clone)]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    pub message: String,
    pub cause: Option<Arc<dyn std::error::Error + Send + Sync>>,
    pub metadata: ErrorMetadata,
}

impl std::fmt::Display for ClassifiedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

impl std::error::Error for ClassifiedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn std::error::Error + 'static))
    }
}

impl ClassifiedError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: None,
            metadata: ErrorMetadata::default(),
        }
    }

    pub fn with_cause(mut self, cause: BoxError) -> Self {
        self.cause = Some(Arc::from(cause));
        self
    }

    pub fn with_attempts(mut self, attempt_count: u32) -> Self {
        self.metadata.attempt_count = attempt_count;
        self
    }

    pub fn with_status(mut self, status_code: u16) -> Self {
        self.metadata.status_code = Some(status_code);
        self
    }

    pub fn with_retry_after(mut self, retry_after: Option<Duration>) -> Self {
        self.metadata.retry_after = retry_after;
        self
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

// =============================================================================
// Raw Failures
// =============================================================================

/// Raw failure signal from one attempt against the inference service
#[derive(Debug, Error)]
pub enum Failure {
    /// Timeout or abort while waiting for the service
    #[error("timed out: {message}")]
    Timeout {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Connection refused, DNS failure or host unreachable
    #[error("connection failed: {message}")]
    Connect {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Non-success HTTP status
    #[error("HTTP {code}: {body}")]
    Status {
        code: u16,
        retry_after: Option<Duration>,
        body: String,
    },

    /// Reply arrived but failed structural validation
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// Request rejected before any network call
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Anything the transport could not name
    #[error("{message}")]
    Other {
        message: String,
        #[source]
        source: Option<BoxError>,
    },
}

impl Failure {
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
            source: None,
        }
    }

    pub fn connect(message: impl Into<String>) -> Self {
        Self::Connect {
            message: message.into(),
            source: None,
        }
    }

    pub fn status(code: u16, body: impl Into<String>) -> Self {
        Self::Status {
            code,
            retry_after: None,
            body: body.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
            source: None,
        }
    }
}

// =============================================================================
// Error Classifier
// =============================================================================

/// Attempt bookkeeping passed alongside a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptContext {
    /// 1-based number of attempts made so far, including the failed one
    pub attempt: u32,
}

impl AttemptContext {
    pub fn new(attempt: u32) -> Self {
        Self { attempt }
    }
}

/// Maps every raw failure to exactly one [`ErrorKind`]
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Classify a raw failure; the mapping is total
    pub fn classify(failure: Failure, ctx: AttemptContext) -> ClassifiedError {
        let classified = match failure {
            Failure::Timeout { message, source } => {
                Self::build(ErrorKind::Timeout, &message, source)
            }
            Failure::Connect { message, source } => {
                Self::build(ErrorKind::ConnectionError, &message, source)
            }
            Failure::Status {
                code,
                retry_after,
                body,
            } => Self::classify_http_status(code, &body, retry_after),
            Failure::InvalidPayload(message) => {
                Self::build(ErrorKind::InvalidResponse, &message, None)
            }
            Failure::InvalidRequest(message) => {
                Self::build(ErrorKind::ValidationError, &message, None)
            }
            Failure::Other { message, source } => {
                Self::build(ErrorKind::Unknown, &message, source)
            }
        };

        classified.with_attempts(ctx.attempt)
    }

    /// Classify an HTTP status directly
    pub fn classify_http_status(
        status: u16,
        body: &str,
        retry_after: Option<Duration>,
    ) -> ClassifiedError {
        let detail = if body.is_empty() {
            format!("HTTP {}", status)
        } else {
            format!("HTTP {}: {}", status, truncate(body, 200))
        };

        let kind = match status {
            429 => ErrorKind::RateLimited,
            408 => ErrorKind::Timeout,
            500..=u16::MAX => ErrorKind::ServerError,
            _ => ErrorKind::Unknown,
        };

        let err = Self::build(kind, &detail, None).with_status(status);
        if kind == ErrorKind::RateLimited {
            err.with_retry_after(retry_after)
        } else {
            err
        }
    }

    fn build(kind: ErrorKind, detail: &str, source: Option<BoxError>) -> ClassifiedError {
        let err = ClassifiedError::new(kind, format!("{}: {}", kind.summary(), detail));
        match source {
            Some(source) => err.with_cause(source),
            None => err,
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Failure surfaced by the gateway request lifecycle
    #[error("{0}")]
    Classified(#[from] ClassifiedError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("HTTP client error: {0}")]
    Http(String),

    /// Reply text could not be turned into a domain suggestion
    #[error("Suggestion error: {0}")]
    Suggestion(String),
}

impl GatewayError {
    /// Gateway error kind, when the error came out of the request lifecycle
    pub fn kind(&self) -> Option<ErrorKind> {
        self.classified().map(|err| err.kind)
    }

    pub fn classified(&self) -> Option<&ClassifiedError> {
        match self {
            Self::Classified(err) => Some(err),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;

/// Result of a gateway query
pub type QueryResult<T> = std::result::Result<T, ClassifiedError>;

// =============================================================================
// Tests
// =============================================================================
