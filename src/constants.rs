//! Global Constants
//!
//! Centralized defaults for the gateway.
//! All magic numbers should be defined here with documentation.

/// Retry scheduler constants
pub mod retry {
    /// Retries after the initial attempt (3 attempts total)
    pub const DEFAULT_MAX_RETRIES: u32 = 2;

    /// Base delay for exponential backoff (milliseconds)
    pub const INITIAL_DELAY_MS: u64 = 1000;

    /// Ceiling for the exponential part of the delay (milliseconds)
    pub const MAX_DELAY_MS: u64 = 5000;

    /// Upper bound of the uniform jitter added to every delay (milliseconds)
    pub const JITTER_MAX_MS: u64 = 1000;
}

/// Request throttle constants
pub mod throttle {
    /// Minimum spacing between two outbound sends (milliseconds)
    pub const MIN_SPACING_MS: u64 = 100;
}

/// Response cache constants
pub mod cache {
    /// Maximum entries held in memory
    pub const MAX_ENTRIES: usize = 500;

    /// Entry lifetime measured from insertion (24 hours)
    pub const TTL_MS: u64 = 24 * 60 * 60 * 1000;
}

/// HTTP/Network constants
pub mod network {
    /// Per-attempt request timeout (milliseconds)
    pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

    /// Default inference service base URL
    pub const DEFAULT_BASE_URL: &str = "http://localhost:1234/v1";

    /// Chat completions path appended to the base URL
    pub const COMPLETIONS_PATH: &str = "/chat/completions";

    /// Embeddings path appended to the base URL
    pub const EMBEDDINGS_PATH: &str = "/embeddings";

    /// Model named in embedding requests unless configured otherwise
    pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";
}

/// Prompt shaping constants for the bookmark helpers
pub mod prompts {
    /// System message sent ahead of every user prompt
    pub const DEFAULT_SYSTEM_PROMPT: &str =
        "You are an AI assistant that analyzes bookmarks and provides insights.";

    /// Sampling temperature for free-text bookmark analysis
    pub const ANALYZE_TEMPERATURE: f32 = 0.7;

    /// Token cap for free-text bookmark analysis
    pub const ANALYZE_MAX_TOKENS: u32 = 500;

    /// Sampling temperature for tag generation
    pub const TAGS_TEMPERATURE: f32 = 0.3;

    /// Sampling temperature for category suggestion
    pub const CATEGORY_TEMPERATURE: f32 = 0.3;

    /// Sampling temperature for semantic search
    pub const SEARCH_TEMPERATURE: f32 = 0.2;

    /// Bookmarks beyond this count are dropped from the search context
    pub const MAX_SEARCH_CANDIDATES: usize = 200;
}
