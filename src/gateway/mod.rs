//! Inference Gateway
//!
//! Single entry point for calls to the external inference service. One
//! `query` primitive composes the cache, throttle, retry scheduler and
//! backend into a request lifecycle:
//!
//! ```text
//! CacheCheck ─hit─▶ Return (wasCached = true)
//!     │miss
//!     ▼
//! Validate ─▶ Throttle ─▶ Send/Retry ─▶ Store ─▶ Return
//!     │                       │
//!     └──────── Failed ◀──────┘
//! ```
//!
//! A [`Gateway`] is cheap to clone; clones share the same cache, throttle and
//! metrics, so a composition root builds one and hands clones to every
//! service that needs it.

pub mod backend;
pub mod cache;
pub mod metrics;
pub mod retry;
pub mod throttle;
pub mod timeout;

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument};
use uuid::Uuid;

pub use backend::{
    ChatMessage, CompletionRequest, EmbeddingRequest, HttpBackend, InferenceBackend, Role,
    SharedBackend, parse_embedding, parse_reply,
};
pub use cache::{CacheStats, ResponseCache};
pub use metrics::{GatewayMetrics, MetricsSummary};
pub use retry::RetryScheduler;
pub use throttle::RequestThrottle;

use crate::bookmark::{Bookmark, CategorySuggestion, prompts};
use crate::config::GatewayConfig;
use crate::constants::prompts as prompt_constants;
use crate::types::{
    AttemptContext, CacheKey, ClassifiedError, ErrorClassifier, Failure, QueryResult, Request,
    Response, Result,
};
use timeout::with_deadline;

/// Per-call knobs for [`Gateway::query`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Abort the whole call, retries included, after this long
    pub deadline: Option<Duration>,
    /// Skip the cache lookup; a successful reply still refreshes the entry
    pub bypass_cache: bool,
}

impl QueryOptions {
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn bypass_cache(mut self) -> Self {
        self.bypass_cache = true;
        self
    }
}

#[derive(Clone)]
pub struct Gateway {
    backend: SharedBackend,
    cache: Arc<ResponseCache>,
    /// Separate from `cache` so text replies and vectors never share a key
    embeddings: Arc<ResponseCache<Vec<f32>>>,
    throttle: Arc<RequestThrottle>,
    retry: RetryScheduler,
    metrics: Arc<GatewayMetrics>,
    system_prompt: Arc<str>,
    embedding_model: Arc<str>,
}

impl Gateway {
    pub fn new(backend: SharedBackend, config: &GatewayConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            backend,
            cache: Arc::new(ResponseCache::from_config(&config.cache)?),
            embeddings: Arc::new(ResponseCache::from_config(&config.cache)?),
            throttle: Arc::new(RequestThrottle::from_config(&config.throttle)),
            retry: RetryScheduler::new(config.retry.clone()),
            metrics: Arc::new(GatewayMetrics::new()),
            system_prompt: Arc::from(config.backend.system_prompt.as_str()),
            embedding_model: Arc::from(config.backend.embedding_model.as_str()),
        })
    }

    /// Gateway over the HTTP backend described by `config`
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        let backend = HttpBackend::new(config)?;
        info!(endpoint = backend.endpoint(), "Inference gateway ready");
        Self::new(Arc::new(backend), config)
    }

    /// Send one prompt through the full request lifecycle.
    ///
    /// Cache hits return immediately without throttling or network I/O. All
    /// failures come back as a classified error.
    pub async fn query(
        &self,
        prompt: &str,
        context: Option<Value>,
        options: QueryOptions,
    ) -> QueryResult<Response> {
        let request = Request::new(prompt)
            .with_context(context)
            .with_temperature(options.temperature)
            .with_max_tokens(options.max_tokens);
        self.execute(request, options).await
    }

    /// [`Gateway::query`] with any serializable value as context.
    ///
    /// A context that cannot be rendered as JSON fails with `ValidationError`
    /// before the cache is consulted.
    pub async fn query_with<T: Serialize>(
        &self,
        prompt: &str,
        context: &T,
        options: QueryOptions,
    ) -> QueryResult<Response> {
        match Request::new(prompt).with_serializable_context(context) {
            Ok(request) => {
                let request = request
                    .with_temperature(options.temperature)
                    .with_max_tokens(options.max_tokens);
                self.execute(request, options).await
            }
            Err(failure) => {
                self.metrics.record_query();
                Err(self.reject(failure))
            }
        }
    }

    #[instrument(
        name = "gateway.query",
        skip(self, request, options),
        fields(request_id = %Uuid::new_v4(), prompt_len = request.prompt().len())
    )]
    async fn execute(&self, request: Request, options: QueryOptions) -> QueryResult<Response> {
        self.metrics.record_query();
        let key = request.cache_key();

        if options.bypass_cache {
            debug!(key = %key, "Cache bypassed");
        } else if let Some(hit) = self.cache.get(&key) {
            self.metrics.record_cache_hit();
            debug!(key = %key, "Cache hit");
            return Ok(hit.mark_cached());
        } else {
            self.metrics.record_cache_miss();
            debug!(key = %key, "Cache miss");
        }

        if let Err(failure) = request.validate() {
            return Err(self.reject(failure));
        }

        let attempts = AtomicU32::new(0);
        let completion = CompletionRequest::from_request(&request, &self.system_prompt);
        let (backend, completion) = (&self.backend, &completion);
        let outcome = with_deadline(
            options.deadline,
            self.send_with_retry(&attempts, move || backend.send(completion)),
            &attempts,
        )
        .await;

        if let Ok(response) = &outcome {
            self.store(key, response);
        }
        self.record_outcome(outcome, &attempts)
    }

    /// Embedding vector for `text`, through the same cache, throttle and
    /// retry lifecycle as [`Gateway::query`]
    #[instrument(
        name = "gateway.embed",
        skip(self, text),
        fields(request_id = %Uuid::new_v4(), text_len = text.len())
    )]
    pub async fn generate_embedding(&self, text: &str) -> QueryResult<Vec<f32>> {
        self.metrics.record_query();
        let request = Request::new(text);
        let key = request.cache_key();

        if let Some(hit) = self.embeddings.get(&key) {
            self.metrics.record_cache_hit();
            debug!(key = %key, "Embedding cache hit");
            return Ok(hit);
        }
        self.metrics.record_cache_miss();

        if let Err(failure) = request.validate() {
            return Err(self.reject(failure));
        }

        let attempts = AtomicU32::new(0);
        let body = EmbeddingRequest::new(text, &*self.embedding_model);
        let (backend, body) = (&self.backend, &body);
        let outcome = self
            .send_with_retry(&attempts, move || backend.embed(body))
            .await;

        if let Ok(embedding) = &outcome {
            self.embeddings.set(key, embedding.clone());
        }
        self.record_outcome(outcome, &attempts)
    }

    async fn send_with_retry<T, F, Fut>(&self, attempts: &AtomicU32, send: F) -> QueryResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = std::result::Result<T, Failure>>,
    {
        let send = &send;
        self.retry
            .run(move |attempt| async move {
                // Every attempt, retries included, counts against global spacing
                let sequence = self.throttle.acquire().await;
                attempts.store(attempt, Ordering::Relaxed);
                self.metrics.record_attempt(attempt);
                debug!(
                    attempt,
                    sequence,
                    backend = self.backend.name(),
                    "Sending request"
                );
                send().await
            })
            .await
    }

    /// Local rejection before any throttle wait or network call
    fn reject(&self, failure: Failure) -> ClassifiedError {
        let err = ErrorClassifier::classify(failure, AttemptContext::new(0));
        self.metrics.record_failure(err.kind);
        err
    }

    fn record_outcome<T>(&self, outcome: QueryResult<T>, attempts: &AtomicU32) -> QueryResult<T> {
        match &outcome {
            Ok(_) => {
                self.metrics.record_success();
                info!(
                    attempts = attempts.load(Ordering::Relaxed),
                    "Query completed"
                );
            }
            Err(err) => self.metrics.record_failure(err.kind),
        }
        outcome
    }

    fn store(&self, key: CacheKey, response: &Response) {
        let mut stored = response.clone();
        stored.metadata.was_cached = None;
        self.cache.set(key, stored);
    }

    // =========================================================================
    // Bookmark Helpers
    // =========================================================================

    /// Free-text analysis of one bookmark
    pub async fn analyze_bookmark(&self, bookmark: &Bookmark) -> QueryResult<Response> {
        let (prompt, context) = prompts::analyze(bookmark);
        let options = QueryOptions::default()
            .with_temperature(prompt_constants::ANALYZE_TEMPERATURE)
            .with_max_tokens(prompt_constants::ANALYZE_MAX_TOKENS);
        self.query(&prompt, Some(context), options).await
    }

    /// Tag suggestions; the reply text is a JSON array, see [`crate::bookmark::parse_tags`]
    pub async fn generate_tags(&self, bookmark: &Bookmark) -> QueryResult<Response> {
        let (prompt, context) = prompts::tags(bookmark);
        let options = QueryOptions::default().with_temperature(prompt_constants::TAGS_TEMPERATURE);
        self.query(&prompt, Some(context), options).await
    }

    /// Semantic search over a caller-supplied set of bookmarks
    pub async fn search_bookmarks(
        &self,
        query: &str,
        bookmarks: &[Bookmark],
    ) -> QueryResult<Response> {
        let (prompt, context) = prompts::search(query, bookmarks);
        let options =
            QueryOptions::default().with_temperature(prompt_constants::SEARCH_TEMPERATURE);
        self.query(&prompt, Some(context), options).await
    }

    /// Suggest a category, preferring one of `existing_categories` when it fits
    pub async fn suggest_category(
        &self,
        bookmark: &Bookmark,
        existing_categories: &[String],
    ) -> Result<CategorySuggestion> {
        let (prompt, context) = prompts::category(bookmark, existing_categories);
        let options =
            QueryOptions::default().with_temperature(prompt_constants::CATEGORY_TEMPERATURE);
        let response = self.query(&prompt, Some(context), options).await?;
        CategorySuggestion::parse(&response.text)
    }

    // =========================================================================
    // Observability and Cache Administration
    // =========================================================================

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn embedding_cache_stats(&self) -> CacheStats {
        self.embeddings.stats()
    }

    /// Empty both the reply and the embedding cache
    pub fn clear_cache(&self) {
        self.cache.clear();
        self.embeddings.clear();
        info!("Response cache cleared");
    }

    /// Drop the cached reply for one prompt/context pair
    pub fn invalidate(&self, prompt: &str, context: Option<&Value>) -> bool {
        self.cache.delete(&CacheKey::new(prompt, context))
    }

    pub fn purge_expired_cache(&self) -> usize {
        self.cache.purge_expired() + self.embeddings.purge_expired()
    }

    pub fn metrics(&self) -> MetricsSummary {
        self.metrics.summary()
    }

    /// Outbound sends performed so far, across all clones
    pub fn request_count(&self) -> u64 {
        self.throttle.request_count()
    }
}
