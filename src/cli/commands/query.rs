//! Query Command
//!
//! Send one prompt through the gateway and print the response as JSON.
//!
//! Usage:
//!   inferlink query "Summarize page X" [--context '{"k":"v"}'] [--temperature 0.2]
//!   inferlink embed "async runtimes"

use std::time::Duration;

use clap::Args;
use serde_json::json;

use crate::cli::ui::Output;
use crate::cli::{CommandContext, parse_context, print_json};
use crate::gateway::QueryOptions;
use crate::types::Result;

#[derive(Debug, Args)]
pub struct QueryArgs {
    /// Prompt text
    pub prompt: String,

    /// Structured context as JSON; part of the cache key
    #[arg(long)]
    pub context: Option<String>,

    /// Sampling temperature in [0, 2]
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Token cap for the reply
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Abort the whole call, retries included, after this many milliseconds
    #[arg(long)]
    pub deadline_ms: Option<u64>,

    /// Skip the cache lookup
    #[arg(long)]
    pub no_cache: bool,

    /// Print cache and request counters afterwards
    #[arg(long)]
    pub stats: bool,
}

impl QueryArgs {
    pub fn options(&self) -> QueryOptions {
        QueryOptions {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            deadline: self.deadline_ms.map(Duration::from_millis),
            bypass_cache: self.no_cache,
        }
    }
}

pub async fn run(ctx: &CommandContext, args: QueryArgs) -> Result<()> {
    let context = parse_context(args.context.as_deref())?;
    let output = Output::new();

    let result = ctx
        .gateway
        .query(&args.prompt, context, args.options())
        .await;

    if args.stats {
        output.stats(&ctx.gateway.cache_stats(), &ctx.gateway.metrics());
    }

    match result {
        Ok(response) => print_json(&response),
        Err(err) => {
            output.classified(&err);
            Err(err.into())
        }
    }
}

/// Print the embedding vector for `text`
pub async fn embed(ctx: &CommandContext, text: &str) -> Result<()> {
    match ctx.gateway.generate_embedding(text).await {
        Ok(embedding) => print_json(&json!({
            "dimensions": embedding.len(),
            "embedding": embedding,
        })),
        Err(err) => {
            Output::new().classified(&err);
            Err(err.into())
        }
    }
}
