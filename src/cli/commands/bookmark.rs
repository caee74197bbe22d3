//! Bookmark Commands
//!
//! Usage:
//!   inferlink analyze --url https://tokio.rs --title Tokio --tags rust,async
//!   inferlink tags --url https://tokio.rs
//!   inferlink categorize --url https://tokio.rs --existing Development,News
//!   inferlink search "async runtimes" --bookmarks bookmarks.json

use std::fs;
use std::path::Path;

use clap::Args;
use serde_json::json;

use crate::bookmark::{Bookmark, category_color, parse_tags};
use crate::cli::ui::Output;
use crate::cli::{CommandContext, print_json, split_list};
use crate::types::{GatewayError, QueryResult, Response, Result};

#[derive(Debug, Args)]
pub struct BookmarkArgs {
    #[arg(long)]
    pub url: String,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long)]
    pub category: Option<String>,

    /// Comma-separated tags
    #[arg(long)]
    pub tags: Option<String>,
}

impl BookmarkArgs {
    pub fn to_bookmark(&self) -> Bookmark {
        Bookmark {
            id: None,
            url: self.url.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            category: self.category.clone(),
            tags: split_list(self.tags.as_deref()),
        }
    }
}

fn reply(result: QueryResult<Response>) -> Result<Response> {
    report(result.map_err(GatewayError::from))
}

/// Print code, status hint and attempts for a gateway failure, then pass it on
fn report<T>(result: Result<T>) -> Result<T> {
    result.inspect_err(|err| {
        if let Some(classified) = err.classified() {
            Output::new().classified(classified);
        }
    })
}

pub async fn analyze(ctx: &CommandContext, args: &BookmarkArgs) -> Result<()> {
    let response = reply(ctx.gateway.analyze_bookmark(&args.to_bookmark()).await)?;
    print_json(&response)
}

pub async fn tags(ctx: &CommandContext, args: &BookmarkArgs) -> Result<()> {
    let response = reply(ctx.gateway.generate_tags(&args.to_bookmark()).await)?;
    let tags = parse_tags(&response.text);
    print_json(&json!({ "tags": tags, "response": response }))
}

pub async fn categorize(
    ctx: &CommandContext,
    args: &BookmarkArgs,
    existing: Option<&str>,
) -> Result<()> {
    let existing = split_list(existing);
    let suggestion = report(
        ctx.gateway
            .suggest_category(&args.to_bookmark(), &existing)
            .await,
    )?;

    let output = Output::new();
    let (name, is_new) = match suggestion.matching(&existing) {
        Some(name) => (name.to_string(), false),
        None => (suggestion.category.trim().to_string(), true),
    };
    if is_new {
        output.info(&format!("'{}' is a new category", name));
    }

    print_json(&json!({
        "category": name,
        "isNew": is_new,
        "color": category_color(&name),
        "suggestion": suggestion,
    }))
}

pub async fn search(ctx: &CommandContext, query: &str, bookmarks_path: &Path) -> Result<()> {
    let bookmarks = load_bookmarks(bookmarks_path)?;
    Output::new().info(&format!(
        "Searching {} bookmarks from {}",
        bookmarks.len(),
        bookmarks_path.display()
    ));

    let response = reply(ctx.gateway.search_bookmarks(query, &bookmarks).await)?;
    print_json(&response)
}

/// Read a JSON array of bookmarks
pub fn load_bookmarks(path: &Path) -> Result<Vec<Bookmark>> {
    let content = fs::read_to_string(path).map_err(|e| {
        GatewayError::Config(format!("Cannot read bookmarks file {}: {}", path.display(), e))
    })?;
    Ok(serde_json::from_str(&content)?)
}
