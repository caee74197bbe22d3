//! Prompt and context builders for the bookmark helpers.
//!
//! Each builder returns the prompt text and the structured context that goes
//! into the cache key, so identical domain inputs always hit the same entry.

use serde_json::{Value, json};

use super::Bookmark;
use crate::constants::prompts::MAX_SEARCH_CANDIDATES;

fn or_placeholder<'a>(value: Option<&'a str>, placeholder: &'a str) -> &'a str {
    value.filter(|v| !v.trim().is_empty()).unwrap_or(placeholder)
}

pub fn analyze(bookmark: &Bookmark) -> (String, Value) {
    let prompt = format!(
        "Analyze this bookmark:\n\
         Title: {}\n\
         URL: {}\n\
         Description: {}\n\
         Category: {}\n\
         Tags: {}\n\n\
         Provide a short summary of the content, its main topics, and how it could be organized.",
        bookmark.display_title(),
        bookmark.url,
        or_placeholder(bookmark.description.as_deref(), "No description"),
        or_placeholder(bookmark.category.as_deref(), "Uncategorized"),
        bookmark.tags.join(", "),
    );

    (prompt, json!({ "task": "analyze" }))
}

pub fn tags(bookmark: &Bookmark) -> (String, Value) {
    let prompt = format!(
        "Suggest tags for this bookmark:\n\
         Title: {}\n\
         URL: {}\n\
         Description: {}\n\n\
         Return only a JSON array of 3 to 7 short, lower-case tags, for example [\"rust\", \"web\"]. \
         Reuse existing tags when they fit.",
        bookmark.display_title(),
        bookmark.url,
        or_placeholder(bookmark.description.as_deref(), "No description"),
    );

    (
        prompt,
        json!({ "task": "tags", "existingTags": bookmark.tags }),
    )
}

pub fn search(query: &str, bookmarks: &[Bookmark]) -> (String, Value) {
    let candidates: Vec<Value> = bookmarks
        .iter()
        .take(MAX_SEARCH_CANDIDATES)
        .enumerate()
        .map(|(idx, b)| {
            json!({
                "id": b.id.clone().unwrap_or_else(|| idx.to_string()),
                "title": b.display_title(),
                "url": b.url,
                "tags": b.tags,
            })
        })
        .collect();

    let prompt = format!(
        "Find the bookmarks that best match this search query: \"{}\"\n\n\
         The candidate bookmarks are provided in the context. Return the ids of the matching \
         bookmarks ordered by relevance, with one sentence explaining each match.",
        query.trim()
    );

    (
        prompt,
        json!({ "task": "search", "query": query.trim(), "bookmarks": candidates }),
    )
}

pub fn category(bookmark: &Bookmark, existing_categories: &[String]) -> (String, Value) {
    let prompt = format!(
        "Analyze this bookmark and suggest the most appropriate category:\n\n\
         Title: {}\n\
         URL: {}\n\
         Description: {}\n\n\
         Return the response in the following JSON format:\n\
         {{\n  \
           \"category\": \"string - suggested category name\",\n  \
           \"confidence\": number - confidence score between 0 and 1,\n  \
           \"explanation\": \"string - brief explanation of why this category was chosen\"\n\
         }}\n\n\
         Consider the following guidelines:\n\
         1. Choose a broad, general category that would be useful for organizing bookmarks\n\
         2. Use existing categories if they match well\n\
         3. Be consistent with naming conventions\n\
         4. Consider the main topic or purpose of the content",
        bookmark.display_title(),
        bookmark.url,
        or_placeholder(bookmark.description.as_deref(), "No description provided"),
    );

    (prompt, json!({ "existingCategories": existing_categories }))
}
