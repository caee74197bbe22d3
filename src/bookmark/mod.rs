//! Bookmark Domain
//!
//! Records the higher-level gateway helpers shape prompts from, plus parsers
//! that turn reply text back into domain values.

pub mod prompts;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::types::{GatewayError, Result};

/// A saved link, as handed to the gateway by the persistence layer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Bookmark {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Title, falling back to the URL
    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(&self.url)
    }
}

// =============================================================================
// Category Suggestion
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySuggestion {
    pub category: String,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl CategorySuggestion {
    /// Parse the JSON object a category prompt asks for.
    ///
    /// Markdown fences and prose around the object are tolerated.
    pub fn parse(text: &str) -> Result<Self> {
        let json = extract_delimited(text, '{', '}').ok_or_else(|| {
            GatewayError::Suggestion("Failed to parse category suggestion from reply".to_string())
        })?;

        let suggestion: Self = serde_json::from_str(json).map_err(|e| {
            GatewayError::Suggestion(format!("Failed to parse category suggestion: {}", e))
        })?;

        if suggestion.category.trim().is_empty() {
            return Err(GatewayError::Suggestion(
                "Suggested category is empty".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&suggestion.confidence) {
            return Err(GatewayError::Suggestion(format!(
                "Suggestion confidence must be within [0, 1], got {}",
                suggestion.confidence
            )));
        }

        Ok(suggestion)
    }

    /// Existing category matching the suggestion, ignoring case
    pub fn matching<'a>(&self, existing: &'a [String]) -> Option<&'a str> {
        existing
            .iter()
            .find(|name| name.eq_ignore_ascii_case(self.category.trim()))
            .map(String::as_str)
    }
}

// =============================================================================
// Reply Parsing
// =============================================================================

/// Extract a tag list from reply text.
///
/// Prefers a JSON string array anywhere in the text; otherwise splits on
/// commas and newlines. Tags are trimmed, lower-cased and deduplicated in
/// first-seen order.
pub fn parse_tags(text: &str) -> Vec<String> {
    let raw: Vec<String> = extract_delimited(text, '[', ']')
        .and_then(|json| serde_json::from_str::<Vec<String>>(json).ok())
        .unwrap_or_else(|| {
            strip_fences(text)
                .split([',', '\n'])
                .map(|t| t.trim().trim_start_matches(['-', '*', '#']).to_string())
                .collect()
        });

    let mut seen = HashSet::new();
    raw.into_iter()
        .map(|tag| tag.trim().trim_matches('"').trim().to_lowercase())
        .filter(|tag| !tag.is_empty() && seen.insert(tag.clone()))
        .collect()
}

fn strip_fences(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
}

// Outermost open..close span, if both delimiters appear in order
fn extract_delimited(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}

/// Deterministic display color for a new category.
///
/// Hue comes from a string hash over UTF-16 units, so the same name always
/// maps to the same `hsl(h, 70%, 50%)`. Only the shift is truncated to 32
/// bits; the subtraction and addition run in `f64` and never wrap.
pub fn category_color(name: &str) -> String {
    let hash = name.encode_utf16().fold(0f64, |acc, unit| {
        let shifted = (acc as i64 as i32).wrapping_shl(5);
        f64::from(unit) + (f64::from(shifted) - acc)
    });
    let hue = (hash % 360.0).abs() as u32;
    format!("hsl({}, 70%, 50%)", hue)
}
