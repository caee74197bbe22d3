//! CLI Common Utilities
//!
//! Shared initialization and argument helpers for CLI commands.

use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use crate::config::{ConfigLoader, GatewayConfig};
use crate::gateway::Gateway;
use crate::types::{GatewayError, Result};

/// Command execution context
///
/// Resolved configuration plus a gateway built from it.
#[derive(Clone)]
pub struct CommandContext {
    pub config: GatewayConfig,
    pub gateway: Gateway,
}

impl CommandContext {
    /// Load configuration (explicit file or the default resolution chain)
    /// and build the HTTP-backed gateway.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config = load_config(config_path)?;
        let gateway = Gateway::from_config(&config)?;
        Ok(Self { config, gateway })
    }
}

pub fn load_config(config_path: Option<&Path>) -> Result<GatewayConfig> {
    match config_path {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

/// Parse an optional `--context` argument as JSON
pub fn parse_context(raw: Option<&str>) -> Result<Option<Value>> {
    raw.map(|text| {
        serde_json::from_str(text)
            .map_err(|e| GatewayError::Config(format!("--context is not valid JSON: {}", e)))
    })
    .transpose()
}

/// Split a comma-separated argument, dropping blanks
pub fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|text| {
        text.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(String::from)
            .collect()
    })
    .unwrap_or_default()
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_context() {
        assert_eq!(parse_context(None).unwrap(), None);
        assert_eq!(
            parse_context(Some(r#"{"a":1}"#)).unwrap(),
            Some(serde_json::json!({"a": 1}))
        );
        assert!(parse_context(Some("{oops")).is_err());
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list(Some(" rust, ,web ")), vec!["rust", "web"]);
        assert!(split_list(None).is_empty());
    }
}
