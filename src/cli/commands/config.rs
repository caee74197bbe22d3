//! Config Command
//!
//! Manage gateway configuration.
//!
//! Usage:
//!   inferlink config show [-f json]
//!   inferlink config path
//!   inferlink config init [-g] [--force]

use std::path::Path;

use crate::cli::load_config;
use crate::cli::ui::Output;
use crate::config::ConfigLoader;
use crate::types::{GatewayError, Result};

/// Show the merged effective configuration
pub fn show(config_path: Option<&Path>, format: &str) -> Result<()> {
    let config = load_config(config_path)?;
    println!("{}", ConfigLoader::render(&config, format == "json")?);
    Ok(())
}

/// Show configuration paths
pub fn path() -> Result<()> {
    ConfigLoader::show_path();
    Ok(())
}

/// Write a default config file (project by default, global with `-g`)
pub fn init(global: bool, force: bool) -> Result<()> {
    let target = if global {
        ConfigLoader::global_config_path().ok_or_else(|| {
            GatewayError::Config("Cannot determine global config directory".to_string())
        })?
    } else {
        ConfigLoader::project_config_path()
    };

    let written = ConfigLoader::init(&target, force)?;
    Output::new().success(&format!("Configuration at {}", written.display()));
    Ok(())
}
