//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Global config (~/.config/inferlink/config.toml)
//! 3. Project config (.inferlink/config.toml)
//! 4. Environment variables (INFERLINK_* prefix, `__` separates sections)

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::types::GatewayConfig;
use crate::types::{GatewayError, Result};

const ENV_PREFIX: &str = "INFERLINK_";

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with full resolution chain using Figment:
    /// defaults → global → project → env vars
    pub fn load() -> Result<GatewayConfig> {
        let mut figment = Figment::new().merge(Serialized::defaults(GatewayConfig::default()));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            debug!("Loading global config from: {}", global_path.display());
            figment = figment.merge(Toml::file(&global_path));
        }

        let project_path = Self::project_config_path();
        if project_path.exists() {
            debug!("Loading project config from: {}", project_path.display());
            figment = figment.merge(Toml::file(&project_path));
        }

        Self::extract(figment.merge(Self::env_provider()))
    }

    /// Load configuration from a specific file, still honoring env overrides
    pub fn load_from_file(path: &Path) -> Result<GatewayConfig> {
        if !path.exists() {
            return Err(GatewayError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        let figment = Figment::new()
            .merge(Serialized::defaults(GatewayConfig::default()))
            .merge(Toml::file(path))
            .merge(Self::env_provider());

        Self::extract(figment)
    }

    // e.g. INFERLINK_RETRY__MAX_RETRIES -> retry.max_retries
    fn env_provider() -> Env {
        Env::prefixed(ENV_PREFIX).split("__").lowercase(true)
    }

    fn extract(figment: Figment) -> Result<GatewayConfig> {
        let config: GatewayConfig = figment
            .extract()
            .map_err(|e| GatewayError::Config(format!("Configuration error: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    // =========================================================================
    // Path Management
    // =========================================================================

    /// Get path to global config directory (~/.config/inferlink/)
    pub fn global_dir() -> Option<PathBuf> {
        env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                env::var("HOME")
                    .ok()
                    .map(|home| PathBuf::from(home).join(".config"))
            })
            .map(|p| p.join("inferlink"))
    }

    /// Get path to global config file
    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join("config.toml"))
    }

    /// Get path to project config file
    pub fn project_config_path() -> PathBuf {
        PathBuf::from(".inferlink/config.toml")
    }

    // =========================================================================
    // Config Commands
    // =========================================================================

    /// Show config file paths
    pub fn show_path() {
        println!("Configuration paths:");
        println!();

        if let Some(global) = Self::global_config_path() {
            let exists = if global.exists() { "✓" } else { "✗" };
            println!("  Global:  {} {}", exists, global.display());
        } else {
            println!("  Global:  (not available)");
        }

        let project = Self::project_config_path();
        let exists = if project.exists() { "✓" } else { "✗" };
        println!("  Project: {} {}", exists, project.display());
    }

    /// Render the effective configuration as TOML or JSON
    pub fn render(config: &GatewayConfig, as_json: bool) -> Result<String> {
        if as_json {
            Ok(serde_json::to_string_pretty(config)?)
        } else {
            toml::to_string_pretty(config).map_err(|e| GatewayError::Config(e.to_string()))
        }
    }

    /// Write a default config file, returning its path
    pub fn init(path: &Path, force: bool) -> Result<PathBuf> {
        if path.exists() && !force {
            info!("Config exists: {}", path.display());
            return Ok(path.to_path_buf());
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let rendered = Self::render(&GatewayConfig::default(), false)?;
        fs::write(path, format!("{}\n{}", Self::HEADER, rendered))?;
        info!("Created config: {}", path.display());

        Ok(path.to_path_buf())
    }

    const HEADER: &'static str = "# inferlink gateway configuration\n\
        # Environment variables override this file, e.g. INFERLINK_RETRY__MAX_RETRIES=4\n";
}
