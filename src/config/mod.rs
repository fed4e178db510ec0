//! Configuration management
//!
//! YAML-based configuration with environment-variable path override and
//! defaults for every setting, so the service boots with no config file in
//! development. The tenancy section is where the development-host escape
//! hatch lives: a reserved routing token for loopback and preview hosts,
//! injected as configuration rather than hardcoded in the resolver.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub tenancy: TenancyConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5070
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

fn default_database_url() -> String {
    "sqlite://worklane.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

/// Authentication configuration (bearer token verification)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// Secret shared with the external auth service
    pub jwt_secret: String,
    #[serde(default = "default_token_expiry_hours")]
    pub token_expiry_hours: i64,
}

fn default_token_expiry_hours() -> i64 {
    24
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
    #[serde(default)]
    pub target: LogTarget,
    /// Directory for log files (used when target is "file")
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            target: LogTarget::default(),
            log_dir: default_log_dir(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

/// Log output format
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Log output target
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    #[default]
    Console,
    File,
}

/// Tenancy configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TenancyConfig {
    /// Reserved routing token that loopback and preview hosts resolve to.
    /// A development convenience only; production hosts never match it.
    #[serde(default = "default_dev_token")]
    pub dev_token: String,
    /// Host suffixes (preview/staging platforms) that also map to the
    /// development token.
    #[serde(default = "default_preview_suffixes")]
    pub preview_suffixes: Vec<String>,
}

impl Default for TenancyConfig {
    fn default() -> Self {
        Self {
            dev_token: default_dev_token(),
            preview_suffixes: default_preview_suffixes(),
        }
    }
}

fn default_dev_token() -> String {
    "dev".to_string()
}

fn default_preview_suffixes() -> Vec<String> {
    vec!["worklane.local".to_string()]
}

impl AppConfig {
    /// Load configuration from the first existing well-known location
    ///
    /// Order: `WORKLANE_CONFIG` env var, `./worklane.yaml`,
    /// `/etc/worklane/config.yaml`. With no file present, defaults are used
    /// (the JWT secret then comes from `WORKLANE_JWT_SECRET`).
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        if let Ok(path) = std::env::var("WORKLANE_CONFIG") {
            return Self::load_from(Path::new(&path));
        }

        for candidate in ["worklane.yaml", "/etc/worklane/config.yaml"] {
            let path = Path::new(candidate);
            if path.exists() {
                return Self::load_from(path);
            }
        }

        info!("No configuration file found, using defaults");
        let jwt_secret = std::env::var("WORKLANE_JWT_SECRET")
            .context("WORKLANE_JWT_SECRET must be set when no config file is present")?;

        Ok(Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            auth: AuthConfig {
                jwt_secret,
                token_expiry_hours: default_token_expiry_hours(),
            },
            logging: LoggingConfig::default(),
            tenancy: TenancyConfig::default(),
        })
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: AppConfig = serde_norway::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        info!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }
}
