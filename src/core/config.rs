//! Configuration management for the MCP server.
//!
//! This module provides a centralized configuration structure populated from
//! environment variables (optionally via a `.env` file) on top of defaults.

use super::error::{Error, Result};
use super::transport::TransportConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Top-level directory names readable by default.
pub const DEFAULT_ALLOWED_DIRS: [&str; 3] = ["www", "themes", "custom_templates"];

/// Main configuration structure for the MCP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server identification and metadata.
    pub server: ServerConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,

    /// Transport configuration.
    pub transport: TransportConfig,

    /// Filesystem access configuration.
    pub access: AccessConfig,
}

/// Server identification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The name of the server as reported to clients.
    pub name: String,

    /// The version of the server.
    pub version: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "trace").
    pub level: String,

    /// Whether to include timestamps in log output.
    pub with_timestamps: bool,
}

/// Configuration for filesystem access.
///
/// Fixed at startup; the request path never changes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessConfig {
    /// Trusted base directory every request path is relative to.
    pub base_dir: PathBuf,

    /// Top-level directories under `base_dir` that may be listed.
    pub read_dirs: Vec<String>,

    /// Top-level directories reserved for write access.
    /// No tool writes yet, so nothing reads this list.
    pub write_dirs: Vec<String>,

    /// Whether `pattern` matching distinguishes upper and lower case.
    pub pattern_case_sensitive: bool,
}

impl Default for AccessConfig {
    fn default() -> Self {
        let allowed: Vec<String> = DEFAULT_ALLOWED_DIRS.iter().map(|d| d.to_string()).collect();
        Self {
            base_dir: PathBuf::from("."),
            read_dirs: allowed.clone(),
            write_dirs: allowed,
            // Follows the host convention: Windows file names are case-insensitive
            pattern_case_sensitive: !cfg!(windows),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                name: "files-mcp-server".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                with_timestamps: true,
            },
            transport: TransportConfig::default(),
            access: AccessConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables are expected to be prefixed with `MCP_`.
    /// For example: `MCP_SERVER_NAME`, `MCP_BASE_DIR`, `MCP_READ_DIRS`.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        if let Ok(name) = std::env::var("MCP_SERVER_NAME") {
            config.server.name = name;
        }

        if let Ok(level) = std::env::var("MCP_LOG_LEVEL") {
            config.logging.level = level;
        }

        if let Ok(timestamps) = std::env::var("MCP_LOG_TIMESTAMPS") {
            config.logging.with_timestamps = parse_flag(&timestamps).unwrap_or(true);
        }

        // Load transport configuration from environment
        config.transport = TransportConfig::from_env();

        if let Ok(base_dir) = std::env::var("MCP_BASE_DIR") {
            config.access.base_dir = PathBuf::from(base_dir);
            info!("Base directory set to {:?}", config.access.base_dir);
        } else {
            warn!("MCP_BASE_DIR not set - using the current working directory as base");
        }

        if let Ok(dirs) = std::env::var("MCP_READ_DIRS") {
            config.access.read_dirs = parse_list(&dirs);
        }

        if let Ok(dirs) = std::env::var("MCP_WRITE_DIRS") {
            config.access.write_dirs = parse_list(&dirs);
        }

        if let Ok(flag) = std::env::var("MCP_PATTERN_CASE_SENSITIVE") {
            match parse_flag(&flag) {
                Some(value) => config.access.pattern_case_sensitive = value,
                None => warn!("Ignoring invalid MCP_PATTERN_CASE_SENSITIVE value: {}", flag),
            }
        }

        config
    }

    /// Check the access section before the server starts serving.
    pub fn validate(&self) -> Result<()> {
        let base_dir = &self.access.base_dir;
        if !base_dir.is_dir() {
            return Err(Error::config(format!(
                "base directory {:?} does not exist or is not a directory",
                base_dir
            )));
        }

        if self.access.read_dirs.is_empty() {
            return Err(Error::config("read allow-list is empty"));
        }

        for dir in &self.access.read_dirs {
            if !is_plain_segment(dir) {
                return Err(Error::config(format!(
                    "allow-list entry '{}' must be a single directory name",
                    dir
                )));
            }
            if !base_dir.join(dir).exists() {
                warn!("Allow-listed directory '{}' does not exist yet", dir);
            }
        }

        Ok(())
    }
}

/// Split a comma separated list, dropping blanks.
fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn is_plain_segment(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
        && Path::new(name).file_name().is_some()
}
