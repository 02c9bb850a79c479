//! Server configuration
//!
//! Configuration can be loaded from:
//! - A TOML file passed on the command line
//! - Environment variables (SYNDICATE_*), used for defaults

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;
use crate::history::{MAX_CHANNELS, MAX_HISTORY};

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Code required to register a new identity
    #[serde(default = "default_invite_code")]
    pub invite_code: String,

    /// Path of the user directory document
    #[serde(default = "default_directory_path")]
    pub directory_path: PathBuf,

    /// Administrator identity, seeded into an empty directory and listed first
    #[serde(default = "default_admin_alias")]
    pub admin_alias: String,

    /// Channel whose history is sent on join
    #[serde(default = "default_channel")]
    pub default_channel: String,

    /// Messages retained per channel
    #[serde(default = "default_max_history")]
    pub max_history: usize,

    /// Distinct channels kept in history
    #[serde(default = "default_max_channels")]
    pub max_channels: usize,

    /// Largest inbound WebSocket message, in bytes
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,

    /// Per-client outbound queue size
    #[serde(default = "default_client_buffer")]
    pub client_buffer: usize,

    /// Server command queue size
    #[serde(default = "default_command_buffer")]
    pub command_buffer: usize,
}

fn default_host() -> String {
    std::env::var("SYNDICATE_HOST").unwrap_or_else(|_| "127.0.0.1".to_string())
}

fn default_port() -> u16 {
    std::env::var("SYNDICATE_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000)
}

fn default_invite_code() -> String {
    std::env::var("SYNDICATE_INVITE_CODE").unwrap_or_else(|_| "SYNDICATE".to_string())
}

fn default_directory_path() -> PathBuf {
    std::env::var("SYNDICATE_DIRECTORY")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("users.json"))
}

fn default_admin_alias() -> String {
    "Architect".to_string()
}

fn default_channel() -> String {
    "general".to_string()
}

fn default_max_history() -> usize {
    MAX_HISTORY
}

fn default_max_channels() -> usize {
    MAX_CHANNELS
}

fn default_max_frame_bytes() -> usize {
    64 * 1024 // 64 KB
}

fn default_client_buffer() -> usize {
    32
}

fn default_command_buffer() -> usize {
    256
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            invite_code: default_invite_code(),
            directory_path: default_directory_path(),
            admin_alias: default_admin_alias(),
            default_channel: default_channel(),
            max_history: default_max_history(),
            max_channels: default_max_channels(),
            max_frame_bytes: default_max_frame_bytes(),
            client_buffer: default_client_buffer(),
            command_buffer: default_command_buffer(),
        }
    }
}

impl Config {
    /// Load from `path` if given, otherwise defaults with environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the server cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sizes = [
            ("max_history", self.max_history),
            ("max_channels", self.max_channels),
            ("max_frame_bytes", self.max_frame_bytes),
            ("client_buffer", self.client_buffer),
            ("command_buffer", self.command_buffer),
        ];
        for (name, value) in sizes {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{} must be at least 1", name)));
            }
        }
        Ok(())
    }

    /// Socket address to bind to
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse().map_err(|_| ConfigError::InvalidAddr(addr))
    }
}
