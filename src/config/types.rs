//! Core configuration types and loading.

use pirch_proto::CaseMapping;
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use super::defaults::{
    default_entity_capacity, default_log_filter, default_max_line_length, default_proxy_capacity,
};
use super::validation::{validate, ValidationError};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error(
        "invalid config: {}",
        .0.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
    )]
    Invalid(Vec<ValidationError>),
}

/// Client configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Who we are on the network.
    pub identity: IdentityConfig,
    /// The server we talk to.
    pub server: ServerConfig,
    /// Wire protocol settings.
    #[serde(default)]
    pub protocol: ProtocolConfig,
    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load and validate configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        content.parse()
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: Config = toml::from_str(s)?;
        validate(&config).map_err(ConfigError::Invalid)?;
        Ok(config)
    }
}

/// Local identity.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdentityConfig {
    /// Nickname (e.g., "pirch").
    pub nick: String,
    /// Username; defaults to the nickname.
    #[serde(default)]
    pub user: Option<String>,
    /// Hostname as the network sees it, if known.
    #[serde(default)]
    pub host: Option<String>,
}

impl IdentityConfig {
    /// The username, falling back to the nickname.
    pub fn user(&self) -> &str {
        self.user.as_deref().unwrap_or(&self.nick)
    }
}

/// Peer server.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Server name (e.g., "irc.libera.chat"). Lines without a prefix are
    /// attributed to it.
    pub name: String,
}

/// Wire protocol settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProtocolConfig {
    /// Case mapping used to match nicknames and channels (default: rfc1459).
    #[serde(default)]
    pub casemapping: CaseMapping,
    /// Maximum line length in bytes, terminator included (default: 512).
    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,
    /// Bound on memoised unknown-command proxies (default: 4096).
    #[serde(default = "default_proxy_capacity")]
    pub proxy_capacity: usize,
    /// Bound on shared entities per session (default: 4096).
    #[serde(default = "default_entity_capacity")]
    pub entity_capacity: usize,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            casemapping: CaseMapping::default(),
            max_line_length: default_max_line_length(),
            proxy_capacity: default_proxy_capacity(),
            entity_capacity: default_entity_capacity(),
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// `EnvFilter` directives; `RUST_LOG` takes precedence (default: "info").
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}
