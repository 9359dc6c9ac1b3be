//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Config struct definitions and TOML loading
//! - [`validation`]: Checks run after parsing
//! - `defaults`: serde default values

mod defaults;
pub mod types;
pub mod validation;

pub use types::{
    Config, ConfigError, IdentityConfig, LoggingConfig, ProtocolConfig, ServerConfig,
};
pub use validation::{validate, ValidationError};
