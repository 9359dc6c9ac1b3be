//! Configuration validation.
//!
//! Catches values that would produce unparseable lines before any are
//! sent.

use super::Config;
use thiserror::Error;

/// Smallest usable line: a one byte command plus CRLF.
const MIN_LINE_LENGTH: usize = 3;

/// Validation errors for configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("identity.nick is required")]
    MissingNick,
    #[error("identity.{field} may not contain spaces, '!', '@' or a leading ':', got '{value}'")]
    InvalidIdentity { field: &'static str, value: String },
    #[error("server.name is required")]
    MissingServerName,
    #[error("server.name may not contain spaces or a leading ':', got '{0}'")]
    InvalidServerName(String),
    #[error("protocol.max_line_length must be at least 3, got {0}")]
    LineLengthTooSmall(usize),
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let identity = &config.identity;
    if identity.nick.is_empty() {
        errors.push(ValidationError::MissingNick);
    }
    for (field, value) in [
        ("nick", Some(identity.nick.as_str())),
        ("user", identity.user.as_deref()),
        ("host", identity.host.as_deref()),
    ] {
        if let Some(value) = value {
            if value.starts_with(':') || value.contains([' ', '!', '@']) {
                errors.push(ValidationError::InvalidIdentity {
                    field,
                    value: value.to_string(),
                });
            }
        }
    }

    let name = &config.server.name;
    if name.is_empty() {
        errors.push(ValidationError::MissingServerName);
    } else if name.starts_with(':') || name.contains(' ') {
        errors.push(ValidationError::InvalidServerName(name.clone()));
    }

    if config.protocol.max_line_length < MIN_LINE_LENGTH {
        errors.push(ValidationError::LineLengthTooSmall(
            config.protocol.max_line_length,
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
