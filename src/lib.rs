//! pirch - IRC client building blocks
//!
//! Wires the [`pirch_proto`] line-protocol core to a configuration file,
//! a log subscriber and a reference identity context.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use pirch::{config::Config, session, telemetry, Session};
//!
//! let config = Config::load("pirch.toml")?;
//! telemetry::init(&config.logging)?;
//!
//! let session = Arc::new(Session::from_config(&config));
//! let codec = session::irc_codec(&config, session);
//! # let _ = codec;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod origin;
pub mod session;
pub mod telemetry;

pub use config::{Config, ConfigError};
pub use origin::Origin;
pub use session::Session;
