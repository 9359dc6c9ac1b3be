//! # pirch-proto
//!
//! The wire-format core of the pirch IRC client: it turns raw protocol
//! lines into typed messages and back.
//!
//! ## Features
//!
//! - Byte-exact tokenizing with the `:` trailing-argument sentinel
//! - Declarative per-command argument schemas with head and tail positions,
//!   defaults, and named access
//! - Forward references: lines naming an unregistered command decode to a
//!   proxy that picks up the schema once it is registered
//! - The three IRC case mappings
//! - Optional Tokio integration for framed transports
//!
//! Transport, identity resolution and session state are left to the
//! caller, who plugs them in through the [`Connection`] and [`Entity`]
//! traits.

#![deny(clippy::all)]
#![warn(missing_docs)]

//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use bytes::Bytes;
//! use pirch_proto::{
//!     ArgumentDescriptor, Command, CommandRegistry, Connection, Entity, EntityRef,
//!     MessageCodec, Value,
//! };
//!
//! #[derive(Debug)]
//! struct Name(Bytes);
//!
//! impl Entity for Name {
//!     fn to_wire(&self) -> Bytes {
//!         self.0.clone()
//!     }
//! }
//!
//! struct Conn {
//!     me: EntityRef,
//! }
//!
//! impl Connection for Conn {
//!     fn resolve_entity(&self, token: &[u8]) -> EntityRef {
//!         Arc::new(Name(Bytes::copy_from_slice(token)))
//!     }
//!     fn local_peer(&self) -> EntityRef {
//!         Arc::new(Name(Bytes::from_static(b"irc.example.net")))
//!     }
//!     fn local_self(&self) -> EntityRef {
//!         self.me.clone()
//!     }
//! }
//!
//! let registry = Arc::new(CommandRegistry::with_builtins());
//! registry.register(
//!     Command::new("PRIVMSG")
//!         .with_argument(ArgumentDescriptor::entity("target", 0)?)?
//!         .with_argument(ArgumentDescriptor::raw("text", -1)?)?,
//! )?;
//!
//! let me: EntityRef = Arc::new(Name(Bytes::from_static(b"me")));
//! let codec = MessageCodec::new(registry, Arc::new(Conn { me }));
//!
//! let msg = codec.decode(&b":alice!a@host PRIVMSG #rust :hi there"[..]).unwrap();
//! assert_eq!(msg.get("text")?, Value::from("hi there"));
//!
//! let reply = codec.message(b"PRIVMSG", [("target", "#rust"), ("text", "hello")])?;
//! assert_eq!(codec.encode(&reply)?.as_ref(), b"PRIVMSG #rust hello");
//! # Ok::<(), pirch_proto::ProtocolError>(())
//! ```

pub mod args;
pub mod casemap;
pub mod codec;
pub mod command;
pub mod entity;
pub mod error;
#[cfg(feature = "tokio")]
pub mod irc;
#[cfg(feature = "tokio")]
pub mod line;
pub mod message;
pub mod tokenize;
pub mod value;

#[cfg(test)]
mod test_support;

pub use self::args::{ArgKey, ArgumentVector};
pub use self::casemap::CaseMapping;
pub use self::codec::MessageCodec;
pub use self::command::{
    ArgumentDescriptor, Command, CommandHandle, CommandRegistry, Conversion, UnresolvedCommand,
};
pub use self::entity::{same_entity, Connection, Entity, EntityRef};
pub use self::error::{ProtocolError, Result};
#[cfg(feature = "tokio")]
pub use self::irc::IrcCodec;
#[cfg(feature = "tokio")]
pub use self::line::LineCodec;
pub use self::message::Message;
pub use self::tokenize::tokenize;
pub use self::value::Value;
