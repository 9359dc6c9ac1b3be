//! Line codec bound to a registry and a connection.
//!
//! [`MessageCodec`] is the entry point most callers want: it carries the
//! command registry and the connection context that [`Message::decode`]
//! and [`Message::build`] otherwise take on every call.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

use crate::args::ArgKey;
use crate::command::CommandRegistry;
use crate::entity::Connection;
use crate::error::Result;
use crate::message::Message;
use crate::value::Value;

/// Decodes and encodes lines for one connection.
#[derive(Clone)]
pub struct MessageCodec {
    registry: Arc<CommandRegistry>,
    conn: Arc<dyn Connection>,
}

impl MessageCodec {
    /// Create a codec over `registry` for `conn`.
    pub fn new(registry: Arc<CommandRegistry>, conn: Arc<dyn Connection>) -> Self {
        Self { registry, conn }
    }

    /// Decode one line without its terminator.
    ///
    /// Returns `None` when the line carries no command.
    pub fn decode(&self, line: impl Into<Bytes>) -> Option<Message> {
        Message::decode(&self.registry, self.conn.clone(), line.into())
    }

    /// Encode a message, without a line terminator.
    ///
    /// # Errors
    ///
    /// See [`Message::encode`].
    pub fn encode(&self, message: &Message) -> Result<Bytes> {
        message.encode()
    }

    /// Build an outgoing message for the command named `token`.
    ///
    /// Unregistered tokens are accepted and encode positional values only.
    ///
    /// # Errors
    ///
    /// Propagates argument resolution errors.
    pub fn message<I, K, V>(&self, token: &[u8], values: I) -> Result<Message>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<ArgKey>,
        V: Into<Value>,
    {
        Message::build(self.conn.clone(), self.registry.get(token), values)
    }

    /// The command registry.
    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    /// The connection context.
    pub fn connection(&self) -> &Arc<dyn Connection> {
        &self.conn
    }
}

impl fmt::Debug for MessageCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageCodec")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
