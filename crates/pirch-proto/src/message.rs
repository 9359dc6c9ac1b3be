//! Protocol messages: one line, decoded.
//!
//! A [`Message`] couples an origin, a command and its arguments. Decoded
//! messages remember the line they came from, so re-encoding them is free
//! and byte-exact.

use std::cell::OnceCell;
use std::fmt;
use std::sync::Arc;

use bytes::{BufMut, Bytes, BytesMut};
use smallvec::SmallVec;
use tracing::trace;

use crate::args::{ArgKey, ArgumentVector};
use crate::command::{CommandHandle, CommandRegistry};
use crate::entity::{same_entity, Connection, EntityRef};
use crate::error::{ProtocolError, Result};
use crate::tokenize::{tokenize, SENTINEL, SPACE};
use crate::value::Value;

/// Typical IRC line length, used to size encode buffers.
const LINE_CAPACITY: usize = 512;

/// One protocol line.
pub struct Message {
    origin: EntityRef,
    args: ArgumentVector,
    raw: OnceCell<Bytes>,
}

impl Message {
    /// Assemble a message from its parts.
    pub fn new(origin: EntityRef, args: ArgumentVector) -> Self {
        Self {
            origin,
            args,
            raw: OnceCell::new(),
        }
    }

    /// Build an outgoing message from our own identity.
    ///
    /// # Errors
    ///
    /// Propagates argument resolution errors from
    /// [`ArgumentVector::resolve`].
    pub fn build<I, K, V>(
        conn: Arc<dyn Connection>,
        command: CommandHandle,
        values: I,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<ArgKey>,
        V: Into<Value>,
    {
        let origin = conn.local_self();
        let args = ArgumentVector::resolve(conn, command, values)?;
        Ok(Self::new(origin, args))
    }

    /// Replace the origin.
    #[must_use]
    pub fn with_origin(self, origin: EntityRef) -> Self {
        Self::new(origin, self.args)
    }

    /// Decode one line, without its terminator.
    ///
    /// Returns `None` for lines that carry no command: empty or blank
    /// lines, lines starting with a space, and lines holding only an
    /// origin prefix.
    pub fn decode(
        registry: &CommandRegistry,
        conn: Arc<dyn Connection>,
        line: Bytes,
    ) -> Option<Self> {
        let tokens: SmallVec<[Bytes; 8]> = tokenize(&line)
            .map(|token| line.slice_ref(token))
            .collect();
        let mut tokens = tokens.into_iter();

        let first = match tokens.next() {
            Some(first) if !first.is_empty() => first,
            _ => {
                trace!(len = line.len(), "dropping line without command");
                return None;
            }
        };

        let (origin, token) = if first[0] == SENTINEL {
            let origin = conn.resolve_entity(&first[1..]);
            match tokens.next() {
                Some(token) => (origin, token),
                None => {
                    trace!("dropping prefix-only line");
                    return None;
                }
            }
        } else {
            (conn.local_peer(), first)
        };

        let command = registry.get(&token);
        let args = ArgumentVector::from_wire(conn, command, tokens);

        let message = Self::new(origin, args);
        let _ = message.raw.set(line);
        Some(message)
    }

    /// Serialise the message.
    ///
    /// The origin is omitted when it is our own identity. Values that
    /// start with the sentinel, contain a space, or are empty are emitted
    /// as the sentinel-prefixed trailing argument. The result is cached.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::MultipleTrailingArguments`] if more than
    /// one value needs the sentinel. Nothing is cached in that case.
    pub fn encode(&self) -> Result<Bytes> {
        if let Some(raw) = self.raw.get() {
            return Ok(raw.clone());
        }

        let mut buf = BytesMut::with_capacity(LINE_CAPACITY);
        if !same_entity(&self.origin, &self.args.connection().local_self()) {
            buf.put_u8(SENTINEL);
            buf.extend_from_slice(&self.origin.to_wire());
            buf.put_u8(SPACE);
        }
        buf.extend_from_slice(self.command().token());

        let mut trailing = false;
        for value in self.args.iter().flatten() {
            buf.put_u8(SPACE);
            if needs_sentinel(value) {
                if trailing {
                    return Err(ProtocolError::MultipleTrailingArguments);
                }
                trailing = true;
                buf.put_u8(SENTINEL);
            }
            buf.extend_from_slice(value);
        }

        let raw = buf.freeze();
        let _ = self.raw.set(raw.clone());
        Ok(raw)
    }

    /// Where the message came from.
    pub fn origin(&self) -> &EntityRef {
        &self.origin
    }

    /// The command, registered or proxied.
    pub fn command(&self) -> &CommandHandle {
        self.args.command()
    }

    /// The arguments.
    pub fn args(&self) -> &ArgumentVector {
        &self.args
    }

    /// Decoded value of a named argument.
    ///
    /// # Errors
    ///
    /// See [`ArgumentVector::get`].
    pub fn get(&self, name: &str) -> Result<Value> {
        self.args.get(name)
    }
}

fn needs_sentinel(value: &[u8]) -> bool {
    value.is_empty() || value[0] == SENTINEL || value.contains(&SPACE)
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("origin", &self.origin)
            .field("args", &self.args)
            .field("raw", &self.raw.get())
            .finish()
    }
}
