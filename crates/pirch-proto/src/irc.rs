//! Message codec for tokio.
//!
//! [`IrcCodec`] layers a [`MessageCodec`] over [`LineCodec`], so a
//! `Framed` transport yields and accepts [`Message`]s directly.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

use crate::codec::MessageCodec;
use crate::error::{ProtocolError, Result};
use crate::line::LineCodec;
use crate::message::Message;

/// Tokio codec for protocol messages.
///
/// Lines that carry no command are skipped rather than surfaced.
#[derive(Debug)]
pub struct IrcCodec {
    inner: LineCodec,
    messages: MessageCodec,
}

impl IrcCodec {
    /// Wrap `messages` with the standard line limit.
    pub fn new(messages: MessageCodec) -> Self {
        Self::with_line_codec(messages, LineCodec::new())
    }

    /// Wrap `messages` with a custom line limit.
    pub fn with_max_len(messages: MessageCodec, max_len: usize) -> Self {
        Self::with_line_codec(messages, LineCodec::with_max_len(max_len))
    }

    fn with_line_codec(messages: MessageCodec, inner: LineCodec) -> Self {
        Self { inner, messages }
    }

    /// The message codec lines are fed through.
    pub fn messages(&self) -> &MessageCodec {
        &self.messages
    }
}

impl Decoder for IrcCodec {
    type Item = Message;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Message>> {
        while let Some(line) = self.inner.decode(src)? {
            if let Some(message) = self.messages.decode(line) {
                return Ok(Some(message));
            }
            trace!("skipped line without command");
        }
        Ok(None)
    }
}

impl Encoder<&Message> for IrcCodec {
    type Error = ProtocolError;

    fn encode(&mut self, message: &Message, dst: &mut BytesMut) -> Result<()> {
        let line = self.messages.encode(message)?;
        self.inner.encode(line, dst)
    }
}

impl Encoder<Message> for IrcCodec {
    type Error = ProtocolError;

    fn encode(&mut self, message: Message, dst: &mut BytesMut) -> Result<()> {
        <Self as Encoder<&Message>>::encode(self, &message, dst)
    }
}
