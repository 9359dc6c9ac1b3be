//! Message origins.
//!
//! An origin identifies who a message came from. It is either a server
//! name or a user's `nick!user@host` mask. Parsing is lenient and never
//! fails; the original bytes are kept so the wire form is reproduced
//! exactly.

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};
use pirch_proto::Entity;

/// A server or a user, as named in a message prefix.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub enum Origin {
    /// Server name (e.g., "irc.example.com")
    Server(Bytes),
    /// User mask; empty parts were absent.
    User {
        /// The bytes as received.
        raw: Bytes,
        /// Nickname
        nick: Bytes,
        /// Username (ident)
        user: Bytes,
        /// Hostname
        host: Bytes,
    },
}

impl Origin {
    /// Parse an origin token, without the leading `:`.
    pub fn parse(raw: impl Into<Bytes>) -> Self {
        let raw = raw.into();

        // Look for @ first (nick!user@host format)
        if let Some(at) = raw.iter().position(|&b| b == b'@') {
            let host = raw.slice(at + 1..);
            let (nick, user) = match raw[..at].iter().position(|&b| b == b'!') {
                Some(bang) => (raw.slice(..bang), raw.slice(bang + 1..at)),
                None => (raw.slice(..at), Bytes::new()),
            };
            Origin::User {
                raw,
                nick,
                user,
                host,
            }
        } else if let Some(bang) = raw.iter().position(|&b| b == b'!') {
            // nick!user without @host
            Origin::User {
                nick: raw.slice(..bang),
                user: raw.slice(bang + 1..),
                host: Bytes::new(),
                raw,
            }
        } else if raw.contains(&b'.') {
            Origin::Server(raw)
        } else {
            Origin::User {
                nick: raw.clone(),
                user: Bytes::new(),
                host: Bytes::new(),
                raw,
            }
        }
    }

    /// Build a user origin from its parts. Empty parts are left out.
    pub fn user(nick: &str, user: &str, host: &str) -> Self {
        let mut raw = BytesMut::with_capacity(nick.len() + user.len() + host.len() + 2);
        raw.put_slice(nick.as_bytes());
        if !user.is_empty() {
            raw.put_u8(b'!');
            raw.put_slice(user.as_bytes());
        }
        if !host.is_empty() {
            raw.put_u8(b'@');
            raw.put_slice(host.as_bytes());
        }
        Self::parse(raw.freeze())
    }

    /// A server origin.
    pub fn server(name: &str) -> Self {
        Origin::Server(Bytes::copy_from_slice(name.as_bytes()))
    }

    /// True for server names.
    pub fn is_server(&self) -> bool {
        matches!(self, Origin::Server(_))
    }

    /// The nickname, if this is a user with one.
    pub fn nick(&self) -> Option<&[u8]> {
        match self {
            Origin::User { nick, .. } if !nick.is_empty() => Some(nick.as_ref()),
            _ => None,
        }
    }

    /// The username, if present.
    pub fn user_name(&self) -> Option<&[u8]> {
        match self {
            Origin::User { user, .. } if !user.is_empty() => Some(user.as_ref()),
            _ => None,
        }
    }

    /// The hostname; a server's name counts as its host.
    pub fn host(&self) -> Option<&[u8]> {
        match self {
            Origin::Server(name) => Some(name.as_ref()),
            Origin::User { host, .. } if !host.is_empty() => Some(host.as_ref()),
            _ => None,
        }
    }

    /// The wire bytes.
    pub fn as_bytes(&self) -> &Bytes {
        match self {
            Origin::Server(raw) | Origin::User { raw, .. } => raw,
        }
    }

    /// The name this origin goes by: the nickname for users, the name for
    /// servers.
    pub fn key(&self) -> &[u8] {
        match self {
            Origin::Server(name) => name.as_ref(),
            Origin::User { nick, raw, .. } => {
                if nick.is_empty() {
                    raw.as_ref()
                } else {
                    nick.as_ref()
                }
            }
        }
    }
}

impl Entity for Origin {
    fn to_wire(&self) -> Bytes {
        self.as_bytes().clone()
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(self.as_bytes()))
    }
}

impl From<&str> for Origin {
    fn from(s: &str) -> Self {
        Origin::parse(Bytes::copy_from_slice(s.as_bytes()))
    }
}
