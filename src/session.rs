//! Per-connection identity context.
//!
//! A [`Session`] is the [`Connection`] the protocol core resolves origins
//! and entity-valued arguments through. It hands out one shared
//! [`Origin`] per token, matched under the configured case mapping, so
//! `Nick!u@h` and `nick!U@H` are the same entity under rfc1459 while
//! `nick` on its own is another. An entity's wire form is always the
//! token it was first resolved from.
//!
//! Our own nickname and the server name resolve to the local identities,
//! which is what lets messages from ourselves go out without a prefix.
//!
//! The entity table is bounded. Callers should [`Session::forget`] a
//! nickname once it leaves (QUIT, or the old name after NICK); past the
//! bound, new tokens resolve to fresh, unshared origins.

use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashMap;
use pirch_proto::{CaseMapping, CommandRegistry, Connection, EntityRef, IrcCodec, MessageCodec};
use tracing::{debug, trace};

use crate::config::Config;
use crate::origin::Origin;

/// Default bound on the number of shared entities per session.
pub const DEFAULT_ENTITY_CAPACITY: usize = 4096;

/// Entity table for one connection.
#[derive(Debug)]
pub struct Session {
    casemapping: CaseMapping,
    me: Arc<Origin>,
    peer: Arc<Origin>,
    entities: DashMap<Vec<u8>, Arc<Origin>>,
    capacity: usize,
}

impl Session {
    /// Create a session for `me` talking to `peer`.
    pub fn new(casemapping: CaseMapping, me: Origin, peer: Origin) -> Self {
        Self::with_capacity(casemapping, me, peer, DEFAULT_ENTITY_CAPACITY)
    }

    /// Like [`Session::new`], sharing at most `capacity` entities.
    ///
    /// The local identities are always shared and count towards the bound.
    pub fn with_capacity(
        casemapping: CaseMapping,
        me: Origin,
        peer: Origin,
        capacity: usize,
    ) -> Self {
        let session = Self {
            casemapping,
            me: Arc::new(me),
            peer: Arc::new(peer),
            entities: DashMap::new(),
            capacity,
        };
        session.remember(session.me.clone());
        session.remember(session.peer.clone());
        session
    }

    /// Create a session from the identity, server and protocol sections.
    ///
    /// Our identity is the bare nickname, so it reproduces as a target.
    pub fn from_config(config: &Config) -> Self {
        Self::with_capacity(
            config.protocol.casemapping,
            Origin::user(&config.identity.nick, "", ""),
            Origin::server(&config.server.name),
            config.protocol.entity_capacity,
        )
    }

    fn remember(&self, origin: Arc<Origin>) {
        let key = self.casemapping.to_lower(origin.as_bytes());
        self.entities.insert(key, origin);
    }

    /// Look up or create the shared origin for `token`.
    pub fn origin(&self, token: &[u8]) -> Arc<Origin> {
        let key = self.casemapping.to_lower(token);
        if let Some(origin) = self.entities.get(&key) {
            return origin.value().clone();
        }

        let origin = Origin::parse(Bytes::copy_from_slice(token));
        if self.entities.len() >= self.capacity {
            debug!(
                origin = %origin,
                capacity = self.capacity,
                "entity table full, handing out unshared origin"
            );
            return Arc::new(origin);
        }

        self.entities
            .entry(key)
            .or_insert_with(|| {
                trace!(origin = %origin, "new entity");
                Arc::new(origin)
            })
            .clone()
    }

    /// Forget every token naming `name`, e.g. after a QUIT. Users match
    /// by nickname and servers by name; the local identities stay.
    ///
    /// Returns the number of entities dropped.
    pub fn forget(&self, name: &[u8]) -> usize {
        let name = self.casemapping.to_lower(name);
        let mut removed = 0;
        self.entities.retain(|_, origin| {
            let keep = Arc::ptr_eq(origin, &self.me)
                || Arc::ptr_eq(origin, &self.peer)
                || self.casemapping.to_lower(origin.key()) != name;
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    /// Number of known entities, the local identities included.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// True if no entities are known.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// The case mapping names are matched under.
    pub fn casemapping(&self) -> CaseMapping {
        self.casemapping
    }

    /// Our own identity.
    pub fn me(&self) -> &Arc<Origin> {
        &self.me
    }

    /// The server identity.
    pub fn peer(&self) -> &Arc<Origin> {
        &self.peer
    }
}

impl Connection for Session {
    fn resolve_entity(&self, token: &[u8]) -> EntityRef {
        self.origin(token)
    }

    fn local_peer(&self) -> EntityRef {
        self.peer.clone()
    }

    fn local_self(&self) -> EntityRef {
        self.me.clone()
    }
}

/// Build a message codec for `session` using the configured limits.
pub fn message_codec(config: &Config, session: Arc<Session>) -> MessageCodec {
    let registry = CommandRegistry::with_proxy_capacity(config.protocol.proxy_capacity);
    registry.register_builtins();
    MessageCodec::new(Arc::new(registry), session)
}

/// Build a framed codec for `session` using the configured limits.
pub fn irc_codec(config: &Config, session: Arc<Session>) -> IrcCodec {
    IrcCodec::with_max_len(
        message_codec(config, session),
        config.protocol.max_line_length,
    )
}
