//! Shared fakes for unit tests.

use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;

use crate::entity::{Connection, Entity, EntityRef};

/// An entity that is just its wire token.
#[derive(Debug)]
pub(crate) struct Nick(pub(crate) Bytes);

impl Nick {
    pub(crate) fn entity(name: &'static str) -> EntityRef {
        Arc::new(Nick(Bytes::from_static(name.as_bytes())))
    }
}

impl Entity for Nick {
    fn to_wire(&self) -> Bytes {
        self.0.clone()
    }
}

/// A connection that records every entity resolution.
pub(crate) struct TestConn {
    pub(crate) me: EntityRef,
    pub(crate) peer: EntityRef,
    resolved: Mutex<Vec<Bytes>>,
}

impl TestConn {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            me: Nick::entity("me"),
            peer: Nick::entity("irc.example.net"),
            resolved: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn resolved(&self) -> MutexGuard<'_, Vec<Bytes>> {
        self.resolved.lock().unwrap()
    }
}

impl Connection for TestConn {
    fn resolve_entity(&self, token: &[u8]) -> EntityRef {
        let token = Bytes::copy_from_slice(token);
        self.resolved().push(token.clone());
        Arc::new(Nick(token))
    }

    fn local_peer(&self) -> EntityRef {
        self.peer.clone()
    }

    fn local_self(&self) -> EntityRef {
        self.me.clone()
    }
}
