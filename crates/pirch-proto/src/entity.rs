//! Collaborator interfaces consumed by the codec.
//!
//! The core never resolves identities itself. Whoever owns the
//! connection supplies a [`Connection`] that turns origin and argument
//! tokens into [`Entity`] values, and names the two implicit identities
//! of the link.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

/// Something that can appear as a message origin or as an entity-valued
/// argument: a user, a server, a channel.
pub trait Entity: fmt::Debug + Send + Sync {
    /// The token representing this entity on the wire.
    fn to_wire(&self) -> Bytes;
}

/// Shared handle to an [`Entity`].
pub type EntityRef = Arc<dyn Entity>;

/// The per-connection services the codec relies on.
pub trait Connection: Send + Sync {
    /// Resolve an origin or entity-valued argument token.
    fn resolve_entity(&self, token: &[u8]) -> EntityRef;

    /// The implicit origin of lines that carry no prefix.
    fn local_peer(&self) -> EntityRef;

    /// Our own identity. Messages originating here are sent without a
    /// prefix.
    fn local_self(&self) -> EntityRef;
}

/// True when both handles refer to the same entity instance.
#[inline]
pub fn same_entity(a: &EntityRef, b: &EntityRef) -> bool {
    // Compare data pointers only; vtable pointers are not unique.
    std::ptr::eq(
        Arc::as_ptr(a) as *const u8,
        Arc::as_ptr(b) as *const u8,
    )
}
