//! Argument values.

use std::fmt;

use bytes::Bytes;

use crate::entity::{same_entity, EntityRef};

/// A decoded or to-be-encoded argument value.
#[derive(Clone, Default)]
pub enum Value {
    /// No value and no default. Distinct from an empty [`Value::Raw`].
    #[default]
    Unset,
    /// Raw wire bytes.
    Raw(Bytes),
    /// A resolved entity.
    Entity(EntityRef),
}

impl Value {
    /// Build a raw value from anything byte-like.
    pub fn raw(bytes: impl Into<Bytes>) -> Self {
        Value::Raw(bytes.into())
    }

    /// True for [`Value::Unset`].
    pub fn is_unset(&self) -> bool {
        matches!(self, Value::Unset)
    }

    /// The raw bytes, if this is a raw value.
    pub fn as_raw(&self) -> Option<&Bytes> {
        match self {
            Value::Raw(b) => Some(b),
            _ => None,
        }
    }

    /// The entity, if this is an entity value.
    pub fn as_entity(&self) -> Option<&EntityRef> {
        match self {
            Value::Entity(e) => Some(e),
            _ => None,
        }
    }

    /// Wire form of this value, `None` when unset.
    pub fn to_wire(&self) -> Option<Bytes> {
        match self {
            Value::Unset => None,
            Value::Raw(b) => Some(b.clone()),
            Value::Entity(e) => Some(e.to_wire()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unset => f.write_str("Unset"),
            Value::Raw(b) => f.debug_tuple("Raw").field(b).finish(),
            Value::Entity(e) => f.debug_tuple("Entity").field(e).finish(),
        }
    }
}

/// Raw values compare by bytes, entities by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Unset, Value::Unset) => true,
            (Value::Raw(a), Value::Raw(b)) => a == b,
            (Value::Entity(a), Value::Entity(b)) => same_entity(a, b),
            _ => false,
        }
    }
}

impl From<Bytes> for Value {
    fn from(b: Bytes) -> Self {
        Value::Raw(b)
    }
}

impl From<&'static [u8]> for Value {
    fn from(b: &'static [u8]) -> Self {
        Value::Raw(Bytes::from_static(b))
    }
}

impl<const N: usize> From<&'static [u8; N]> for Value {
    fn from(b: &'static [u8; N]) -> Self {
        Value::Raw(Bytes::from_static(b))
    }
}

impl From<&'static str> for Value {
    fn from(s: &'static str) -> Self {
        Value::Raw(Bytes::from_static(s.as_bytes()))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Raw(Bytes::from(s))
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Raw(Bytes::from(b))
    }
}

impl From<EntityRef> for Value {
    fn from(e: EntityRef) -> Self {
        Value::Entity(e)
    }
}

impl From<Option<Bytes>> for Value {
    fn from(b: Option<Bytes>) -> Self {
        b.map_or(Value::Unset, Value::Raw)
    }
}
