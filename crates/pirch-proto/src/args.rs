//! Positional arguments with named, schema-driven access.
//!
//! An [`ArgumentVector`] is the ordered list of wire values following a
//! command token. It is built one of two ways:
//!
//! - [`ArgumentVector::resolve`] lays out values supplied by name or by
//!   index according to the command's descriptors, filling in defaults.
//!   Negative (tail) positions are placed only once the total length is
//!   known.
//! - [`ArgumentVector::from_wire`] wraps tokens read off a line. Named
//!   access through [`ArgumentVector::get`] decodes lazily and caches.

use std::cell::{OnceCell, RefCell};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::ops::{Bound, RangeBounds};
use std::sync::Arc;

use bytes::Bytes;

use crate::command::{check_position, CommandHandle, MAX_POSITION};
use crate::entity::Connection;
use crate::error::{lossy, ProtocolError, Result};
use crate::value::Value;

/// Key of a supplied argument: an explicit position or a declared name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ArgKey {
    /// A raw position; negative counts from the end. No descriptor applies.
    Position(isize),
    /// A declared argument name.
    Name(String),
}

impl From<isize> for ArgKey {
    fn from(position: isize) -> Self {
        ArgKey::Position(position)
    }
}

impl From<i32> for ArgKey {
    fn from(position: i32) -> Self {
        ArgKey::Position(position as isize)
    }
}

impl From<&str> for ArgKey {
    fn from(name: &str) -> Self {
        ArgKey::Name(name.to_owned())
    }
}

impl From<String> for ArgKey {
    fn from(name: String) -> Self {
        ArgKey::Name(name)
    }
}

/// Where a placed value came from.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Source {
    Index,
    Descriptor,
}

/// Head and tail buckets used while resolving an encode-time layout.
struct Layout {
    head: BTreeMap<isize, (Option<Bytes>, Source)>,
    tail: BTreeMap<isize, (Option<Bytes>, Source)>,
    highest: isize,
}

impl Layout {
    fn new() -> Self {
        Self {
            head: BTreeMap::new(),
            tail: BTreeMap::new(),
            highest: -1,
        }
    }

    fn place(&mut self, position: isize, wire: Option<Bytes>, source: Source) -> Result<()> {
        let position = check_position(position)?;
        let bucket = if position >= 0 {
            &mut self.head
        } else {
            &mut self.tail
        };

        if let Some((_, prev)) = bucket.get(&position) {
            if *prev != source {
                return Err(ProtocolError::PositionConflict { position });
            }
        }
        bucket.insert(position, (wire, source));

        if position > self.highest {
            self.highest = position;
        }
        Ok(())
    }

    /// Fold the tail in behind the head and fill gaps with unset.
    fn finish(self) -> Result<Vec<Option<Bytes>>> {
        let total = self.highest + 1 + self.tail.len() as isize;
        let mut highest = self.highest;
        let mut slots = self.head;

        for (position, (wire, source)) in self.tail {
            let resolved = total + position;
            if resolved < 0 {
                return Err(ProtocolError::PositionOutOfRange {
                    position,
                    limit: MAX_POSITION,
                });
            }

            match slots.entry(resolved) {
                Entry::Occupied(mut slot) => {
                    if slot.get().1 != source {
                        return Err(ProtocolError::PositionConflict { position: resolved });
                    }
                    slot.insert((wire, source));
                }
                Entry::Vacant(slot) => {
                    slot.insert((wire, source));
                }
            }
            highest = highest.max(resolved);
        }

        Ok((0..=highest)
            .map(|position| slots.remove(&position).and_then(|(wire, _)| wire))
            .collect())
    }
}

/// The arguments of one message.
///
/// Named lookups are cached per instance, so a vector is `Send` but not
/// `Sync`.
#[derive(Clone)]
pub struct ArgumentVector {
    command: CommandHandle,
    conn: Arc<dyn Connection>,
    values: Vec<Option<Bytes>>,
    len: OnceCell<usize>,
    cache: RefCell<HashMap<String, Value>>,
}

impl ArgumentVector {
    /// Lay out `values` for `command`.
    ///
    /// Named values go through their descriptor's conversion and land at
    /// the declared position; positional keys are placed as given.
    /// Declared arguments that were not supplied contribute their default,
    /// or nothing at all if they have none. Gaps become unset.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::UnknownAttribute`] for a name the command does
    ///   not declare.
    /// - [`ProtocolError::PositionConflict`] when a positional key and a
    ///   declared argument land on the same position, including once tail
    ///   positions are counted from the front.
    /// - [`ProtocolError::PositionOutOfRange`] for a position beyond
    ///   [`MAX_POSITION`], or a tail position that falls before the first
    ///   argument.
    pub fn resolve<I, K, V>(
        conn: Arc<dyn Connection>,
        command: CommandHandle,
        values: I,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<ArgKey>,
        V: Into<Value>,
    {
        let mut layout = Layout::new();
        let mut supplied = HashMap::new();

        for (key, value) in values {
            let value = value.into();
            match key.into() {
                ArgKey::Position(position) => {
                    layout.place(position, value.to_wire(), Source::Index)?;
                }
                ArgKey::Name(name) => {
                    let desc = command
                        .descriptor(&name)
                        .ok_or_else(|| unknown_attribute(&command, &name))?;
                    layout.place(
                        desc.position(),
                        desc.conversion().to_wire(&value),
                        Source::Descriptor,
                    )?;
                    supplied.insert(name, value);
                }
            }
        }

        if let Some(cmd) = command.command() {
            for desc in cmd.descriptors() {
                if supplied.contains_key(desc.name()) || desc.default_value().is_unset() {
                    continue;
                }
                layout.place(
                    desc.position(),
                    desc.conversion().to_wire(desc.default_value()),
                    Source::Descriptor,
                )?;
            }
        }

        let args = Self::new(conn, command, layout.finish()?);
        // The caller's own values need no decoding later.
        *args.cache.borrow_mut() = supplied;
        Ok(args)
    }

    /// Wrap tokens read from the wire.
    pub fn from_wire<I>(conn: Arc<dyn Connection>, command: CommandHandle, values: I) -> Self
    where
        I: IntoIterator<Item = Bytes>,
    {
        Self::new(conn, command, values.into_iter().map(Some).collect())
    }

    fn new(conn: Arc<dyn Connection>, command: CommandHandle, values: Vec<Option<Bytes>>) -> Self {
        Self {
            command,
            conn,
            values,
            len: OnceCell::new(),
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// The command these arguments belong to.
    pub fn command(&self) -> &CommandHandle {
        &self.command
    }

    /// The connection used for entity resolution.
    pub fn connection(&self) -> &Arc<dyn Connection> {
        &self.conn
    }

    /// Logical length: stored values minus any trailing unset run.
    pub fn len(&self) -> usize {
        *self.len.get_or_init(|| {
            let trailing = self.values.iter().rev().take_while(|v| v.is_none()).count();
            self.values.len() - trailing
        })
    }

    /// True if there are no logical values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The logical values; `None` marks an unset slot.
    pub fn as_slice(&self) -> &[Option<Bytes>] {
        &self.values[..self.len()]
    }

    /// Iterate over the logical values.
    pub fn iter(&self) -> impl Iterator<Item = Option<&Bytes>> + '_ {
        self.as_slice().iter().map(Option::as_ref)
    }

    /// Raw value at `index`; negative indices count from the end.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::IndexOutOfRange`] outside the logical length.
    pub fn index(&self, index: isize) -> Result<Option<&Bytes>> {
        let len = self.len();
        let resolved = if index < 0 {
            len as isize + index
        } else {
            index
        };

        if resolved < 0 || resolved >= len as isize {
            return Err(ProtocolError::IndexOutOfRange { index, len });
        }
        Ok(self.values[resolved as usize].as_ref())
    }

    /// Raw values in `range`; negative bounds count from the end.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::IndexOutOfRange`] if either bound falls
    /// outside the logical length or the range is reversed.
    pub fn range<R: RangeBounds<isize>>(&self, range: R) -> Result<&[Option<Bytes>]> {
        let len = self.len();
        let bound = |index: isize| -> Result<usize> {
            let resolved = if index < 0 {
                len as isize + index
            } else {
                index
            };
            if resolved < 0 || resolved > len as isize {
                return Err(ProtocolError::IndexOutOfRange { index, len });
            }
            Ok(resolved as usize)
        };

        let start = match range.start_bound() {
            Bound::Included(&s) => bound(s)?,
            Bound::Excluded(&s) => bound(s)? + 1,
            Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(&e) => bound(e)? + 1,
            Bound::Excluded(&e) => bound(e)?,
            Bound::Unbounded => len,
        };

        if start > end || end > len {
            return Err(ProtocolError::IndexOutOfRange {
                index: end as isize,
                len,
            });
        }
        Ok(&self.values[start..end])
    }

    /// Decoded value of the named argument.
    ///
    /// Reads the declared position (past the end counts as unset),
    /// converts it, and falls back to the declared default when unset.
    /// The result is cached.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::UnknownAttribute`] if the command does not
    /// declare `name`.
    pub fn get(&self, name: &str) -> Result<Value> {
        let desc = self
            .command
            .descriptor(name)
            .ok_or_else(|| unknown_attribute(&self.command, name))?;

        if let Some(value) = self.cache.borrow().get(name) {
            return Ok(value.clone());
        }

        let value = match self.stored(desc.position()) {
            Some(raw) => desc.conversion().from_wire(self.conn.as_ref(), raw),
            None => Value::Unset,
        };
        let value = if value.is_unset() {
            desc.default_value().clone()
        } else {
            value
        };

        self.cache
            .borrow_mut()
            .insert(name.to_owned(), value.clone());
        Ok(value)
    }

    /// Stored value at a declared position, ignoring the logical length.
    fn stored(&self, position: isize) -> Option<Bytes> {
        let resolved = if position < 0 {
            self.values.len() as isize + position
        } else {
            position
        };
        if resolved < 0 {
            return None;
        }
        self.values.get(resolved as usize).cloned().flatten()
    }
}

fn unknown_attribute(command: &CommandHandle, name: &str) -> ProtocolError {
    ProtocolError::UnknownAttribute {
        command: lossy(command.token()),
        name: name.to_owned(),
    }
}

impl fmt::Debug for ArgumentVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArgumentVector")
            .field("command", self.command.token())
            .field("values", &self.values)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{ArgumentDescriptor, Command};
    use crate::entity::{same_entity, Entity, EntityRef};
    use crate::test_support::{Nick, TestConn};

    fn command(args: &[(&str, isize, Option<&'static str>)]) -> CommandHandle {
        let mut cmd = Command::new("CMD");
        for &(name, position, default) in args {
            let mut desc = ArgumentDescriptor::raw(name, position).unwrap();
            if let Some(default) = default {
                desc = desc.with_default(default);
            }
            cmd.add_argument(desc).unwrap();
        }
        cmd.into()
    }

    fn wire(args: &ArgumentVector) -> Vec<Option<&str>> {
        args.iter()
            .map(|v| v.map(|b| std::str::from_utf8(b).unwrap()))
            .collect()
    }

    fn raw(values: &[&'static str]) -> Vec<Bytes> {
        values.iter().map(|v| Bytes::from_static(v.as_bytes())).collect()
    }

    #[test]
    fn test_resolve_names() {
        let cmd = command(&[
            ("zero", 0, Some("def0")),
            ("one", 1, Some("def1")),
            ("two", 2, Some("def2")),
            ("three", 3, Some("def3")),
        ]);
        let args = ArgumentVector::resolve(
            TestConn::new(),
            cmd,
            [("zero", "v0"), ("one", "v1"), ("two", "v2"), ("three", "v3")],
        )
        .unwrap();

        assert_eq!(
            wire(&args),
            [Some("v0"), Some("v1"), Some("v2"), Some("v3")]
        );
        assert_eq!(args.cache.borrow().len(), 4);
    }

    #[test]
    fn test_resolve_positions() {
        let args = ArgumentVector::resolve(
            TestConn::new(),
            command(&[]),
            [(0isize, "v0"), (1, "v1"), (-2, "v2"), (-1, "v3")],
        )
        .unwrap();

        assert_eq!(
            wire(&args),
            [Some("v0"), Some("v1"), Some("v2"), Some("v3")]
        );
        assert!(args.cache.borrow().is_empty());
    }

    #[test]
    fn test_resolve_defaults() {
        let cmd = command(&[
            ("zero", 0, Some("def0")),
            ("one", 1, Some("def1")),
            ("two", 2, Some("def2")),
        ]);
        let args =
            ArgumentVector::resolve(TestConn::new(), cmd, Vec::<(ArgKey, Value)>::new()).unwrap();

        assert_eq!(wire(&args), [Some("def0"), Some("def1"), Some("def2")]);
        assert!(args.cache.borrow().is_empty());
    }

    #[test]
    fn test_resolve_tail() {
        let cmd = command(&[
            ("zero", 0, None),
            ("one", 1, None),
            ("two", -2, None),
            ("three", -1, None),
        ]);
        let args = ArgumentVector::resolve(
            TestConn::new(),
            cmd,
            [("three", "v3"), ("two", "v2"), ("one", "v1"), ("zero", "v0")],
        )
        .unwrap();

        assert_eq!(
            wire(&args),
            [Some("v0"), Some("v1"), Some("v2"), Some("v3")]
        );
    }

    #[test]
    fn test_resolve_tail_defaults_skip_gap() {
        let cmd = command(&[
            ("zero", 0, Some("def0")),
            ("one", 1, None),
            ("two", -2, Some("def-2")),
            ("three", -1, Some("def-1")),
        ]);
        let args =
            ArgumentVector::resolve(TestConn::new(), cmd, Vec::<(ArgKey, Value)>::new()).unwrap();

        assert_eq!(
            wire(&args),
            [Some("def0"), Some("def-2"), Some("def-1")]
        );
    }

    #[test]
    fn test_resolve_undeclared_tail_contributes_nothing() {
        let cmd = command(&[("a", 0, None), ("b", -1, None)]);
        let args = ArgumentVector::resolve(TestConn::new(), cmd.clone(), [("a", "X")]).unwrap();
        assert_eq!(wire(&args), [Some("X")]);

        let args =
            ArgumentVector::resolve(TestConn::new(), cmd, Vec::<(ArgKey, Value)>::new()).unwrap();
        assert!(args.is_empty());
    }

    #[test]
    fn test_resolve_fills_gaps_with_unset() {
        let cmd = command(&[("a", 0, None), ("c", 2, None)]);
        let args =
            ArgumentVector::resolve(TestConn::new(), cmd, [("c", "C"), ("a", "A")]).unwrap();

        assert_eq!(wire(&args), [Some("A"), None, Some("C")]);
        assert_eq!(args.len(), 3);
    }

    #[test]
    fn test_resolve_unknown_name() {
        let err = ArgumentVector::resolve(TestConn::new(), command(&[]), [("spam", "x")])
            .unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownAttribute { ref name, .. } if name == "spam"));
    }

    #[test]
    fn test_resolve_position_conflict() {
        let cmd = command(&[("a", 0, None)]);
        let err = ArgumentVector::resolve(
            TestConn::new(),
            cmd.clone(),
            [(ArgKey::from(0isize), Value::from("x")), (ArgKey::from("a"), Value::from("y"))],
        )
        .unwrap_err();
        assert!(matches!(err, ProtocolError::PositionConflict { position: 0 }));

        // Defaults conflict too.
        let cmd = command(&[("t", -1, Some("dflt"))]);
        let err = ArgumentVector::resolve(TestConn::new(), cmd, [(-1isize, "x")]).unwrap_err();
        assert!(matches!(err, ProtocolError::PositionConflict { position: -1 }));
    }

    #[test]
    fn test_resolve_tail_conflicts_with_head_index() {
        // "b" at -2 lands on position 0 once the length (2) is known.
        let cmd = command(&[("b", -2, None)]);
        let err = ArgumentVector::resolve(
            TestConn::new(),
            cmd.clone(),
            [(ArgKey::from(0isize), Value::from("X")), (ArgKey::from("b"), Value::from("B"))],
        )
        .unwrap_err();
        assert!(matches!(err, ProtocolError::PositionConflict { position: 0 }));

        // Without the index the tail simply shifts forward.
        let args = ArgumentVector::resolve(TestConn::new(), cmd, [("b", "B")]).unwrap();
        assert_eq!(wire(&args), [Some("B")]);
    }

    #[test]
    fn test_resolve_tail_index_overrides_head_index() {
        let args = ArgumentVector::resolve(
            TestConn::new(),
            command(&[]),
            [(0isize, "X"), (-2, "Y")],
        )
        .unwrap();
        assert_eq!(wire(&args), [Some("Y")]);
    }

    #[test]
    fn test_resolve_rejects_extreme_positions() {
        for position in [isize::MAX, isize::MIN, 1_000_000_000, MAX_POSITION + 1] {
            let err = ArgumentVector::resolve(TestConn::new(), command(&[]), [(position, "x")])
                .unwrap_err();
            assert!(matches!(
                err,
                ProtocolError::PositionOutOfRange { position: p, .. } if p == position
            ));
        }

        let args =
            ArgumentVector::resolve(TestConn::new(), command(&[]), [(MAX_POSITION, "x")]).unwrap();
        assert_eq!(args.len(), MAX_POSITION as usize + 1);
    }

    #[test]
    fn test_resolve_tail_before_start() {
        let cmd = command(&[("far", -5, None)]);
        let err = ArgumentVector::resolve(TestConn::new(), cmd, [("far", "x")]).unwrap_err();
        assert!(matches!(err, ProtocolError::PositionOutOfRange { position: -5, .. }));
    }

    #[test]
    fn test_resolve_entity_argument() {
        let conn = TestConn::new();
        let target: EntityRef = Nick::entity("#rust");
        let cmd: CommandHandle = Command::new("PRIVMSG")
            .with_argument(ArgumentDescriptor::entity("target", 0).unwrap())
            .unwrap()
            .with_argument(ArgumentDescriptor::raw("text", -1).unwrap())
            .unwrap()
            .into();

        let args = ArgumentVector::resolve(
            conn.clone(),
            cmd,
            [
                ("target", Value::from(target.clone())),
                ("text", Value::from("hi there")),
            ],
        )
        .unwrap();

        assert_eq!(wire(&args), [Some("#rust"), Some("hi there")]);
        // Supplied values are served from the cache without re-resolving.
        let value = args.get("target").unwrap();
        assert!(same_entity(value.as_entity().unwrap(), &target));
        assert!(conn.resolved().is_empty());
    }

    #[test]
    fn test_len_ignores_trailing_unset() {
        let conn = TestConn::new();
        let cmd = command(&[]);
        let make = |values: Vec<Option<Bytes>>| ArgumentVector::new(conn.clone(), cmd.clone(), values);

        let one = || Some(Bytes::from_static(b"one"));
        assert_eq!(make(vec![None, one(), one()]).len(), 3);
        assert_eq!(make(vec![one(), one(), None]).len(), 2);
        assert_eq!(make(vec![None, None]).len(), 0);
        assert!(make(vec![]).is_empty());
    }

    #[test]
    fn test_index() {
        let conn = TestConn::new();
        let cmd = command(&[]);
        let mut values: Vec<Option<Bytes>> = raw(&["zero", "one"]).into_iter().map(Some).collect();
        values.push(None);
        let args = ArgumentVector::new(conn, cmd, values);

        assert!(matches!(
            args.index(-3),
            Err(ProtocolError::IndexOutOfRange { index: -3, len: 2 })
        ));
        assert_eq!(args.index(-2).unwrap().unwrap().as_ref(), b"zero");
        assert_eq!(args.index(-1).unwrap().unwrap().as_ref(), b"one");
        assert_eq!(args.index(0).unwrap().unwrap().as_ref(), b"zero");
        assert_eq!(args.index(1).unwrap().unwrap().as_ref(), b"one");
        assert!(args.index(2).is_err());
    }

    #[test]
    fn test_range() {
        let args = ArgumentVector::from_wire(
            TestConn::new(),
            command(&[]),
            raw(&["zero", "one", "two", "three", "four"]),
        );
        let names = |slice: &[Option<Bytes>]| -> Vec<Vec<u8>> {
            slice.iter().flatten().map(|b| b.to_vec()).collect()
        };

        assert_eq!(names(args.range(..).unwrap()).len(), 5);
        assert_eq!(names(args.range(1..3).unwrap()), [b"one".to_vec(), b"two".to_vec()]);
        assert_eq!(
            names(args.range(-4..-1).unwrap()),
            [b"one".to_vec(), b"two".to_vec(), b"three".to_vec()]
        );
        assert_eq!(names(args.range(3..=-1).unwrap()), [b"three".to_vec(), b"four".to_vec()]);
        assert!(args.range(5..5).unwrap().is_empty());
        assert!(args.range(2..7).is_err());
        assert!(args.range(-7..-3).is_err());
        assert!(args.range(3..1).is_err());
    }

    #[test]
    fn test_get_unknown() {
        let args = ArgumentVector::from_wire(TestConn::new(), command(&[]), raw(&["zero"]));
        args.cache
            .borrow_mut()
            .insert("spam".to_owned(), Value::from("cached"));

        assert!(matches!(
            args.get("spam"),
            Err(ProtocolError::UnknownAttribute { .. })
        ));
    }

    #[test]
    fn test_get_cached() {
        let cmd = command(&[("spam", 1, Some("default"))]);
        let args = ArgumentVector::from_wire(TestConn::new(), cmd, raw(&["zero", "one"]));
        args.cache
            .borrow_mut()
            .insert("spam".to_owned(), Value::from("cached"));

        assert_eq!(args.get("spam").unwrap(), Value::from("cached"));
    }

    #[test]
    fn test_get_past_end_uses_default() {
        let cmd = command(&[("spam", 100, Some("default"))]);
        let args = ArgumentVector::from_wire(TestConn::new(), cmd, raw(&["zero", "one", "two"]));

        assert_eq!(args.get("spam").unwrap(), Value::from("default"));
        assert_eq!(
            args.cache.borrow().get("spam"),
            Some(&Value::from("default"))
        );
    }

    #[test]
    fn test_get_no_default_is_unset() {
        let cmd = command(&[("spam", 3, None)]);
        let args = ArgumentVector::from_wire(TestConn::new(), cmd, raw(&["zero"]));
        assert!(args.get("spam").unwrap().is_unset());
    }

    #[test]
    fn test_get_decodes_value() {
        let cmd = command(&[("spam", 1, Some("default")), ("last", -1, None)]);
        let args = ArgumentVector::from_wire(TestConn::new(), cmd, raw(&["zero", "one", "two"]));

        assert_eq!(args.get("spam").unwrap(), Value::from("one"));
        assert_eq!(args.get("last").unwrap(), Value::from("two"));
    }

    #[test]
    fn test_get_resolves_entities_once() {
        let conn = TestConn::new();
        let cmd: CommandHandle = Command::new("KICK")
            .with_argument(ArgumentDescriptor::entity("channel", 0).unwrap())
            .unwrap()
            .into();
        let args = ArgumentVector::from_wire(conn.clone(), cmd, raw(&["#rust", "nick"]));

        let first = args.get("channel").unwrap();
        let second = args.get("channel").unwrap();
        assert_eq!(first, second);
        assert_eq!(first.as_entity().unwrap().to_wire().as_ref(), b"#rust");
        assert_eq!(conn.resolved().len(), 1);
    }
}
