//! Command schemas and the command registry.
//!
//! A [`Command`] describes one protocol verb: its wire token and the named
//! arguments it carries, each pinned to a position in the argument list.
//! Positions may be negative, counting from the end, which is how
//! trailing arguments such as a PRIVMSG text are declared.
//!
//! Commands live in a [`CommandRegistry`]. Lines naming a verb that is not
//! (yet) registered get an [`UnresolvedCommand`] proxy, which starts
//! behaving like the real schema as soon as one is registered.
//!
//! # Example
//!
//! ```
//! use pirch_proto::command::{ArgumentDescriptor, Command, CommandRegistry};
//!
//! let registry = CommandRegistry::with_builtins();
//! registry
//!     .register(
//!         Command::new("PRIVMSG")
//!             .with_argument(ArgumentDescriptor::entity("target", 0)?)?
//!             .with_argument(ArgumentDescriptor::raw("text", -1)?)?,
//!     )?;
//!
//! assert!(registry.lookup(b"PRIVMSG")?.contains("text"));
//! assert!(registry.get(b"PING").contains("token"));
//! # Ok::<(), pirch_proto::ProtocolError>(())
//! ```

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, OnceLock};

use bytes::Bytes;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use crate::entity::Connection;
use crate::error::{lossy, ProtocolError, Result};
use crate::value::Value;

/// Names beginning with this character are reserved.
pub const RESERVED_MARKER: char = '_';

/// Default bound on the number of memoised unresolved-command proxies.
pub const DEFAULT_PROXY_CAPACITY: usize = 4096;

/// Largest head position, and largest tail distance, an argument may use.
///
/// A 512-byte line cannot carry more than 256 tokens.
pub const MAX_POSITION: isize = 255;

/// Argument declared by the `PING` and `PONG` builtins.
const BUILTIN_ARGUMENT: &str = "token";

const _: () = assert!(is_valid_name(BUILTIN_ARGUMENT));

const fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name.as_bytes()[0] != RESERVED_MARKER as u8
}

/// Check a position against [`MAX_POSITION`].
pub(crate) fn check_position(position: isize) -> Result<isize> {
    if position > MAX_POSITION || position < -MAX_POSITION - 1 {
        return Err(ProtocolError::PositionOutOfRange {
            position,
            limit: MAX_POSITION,
        });
    }
    Ok(position)
}

static EMPTY_ARGUMENTS: BTreeSet<String> = BTreeSet::new();

/// How an argument travels between wire bytes and [`Value`]s.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Conversion {
    /// Bytes are passed through unchanged.
    #[default]
    Raw,
    /// Bytes name an entity, resolved through the [`Connection`].
    Entity,
}

impl Conversion {
    /// Convert a wire token into a value.
    pub fn from_wire(self, conn: &dyn Connection, raw: Bytes) -> Value {
        match self {
            Conversion::Raw => Value::Raw(raw),
            Conversion::Entity => Value::Entity(conn.resolve_entity(&raw)),
        }
    }

    /// Convert a value into its wire token. `None` means unset.
    pub fn to_wire(self, value: &Value) -> Option<Bytes> {
        match (self, value) {
            (_, Value::Unset) => None,
            (Conversion::Raw, Value::Raw(b)) | (Conversion::Entity, Value::Raw(b)) => {
                Some(b.clone())
            }
            (Conversion::Raw, Value::Entity(e)) | (Conversion::Entity, Value::Entity(e)) => {
                Some(e.to_wire())
            }
        }
    }
}

/// Metadata for one named argument of a command.
#[derive(Clone, Debug)]
pub struct ArgumentDescriptor {
    name: String,
    position: isize,
    default: Value,
    conversion: Conversion,
}

impl ArgumentDescriptor {
    /// Describe an argument.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::InvalidArgumentName`] if `name` is empty or
    ///   starts with [`RESERVED_MARKER`].
    /// - [`ProtocolError::PositionOutOfRange`] if `position` lies beyond
    ///   [`MAX_POSITION`] in either direction.
    pub fn new(name: impl Into<String>, position: isize, conversion: Conversion) -> Result<Self> {
        let name = name.into();
        if !is_valid_name(&name) {
            return Err(ProtocolError::InvalidArgumentName(name));
        }

        Ok(Self::unchecked(name, check_position(position)?, conversion))
    }

    fn unchecked(name: impl Into<String>, position: isize, conversion: Conversion) -> Self {
        Self {
            name: name.into(),
            position,
            default: Value::Unset,
            conversion,
        }
    }

    /// Describe a raw argument.
    pub fn raw(name: impl Into<String>, position: isize) -> Result<Self> {
        Self::new(name, position, Conversion::Raw)
    }

    /// Describe an entity-valued argument.
    pub fn entity(name: impl Into<String>, position: isize) -> Result<Self> {
        Self::new(name, position, Conversion::Entity)
    }

    /// Set the default used when the argument is neither supplied nor
    /// present on the wire.
    #[must_use]
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = default.into();
        self
    }

    /// The argument name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared position; negative positions count from the end.
    pub fn position(&self) -> isize {
        self.position
    }

    /// The default value, [`Value::Unset`] if none.
    pub fn default_value(&self) -> &Value {
        &self.default
    }

    /// The conversion strategy.
    pub fn conversion(&self) -> Conversion {
        self.conversion
    }
}

/// Schema for one protocol command.
#[derive(Debug)]
pub struct Command {
    token: Bytes,
    numeric: Option<u16>,
    arguments: HashMap<String, ArgumentDescriptor>,
    argset: OnceLock<BTreeSet<String>>,
}

impl Command {
    /// Create a command with no arguments.
    ///
    /// Tokens of exactly three ASCII digits are numeric replies.
    pub fn new(token: impl Into<Bytes>) -> Self {
        let token = token.into();
        let numeric = match token.as_ref() {
            [a, b, c] if [a, b, c].iter().all(|d| d.is_ascii_digit()) => {
                Some(u16::from(a - b'0') * 100 + u16::from(b - b'0') * 10 + u16::from(c - b'0'))
            }
            _ => None,
        };

        Self {
            token,
            numeric,
            arguments: HashMap::new(),
            argset: OnceLock::new(),
        }
    }

    /// Declare an argument.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::DuplicateArgument`] if the name is taken; the
    /// command is left unchanged.
    pub fn add_argument(&mut self, desc: ArgumentDescriptor) -> Result<&mut Self> {
        if self.arguments.contains_key(desc.name()) {
            return Err(ProtocolError::DuplicateArgument {
                command: lossy(&self.token),
                name: desc.name,
            });
        }

        self.declare(desc);
        Ok(self)
    }

    fn declare(&mut self, desc: ArgumentDescriptor) {
        self.arguments.insert(desc.name.clone(), desc);
        self.argset = OnceLock::new();
    }

    /// Builder form of [`Command::add_argument`].
    pub fn with_argument(mut self, desc: ArgumentDescriptor) -> Result<Self> {
        self.add_argument(desc)?;
        Ok(self)
    }

    /// The wire token.
    pub fn token(&self) -> &Bytes {
        &self.token
    }

    /// Numeric reply code, if the token is three digits.
    pub fn numeric(&self) -> Option<u16> {
        self.numeric
    }

    /// True if `name` is a declared argument.
    pub fn contains(&self, name: &str) -> bool {
        self.arguments.contains_key(name)
    }

    /// The descriptor for `name`.
    pub fn descriptor(&self, name: &str) -> Option<&ArgumentDescriptor> {
        self.arguments.get(name)
    }

    /// Iterate over all descriptors.
    pub fn descriptors(&self) -> impl Iterator<Item = &ArgumentDescriptor> {
        self.arguments.values()
    }

    /// The set of declared argument names.
    pub fn arguments(&self) -> &BTreeSet<String> {
        self.argset
            .get_or_init(|| self.arguments.keys().cloned().collect())
    }
}

type CommandTable = DashMap<Bytes, Arc<Command>>;

/// Stand-in for a command token that had no schema when it was seen.
///
/// Until a command with the same token is registered, the proxy acts as a
/// command with no arguments. Afterwards every query is answered by the
/// registered command.
pub struct UnresolvedCommand {
    token: Bytes,
    table: Arc<CommandTable>,
    resolved: OnceLock<Arc<Command>>,
}

impl UnresolvedCommand {
    fn new(token: Bytes, table: Arc<CommandTable>) -> Self {
        Self {
            token,
            table,
            resolved: OnceLock::new(),
        }
    }

    /// The registered command, if one exists by now.
    pub fn resolve(&self) -> Option<&Arc<Command>> {
        if let Some(cmd) = self.resolved.get() {
            return Some(cmd);
        }

        let cmd = self.table.get(&self.token)?.value().clone();
        Some(self.resolved.get_or_init(|| cmd))
    }

    /// The wire token.
    pub fn token(&self) -> &Bytes {
        &self.token
    }

    /// True if the registered command declares `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.resolve().is_some_and(|cmd| cmd.contains(name))
    }

    /// The registered command's descriptor for `name`.
    pub fn descriptor(&self, name: &str) -> Option<&ArgumentDescriptor> {
        self.resolve()?.descriptor(name)
    }

    /// The registered command's argument names, empty while unresolved.
    pub fn arguments(&self) -> &BTreeSet<String> {
        self.resolve()
            .map_or(&EMPTY_ARGUMENTS, |cmd| cmd.arguments())
    }
}

impl fmt::Debug for UnresolvedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnresolvedCommand")
            .field("token", &self.token)
            .field("resolved", &self.resolved.get().is_some())
            .finish()
    }
}

/// A command as attached to a message: registered, or a proxy.
#[derive(Clone, Debug)]
pub enum CommandHandle {
    /// A registered schema.
    Registered(Arc<Command>),
    /// A proxy for a token without a schema at lookup time.
    Unresolved(Arc<UnresolvedCommand>),
}

impl CommandHandle {
    /// The wire token.
    pub fn token(&self) -> &Bytes {
        match self {
            CommandHandle::Registered(cmd) => cmd.token(),
            CommandHandle::Unresolved(proxy) => proxy.token(),
        }
    }

    /// The schema, if one is available now.
    pub fn command(&self) -> Option<&Command> {
        match self {
            CommandHandle::Registered(cmd) => Some(cmd.as_ref()),
            CommandHandle::Unresolved(proxy) => proxy.resolve().map(|cmd| &**cmd),
        }
    }

    /// Numeric reply code, derived from the token.
    pub fn numeric(&self) -> Option<u16> {
        match self {
            CommandHandle::Registered(cmd) => cmd.numeric(),
            CommandHandle::Unresolved(proxy) => proxy.resolve().and_then(|cmd| cmd.numeric()),
        }
    }

    /// True if `name` is a declared argument.
    pub fn contains(&self, name: &str) -> bool {
        self.command().is_some_and(|cmd| cmd.contains(name))
    }

    /// The descriptor for `name`.
    pub fn descriptor(&self, name: &str) -> Option<&ArgumentDescriptor> {
        self.command()?.descriptor(name)
    }

    /// The declared argument names.
    pub fn arguments(&self) -> &BTreeSet<String> {
        self.command()
            .map_or(&EMPTY_ARGUMENTS, |cmd| cmd.arguments())
    }

    /// True if both handles are the same registered command or proxy.
    pub fn same(&self, other: &CommandHandle) -> bool {
        match (self, other) {
            (CommandHandle::Registered(a), CommandHandle::Registered(b)) => Arc::ptr_eq(a, b),
            (CommandHandle::Unresolved(a), CommandHandle::Unresolved(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<Arc<Command>> for CommandHandle {
    fn from(cmd: Arc<Command>) -> Self {
        CommandHandle::Registered(cmd)
    }
}

impl From<Command> for CommandHandle {
    fn from(cmd: Command) -> Self {
        CommandHandle::Registered(Arc::new(cmd))
    }
}

/// Mapping from wire token to [`Command`].
///
/// Build one at startup and share it through an `Arc`; registrations may
/// continue afterwards and are visible to existing proxies.
pub struct CommandRegistry {
    commands: Arc<CommandTable>,
    proxies: DashMap<Bytes, Arc<UnresolvedCommand>>,
    proxy_capacity: usize,
}

impl CommandRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::with_proxy_capacity(DEFAULT_PROXY_CAPACITY)
    }

    /// An empty registry memoising at most `capacity` proxies.
    pub fn with_proxy_capacity(capacity: usize) -> Self {
        Self {
            commands: Arc::new(DashMap::new()),
            proxies: DashMap::new(),
            proxy_capacity: capacity,
        }
    }

    /// A registry holding the keep-alive commands `PING` and `PONG`.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.register_builtins();
        registry
    }

    /// Add `PING` and `PONG`, each with a `token` argument at position 0.
    ///
    /// Tokens that are already registered are left alone.
    pub fn register_builtins(&self) {
        for token in [&b"PING"[..], b"PONG"] {
            let mut cmd = Command::new(Bytes::from_static(token));
            cmd.declare(ArgumentDescriptor::unchecked(
                BUILTIN_ARGUMENT,
                0,
                Conversion::Raw,
            ));
            if let Entry::Vacant(slot) = self.commands.entry(cmd.token.clone()) {
                slot.insert(Arc::new(cmd));
                self.proxies.remove(token);
            }
        }
    }

    /// Register a command.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::DuplicateRegistration`] if the token is
    /// already registered; the existing entry is kept.
    pub fn register(&self, command: Command) -> Result<Arc<Command>> {
        let cmd = match self.commands.entry(command.token.clone()) {
            Entry::Occupied(_) => {
                return Err(ProtocolError::DuplicateRegistration(lossy(&command.token)))
            }
            Entry::Vacant(slot) => slot.insert(Arc::new(command)).value().clone(),
        };

        debug!(
            command = %lossy(cmd.token()),
            arguments = cmd.arguments.len(),
            "registered command"
        );

        // Outstanding proxies resolve through the shared table.
        self.proxies.remove(cmd.token());
        Ok(cmd)
    }

    /// Strict lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::NotFound`] for unregistered tokens.
    pub fn lookup(&self, token: &[u8]) -> Result<Arc<Command>> {
        self.commands
            .get(token)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ProtocolError::NotFound(lossy(token)))
    }

    /// Tolerant lookup: the registered command, or the proxy for `token`.
    ///
    /// Repeated calls for one unregistered token return the same proxy.
    pub fn get(&self, token: &[u8]) -> CommandHandle {
        if let Some(cmd) = self.commands.get(token) {
            return CommandHandle::Registered(cmd.value().clone());
        }

        if let Some(proxy) = self.proxies.get(token) {
            return CommandHandle::Unresolved(proxy.value().clone());
        }

        let token = Bytes::copy_from_slice(token);
        if self.proxies.len() >= self.proxy_capacity {
            debug!(
                command = %lossy(&token),
                capacity = self.proxy_capacity,
                "proxy cache full, handing out unmemoised proxy"
            );
            return CommandHandle::Unresolved(Arc::new(UnresolvedCommand::new(
                token,
                self.commands.clone(),
            )));
        }

        let proxy = self
            .proxies
            .entry(token.clone())
            .or_insert_with(|| Arc::new(UnresolvedCommand::new(token, self.commands.clone())))
            .value()
            .clone();
        CommandHandle::Unresolved(proxy)
    }

    /// True if `token` is registered.
    pub fn is_registered(&self, token: &[u8]) -> bool {
        self.commands.contains_key(token)
    }

    /// Number of registered commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// True if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.commands.len())
            .field("proxies", &self.proxies.len())
            .finish()
    }
}
