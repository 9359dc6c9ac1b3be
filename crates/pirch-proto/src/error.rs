//! Error types for the pirch protocol core.
//!
//! Every failure in this crate is synchronous and local. Malformed or
//! incomplete lines are not errors at all: decoding them yields `None`.

use thiserror::Error;

/// Convenience type alias for Results using [`ProtocolError`].
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

/// Errors raised by the schema registry, argument resolution and codec.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// A command token was registered twice.
    #[error("duplicate registration of command \"{0}\"")]
    DuplicateRegistration(String),

    /// An argument name was declared twice on one command.
    #[error("duplicate argument \"{name}\" on command \"{command}\"")]
    DuplicateArgument {
        /// The command token.
        command: String,
        /// The repeated argument name.
        name: String,
    },

    /// An argument name is empty or begins with the reserved marker.
    #[error("invalid argument name \"{0}\": names may not be empty or begin with \"_\"")]
    InvalidArgumentName(String),

    /// Strict lookup of a command token that was never registered.
    #[error("command \"{0}\" not found")]
    NotFound(String),

    /// Named access to an argument the command does not declare.
    #[error("command \"{command}\" has no argument \"{name}\"")]
    UnknownAttribute {
        /// The command token.
        command: String,
        /// The requested argument name.
        name: String,
    },

    /// Positional or range access beyond the logical length.
    #[error("argument index {index} out of range for length {len}")]
    IndexOutOfRange {
        /// The requested index (or range bound) as given by the caller.
        index: isize,
        /// The logical length of the argument vector.
        len: usize,
    },

    /// More than one argument value requires trailing-sentinel encoding.
    ///
    /// Empty values count as trailing along with values that start with
    /// `:` or contain a space, since an empty token cannot otherwise
    /// survive tokenizing. A message holding an empty value alongside one
    /// that starts with `:` or contains a space therefore fails to encode.
    #[error("multiple trailing arguments")]
    MultipleTrailingArguments,

    /// An integer key and a declared argument claim the same position.
    #[error("argument position {position} supplied both by index and by name")]
    PositionConflict {
        /// The declared position both entries resolved to.
        position: isize,
    },

    /// An argument position lies beyond the supported number of arguments.
    #[error("argument position {position} out of range (limit: {limit})")]
    PositionOutOfRange {
        /// The offending position as declared or supplied.
        position: isize,
        /// The largest head position accepted.
        limit: isize,
    },

    /// Unknown case-mapping name.
    #[error("unknown case mapping \"{0}\"")]
    UnknownCaseMapping(String),

    /// I/O error surfaced by the line framing codec.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A framed line exceeded the configured maximum length.
    #[error("message too long: {actual} bytes (limit: {limit})")]
    MessageTooLong {
        /// Actual line length.
        actual: usize,
        /// Maximum allowed length.
        limit: usize,
    },
}

/// Render a wire token for error messages.
pub(crate) fn lossy(token: &[u8]) -> String {
    String::from_utf8_lossy(token).into_owned()
}
