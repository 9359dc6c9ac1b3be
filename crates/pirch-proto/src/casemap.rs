//! IRC case-mapping functions.
//!
//! IRC compares nicknames and channel names case-insensitively, and
//! servers advertise which characters count as case variants through the
//! `CASEMAPPING` token. Three mappings are recognised:
//!
//! - `ascii`: only `A`-`Z` are lowered.
//! - `rfc1459`: additionally `[\]^` lower to `{|}~`.
//! - `strict-rfc1459`: additionally `[\]` lower to `{|}`; `^` is left alone.

use std::fmt;
use std::str::FromStr;

use crate::error::{ProtocolError, Result};

/// A named case mapping.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CaseMapping {
    /// Plain ASCII lowercasing.
    #[cfg_attr(feature = "serde", serde(rename = "ascii"))]
    Ascii,
    /// RFC 1459 mapping, treating `[\]^` as the uppercase of `{|}~`.
    #[default]
    #[cfg_attr(feature = "serde", serde(rename = "rfc1459"))]
    Rfc1459,
    /// RFC 1459 mapping without the `^`/`~` pair.
    #[cfg_attr(feature = "serde", serde(rename = "strict-rfc1459"))]
    StrictRfc1459,
}

impl CaseMapping {
    /// All mappings, in advertisement order.
    pub const ALL: [CaseMapping; 3] = [Self::Ascii, Self::Rfc1459, Self::StrictRfc1459];

    /// Look up a mapping by its advertised name.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::UnknownCaseMapping`] for unrecognised names.
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "ascii" => Ok(Self::Ascii),
            "rfc1459" => Ok(Self::Rfc1459),
            "strict-rfc1459" => Ok(Self::StrictRfc1459),
            _ => Err(ProtocolError::UnknownCaseMapping(name.to_owned())),
        }
    }

    /// The advertised name of this mapping.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ascii => "ascii",
            Self::Rfc1459 => "rfc1459",
            Self::StrictRfc1459 => "strict-rfc1459",
        }
    }

    /// Lowercase a single byte under this mapping.
    #[inline]
    pub const fn lower_byte(self, b: u8) -> u8 {
        match (self, b) {
            (_, b'A'..=b'Z') => b + 32,
            (Self::Rfc1459 | Self::StrictRfc1459, b'[') => b'{',
            (Self::Rfc1459 | Self::StrictRfc1459, b'\\') => b'|',
            (Self::Rfc1459 | Self::StrictRfc1459, b']') => b'}',
            (Self::Rfc1459, b'^') => b'~',
            _ => b,
        }
    }

    /// Lowercase a byte string.
    pub fn to_lower(self, s: &[u8]) -> Vec<u8> {
        s.iter().map(|&b| self.lower_byte(b)).collect()
    }

    /// Lowercase a string. Only ASCII bytes are ever rewritten, so the
    /// result stays valid UTF-8.
    pub fn to_lower_str(self, s: &str) -> String {
        s.chars()
            .map(|c| {
                if c.is_ascii() {
                    self.lower_byte(c as u8) as char
                } else {
                    c
                }
            })
            .collect()
    }

    /// Compare two byte strings case-insensitively under this mapping.
    pub fn equals(self, a: &[u8], b: &[u8]) -> bool {
        a.len() == b.len()
            && a.iter()
                .zip(b)
                .all(|(&x, &y)| self.lower_byte(x) == self.lower_byte(y))
    }
}

impl fmt::Display for CaseMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CaseMapping {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s)
    }
}

/// Return the lowering function for the named mapping.
///
/// # Example
///
/// ```
/// use pirch_proto::casemap::mapper;
///
/// let lower = mapper("rfc1459").unwrap();
/// assert_eq!(lower("Nick[Away]"), "nick{away}");
/// assert!(mapper("klingon").is_err());
/// ```
pub fn mapper(name: &str) -> Result<impl Fn(&str) -> String> {
    let mapping = CaseMapping::from_name(name)?;
    Ok(move |s: &str| mapping.to_lower_str(s))
}
