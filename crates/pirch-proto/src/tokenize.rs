//! Splitting raw protocol lines into wire tokens.
//!
//! Tokens are separated by runs of spaces. Once the first token has been
//! read, a [`SENTINEL`] found where the next token would start turns the
//! rest of the line, verbatim, into one final token. The first token is
//! never treated that way, which is what lets `:origin` prefixes through
//! unchanged.

/// Marker that introduces the trailing argument (and the origin prefix).
pub const SENTINEL: u8 = b':';

/// Token separator.
pub const SPACE: u8 = b' ';

/// Split `line` into wire tokens.
///
/// # Example
///
/// ```
/// use pirch_proto::tokenize::tokenize;
///
/// let tokens: Vec<&[u8]> = tokenize(b":nick PRIVMSG #rust :hello  world").collect();
/// assert_eq!(tokens, [&b":nick"[..], b"PRIVMSG", b"#rust", b"hello  world"]);
/// ```
pub fn tokenize(line: &[u8]) -> Tokens<'_> {
    // A blank line has no first token to start inside of.
    let blank = line.iter().all(|&b| b == SPACE);
    Tokens {
        line,
        pos: 0,
        start: if blank { None } else { Some(0) },
        done: blank,
    }
}

/// Single-pass iterator over the tokens of one line.
///
/// Created by [`tokenize`].
#[derive(Clone, Debug)]
pub struct Tokens<'a> {
    line: &'a [u8],
    pos: usize,
    /// Start of the token being consumed, or `None` while skipping spaces.
    start: Option<usize>,
    done: bool,
}

impl<'a> Iterator for Tokens<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        if self.done {
            return None;
        }

        while self.pos < self.line.len() {
            let i = self.pos;
            self.pos += 1;

            match (self.start, self.line[i]) {
                (None, SPACE) => {}
                (None, SENTINEL) => {
                    self.done = true;
                    return Some(&self.line[i + 1..]);
                }
                (None, _) => self.start = Some(i),
                (Some(start), SPACE) => {
                    self.start = None;
                    return Some(&self.line[start..i]);
                }
                (Some(_), _) => {}
            }
        }

        self.done = true;
        self.start.take().map(|start| &self.line[start..])
    }
}

impl std::iter::FusedIterator for Tokens<'_> {}
