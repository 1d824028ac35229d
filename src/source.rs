//! Source locations.
//!
//! Every AST node, symbol, scope, IL instruction, and diagnostic carries a
//! [`Span`] back to the text the parser consumed it from.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single point in source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    /// 1-based line number.
    pub line: u32,
    /// 1-based column number.
    pub col: u32,
    /// 0-based byte offset from the start of the file.
    pub offset: u32,
}

impl Position {
    /// The position at the very start of a file.
    pub const fn start() -> Self {
        Self {
            line: 1,
            col: 1,
            offset: 0,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// A start/end range in source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Span {
    /// Inclusive start position.
    pub start: Position,
    /// Exclusive end position.
    pub end: Position,
}

impl Span {
    /// Creates a span covering `[start, end)`.
    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// A zero-width span at the start of a file, used for synthesized nodes
    /// that have no real source (e.g. the implicit `RETURN_VOID` appended
    /// to a function body).
    pub const fn synthetic() -> Self {
        Self::new(Position::start(), Position::start())
    }

    /// Smallest span that encloses both `self` and `other`.
    pub fn merge(&self, other: &Span) -> Span {
        let start = if self.start <= other.start {
            self.start
        } else {
            other.start
        };
        let end = if self.end >= other.end {
            self.end
        } else {
            other.end
        };
        Span::new(start, end)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start.line == self.end.line {
            write!(f, "{}:{}-{}", self.start.line, self.start.col, self.end.col)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_takes_outer_bounds() {
        let a = Span::new(
            Position {
                line: 2,
                col: 1,
                offset: 10,
            },
            Position {
                line: 2,
                col: 5,
                offset: 14,
            },
        );
        let b = Span::new(
            Position {
                line: 1,
                col: 1,
                offset: 0,
            },
            Position {
                line: 2,
                col: 3,
                offset: 12,
            },
        );
        let merged = a.merge(&b);
        assert_eq!(merged.start, b.start);
        assert_eq!(merged.end, a.end);
    }
}
