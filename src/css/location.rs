//! Source positions attached to tokens, constructs and diagnostics.

extern crate alloc;

use alloc::sync::Arc;
use core::fmt;

/// A position in a style sheet source.
///
/// Lines and columns are 1-based. `char_offset` counts decoded characters
/// from the start of the source, so the first character has offset 1.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Location {
    /// 1-based line number.
    pub line: usize,
    /// 1-based column number.
    pub column: usize,
    /// Decoded character offset.
    pub char_offset: usize,
    /// Identifier of the source (a path or URL), used only for diagnostics.
    pub source_id: Arc<str>,
}

impl Location {
    /// Create a new location.
    pub fn new(line: usize, column: usize, char_offset: usize, source_id: Arc<str>) -> Self {
        Self {
            line,
            column,
            char_offset,
            source_id,
        }
    }
}

impl Default for Location {
    fn default() -> Self {
        Self {
            line: 1,
            column: 1,
            char_offset: 0,
            source_id: Arc::from(""),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.source_id, self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_display() {
        let loc = Location::new(3, 14, 40, Arc::from("OEBPS/style.css"));
        assert_eq!(alloc::format!("{}", loc), "OEBPS/style.css:3:14");
    }

    #[test]
    fn test_location_equality_is_structural() {
        let a = Location::new(1, 2, 2, Arc::from("a.css"));
        let b = Location::new(1, 2, 2, Arc::from("a.css"));
        let c = Location::new(1, 2, 2, Arc::from("b.css"));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
