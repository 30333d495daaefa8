//! Character cursor with line/column tracking and mark/reset backtracking.

extern crate alloc;

use alloc::sync::Arc;
use alloc::vec::Vec;

use super::location::Location;

/// Default number of characters a mark may lag behind the cursor.
pub const DEFAULT_PUSHBACK_CAPACITY: usize = 8096;

/// Saved reader state, restored with [`CssReader::reset`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Mark {
    pos: usize,
    cur: Option<char>,
    prev: Option<char>,
    line: usize,
    col: usize,
    prev_line: usize,
    offset: usize,
}

/// A cursor over decoded style sheet text.
///
/// `next` makes the following character current; `cur` is `None` before the
/// first call and again once input is exhausted. Lookahead methods never
/// change observable state.
#[derive(Clone, Debug)]
pub struct CssReader {
    chars: Vec<char>,
    pos: usize,
    cur: Option<char>,
    prev: Option<char>,
    line: usize,
    col: usize,
    prev_line: usize,
    offset: usize,
    source_id: Arc<str>,
    pushback_capacity: usize,
}

impl CssReader {
    /// Create a reader over `text` with the default pushback capacity.
    pub fn new(text: &str, source_id: Arc<str>) -> Self {
        Self::with_capacity(text, source_id, DEFAULT_PUSHBACK_CAPACITY)
    }

    /// Create a reader with an explicit pushback capacity.
    pub fn with_capacity(text: &str, source_id: Arc<str>, pushback_capacity: usize) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
            cur: None,
            prev: None,
            line: 1,
            col: 1,
            prev_line: 1,
            offset: 0,
            source_id,
            pushback_capacity,
        }
    }

    /// Advance one character and return it, or `None` at end of input.
    ///
    /// `\r\n` counts as one line break; a lone `\n`, `\r` or `\x0C` each count as one.
    pub fn next(&mut self) -> Option<char> {
        self.prev = self.cur;
        self.cur = self.chars.get(self.pos).copied();
        if self.cur.is_some() {
            self.pos += 1;
        }
        self.offset += 1;

        match self.cur {
            Some('\n') if self.prev == Some('\r') => {}
            Some('\n' | '\r' | '\x0C') => {
                self.prev_line = self.line;
                self.line += 1;
            }
            _ => {
                if self.prev_line < self.line {
                    self.col = 1;
                    self.prev_line = self.line;
                } else if self.offset > 1 {
                    self.col += 1;
                }
            }
        }
        self.cur
    }

    /// Current character.
    pub fn cur(&self) -> Option<char> {
        self.cur
    }

    /// Character before the current one.
    pub fn prev(&self) -> Option<char> {
        self.prev
    }

    /// The character `next` would return.
    pub fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    /// Up to `n` upcoming characters; shorter near end of input.
    pub fn peek_n(&self, n: usize) -> &[char] {
        let end = (self.pos + n).min(self.chars.len());
        &self.chars[self.pos..end]
    }

    /// The `n`th upcoming character, 1-based, so `at(1) == peek()`.
    pub fn at(&self, n: usize) -> Option<char> {
        if n == 0 {
            return self.cur;
        }
        self.chars.get(self.pos + n - 1).copied()
    }

    /// Returns `true` if the upcoming characters equal `s`.
    pub fn peek_eq(&self, s: &str, ignore_case: bool) -> bool {
        let mut ahead = self.chars[self.pos..].iter();
        s.chars().all(|expected| match ahead.next() {
            Some(&c) if ignore_case => c.eq_ignore_ascii_case(&expected),
            Some(&c) => c == expected,
            None => false,
        })
    }

    /// Advance until the next character matches `stop` and is not preceded by a backslash.
    pub fn forward_until<F: Fn(char) -> bool>(&mut self, stop: F) {
        while let Some(c) = self.peek() {
            if stop(c) && self.cur != Some('\\') {
                break;
            }
            self.next();
        }
    }

    /// Advance `n` characters, stopping early at end of input.
    pub fn forward(&mut self, n: usize) {
        for _ in 0..n {
            if self.peek().is_none() {
                break;
            }
            self.next();
        }
    }

    /// Capture the current state.
    pub fn mark(&self) -> Mark {
        Mark {
            pos: self.pos,
            cur: self.cur,
            prev: self.prev,
            line: self.line,
            col: self.col,
            prev_line: self.prev_line,
            offset: self.offset,
        }
    }

    /// Restore a state captured by [`mark`](Self::mark).
    ///
    /// # Panics
    ///
    /// Panics if the mark lags the cursor by more than the pushback capacity.
    pub fn reset(&mut self, mark: Mark) {
        let distance = self.pos.saturating_sub(mark.pos);
        assert!(
            distance <= self.pushback_capacity,
            "reset of {} characters exceeds pushback capacity {}",
            distance,
            self.pushback_capacity
        );
        self.pos = mark.pos;
        self.cur = mark.cur;
        self.prev = mark.prev;
        self.line = mark.line;
        self.col = mark.col;
        self.prev_line = mark.prev_line;
        self.offset = mark.offset;
    }

    /// Location of the current character.
    pub fn location(&self) -> Location {
        Location::new(self.line, self.col, self.offset, Arc::clone(&self.source_id))
    }

    /// Source identifier.
    pub fn source_id(&self) -> &Arc<str> {
        &self.source_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader(text: &str) -> CssReader {
        CssReader::new(text, Arc::from("t.css"))
    }

    fn position(r: &CssReader) -> (usize, usize) {
        let loc = r.location();
        (loc.line, loc.column)
    }

    #[test]
    fn test_next_tracks_columns() {
        let mut r = reader("ab");
        assert_eq!(r.next(), Some('a'));
        assert_eq!(position(&r), (1, 1));
        assert_eq!(r.next(), Some('b'));
        assert_eq!(position(&r), (1, 2));
        assert_eq!(r.next(), None);
        assert_eq!(r.cur(), None);
        assert_eq!(r.prev(), Some('b'));
    }

    #[test]
    fn test_line_breaks() {
        let mut r = reader("a\r\nb\nc\rd\x0Ce");
        let mut positions = Vec::new();
        while let Some(c) = r.next() {
            if c.is_alphabetic() {
                positions.push((c, r.location().line, r.location().column));
            }
        }
        assert_eq!(
            positions,
            [('a', 1, 1), ('b', 2, 1), ('c', 3, 1), ('d', 4, 1), ('e', 5, 1)]
        );
    }

    #[test]
    fn test_lookahead_leaves_state_unchanged() {
        let mut r = reader("abcdef");
        r.next();
        let before = r.mark();
        assert_eq!(r.peek(), Some('b'));
        assert_eq!(r.peek_n(3), &['b', 'c', 'd']);
        assert_eq!(r.peek_n(10).len(), 5);
        assert_eq!(r.at(1), Some('b'));
        assert_eq!(r.at(5), Some('f'));
        assert_eq!(r.at(6), None);
        assert!(r.peek_eq("BCD", true));
        assert!(!r.peek_eq("BCD", false));
        assert_eq!(r.mark(), before);
    }

    #[test]
    fn test_mark_reset_restores_position() {
        let mut r = reader("x\ny");
        r.next();
        let mark = r.mark();
        r.next();
        r.next();
        assert_eq!(r.location().line, 2);
        r.reset(mark);
        assert_eq!(r.cur(), Some('x'));
        assert_eq!(position(&r), (1, 1));
        assert_eq!(r.next(), Some('\n'));
    }

    #[test]
    fn test_forward_until_respects_backslash() {
        let mut r = reader("ab\\;c;d");
        r.next();
        r.forward_until(|c| c == ';');
        assert_eq!(r.cur(), Some('c'));
        assert_eq!(r.peek(), Some(';'));
    }

    #[test]
    fn test_forward_n_stops_at_eof() {
        let mut r = reader("abc");
        r.next();
        r.forward(10);
        assert_eq!(r.cur(), Some('c'));
        assert_eq!(r.peek(), None);
    }

    #[test]
    #[should_panic(expected = "exceeds pushback capacity")]
    fn test_reset_beyond_capacity_panics() {
        let mut r = CssReader::with_capacity("abcdef", Arc::from("t.css"), 2);
        let mark = r.mark();
        r.forward(4);
        r.reset(mark);
    }
}
