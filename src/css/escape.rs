//! Backslash escape decoding.

extern crate alloc;

use alloc::string::String;

use super::reader::CssReader;

/// Why no escape could be read at a backslash.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EscapeError {
    /// The backslash is the last character of the input.
    PrematureEof,
}

/// One decoded escape sequence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CssEscape {
    sequence: String,
    character: char,
    malformed: bool,
}

fn is_hex(c: char) -> bool {
    c.is_ascii_hexdigit()
}

pub(crate) fn is_newline(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\x0C')
}

pub(crate) fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0C')
}

impl CssEscape {
    /// Read the escape starting at the reader's current backslash.
    ///
    /// Returns `Ok(None)` when the reader is not on a backslash, or when the
    /// backslash escapes a newline (a line continuation). The reader is not
    /// advanced.
    pub fn create(reader: &CssReader) -> Result<Option<CssEscape>, EscapeError> {
        if reader.cur() != Some('\\') {
            return Ok(None);
        }
        let ahead = reader.peek_n(8);
        let first = match ahead.first() {
            Some(&c) => c,
            None => return Err(EscapeError::PrematureEof),
        };
        if is_newline(first) {
            return Ok(None);
        }

        let mut sequence = String::from('\\');
        if !is_hex(first) {
            sequence.push(first);
            return Ok(Some(CssEscape {
                sequence,
                character: first,
                malformed: false,
            }));
        }

        let digits = ahead.iter().take(6).take_while(|c| is_hex(**c)).count();
        let hex: String = ahead[..digits].iter().collect();
        sequence.push_str(&hex);
        let mut rest = ahead[digits..].iter();
        match rest.next() {
            Some('\r') => {
                sequence.push('\r');
                if rest.next() == Some(&'\n') {
                    sequence.push('\n');
                }
            }
            Some(&c) if is_whitespace(c) => sequence.push(c),
            _ => {}
        }

        let decoded = u32::from_str_radix(&hex, 16)
            .ok()
            .filter(|&cp| cp != 0)
            .and_then(char::from_u32);
        Ok(Some(CssEscape {
            sequence,
            character: decoded.unwrap_or('\u{FFFD}'),
            malformed: decoded.is_none(),
        }))
    }

    /// Original text, including the backslash.
    pub fn sequence(&self) -> &str {
        &self.sequence
    }

    /// Decoded character (U+FFFD when malformed).
    pub fn character(&self) -> char {
        self.character
    }

    /// Returns `true` when the hex value is zero, a surrogate, or out of range.
    pub fn is_malformed(&self) -> bool {
        self.malformed
    }

    /// Number of characters after the backslash.
    pub fn len(&self) -> usize {
        self.sequence.chars().count() - 1
    }

    /// Always `false`; an escape has at least one character after the backslash.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Append the decoded character if `literal_ok` accepts it, else the original text.
    ///
    /// Returns the number of characters consumed after the backslash.
    pub fn render<F: Fn(char) -> bool>(&self, out: &mut String, literal_ok: F) -> usize {
        if !self.malformed && literal_ok(self.character) {
            out.push(self.character);
        } else {
            out.push_str(&self.sequence);
        }
        self.len()
    }
}
