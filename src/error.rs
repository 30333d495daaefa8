//! Error types for mu-epub-css
//!
//! `CssException` is the unit reported to an [`ErrorHandler`](crate::css::ErrorHandler)
//! for every lexical or grammatical problem. `CssError` is the crate-level
//! error returned by the parse and validation entry points.

extern crate alloc;

use alloc::boxed::Box;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

use crate::css::location::Location;
use crate::css::messages::{self, Locale};
use crate::css::token::Token;

/// Error taxonomy for the scanner and the grammar.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum CssErrorCode {
    /// A token could not be completed with the characters found.
    ScannerIllegalSyntax,
    /// A character is not allowed inside the current token.
    ScannerIllegalChar,
    /// A character is not allowed at the start of the current token.
    ScannerIllegalFirstChar,
    /// A backslash escape decodes to an invalid code point.
    ScannerMalformedEscape,
    /// A unicode range has more than six digits.
    ScannerIllegalUnicodeRange,
    /// Input ended inside a token.
    ScannerPrematureEof,
    /// Input ended inside a statement.
    GrammarPrematureEof,
    /// A token is not allowed where it was found.
    GrammarUnexpectedToken,
    /// A specific token was required but another was found.
    GrammarExpectingToken,
    /// A selector is well-formed token-wise but structurally invalid.
    GrammarInvalidSelector,
}

impl CssErrorCode {
    /// Stable dotted key for this code.
    pub fn key(self) -> &'static str {
        match self {
            CssErrorCode::ScannerIllegalSyntax => "css.scanner.token.syntax",
            CssErrorCode::ScannerIllegalChar => "css.scanner.token.char",
            CssErrorCode::ScannerIllegalFirstChar => "css.scanner.token.firstchar",
            CssErrorCode::ScannerMalformedEscape => "css.scanner.escape.malformed",
            CssErrorCode::ScannerIllegalUnicodeRange => "css.scanner.token.urange",
            CssErrorCode::ScannerPrematureEof => "css.scanner.prematureEOF",
            CssErrorCode::GrammarPrematureEof => "css.grammar.prematureEOF",
            CssErrorCode::GrammarUnexpectedToken => "css.grammar.unexpectedToken",
            CssErrorCode::GrammarExpectingToken => "css.grammar.expectingToken",
            CssErrorCode::GrammarInvalidSelector => "css.grammar.invalidSelector",
        }
    }

    /// Returns `true` for codes raised by the scanner.
    pub fn is_lexical(self) -> bool {
        matches!(
            self,
            CssErrorCode::ScannerIllegalSyntax
                | CssErrorCode::ScannerIllegalChar
                | CssErrorCode::ScannerIllegalFirstChar
                | CssErrorCode::ScannerMalformedEscape
                | CssErrorCode::ScannerIllegalUnicodeRange
                | CssErrorCode::ScannerPrematureEof
        )
    }
}

impl fmt::Display for CssErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A lexical or grammatical problem found while parsing a style sheet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CssException {
    /// Error classification.
    pub code: CssErrorCode,
    /// Where the problem was found.
    pub location: Location,
    /// Token that triggered the error, when one exists.
    pub token: Option<Box<Token>>,
    /// Message arguments, in template order.
    pub arguments: Vec<String>,
    message: String,
}

impl CssException {
    /// Create an exception, rendering its message in `locale`.
    pub fn new(
        code: CssErrorCode,
        location: Location,
        arguments: Vec<String>,
        locale: Locale,
    ) -> Self {
        let message = messages::render(locale, code, &arguments);
        Self {
            code,
            location,
            token: None,
            arguments,
            message,
        }
    }

    /// Attach the originating token.
    pub fn with_token(mut self, token: Token) -> Self {
        self.token = Some(Box::new(token));
        self
    }

    /// Localized, human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CssException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.location)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for CssException {}

/// Top-level error type for mu-epub-css operations
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CssError {
    /// I/O error (description only, since `std::io::Error` is not `Clone`)
    Io(String),
    /// The error handler aborted the parse
    Aborted(CssException),
    /// Markup around an embedded style could not be read
    Xhtml(String),
    /// Source exceeds the configured size limit
    SourceTooLarge {
        /// Size of the rejected source in bytes.
        size: usize,
        /// Configured limit in bytes.
        limit: usize,
    },
}

impl fmt::Display for CssError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CssError::Io(msg) => write!(f, "I/O error: {}", msg),
            CssError::Aborted(err) => write!(f, "Parse aborted: {}", err),
            CssError::Xhtml(msg) => write!(f, "XHTML error: {}", msg),
            CssError::SourceTooLarge { size, limit } => write!(
                f,
                "Style sheet is {} bytes, exceeding the limit of {} bytes",
                size, limit
            ),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for CssError {}

impl From<CssException> for CssError {
    fn from(err: CssException) -> Self {
        CssError::Aborted(err)
    }
}

#[cfg(feature = "std")]
impl From<std::io::Error> for CssError {
    fn from(err: std::io::Error) -> Self {
        CssError::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::sync::Arc;
    use alloc::vec;

    #[test]
    fn test_code_keys_and_groups() {
        assert_eq!(
            CssErrorCode::ScannerPrematureEof.key(),
            "css.scanner.prematureEOF"
        );
        assert!(CssErrorCode::ScannerIllegalChar.is_lexical());
        assert!(!CssErrorCode::GrammarExpectingToken.is_lexical());
    }

    #[test]
    fn test_exception_display_includes_location() {
        let loc = Location::new(2, 5, 9, Arc::from("a.css"));
        let err = CssException::new(
            CssErrorCode::GrammarExpectingToken,
            loc,
            vec!["}".to_string(), "a property value".to_string()],
            Locale::English,
        );
        let display = format!("{}", err);
        assert!(display.contains("a property value"));
        assert!(display.ends_with("(a.css:2:5)"));
    }

    #[test]
    fn test_css_error_display() {
        let err = CssError::SourceTooLarge { size: 20, limit: 10 };
        assert_eq!(
            format!("{}", err),
            "Style sheet is 20 bytes, exceeding the limit of 10 bytes"
        );
    }
}
