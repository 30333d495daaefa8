//! Content and error handler seams for the parser.

extern crate alloc;

use alloc::vec::Vec;

use super::grammar::{AtRule, Declaration, Selector};
use crate::error::CssException;

/// Receives structural parse events in document order.
///
/// Every method defaults to a no-op so implementors only override what they need.
pub trait ContentHandler {
    /// Parsing has started.
    fn start_document(&mut self) {}

    /// Parsing has finished, including after premature end of input.
    fn end_document(&mut self) {}

    /// An at-rule with its parameters. Block contents, if any, follow before
    /// the matching [`end_at_rule`](Self::end_at_rule).
    fn start_at_rule(&mut self, at_rule: AtRule) {
        let _ = at_rule;
    }

    /// End of the at-rule named `name` (lowercase, including `@`).
    fn end_at_rule(&mut self, name: &str) {
        let _ = name;
    }

    /// Selector list of a rule set. Its declarations follow.
    fn selectors(&mut self, selectors: &[Selector]) {
        let _ = selectors;
    }

    /// End of the rule set opened by [`selectors`](Self::selectors).
    fn end_selectors(&mut self, selectors: Vec<Selector>) {
        let _ = selectors;
    }

    /// One declaration inside a rule set, at-rule block or style attribute.
    fn declaration(&mut self, declaration: Declaration) {
        let _ = declaration;
    }
}

/// Receives every lexical and grammatical error.
///
/// Returning `Err` aborts the parse and surfaces that error to the caller;
/// returning `Ok(())` lets parsing resynchronize and continue.
pub trait ErrorHandler {
    /// Handle one error.
    fn error(&mut self, error: CssException) -> Result<(), CssException>;
}

/// A content handler that ignores every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultHandler;

impl ContentHandler for DefaultHandler {}

/// Logs each error and continues.
#[derive(Clone, Copy, Debug, Default)]
pub struct ForgivingErrorHandler;

impl ErrorHandler for ForgivingErrorHandler {
    fn error(&mut self, error: CssException) -> Result<(), CssException> {
        #[cfg(feature = "std")]
        log::debug!("[CSS] {}", error);
        #[cfg(not(feature = "std"))]
        let _ = error;
        Ok(())
    }
}

/// Aborts on the first error.
#[derive(Clone, Copy, Debug, Default)]
pub struct StrictErrorHandler;

impl ErrorHandler for StrictErrorHandler {
    fn error(&mut self, error: CssException) -> Result<(), CssException> {
        Err(error)
    }
}

/// Collects every error and continues.
impl ErrorHandler for Vec<CssException> {
    fn error(&mut self, error: CssException) -> Result<(), CssException> {
        self.push(error);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::css::location::Location;
    use crate::css::messages::Locale;
    use crate::error::CssErrorCode;

    fn sample() -> CssException {
        CssException::new(
            CssErrorCode::GrammarUnexpectedToken,
            Location::default(),
            alloc::vec![alloc::string::String::from("}")],
            Locale::English,
        )
    }

    #[test]
    fn test_strict_handler_aborts() {
        let mut handler = StrictErrorHandler;
        assert_eq!(handler.error(sample()), Err(sample()));
    }

    #[test]
    fn test_forgiving_handler_continues() {
        let mut handler = ForgivingErrorHandler;
        assert!(handler.error(sample()).is_ok());
    }

    #[test]
    fn test_vec_collects() {
        let mut errors: Vec<CssException> = Vec::new();
        errors.error(sample()).unwrap();
        errors.error(sample()).unwrap();
        assert_eq!(errors.len(), 2);
    }
}
