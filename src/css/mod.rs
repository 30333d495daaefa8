//! CSS lexical and syntactic analysis.
//!
//! Data flows one way: bytes are decoded by [`source`], read character by
//! character by [`reader`], turned into [`Token`]s by [`scanner`], and
//! assembled into [`Construct`]s by [`parser`], which emits them to a
//! [`ContentHandler`]. Errors at every stage go to an [`ErrorHandler`].
//!
//! ```
//! use mu_epub_css::css::{CssParser, DefaultHandler};
//! use mu_epub_css::CssException;
//!
//! let mut errors: Vec<CssException> = Vec::new();
//! CssParser::new()
//!     .parse_str("p { color: }", "style.css", &mut errors, &mut DefaultHandler)
//!     .unwrap();
//! assert_eq!(errors.len(), 1);
//! ```

pub mod builders;
pub mod escape;
pub mod grammar;
pub mod handler;
pub mod location;
pub mod messages;
pub mod parser;
pub mod reader;
pub mod scanner;
pub mod source;
pub mod token;
pub mod tokens;

pub use grammar::{
    AtRule, Atom, AttributeMatch, AttributeSelector, Combinator, CombinatorKind, Construct,
    Declaration, Function, GroupKind, PseudoKind, PseudoSelector, Quantity, ScopedGroup, Selector,
    SimpleSelectorSequence, Uri,
};
pub use handler::{
    ContentHandler, DefaultHandler, ErrorHandler, ForgivingErrorHandler, StrictErrorHandler,
};
pub use location::Location;
pub use messages::Locale;
pub use parser::{CssParser, ParserOptions, DEFAULT_MAX_SOURCE_BYTES};
pub use reader::{CssReader, DEFAULT_PUSHBACK_CAPACITY};
pub use scanner::{scan, CssScanner};
pub use source::{detect_bom, sniff_charset, Bom, CssSource, Encoding};
#[cfg(feature = "std")]
pub use source::CssInputStream;
pub use token::{MatchOperator, QuantityUnit, Token, TokenType};
pub use tokens::{TokenFilter, TokenIter};
