//! mu-epub-css -- CSS scanner, parser and style checks for EPUB content
//!
//! Turns style sheet bytes into a stream of structural events (selectors,
//! declarations, at-rules) delivered SAX-style to a caller-supplied handler,
//! with every lexical and grammatical problem reported to an error handler.
//! The parser does not interpret CSS semantics; the `validate` module layers
//! the EPUB CSS profile checks on top of the event stream.
//!
//! # Features
//!
//! - `std` (default) -- `std::io::Read` byte sources, logging, XHTML style
//!   extraction and the EPUB CSS profile checker
//! - `async` -- tokio-based file helpers
//! - `cli` -- the `mu-epub-css` binary
//!
//! # Allocation Behavior
//!
//! A parse materializes the decoded text and the full token list for one
//! source; sources above [`ParserOptions::max_source_bytes`](css::ParserOptions)
//! are rejected before decoding. The encoding sniffer reads at most
//! [`MAX_CHARSET_SNIFF`](css::source::MAX_CHARSET_SNIFF) bytes into a fixed
//! buffer. No state is shared between parses.

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![deny(clippy::large_enum_variant, clippy::large_stack_arrays, clippy::redundant_clone)]
#![warn(
    clippy::box_collection,
    clippy::needless_collect,
    clippy::map_clone,
    clippy::implicit_clone,
    clippy::inefficient_to_string
)]

extern crate alloc;

pub mod css;
pub mod error;

#[cfg(feature = "std")]
pub mod validate;

#[cfg(feature = "std")]
pub mod xhtml;

#[cfg(feature = "async")]
pub mod async_api;

// Re-export key types for convenience
#[cfg(feature = "async")]
pub use async_api::{validate_stylesheet_file_async, validate_stylesheet_file_async_with_options};
pub use css::{
    ContentHandler, CssParser, CssSource, ErrorHandler, Locale, Location, ParserOptions, Token,
    TokenType,
};
pub use error::{CssError, CssErrorCode, CssException};
#[cfg(feature = "std")]
pub use validate::{
    validate_style_attribute, validate_stylesheet, validate_stylesheet_file,
    validate_stylesheet_file_with_options, validate_xhtml_styles, CssReference, EpubVersion,
    FontFace, ReferenceKind, ValidationDiagnostic, ValidationOptions, ValidationReport,
    ValidationSeverity,
};
#[cfg(feature = "std")]
pub use xhtml::{extract_styles, EmbeddedStyle, StyleKind};
