//! Optional async helpers for style sheet validation.
//!
//! This module is available with the `async` feature.

extern crate alloc;

use alloc::string::ToString;
use core::result::Result;
use std::path::Path;

use crate::error::CssError;
use crate::validate::{validate_stylesheet, ValidationOptions, ValidationReport};

/// Read a style sheet file asynchronously and validate it.
///
/// The file is read into memory; parsing and checking run synchronously
/// afterwards.
pub async fn validate_stylesheet_file_async<P: AsRef<Path>>(
    path: P,
) -> Result<ValidationReport, CssError> {
    validate_stylesheet_file_async_with_options(path, ValidationOptions::default()).await
}

/// Read a style sheet file asynchronously and validate it with options.
pub async fn validate_stylesheet_file_async_with_options<P: AsRef<Path>>(
    path: P,
    options: ValidationOptions,
) -> Result<ValidationReport, CssError> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| CssError::Io(e.to_string()))?;
    validate_stylesheet(&path.to_string_lossy(), &bytes, &options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn validates_file_from_disk() {
        let path = std::env::temp_dir().join("mu_epub_css_async_check.css");
        tokio::fs::write(&path, b"p { direction: rtl }").await.unwrap();
        let report = validate_stylesheet_file_async(&path).await.unwrap();
        let _ = tokio::fs::remove_file(&path).await;
        assert_eq!(report.error_count(), 1);
        assert_eq!(report.diagnostics()[0].code, "CSS-001");
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let err = validate_stylesheet_file_async("/nonexistent/mu_epub_css.css")
            .await
            .unwrap_err();
        assert!(matches!(err, CssError::Io(_)));
    }
}
