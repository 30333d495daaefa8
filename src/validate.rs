//! EPUB CSS profile checks and structured diagnostics.
//!
//! The checker listens to parser events and reports compliance-oriented
//! diagnostics for the CSS rules EPUB reading systems care about: text
//! direction overrides, fixed positioning, embedded font types, encodings
//! and empty references. Every syntax error the parser reports becomes a
//! `CSS-008` diagnostic. Nothing here panics on malformed input.

extern crate alloc;

use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use std::collections::BTreeMap;
use std::path::Path;

use crate::css::{
    AtRule, Bom, ContentHandler, Construct, CssParser, CssSource, Declaration, Location,
    ParserOptions,
};
use crate::error::{CssError, CssException};
use crate::xhtml::{extract_styles, StyleKind};

/// Severity level for a validation diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValidationSeverity {
    /// Violates a required profile expectation.
    Error,
    /// Suspicious or non-ideal usage that may reduce compatibility.
    Warning,
    /// Worth knowing about; not a compatibility problem by itself.
    Info,
}

impl ValidationSeverity {
    /// Lowercase label used in reports.
    pub fn as_str(self) -> &'static str {
        match self {
            ValidationSeverity::Error => "error",
            ValidationSeverity::Warning => "warning",
            ValidationSeverity::Info => "info",
        }
    }
}

/// Structured validation diagnostic entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationDiagnostic {
    /// Stable machine-readable diagnostic code.
    pub code: &'static str,
    /// Severity classification.
    pub severity: ValidationSeverity,
    /// Human-readable description.
    pub message: String,
    /// Path of the style sheet or document the diagnostic belongs to.
    pub path: Option<String>,
    /// 1-based line, corrected for any embedding offset.
    pub line: Option<usize>,
    /// 1-based column, corrected for any embedding offset.
    pub column: Option<usize>,
    /// Optional EPUB spec reference label.
    pub spec_ref: Option<&'static str>,
    /// Optional remediation hint.
    pub hint: Option<String>,
}

impl ValidationDiagnostic {
    fn error(code: &'static str, message: impl Into<String>) -> Self {
        Self::with_severity(code, ValidationSeverity::Error, message)
    }

    fn warning(code: &'static str, message: impl Into<String>) -> Self {
        Self::with_severity(code, ValidationSeverity::Warning, message)
    }

    fn info(code: &'static str, message: impl Into<String>) -> Self {
        Self::with_severity(code, ValidationSeverity::Info, message)
    }

    fn with_severity(
        code: &'static str,
        severity: ValidationSeverity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code,
            severity,
            message: message.into(),
            path: None,
            line: None,
            column: None,
            spec_ref: None,
            hint: None,
        }
    }
}

/// How a referenced resource is used by the style sheet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum ReferenceKind {
    /// Target of an `@import` rule.
    Import,
    /// `src` of an `@font-face` rule.
    Font,
    /// Any other `url()` value.
    Url,
}

impl ReferenceKind {
    /// Lowercase label used in reports.
    pub fn as_str(self) -> &'static str {
        match self {
            ReferenceKind::Import => "import",
            ReferenceKind::Font => "font",
            ReferenceKind::Url => "url",
        }
    }
}

/// A resource referenced from a style sheet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CssReference {
    /// Reference as written.
    pub href: String,
    /// Reference resolved against the style sheet path.
    pub resolved: String,
    /// Where the reference appears.
    pub location: Location,
    /// How the reference is used.
    pub kind: ReferenceKind,
}

/// Descriptors collected from one `@font-face` rule.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FontFace {
    /// `font-family` value.
    pub family: Option<String>,
    /// `font-style` value.
    pub style: Option<String>,
    /// `font-weight` value.
    pub weight: Option<String>,
    /// Resolved `src` URLs, in source order.
    pub src: Vec<String>,
    /// Position of the `@font-face` keyword.
    pub location: Location,
}

/// Validation report with all discovered diagnostics.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationReport {
    diagnostics: Vec<ValidationDiagnostic>,
    references: Vec<CssReference>,
    font_faces: Vec<FontFace>,
}

impl ValidationReport {
    /// Create an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return all collected diagnostics, ordered by position.
    pub fn diagnostics(&self) -> &[ValidationDiagnostic] {
        &self.diagnostics
    }

    /// Resources referenced by the checked styles.
    pub fn references(&self) -> &[CssReference] {
        &self.references
    }

    /// `@font-face` rules found in the checked styles.
    pub fn font_faces(&self) -> &[FontFace] {
        &self.font_faces
    }

    /// Number of error diagnostics.
    pub fn error_count(&self) -> usize {
        self.count(ValidationSeverity::Error)
    }

    /// Number of warning diagnostics.
    pub fn warning_count(&self) -> usize {
        self.count(ValidationSeverity::Warning)
    }

    /// Number of informational diagnostics.
    pub fn info_count(&self) -> usize {
        self.count(ValidationSeverity::Info)
    }

    /// Returns `true` when no error-level diagnostics were found.
    pub fn is_valid(&self) -> bool {
        self.error_count() == 0
    }

    /// Returns `true` if any diagnostic carries `code`.
    pub fn has_code(&self, code: &str) -> bool {
        self.diagnostics.iter().any(|d| d.code == code)
    }

    fn count(&self, severity: ValidationSeverity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    fn push(&mut self, diagnostic: ValidationDiagnostic) {
        self.diagnostics.push(diagnostic);
    }

    fn finish(&mut self) {
        // Stable: diagnostics at the same position keep their emission order.
        self.diagnostics
            .sort_by_key(|d| (d.line.unwrap_or(0), d.column.unwrap_or(0)));
    }
}

/// Target EPUB version; some checks only apply to EPUB 3.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EpubVersion {
    /// EPUB 2.0.1.
    Epub2,
    /// EPUB 3.x.
    #[default]
    Epub3,
}

/// Options for validation runs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationOptions {
    /// Publication version the style sheet belongs to.
    pub epub_version: EpubVersion,
    /// Manifest media types keyed by resolved href, used for font checks.
    pub font_media_types: BTreeMap<String, String>,
    /// Options for the underlying parser.
    pub parser: ParserOptions,
}

impl ValidationOptions {
    /// Set the target EPUB version.
    pub fn with_epub_version(mut self, version: EpubVersion) -> Self {
        self.epub_version = version;
        self
    }

    /// Declare the manifest media type of `href`.
    pub fn with_font_media_type(
        mut self,
        href: impl Into<String>,
        media_type: impl Into<String>,
    ) -> Self {
        self.font_media_types.insert(href.into(), media_type.into());
        self
    }

    /// Set the parser options.
    pub fn with_parser_options(mut self, parser: ParserOptions) -> Self {
        self.parser = parser;
        self
    }
}

/// Validate a style sheet file with default options.
pub fn validate_stylesheet_file<P: AsRef<Path>>(path: P) -> Result<ValidationReport, CssError> {
    validate_stylesheet_file_with_options(path, &ValidationOptions::default())
}

/// Validate a style sheet file with explicit options.
pub fn validate_stylesheet_file_with_options<P: AsRef<Path>>(
    path: P,
    options: &ValidationOptions,
) -> Result<ValidationReport, CssError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| CssError::Io(e.to_string()))?;
    validate_stylesheet(&path.to_string_lossy(), &bytes, options)
}

/// Validate the raw bytes of a style sheet located at `path`.
///
/// `path` names the style sheet in diagnostics and is the base for resolving
/// references.
pub fn validate_stylesheet(
    path: &str,
    bytes: &[u8],
    options: &ValidationOptions,
) -> Result<ValidationReport, CssError> {
    let mut report = ValidationReport::new();
    let source = CssSource::from_bytes(path, bytes);
    check_encoding(path, &source, &mut report);

    let parser = CssParser::with_options(options.parser.clone());
    let mut errors: Vec<CssException> = Vec::new();
    let mut checker = StyleChecker::new(path, options, Origin::START, &mut report);
    parser.parse(&source, &mut errors, &mut checker)?;
    checker.syntax_errors(errors);

    report.finish();
    log::debug!(
        "[CSS] {}: {} errors, {} warnings",
        path,
        report.error_count(),
        report.warning_count()
    );
    Ok(report)
}

/// Validate the body of a `style` attribute found at `line`/`column` of the
/// document at `path`.
pub fn validate_style_attribute(
    path: &str,
    text: &str,
    line: usize,
    column: usize,
    options: &ValidationOptions,
) -> Result<ValidationReport, CssError> {
    let mut report = ValidationReport::new();
    check_embedded(path, text, StyleKind::Attribute, Origin { line, column }, options, &mut report)?;
    report.finish();
    Ok(report)
}

/// Validate every `<style>` element and `style` attribute of an XHTML
/// document.
pub fn validate_xhtml_styles(
    path: &str,
    xhtml: &[u8],
    options: &ValidationOptions,
) -> Result<ValidationReport, CssError> {
    let mut report = ValidationReport::new();
    for style in extract_styles(xhtml)? {
        let origin = Origin {
            line: style.line,
            column: style.column,
        };
        check_embedded(path, &style.css, style.kind, origin, options, &mut report)?;
    }
    report.finish();
    log::debug!(
        "[CSS] {}: {} diagnostics in embedded styles",
        path,
        report.diagnostics().len()
    );
    Ok(report)
}

fn check_embedded(
    path: &str,
    css: &str,
    kind: StyleKind,
    origin: Origin,
    options: &ValidationOptions,
    report: &mut ValidationReport,
) -> Result<(), CssError> {
    let parser = CssParser::with_options(options.parser.clone());
    let mut errors: Vec<CssException> = Vec::new();
    let mut checker = StyleChecker::new(path, options, origin, report);
    match kind {
        StyleKind::Element => parser.parse_str(css, path, &mut errors, &mut checker)?,
        StyleKind::Attribute => parser.parse_style_attribute(css, path, &mut errors, &mut checker)?,
    }
    checker.syntax_errors(errors);
    Ok(())
}

fn check_encoding(path: &str, source: &CssSource, report: &mut ValidationReport) {
    if let Some(charset) = source.charset() {
        if !is_unicode_label(charset) {
            let mut d = ValidationDiagnostic::error(
                "CSS-003",
                format!(
                    "Only UTF-8 and UTF-16 encodings are allowed, detected `{}` in @charset.",
                    charset
                ),
            );
            d.path = Some(path.to_string());
            d.line = Some(1);
            d.column = Some(1);
            d.spec_ref = Some("EPUB 3 CSS profile");
            d.hint = Some("Re-encode the style sheet as UTF-8 and drop the @charset rule.".to_string());
            report.push(d);
        }
    }
    if let Some(bom) = source.bom() {
        if matches!(bom, Bom::Utf32Be | Bom::Utf32Le) {
            let mut d = ValidationDiagnostic::error(
                "CSS-004",
                format!(
                    "Only UTF-8 and UTF-16 encodings are allowed, detected a {} byte order mark.",
                    bom.encoding()
                ),
            );
            d.path = Some(path.to_string());
            d.line = Some(1);
            d.column = Some(1);
            d.spec_ref = Some("EPUB 3 CSS profile");
            report.push(d);
        }
    }
}

fn is_unicode_label(label: &str) -> bool {
    let label = label.trim().to_ascii_lowercase();
    label == "utf-8" || label.starts_with("utf-16")
}

/// Position of the first character of an embedded style in its document.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Origin {
    line: usize,
    column: usize,
}

impl Origin {
    const START: Origin = Origin { line: 1, column: 1 };

    fn apply(self, location: &Location) -> (usize, usize) {
        if location.line <= 1 {
            (self.line, self.column + location.column.saturating_sub(1))
        } else {
            (self.line + location.line - 1, location.column)
        }
    }
}

struct OpenFontFace {
    face: FontFace,
    declarations: usize,
}

struct StyleChecker<'a> {
    path: &'a str,
    options: &'a ValidationOptions,
    origin: Origin,
    report: &'a mut ValidationReport,
    font_face: Option<OpenFontFace>,
}

impl<'a> StyleChecker<'a> {
    fn new(
        path: &'a str,
        options: &'a ValidationOptions,
        origin: Origin,
        report: &'a mut ValidationReport,
    ) -> Self {
        Self {
            path,
            options,
            origin,
            report,
            font_face: None,
        }
    }

    fn emit(&mut self, mut d: ValidationDiagnostic, location: &Location) {
        let (line, column) = self.origin.apply(location);
        d.path = Some(self.path.to_string());
        d.line = Some(line);
        d.column = Some(column);
        self.report.push(d);
    }

    fn syntax_errors(mut self, errors: Vec<CssException>) {
        for error in errors {
            let mut d = ValidationDiagnostic::error(
                "CSS-008",
                format!("An error occurred while parsing the CSS: {}", error.message()),
            );
            d.hint = Some(format!("parser code `{}`", error.code.key()));
            self.emit(d, &error.location);
        }
    }

    fn reference(&mut self, href: &str, location: &Location, kind: ReferenceKind) -> Option<String> {
        if href.is_empty() {
            let mut d = ValidationDiagnostic::error("CSS-002", "Empty or NULL reference found.");
            d.spec_ref = Some("EPUB 3 CSS profile");
            self.emit(d, location);
            return None;
        }
        let resolved = resolve_relative(self.path, href);
        let mut location = location.clone();
        let (line, column) = self.origin.apply(&location);
        location.line = line;
        location.column = column;
        self.report.references.push(CssReference {
            href: href.to_string(),
            resolved: resolved.clone(),
            location,
            kind,
        });
        Some(resolved)
    }

    fn collect_uris(&mut self, components: &[Construct], kind: ReferenceKind) -> Vec<String> {
        let mut found = Vec::new();
        for component in components {
            match component {
                Construct::Uri(uri) => {
                    if let Some(resolved) = self.reference(uri.uri(), &uri.location, kind) {
                        found.push(resolved);
                    }
                }
                Construct::Function(f) => found.extend(self.collect_uris(&f.components, kind)),
                Construct::ScopedGroup(g) => found.extend(self.collect_uris(&g.components, kind)),
                _ => {}
            }
        }
        found
    }

    fn check_font_type(&mut self, resolved: &str, location: &Location) {
        if is_remote(resolved) {
            return;
        }
        let options = self.options;
        let media_type = options
            .font_media_types
            .get(resolved)
            .map(String::as_str)
            .or_else(|| guess_font_media_type(resolved));
        let Some(media_type) = media_type else {
            return;
        };
        if !is_font_media_type(media_type) {
            let mut d = ValidationDiagnostic::info(
                "CSS-007",
                format!(
                    "Font-face reference `{}` refers to non-standard font type `{}`.",
                    resolved, media_type
                ),
            );
            d.spec_ref = Some("EPUB 3 core media types");
            self.emit(d, location);
        }
    }

    fn font_descriptor(&mut self, decl: &Declaration) {
        let src = if decl.name == "src" {
            self.collect_uris(&decl.components, ReferenceKind::Font)
        } else {
            self.collect_uris(&decl.components, ReferenceKind::Url);
            Vec::new()
        };
        for resolved in &src {
            self.check_font_type(resolved, &decl.location);
        }
        let Some(open) = self.font_face.as_mut() else {
            return;
        };
        open.declarations += 1;
        match decl.name.as_str() {
            "font-family" => open.face.family = Some(plain_value(&decl.components)),
            "font-style" => open.face.style = Some(plain_value(&decl.components)),
            "font-weight" => open.face.weight = Some(plain_value(&decl.components)),
            "src" => open.face.src.extend(src),
            _ => {}
        }
    }

    fn profile_checks(&mut self, decl: &Declaration) {
        match decl.name.as_str() {
            "direction" | "unicode-bidi" => {
                let mut d = ValidationDiagnostic::error(
                    "CSS-001",
                    format!(
                        "The `{}` property must not be included in an EPUB style sheet.",
                        decl.name
                    ),
                );
                d.spec_ref = Some("EPUB 3 CSS profile");
                d.hint = Some("Set text direction with the `dir` attribute in markup.".to_string());
                self.emit(d, &decl.location);
            }
            "position" if self.options.epub_version == EpubVersion::Epub3 => {
                if decl.components.iter().any(|c| c.is_keyword("fixed")) {
                    let mut d = ValidationDiagnostic::warning(
                        "CSS-006",
                        "The `fixed` value of the `position` property is not supported.",
                    );
                    d.spec_ref = Some("EPUB 3 CSS profile");
                    self.emit(d, &decl.location);
                }
            }
            _ => {}
        }
        if decl.important {
            let d = ValidationDiagnostic::info(
                "CSS-013",
                format!("`!important` used on property `{}`.", decl.name),
            );
            self.emit(d, &decl.location);
        }
    }
}

impl ContentHandler for StyleChecker<'_> {
    fn start_at_rule(&mut self, at_rule: AtRule) {
        match at_rule.name.as_str() {
            "@import" => {
                let target = at_rule.components.first().and_then(|c| match c {
                    Construct::Uri(uri) => Some(uri.uri()),
                    Construct::String(s) => Some(s.value.as_str()),
                    _ => None,
                });
                if let Some(href) = target {
                    self.reference(href, &at_rule.location, ReferenceKind::Import);
                }
            }
            "@font-face" => {
                self.font_face = Some(OpenFontFace {
                    face: FontFace {
                        location: at_rule.location,
                        ..FontFace::default()
                    },
                    declarations: 0,
                });
            }
            "@media" => {
                let d = ValidationDiagnostic::info("CSS-023", "@media rule found.");
                self.emit(d, &at_rule.location);
                self.collect_uris(&at_rule.components, ReferenceKind::Url);
            }
            _ => {
                self.collect_uris(&at_rule.components, ReferenceKind::Url);
            }
        }
    }

    fn end_at_rule(&mut self, name: &str) {
        if name != "@font-face" {
            return;
        }
        let Some(open) = self.font_face.take() else {
            return;
        };
        if open.declarations == 0 {
            let mut d = ValidationDiagnostic::warning(
                "CSS-019",
                "@font-face declaration has no attributes.",
            );
            d.hint = Some("Remove the rule or add font descriptors.".to_string());
            self.emit(d, &open.face.location);
        }
        let mut face = open.face;
        let (line, column) = self.origin.apply(&face.location);
        face.location.line = line;
        face.location.column = column;
        self.report.font_faces.push(face);
    }

    fn declaration(&mut self, declaration: Declaration) {
        if self.font_face.is_some() {
            self.font_descriptor(&declaration);
        } else {
            self.collect_uris(&declaration.components, ReferenceKind::Url);
        }
        self.profile_checks(&declaration);
    }
}

fn plain_value(components: &[Construct]) -> String {
    let mut out = String::new();
    for component in components {
        if !out.is_empty() && !component.is_symbol(',') {
            out.push(' ');
        }
        match component {
            Construct::String(a) | Construct::Keyword(a) => out.push_str(&a.value),
            other => out.push_str(&other.to_css_string()),
        }
    }
    out
}

fn is_remote(href: &str) -> bool {
    let lower = href.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn guess_font_media_type(href: &str) -> Option<&'static str> {
    let path = href.split(['?', '#']).next().unwrap_or(href);
    let ext = path.rsplit_once('.')?.1.to_ascii_lowercase();
    Some(match ext.as_str() {
        "otf" => "font/otf",
        "ttf" => "font/ttf",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttc" => "font/collection",
        "eot" => "application/vnd.ms-fontobject",
        "svg" => "image/svg+xml",
        _ => return None,
    })
}

fn is_font_media_type(media_type: &str) -> bool {
    let media_type = media_type.trim().to_ascii_lowercase();
    media_type.starts_with("font/")
        || media_type.starts_with("application/font")
        || media_type.starts_with("application/x-font")
        || media_type == "application/vnd.ms-opentype"
}

fn resolve_relative(base_path: &str, href: &str) -> String {
    if href.contains("://") || href.starts_with('/') || href.starts_with("data:") {
        return href.to_string();
    }
    let joined = match base_path.rfind('/') {
        Some(idx) => format!("{}/{}", &base_path[..idx], href),
        None => href.to_string(),
    };
    let mut segments: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "." => {}
            ".." if segments.last().is_some_and(|s| *s != "..") => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }
    segments.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(css: &str) -> ValidationReport {
        validate_stylesheet("OEBPS/css/style.css", css.as_bytes(), &ValidationOptions::default())
            .unwrap()
    }

    fn codes(report: &ValidationReport) -> Vec<&'static str> {
        report.diagnostics().iter().map(|d| d.code).collect()
    }

    #[test]
    fn validate_clean_stylesheet() {
        let report = check("p { margin: 0 1em; color: #333 }\nh1 { font-size: 2em }");
        assert!(report.is_valid());
        assert!(report.diagnostics().is_empty());
    }

    #[test]
    fn validate_reports_syntax_errors() {
        let report = check("p { color: }\nh1 { font-weight: bold }");
        assert_eq!(codes(&report), vec!["CSS-008"]);
        let d = &report.diagnostics()[0];
        assert_eq!(d.severity, ValidationSeverity::Error);
        assert_eq!(d.path.as_deref(), Some("OEBPS/css/style.css"));
        assert_eq!(d.line, Some(1));
    }

    #[test]
    fn validate_detects_direction_properties() {
        let report = check("p { direction: rtl }\nspan { unicode-bidi: embed }");
        assert_eq!(codes(&report), vec!["CSS-001", "CSS-001"]);
        assert_eq!(report.diagnostics()[1].line, Some(2));
        assert_eq!(report.error_count(), 2);
    }

    #[test]
    fn validate_warns_on_fixed_position_for_epub3_only() {
        let css = "div { position: fixed }";
        assert_eq!(codes(&check(css)), vec!["CSS-006"]);

        let options = ValidationOptions::default().with_epub_version(EpubVersion::Epub2);
        let report = validate_stylesheet("a.css", css.as_bytes(), &options).unwrap();
        assert!(report.diagnostics().is_empty());
    }

    #[test]
    fn validate_reports_important_and_media() {
        let report = check("@media screen { p { color: red !important } }");
        assert_eq!(codes(&report), vec!["CSS-023", "CSS-013"]);
        assert_eq!(report.info_count(), 2);
        assert!(report.is_valid());
    }

    #[test]
    fn validate_warns_on_empty_font_face() {
        let report = check("@font-face { }");
        assert_eq!(codes(&report), vec!["CSS-019"]);
        assert_eq!(report.font_faces().len(), 1);
    }

    #[test]
    fn validate_collects_font_faces() {
        let css = "@font-face {\n  font-family: \"Open Sans\";\n  font-weight: bold;\n  \
                   src: url(../fonts/open.woff2) format(\"woff2\"), url(../fonts/open.eot);\n}";
        let report = check(css);
        let face = &report.font_faces()[0];
        assert_eq!(face.family.as_deref(), Some("Open Sans"));
        assert_eq!(face.weight.as_deref(), Some("bold"));
        assert_eq!(face.style, None);
        assert_eq!(
            face.src,
            vec!["OEBPS/fonts/open.woff2".to_string(), "OEBPS/fonts/open.eot".to_string()]
        );
        assert_eq!(codes(&report), vec!["CSS-007"]);
        assert!(report.diagnostics()[0].message.contains("application/vnd.ms-fontobject"));
        assert!(report
            .references()
            .iter()
            .all(|r| r.kind == ReferenceKind::Font));
    }

    #[test]
    fn validate_font_type_from_manifest_overrides_extension() {
        let options = ValidationOptions::default()
            .with_font_media_type("OEBPS/fonts/a.bin", "application/octet-stream")
            .with_font_media_type("OEBPS/fonts/b.eot", "application/vnd.ms-opentype");
        let css = "@font-face { font-family: A; src: url(../fonts/a.bin) }\n\
                   @font-face { font-family: B; src: url(../fonts/b.eot) }";
        let report = validate_stylesheet("OEBPS/css/style.css", css.as_bytes(), &options).unwrap();
        assert_eq!(codes(&report), vec!["CSS-007"]);
        assert!(report.diagnostics()[0].message.contains("a.bin"));
    }

    #[test]
    fn validate_skips_remote_fonts() {
        let report = check("@font-face { font-family: X; src: url(https://example.com/x.eot) }");
        assert!(report.diagnostics().is_empty());
        assert_eq!(report.references()[0].resolved, "https://example.com/x.eot");
    }

    #[test]
    fn validate_records_references() {
        let report = check("@import url(base.css);\n@import \"print.css\";\nbody { background: url(../img/bg.png) }");
        let refs: Vec<(&str, ReferenceKind)> = report
            .references()
            .iter()
            .map(|r| (r.resolved.as_str(), r.kind))
            .collect();
        assert_eq!(
            refs,
            vec![
                ("OEBPS/css/base.css", ReferenceKind::Import),
                ("OEBPS/css/print.css", ReferenceKind::Import),
                ("OEBPS/img/bg.png", ReferenceKind::Url),
            ]
        );
        assert_eq!(report.references()[2].location.line, 3);
    }

    #[test]
    fn validate_detects_empty_reference() {
        let report = check("body { background: url() }");
        assert_eq!(codes(&report), vec!["CSS-002"]);
        assert!(report.references().is_empty());
    }

    #[test]
    fn validate_detects_non_unicode_charset() {
        let report = check("@charset \"iso-8859-1\";\np { color: red }");
        assert_eq!(codes(&report), vec!["CSS-003"]);

        let report = check("@charset \"UTF-8\";\np { color: red }");
        assert!(report.diagnostics().is_empty());
    }

    #[test]
    fn validate_detects_utf32_bom() {
        let mut bytes = vec![0xFF, 0xFE, 0x00, 0x00];
        for c in "p{}".chars() {
            bytes.extend_from_slice(&(c as u32).to_le_bytes());
        }
        let report =
            validate_stylesheet("a.css", &bytes, &ValidationOptions::default()).unwrap();
        assert_eq!(codes(&report), vec!["CSS-004"]);
    }

    #[test]
    fn validate_style_attribute_offsets_positions() {
        let report = validate_style_attribute(
            "OEBPS/ch1.xhtml",
            "color: red; direction: rtl",
            12,
            20,
            &ValidationOptions::default(),
        )
        .unwrap();
        let d = &report.diagnostics()[0];
        assert_eq!(d.code, "CSS-001");
        assert_eq!(d.line, Some(12));
        assert_eq!(d.column, Some(20 + 12));
    }

    #[test]
    fn validate_rejects_oversized_source() {
        let options = ValidationOptions::default()
            .with_parser_options(ParserOptions::default().with_max_source_bytes(Some(4)));
        let err = validate_stylesheet("a.css", b"p { color: red }", &options).unwrap_err();
        assert!(matches!(err, CssError::SourceTooLarge { limit: 4, .. }));
    }

    #[test]
    fn resolve_relative_paths() {
        assert_eq!(resolve_relative("OEBPS/css/a.css", "b.css"), "OEBPS/css/b.css");
        assert_eq!(resolve_relative("OEBPS/css/a.css", "../f/x.otf"), "OEBPS/f/x.otf");
        assert_eq!(resolve_relative("OEBPS/css/a.css", "./b.css"), "OEBPS/css/b.css");
        assert_eq!(resolve_relative("a.css", "b.css"), "b.css");
        assert_eq!(resolve_relative("a.css", "http://x/y"), "http://x/y");
    }

    #[test]
    fn font_media_type_classification() {
        assert!(is_font_media_type("font/woff2"));
        assert!(is_font_media_type("application/font-woff"));
        assert!(is_font_media_type("application/x-font-ttf"));
        assert!(is_font_media_type("application/vnd.ms-opentype"));
        assert!(!is_font_media_type("application/vnd.ms-fontobject"));
        assert_eq!(guess_font_media_type("a/b.WOFF?v=1"), Some("font/woff"));
        assert_eq!(guess_font_media_type("a/b"), None);
    }
}
