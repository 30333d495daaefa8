//! Embedded style extraction from XHTML content documents
//!
//! Finds `<style>` element bodies and `style="..."` attributes with the
//! position of their first character, so diagnostics raised against the CSS
//! can be reported at document coordinates. Uses quick_xml in streaming
//! mode; the document is never materialized as a tree.

extern crate alloc;

use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::CssError;

/// Where an embedded style came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum StyleKind {
    /// Body of a `<style>` element: a full style sheet.
    Element,
    /// Value of a `style` attribute: declarations only.
    Attribute,
}

/// One style found in an XHTML document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmbeddedStyle {
    /// Element or attribute.
    pub kind: StyleKind,
    /// Local name of the carrying element.
    pub element: String,
    /// CSS text with XML entities resolved.
    pub css: String,
    /// 1-based line of the first CSS character in the document.
    pub line: usize,
    /// 1-based column of the first CSS character in the document.
    pub column: usize,
}

struct OpenStyle {
    css: String,
    line: usize,
    column: usize,
}

/// Extract every embedded style from `xhtml`, in document order.
pub fn extract_styles(xhtml: &[u8]) -> Result<Vec<EmbeddedStyle>, CssError> {
    let mut reader = Reader::from_reader(xhtml);
    reader.config_mut().trim_text(false);
    reader.config_mut().expand_empty_elements = false;

    let mut buf = Vec::new();
    let mut styles = Vec::new();
    let mut open: Option<OpenStyle> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let end = reader_offset(&reader);
                let name = local_name(&reader, &e)?;
                attribute_styles(&reader, &e, &name, xhtml, end, &mut styles)?;
                if name == "style" && open.is_none() {
                    let (line, column) = line_column(xhtml, end);
                    open = Some(OpenStyle {
                        css: String::new(),
                        line,
                        column,
                    });
                }
            }
            Ok(Event::Empty(e)) => {
                let end = reader_offset(&reader);
                let name = local_name(&reader, &e)?;
                attribute_styles(&reader, &e, &name, xhtml, end, &mut styles)?;
            }
            Ok(Event::End(e)) => {
                let name = reader
                    .decoder()
                    .decode(e.local_name().as_ref())
                    .map_err(|err| CssError::Xhtml(format!("Decode error: {:?}", err)))?
                    .to_ascii_lowercase();
                if name == "style" {
                    if let Some(style) = open.take() {
                        styles.push(EmbeddedStyle {
                            kind: StyleKind::Element,
                            element: name,
                            css: style.css,
                            line: style.line,
                            column: style.column,
                        });
                    }
                }
            }
            Ok(Event::Text(e)) => {
                if let Some(style) = open.as_mut() {
                    let text = e
                        .decode()
                        .map_err(|err| CssError::Xhtml(format!("Decode error: {:?}", err)))?;
                    style.css.push_str(&text);
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(style) = open.as_mut() {
                    let text = reader
                        .decoder()
                        .decode(&e)
                        .map_err(|err| CssError::Xhtml(format!("Decode error: {:?}", err)))?;
                    style.css.push_str(&text);
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if let Some(style) = open.as_mut() {
                    let entity_name = e
                        .decode()
                        .map_err(|err| CssError::Xhtml(format!("Decode error: {:?}", err)))?;
                    let entity = format!("&{};", entity_name);
                    let resolved = unescape(&entity)
                        .map_err(|err| CssError::Xhtml(format!("Unescape error: {:?}", err)))?;
                    style.css.push_str(&resolved);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => {
                return Err(CssError::Xhtml(format!(
                    "XML error at byte {}: {:?}",
                    reader.error_position(),
                    err
                )))
            }
        }
        buf.clear();
    }

    if open.is_some() {
        return Err(CssError::Xhtml("Unclosed <style> element".to_string()));
    }
    log::debug!("[CSS] extracted {} embedded styles", styles.len());
    Ok(styles)
}

fn reader_offset(reader: &Reader<&[u8]>) -> usize {
    usize::try_from(reader.buffer_position()).unwrap_or(usize::MAX)
}

fn local_name(reader: &Reader<&[u8]>, e: &BytesStart<'_>) -> Result<String, CssError> {
    reader
        .decoder()
        .decode(e.local_name().as_ref())
        .map(|name| name.to_ascii_lowercase())
        .map_err(|err| CssError::Xhtml(format!("Decode error: {:?}", err)))
}

/// Push a style for the `style` attribute of the tag ending at byte `end`.
fn attribute_styles(
    reader: &Reader<&[u8]>,
    e: &BytesStart<'_>,
    element: &str,
    xhtml: &[u8],
    end: usize,
    styles: &mut Vec<EmbeddedStyle>,
) -> Result<(), CssError> {
    for attr in e.attributes() {
        let attr = match attr {
            Ok(attr) => attr,
            Err(err) => {
                log::debug!("[CSS] skipping malformed attribute on <{}>: {}", element, err);
                continue;
            }
        };
        if attr.key.as_ref() != b"style" {
            continue;
        }
        let raw = reader
            .decoder()
            .decode(&attr.value)
            .map_err(|err| CssError::Xhtml(format!("Decode error: {:?}", err)))?;
        let css = unescape(&raw)
            .map_err(|err| CssError::Xhtml(format!("Unescape error: {:?}", err)))?
            .to_string();

        let end = end.min(xhtml.len());
        let tag_start = xhtml[..end].iter().rposition(|&b| b == b'<').unwrap_or(0);
        let value_start = attribute_value_offset(&xhtml[tag_start..end], b"style")
            .map_or(tag_start, |offset| tag_start + offset);
        let (line, column) = line_column(xhtml, value_start);
        styles.push(EmbeddedStyle {
            kind: StyleKind::Attribute,
            element: element.to_string(),
            css,
            line,
            column,
        });
    }
    Ok(())
}

/// Offset of the first value byte of attribute `name` inside a raw tag.
fn attribute_value_offset(tag: &[u8], name: &[u8]) -> Option<usize> {
    let mut i = 0;
    while i < tag.len() {
        match tag[i] {
            q @ (b'"' | b'\'') => {
                i += 1;
                while i < tag.len() && tag[i] != q {
                    i += 1;
                }
                i += 1;
            }
            _ if i > 0 && tag[i - 1].is_ascii_whitespace() && tag[i..].starts_with(name) => {
                let mut j = i + name.len();
                while j < tag.len() && tag[j].is_ascii_whitespace() {
                    j += 1;
                }
                if tag.get(j) == Some(&b'=') {
                    j += 1;
                    while j < tag.len() && tag[j].is_ascii_whitespace() {
                        j += 1;
                    }
                    if matches!(tag.get(j), Some(b'"' | b'\'')) {
                        return Some(j + 1);
                    }
                }
                i += 1;
            }
            _ => i += 1,
        }
    }
    None
}

/// 1-based line and character column of byte `offset`.
fn line_column(bytes: &[u8], offset: usize) -> (usize, usize) {
    let prefix = &bytes[..offset.min(bytes.len())];
    let line = prefix.iter().filter(|&&b| b == b'\n').count() + 1;
    let line_start = prefix
        .iter()
        .rposition(|&b| b == b'\n')
        .map_or(0, |idx| idx + 1);
    let column = String::from_utf8_lossy(&prefix[line_start..]).chars().count() + 1;
    (line, column)
}
