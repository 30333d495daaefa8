//! Encoding detection and decoding tests.

use std::io::{Cursor, Read};

use mu_epub_css::css::{
    detect_bom, sniff_charset, Bom, CssInputStream, DefaultHandler, Encoding,
};
use mu_epub_css::{CssException, CssParser, CssSource};

fn utf16le_with_bom(text: &str) -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xFE];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    bytes
}

#[test]
fn plain_utf8_source() {
    let source = CssSource::from_bytes("plain.css", b"p { color: red }");
    assert_eq!(source.bom(), None);
    assert_eq!(source.charset(), None);
    assert_eq!(source.encoding(), Encoding::Utf8);
    assert_eq!(source.decode(), "p { color: red }");
    assert_eq!(&**source.source_id(), "plain.css");
}

#[test]
fn utf16le_bom_source_decodes_and_parses() {
    let bytes = utf16le_with_bom("@charset \"utf-16\";\nh1 { content: \"ü\" }");
    assert_eq!(detect_bom(&bytes), Some(Bom::Utf16Le));

    let source = CssSource::from_bytes("wide.css", &bytes);
    assert_eq!(source.bom(), Some(Bom::Utf16Le));
    assert_eq!(source.charset(), Some("utf-16"));
    assert_eq!(source.encoding(), Encoding::Utf16Le);
    assert!(source.decode().ends_with("h1 { content: \"ü\" }"));

    let mut errors: Vec<CssException> = Vec::new();
    CssParser::new()
        .parse(&source, &mut errors, &mut DefaultHandler)
        .unwrap();
    assert!(errors.is_empty(), "{:?}", errors);
}

#[test]
fn declared_latin1_is_decoded() {
    let mut bytes = b"@charset \"ISO-8859-1\";\np:after { content: \"".to_vec();
    bytes.push(0xE9);
    bytes.extend_from_slice(b"\" }");
    let source = CssSource::from_bytes("latin.css", &bytes);
    assert_eq!(source.charset(), Some("ISO-8859-1"));
    assert_eq!(source.encoding(), Encoding::Latin1);
    assert!(source.decode().contains("\"\u{e9}\""));
}

#[test]
fn charset_must_be_first() {
    assert_eq!(sniff_charset(b"/* x */@charset \"utf-8\";", None), None);
    assert_eq!(
        sniff_charset(b"@charset \"windows-1252\"; p{}", None).as_deref(),
        Some("windows-1252")
    );
}

#[test]
fn encoding_labels() {
    assert_eq!(Encoding::from_label("UTF-8"), Some(Encoding::Utf8));
    assert_eq!(Encoding::from_label(" latin1 "), Some(Encoding::Latin1));
    assert_eq!(Encoding::from_label("utf-16le"), Some(Encoding::Utf16Le));
    assert_eq!(Encoding::from_label("shift_jis"), None);
    assert_eq!(Encoding::Utf32Be.to_string(), "UTF-32BE");
}

#[test]
fn reader_source_matches_byte_source() {
    let bytes = utf16le_with_bom("a { b: c }");
    let from_reader = CssSource::from_reader("r.css", Cursor::new(bytes.clone())).unwrap();
    let from_bytes = CssSource::from_bytes("r.css", &bytes);
    assert_eq!(from_reader, from_bytes);
    assert_eq!(from_reader.decode(), "a { b: c }");
}

#[test]
fn input_stream_yields_body_after_detection() {
    let css = b"@charset \"utf-8\";\nbody{}";
    let mut stream = CssInputStream::new(Cursor::new(&css[..])).unwrap();
    assert_eq!(stream.bom(), None);
    assert_eq!(stream.charset(), Some("utf-8"));
    let mut rest = Vec::new();
    stream.read_to_end(&mut rest).unwrap();
    assert_eq!(rest, css);
}

#[test]
fn text_source_skips_detection() {
    let source = CssSource::from_text("t.css", "@charset \"iso-8859-1\"; é{}");
    assert_eq!(source.charset(), None);
    assert_eq!(source.encoding(), Encoding::Utf8);
    assert_eq!(source.decode(), "@charset \"iso-8859-1\"; é{}");
}
