//! Style sheet byte sources and encoding detection.
//!
//! Detection looks at two independent signals: a byte order mark, and a
//! leading `@charset "name";` rule. The BOM fixes the unit width and byte
//! order used while sniffing for the rule. When both are present they are
//! reported as found, without reconciliation; decoding uses the BOM
//! encoding first, then the declared charset, then UTF-8.

extern crate alloc;

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

#[cfg(feature = "std")]
use heapless::Vec as HeaplessVec;
#[cfg(feature = "std")]
use std::io::{self, Read};

/// Maximum number of bytes examined while sniffing for `@charset`.
pub const MAX_CHARSET_SNIFF: usize = 256;

const REPLACEMENT: char = '\u{FFFD}';

/// Byte order marks recognised at the start of a source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Bom {
    /// `EF BB BF`
    Utf8,
    /// `FE FF`
    Utf16Be,
    /// `FF FE`
    Utf16Le,
    /// `00 00 FE FF`
    Utf32Be,
    /// `FF FE 00 00`
    Utf32Le,
}

impl Bom {
    /// Signature bytes.
    pub fn bytes(self) -> &'static [u8] {
        match self {
            Bom::Utf8 => &[0xEF, 0xBB, 0xBF],
            Bom::Utf16Be => &[0xFE, 0xFF],
            Bom::Utf16Le => &[0xFF, 0xFE],
            Bom::Utf32Be => &[0x00, 0x00, 0xFE, 0xFF],
            Bom::Utf32Le => &[0xFF, 0xFE, 0x00, 0x00],
        }
    }

    /// Width in bytes of one code unit in this encoding.
    pub fn unit_width(self) -> usize {
        match self {
            Bom::Utf8 => 1,
            Bom::Utf16Be | Bom::Utf16Le => 2,
            Bom::Utf32Be | Bom::Utf32Le => 4,
        }
    }

    /// Returns `true` for little-endian encodings.
    pub fn is_little_endian(self) -> bool {
        matches!(self, Bom::Utf16Le | Bom::Utf32Le)
    }

    /// Encoding implied by this mark.
    pub fn encoding(self) -> Encoding {
        match self {
            Bom::Utf8 => Encoding::Utf8,
            Bom::Utf16Be => Encoding::Utf16Be,
            Bom::Utf16Le => Encoding::Utf16Le,
            Bom::Utf32Be => Encoding::Utf32Be,
            Bom::Utf32Le => Encoding::Utf32Le,
        }
    }
}

// Longest signatures first so `FF FE 00 00` wins over `FF FE`.
const BOM_ORDER: [Bom; 5] = [
    Bom::Utf32Be,
    Bom::Utf32Le,
    Bom::Utf8,
    Bom::Utf16Be,
    Bom::Utf16Le,
];

/// Detect a byte order mark at the start of `bytes`.
pub fn detect_bom(bytes: &[u8]) -> Option<Bom> {
    BOM_ORDER
        .iter()
        .copied()
        .find(|bom| bytes.starts_with(bom.bytes()))
}

/// Sniff a leading `@charset "name";` rule in `bytes` (which must not include the BOM).
///
/// Returns the declared name exactly as written.
pub fn sniff_charset(bytes: &[u8], bom: Option<Bom>) -> Option<String> {
    sniff_charset_from(bytes.iter().copied(), bom)
}

fn sniff_charset_from<I: Iterator<Item = u8>>(mut bytes: I, bom: Option<Bom>) -> Option<String> {
    let width = bom.map_or(1, Bom::unit_width);
    let little_endian = bom.is_some_and(Bom::is_little_endian);

    let mut consumed = 0usize;
    let mut seen = String::new();
    let mut count = 0usize;
    let mut open_quote: Option<char> = None;
    let mut value_start = 0usize;
    let mut unit = [0u8; 4];

    loop {
        for slot in unit.iter_mut().take(width) {
            *slot = bytes.next()?;
            consumed += 1;
        }
        if consumed >= MAX_CHARSET_SNIFF {
            return None;
        }
        let ch = if width == 1 || little_endian {
            unit[0]
        } else {
            unit[width - 1]
        } as char;
        seen.push(ch);
        count += 1;

        if count == 1 && ch != '@' {
            return None;
        } else if matches!(ch, ';' | '{' | '}') {
            return None;
        } else if count == 8 && seen != "@charset" {
            return None;
        } else if open_quote.is_none() && matches!(ch, '"' | '\'') {
            open_quote = Some(ch);
            value_start = seen.len();
        } else if open_quote == Some(ch) {
            let end = seen.len() - ch.len_utf8();
            return Some(String::from(&seen[value_start..end]));
        }
    }
}

/// Character encodings the decoder supports.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Encoding {
    /// UTF-8 (default).
    #[default]
    Utf8,
    /// UTF-16, big-endian.
    Utf16Be,
    /// UTF-16, little-endian.
    Utf16Le,
    /// UTF-32, big-endian.
    Utf32Be,
    /// UTF-32, little-endian.
    Utf32Le,
    /// ISO-8859-1.
    Latin1,
    /// US-ASCII.
    Ascii,
}

impl Encoding {
    /// Resolve a charset label, case-insensitively.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        const TABLE: &[(&str, Encoding)] = &[
            ("utf-8", Encoding::Utf8),
            ("utf8", Encoding::Utf8),
            ("unicode-1-1-utf-8", Encoding::Utf8),
            ("utf-16", Encoding::Utf16Be),
            ("utf-16be", Encoding::Utf16Be),
            ("utf-16le", Encoding::Utf16Le),
            ("utf-32", Encoding::Utf32Be),
            ("utf-32be", Encoding::Utf32Be),
            ("utf-32le", Encoding::Utf32Le),
            ("iso-8859-1", Encoding::Latin1),
            ("iso8859-1", Encoding::Latin1),
            ("iso_8859-1", Encoding::Latin1),
            ("latin1", Encoding::Latin1),
            ("l1", Encoding::Latin1),
            ("cp819", Encoding::Latin1),
            ("us-ascii", Encoding::Ascii),
            ("ascii", Encoding::Ascii),
            ("iso646-us", Encoding::Ascii),
        ];
        TABLE
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(label))
            .map(|(_, enc)| *enc)
    }

    /// Canonical name.
    pub fn name(self) -> &'static str {
        match self {
            Encoding::Utf8 => "UTF-8",
            Encoding::Utf16Be => "UTF-16BE",
            Encoding::Utf16Le => "UTF-16LE",
            Encoding::Utf32Be => "UTF-32BE",
            Encoding::Utf32Le => "UTF-32LE",
            Encoding::Latin1 => "ISO-8859-1",
            Encoding::Ascii => "US-ASCII",
        }
    }

    /// Decode `bytes`, replacing malformed sequences with U+FFFD.
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            Encoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Encoding::Utf16Be | Encoding::Utf16Le => {
                let big = self == Encoding::Utf16Be;
                let chunks = bytes.chunks_exact(2);
                let tail = chunks.remainder().len();
                let units = chunks.map(|c| {
                    if big {
                        u16::from_be_bytes([c[0], c[1]])
                    } else {
                        u16::from_le_bytes([c[0], c[1]])
                    }
                });
                let mut out: String = char::decode_utf16(units)
                    .map(|r| r.unwrap_or(REPLACEMENT))
                    .collect();
                if tail > 0 {
                    out.push(REPLACEMENT);
                }
                out
            }
            Encoding::Utf32Be | Encoding::Utf32Le => {
                let big = self == Encoding::Utf32Be;
                let chunks = bytes.chunks_exact(4);
                let tail = chunks.remainder().len();
                let mut out: String = chunks
                    .map(|c| {
                        let cp = if big {
                            u32::from_be_bytes([c[0], c[1], c[2], c[3]])
                        } else {
                            u32::from_le_bytes([c[0], c[1], c[2], c[3]])
                        };
                        char::from_u32(cp).unwrap_or(REPLACEMENT)
                    })
                    .collect();
                if tail > 0 {
                    out.push(REPLACEMENT);
                }
                out
            }
            Encoding::Latin1 => bytes.iter().map(|&b| b as char).collect(),
            Encoding::Ascii => bytes
                .iter()
                .map(|&b| if b < 0x80 { b as char } else { REPLACEMENT })
                .collect(),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A style sheet ready for scanning: detected encoding plus body bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CssSource {
    source_id: Arc<str>,
    bom: Option<Bom>,
    charset: Option<String>,
    encoding: Encoding,
    body: Vec<u8>,
}

impl CssSource {
    /// Build a source from raw bytes, running BOM and `@charset` detection.
    pub fn from_bytes(source_id: &str, bytes: &[u8]) -> Self {
        let bom = detect_bom(bytes);
        let body = &bytes[bom.map_or(0, |b| b.bytes().len())..];
        let charset = sniff_charset(body, bom);
        Self::detected(source_id, bom, charset, body.to_vec())
    }

    /// Build a source from already decoded text. No detection is performed.
    pub fn from_text(source_id: &str, text: &str) -> Self {
        Self {
            source_id: Arc::from(source_id),
            bom: None,
            charset: None,
            encoding: Encoding::Utf8,
            body: text.as_bytes().to_vec(),
        }
    }

    /// Build a source from a reader, detecting without over-reading.
    #[cfg(feature = "std")]
    pub fn from_reader<R: Read>(source_id: &str, reader: R) -> io::Result<Self> {
        let mut stream = CssInputStream::new(reader)?;
        let bom = stream.bom();
        let charset = stream.charset().map(String::from);
        let mut body = Vec::new();
        stream.read_to_end(&mut body)?;
        Ok(Self::detected(source_id, bom, charset, body))
    }

    fn detected(source_id: &str, bom: Option<Bom>, charset: Option<String>, body: Vec<u8>) -> Self {
        let encoding = resolve_encoding(bom, charset.as_deref());
        Self {
            source_id: Arc::from(source_id),
            bom,
            charset,
            encoding,
            body,
        }
    }

    /// Source identifier used in locations.
    pub fn source_id(&self) -> &Arc<str> {
        &self.source_id
    }

    /// Byte order mark found at the start of the input, if any.
    pub fn bom(&self) -> Option<Bom> {
        self.bom
    }

    /// Charset declared by a leading `@charset` rule, exactly as written.
    pub fn charset(&self) -> Option<&str> {
        self.charset.as_deref()
    }

    /// Encoding used to decode the body.
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Size of the body in bytes, excluding any BOM.
    pub fn len(&self) -> usize {
        self.body.len()
    }

    /// Returns `true` when the body is empty.
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Decode the body to text.
    pub fn decode(&self) -> String {
        self.encoding.decode(&self.body)
    }
}

fn resolve_encoding(bom: Option<Bom>, charset: Option<&str>) -> Encoding {
    if let Some(bom) = bom {
        return bom.encoding();
    }
    match charset {
        Some(label) => match Encoding::from_label(label) {
            Some(enc) => enc,
            None => {
                #[cfg(feature = "std")]
                log::warn!(
                    "[CSS] Unsupported charset '{}', decoding as {}",
                    label,
                    Encoding::default()
                );
                Encoding::default()
            }
        },
        None => Encoding::default(),
    }
}

#[cfg(feature = "std")]
const PUSHBACK_CAPACITY: usize = MAX_CHARSET_SNIFF + 4;

/// A byte stream that detects the BOM and `@charset` of a style sheet.
///
/// Bytes examined during detection are kept in a bounded pushback buffer and
/// served again by `read`, so only the BOM itself is consumed.
#[cfg(feature = "std")]
pub struct CssInputStream<R> {
    inner: R,
    pushback: HeaplessVec<u8, PUSHBACK_CAPACITY>,
    pos: usize,
    bom: Option<Bom>,
    charset: Option<String>,
}

#[cfg(feature = "std")]
impl<R: Read> CssInputStream<R> {
    /// Wrap `inner`, running detection immediately.
    pub fn new(mut inner: R) -> io::Result<Self> {
        let mut head: HeaplessVec<u8, PUSHBACK_CAPACITY> = HeaplessVec::new();
        let mut byte = [0u8; 1];
        while head.len() < 4 {
            match inner.read(&mut byte) {
                Ok(0) => break,
                Ok(_) => push_byte(&mut head, byte[0])?,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        let bom = detect_bom(&head);
        let skip = bom.map_or(0, |b| b.bytes().len());
        let mut pushback: HeaplessVec<u8, PUSHBACK_CAPACITY> = HeaplessVec::new();
        for &b in &head[skip..] {
            push_byte(&mut pushback, b)?;
        }

        let mut lookahead = Lookahead {
            inner: &mut inner,
            buf: &mut pushback,
            idx: 0,
            error: None,
        };
        let charset = sniff_charset_from(&mut lookahead, bom);
        if let Some(err) = lookahead.error.take() {
            return Err(err);
        }

        log::debug!(
            "[CSS] Detected BOM {:?}, @charset {:?} ({} bytes pushed back)",
            bom,
            charset,
            pushback.len()
        );

        Ok(Self {
            inner,
            pushback,
            pos: 0,
            bom,
            charset,
        })
    }

    /// Byte order mark found at the start of the stream, if any.
    pub fn bom(&self) -> Option<Bom> {
        self.bom
    }

    /// Charset declared by a leading `@charset` rule, exactly as written.
    pub fn charset(&self) -> Option<&str> {
        self.charset.as_deref()
    }

    /// Unwrap the underlying reader, dropping any pushed-back bytes.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

#[cfg(feature = "std")]
impl<R: Read> Read for CssInputStream<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pos < self.pushback.len() {
            let pending = &self.pushback[self.pos..];
            let n = pending.len().min(buf.len());
            buf[..n].copy_from_slice(&pending[..n]);
            self.pos += n;
            return Ok(n);
        }
        self.inner.read(buf)
    }
}

#[cfg(feature = "std")]
fn push_byte(buf: &mut HeaplessVec<u8, PUSHBACK_CAPACITY>, b: u8) -> io::Result<()> {
    buf.push(b)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "charset pushback buffer full"))
}

#[cfg(feature = "std")]
struct Lookahead<'a, R> {
    inner: &'a mut R,
    buf: &'a mut HeaplessVec<u8, PUSHBACK_CAPACITY>,
    idx: usize,
    error: Option<io::Error>,
}

#[cfg(feature = "std")]
impl<R: Read> Iterator for Lookahead<'_, R> {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        if self.idx < self.buf.len() {
            self.idx += 1;
            return Some(self.buf[self.idx - 1]);
        }
        let mut byte = [0u8; 1];
        loop {
            match self.inner.read(&mut byte) {
                Ok(0) => return None,
                Ok(_) => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.error = Some(e);
                    return None;
                }
            }
        }
        if let Err(e) = push_byte(self.buf, byte[0]) {
            self.error = Some(e);
            return None;
        }
        self.idx += 1;
        Some(byte[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_bom_variants() {
        assert_eq!(detect_bom(&[0xEF, 0xBB, 0xBF, b'a']), Some(Bom::Utf8));
        assert_eq!(detect_bom(&[0xFE, 0xFF, 0, b'a']), Some(Bom::Utf16Be));
        assert_eq!(detect_bom(&[0xFF, 0xFE, b'a', 0]), Some(Bom::Utf16Le));
        assert_eq!(detect_bom(&[0, 0, 0xFE, 0xFF]), Some(Bom::Utf32Be));
        assert_eq!(detect_bom(&[0xFF, 0xFE, 0, 0]), Some(Bom::Utf32Le));
        assert_eq!(detect_bom(b"a{}"), None);
        assert_eq!(detect_bom(&[]), None);
    }

    #[test]
    fn test_sniff_charset_plain() {
        let css = b"@charset \"iso-8859-1\"; a{}";
        assert_eq!(sniff_charset(css, None).as_deref(), Some("iso-8859-1"));
    }

    #[test]
    fn test_sniff_charset_single_quotes() {
        let css = b"@charset 'UTF-8';";
        assert_eq!(sniff_charset(css, None).as_deref(), Some("UTF-8"));
    }

    #[test]
    fn test_sniff_charset_mismatched_quote() {
        assert_eq!(sniff_charset(b"@charset \"utf-8';", None), None);
    }

    #[test]
    fn test_sniff_charset_requires_leading_rule() {
        assert_eq!(sniff_charset(b" @charset \"utf-8\";", None), None);
        assert_eq!(sniff_charset(b"@charsex \"utf-8\";", None), None);
        assert_eq!(sniff_charset(b"@import 'a.css';", None), None);
        assert_eq!(sniff_charset(b"@charset \"utf-8", None), None);
    }

    #[test]
    fn test_sniff_charset_utf16le_units() {
        let text = "@charset \"utf-16le\";";
        let bytes: Vec<u8> = text
            .encode_utf16()
            .flat_map(|u| u.to_le_bytes())
            .collect();
        assert_eq!(
            sniff_charset(&bytes, Some(Bom::Utf16Le)).as_deref(),
            Some("utf-16le")
        );
    }

    #[test]
    fn test_sniff_charset_bounded() {
        let mut css = Vec::from(&b"@charset \""[..]);
        css.extend(core::iter::repeat_n(b'x', 400));
        css.extend_from_slice(b"\";");
        assert_eq!(sniff_charset(&css, None), None);
    }

    #[test]
    fn test_source_prefers_bom_over_charset() {
        let mut bytes = Vec::from(&[0xEF, 0xBB, 0xBF][..]);
        bytes.extend_from_slice(b"@charset \"iso-8859-1\"; a{}");
        let source = CssSource::from_bytes("a.css", &bytes);
        assert_eq!(source.bom(), Some(Bom::Utf8));
        assert_eq!(source.charset(), Some("iso-8859-1"));
        assert_eq!(source.encoding(), Encoding::Utf8);
        assert!(source.decode().starts_with("@charset"));
    }

    #[test]
    fn test_source_uses_declared_charset() {
        let mut bytes = Vec::from(&b"@charset \"iso-8859-1\"; a{content:'"[..]);
        bytes.push(0xE9);
        bytes.extend_from_slice(b"'}");
        let source = CssSource::from_bytes("a.css", &bytes);
        assert_eq!(source.encoding(), Encoding::Latin1);
        assert!(source.decode().contains('\u{e9}'));
    }

    #[test]
    fn test_unsupported_charset_falls_back() {
        let source = CssSource::from_bytes("a.css", b"@charset \"x-klingon\"; a{}");
        assert_eq!(source.charset(), Some("x-klingon"));
        assert_eq!(source.encoding(), Encoding::Utf8);
    }

    #[test]
    fn test_decode_utf16_and_utf32() {
        let text = "a\u{1F600}b";
        let be: Vec<u8> = text.encode_utf16().flat_map(|u| u.to_be_bytes()).collect();
        assert_eq!(Encoding::Utf16Be.decode(&be), text);
        let le32: Vec<u8> = text.chars().flat_map(|c| (c as u32).to_le_bytes()).collect();
        assert_eq!(Encoding::Utf32Le.decode(&le32), text);
        assert_eq!(Encoding::Utf16Le.decode(&[b'a', 0, b'b']), "a\u{FFFD}");
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_input_stream_resumes_after_bom() {
        let mut bytes = Vec::from(&[0xFE, 0xFF][..]);
        bytes.extend("p{}".encode_utf16().flat_map(|u| u.to_be_bytes()));
        let mut stream = CssInputStream::new(&bytes[..]).unwrap();
        assert_eq!(stream.bom(), Some(Bom::Utf16Be));
        let mut rest = Vec::new();
        stream.read_to_end(&mut rest).unwrap();
        assert_eq!(rest, &bytes[2..]);
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_input_stream_pushes_back_sniffed_bytes() {
        let css = b"@charset \"utf-8\"; p { color: red }";
        let mut stream = CssInputStream::new(&css[..]).unwrap();
        assert_eq!(stream.bom(), None);
        assert_eq!(stream.charset(), Some("utf-8"));
        let mut rest = Vec::new();
        stream.read_to_end(&mut rest).unwrap();
        assert_eq!(rest, css);
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_input_stream_short_input() {
        let mut stream = CssInputStream::new(&b"a"[..]).unwrap();
        assert_eq!(stream.bom(), None);
        assert_eq!(stream.charset(), None);
        let mut rest = Vec::new();
        stream.read_to_end(&mut rest).unwrap();
        assert_eq!(rest, b"a");
    }
}
