//! Character-level scanner producing [`Token`]s.
//!
//! Recognition is a priority-ordered dispatch on the current character. Order
//! matters: `-->`, `only`/`not`/`and`, `url(` and `U+` share prefixes with
//! identifiers and must be tested before the generic identifier rule.

extern crate alloc;

use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;

use super::escape::{is_newline, is_whitespace, CssEscape, EscapeError};
use super::handler::ErrorHandler;
use super::location::Location;
use super::messages::{Locale, Phrase};
use super::reader::CssReader;
use super::token::{chars, unit_for_suffix, QuantityUnit, Token, TokenType, MAX_UNIT_LEN};
use crate::error::{CssErrorCode, CssException};

type ScanResult<T> = Result<T, CssException>;

struct TokenBuilder {
    kind: TokenType,
    location: Location,
    text: String,
    errors: Vec<CssException>,
}

impl TokenBuilder {
    fn new(location: Location) -> Self {
        Self {
            kind: TokenType::Char,
            location,
            text: String::new(),
            errors: Vec::new(),
        }
    }

    fn build(self) -> Token {
        Token {
            kind: self.kind,
            location: self.location,
            text: self.text,
            errors: self.errors,
        }
    }
}

/// Turns a [`CssReader`] into tokens, reporting lexical errors as it goes.
pub struct CssScanner<'h> {
    reader: CssReader,
    handler: &'h mut dyn ErrorHandler,
    locale: Locale,
}

impl<'h> CssScanner<'h> {
    /// Create a scanner over `reader`.
    pub fn new(reader: CssReader, handler: &'h mut dyn ErrorHandler, locale: Locale) -> Self {
        Self {
            reader,
            handler,
            locale,
        }
    }

    /// Scan the whole input.
    ///
    /// Lexical errors are attached to their token and sent to the error
    /// handler; scanning only stops early if the handler aborts.
    pub fn scan(mut self) -> ScanResult<Vec<Token>> {
        let mut tokens = Vec::new();
        while let Some(c) = self.reader.next() {
            tokens.push(self.next_token(c)?);
        }
        Ok(tokens)
    }

    fn next_token(&mut self, c: char) -> ScanResult<Token> {
        let mut b = TokenBuilder::new(self.reader.location());

        if is_whitespace(c) {
            self.whitespace(&mut b);
        } else if c == '-' && self.reader.peek_eq("->", false) {
            b.kind = TokenType::Cdc;
            b.text.push_str("-->");
            self.reader.forward(2);
        } else if self.keyword_ahead(c, 'o', "nly") {
            self.keyword(&mut b, TokenType::Only, 3);
        } else if self.keyword_ahead(c, 'n', "ot") {
            self.keyword(&mut b, TokenType::Not, 2);
        } else if self.keyword_ahead(c, 'a', "nd") {
            self.keyword(&mut b, TokenType::And, 2);
        } else if c.eq_ignore_ascii_case(&'u') && self.reader.peek_eq("rl(", true) {
            self.uri(&mut b)?;
        } else if c.eq_ignore_ascii_case(&'u')
            && self.reader.peek() == Some('+')
            && self.reader.at(2).is_some_and(|n| n.is_ascii_hexdigit() || n == '?')
        {
            self.urange(&mut b)?;
        } else if self.ident_ahead(c, &mut b)? {
            self.ident(&mut b)?;
        } else if c == '@' && self.at_keyword_ahead() {
            self.at_keyword(&mut b)?;
        } else if self.number_ahead(c) {
            self.number(&mut b)?;
        } else if c == '<' && self.reader.peek_eq("!--", false) {
            b.kind = TokenType::Cdo;
            b.text.push_str("<!--");
            self.reader.forward(3);
        } else if c == '/' && self.reader.peek() == Some('*') {
            self.comment(&mut b)?;
        } else if chars::quote(c) {
            b.kind = TokenType::String;
            self.string_body(&mut b, c)?;
        } else if c == '#' && self.name_ahead() {
            b.kind = TokenType::HashName;
            b.text.push('#');
            self.append_while(&mut b, chars::nmchar)?;
        } else if c == '.' && self.name_ahead() {
            b.kind = TokenType::ClassName;
            b.text.push('.');
            self.append_first(&mut b, chars::nmstart)?;
            self.append_while(&mut b, chars::nmchar)?;
        } else if c == '!' && self.forward_match("important") {
            b.kind = TokenType::Important;
            b.text.push_str("!important");
        } else if let Some(kind) = match_operator(c, self.reader.peek()) {
            b.kind = kind;
            b.text.push(c);
            b.text.push('=');
            self.reader.next();
        } else {
            b.kind = TokenType::Char;
            b.text.push(c);
        }
        Ok(b.build())
    }

    fn report(
        &mut self,
        b: &mut TokenBuilder,
        code: CssErrorCode,
        location: Location,
        args: Vec<String>,
    ) -> ScanResult<()> {
        let err = CssException::new(code, location, args, self.locale);
        b.errors.push(err.clone());
        self.handler.error(err)
    }

    fn whitespace(&mut self, b: &mut TokenBuilder) {
        b.kind = TokenType::S;
        b.text.push(' ');
        self.reader.forward_until(|c| !is_whitespace(c));
    }

    fn keyword_ahead(&self, c: char, first: char, rest: &str) -> bool {
        c.eq_ignore_ascii_case(&first)
            && self.reader.peek_eq(rest, true)
            && self
                .reader
                .at(rest.len() + 1)
                .is_none_or(is_whitespace)
    }

    fn keyword(&mut self, b: &mut TokenBuilder, kind: TokenType, rest: usize) {
        b.kind = kind;
        b.text.push(self.reader.cur().unwrap_or_default());
        for _ in 0..rest {
            if let Some(c) = self.reader.next() {
                b.text.push(c);
            }
        }
    }

    /// Escape starting `n` characters ahead, without moving the reader.
    ///
    /// A backslash at end of input is only reported for the current character.
    fn escape_at(&mut self, n: usize, b: &mut TokenBuilder) -> ScanResult<Option<CssEscape>> {
        if self.reader.at(n) != Some('\\') {
            return Ok(None);
        }
        let mark = self.reader.mark();
        self.reader.forward(n);
        let escape = CssEscape::create(&self.reader);
        let location = self.reader.location();
        self.reader.reset(mark);
        match escape {
            Ok(esc) => Ok(esc),
            Err(EscapeError::PrematureEof) => {
                if n == 0 {
                    self.report(b, CssErrorCode::ScannerPrematureEof, location, Vec::new())?;
                }
                Ok(None)
            }
        }
    }

    fn ident_ahead(&mut self, c: char, b: &mut TokenBuilder) -> ScanResult<bool> {
        let next = self.reader.peek();
        if chars::nmstart(c) || (c == '-' && next.is_some_and(chars::nmstart)) {
            return Ok(true);
        }
        if c == '\\' {
            return Ok(self.escape_at(0, b)?.is_some());
        }
        if c == '-' {
            return Ok(self.escape_at(1, b)?.is_some());
        }
        Ok(false)
    }

    fn at_keyword_ahead(&mut self) -> bool {
        let mut scratch = TokenBuilder::new(Location::default());
        let next = self.reader.peek();
        if next.is_some_and(chars::nmstart) {
            return true;
        }
        if matches!(self.escape_at(1, &mut scratch), Ok(Some(_))) {
            return true;
        }
        next == Some('-')
            && (self.reader.at(2).is_some_and(chars::nmstart)
                || matches!(self.escape_at(2, &mut scratch), Ok(Some(_))))
    }

    fn name_ahead(&mut self) -> bool {
        let mut scratch = TokenBuilder::new(Location::default());
        self.reader.peek().is_some_and(chars::nmchar)
            || matches!(self.escape_at(1, &mut scratch), Ok(Some(_)))
    }

    fn number_ahead(&self, c: char) -> bool {
        let next = self.reader.peek();
        chars::digit(c)
            || (chars::numstart(c) && next.is_some_and(chars::digit))
            || (chars::unary(c) && next == Some('.') && self.reader.at(2).is_some_and(chars::digit))
    }

    /// Consume the escape at the current backslash into `b`, rendering with `render_as`.
    ///
    /// Returns `false` without consuming anything if no escape is there.
    fn append_escape(&mut self, b: &mut TokenBuilder, render_as: fn(char) -> bool) -> ScanResult<bool> {
        let escape = match CssEscape::create(&self.reader) {
            Ok(Some(esc)) => esc,
            _ => return Ok(false),
        };
        if escape.is_malformed() {
            let location = self.reader.location();
            let seq = escape.sequence().trim_end().to_string();
            self.report(b, CssErrorCode::ScannerMalformedEscape, location, vec![seq])?;
        }
        let consumed = escape.render(&mut b.text, render_as);
        self.reader.forward(consumed);
        Ok(true)
    }

    fn append_current(&mut self, b: &mut TokenBuilder, render_as: fn(char) -> bool) -> ScanResult<()> {
        match self.reader.cur() {
            Some('\\') => {
                if !self.append_escape(b, render_as)? {
                    b.text.push('\\');
                }
            }
            Some(c) => b.text.push(c),
            None => {}
        }
        Ok(())
    }

    /// Consume the next name character, rendering an escape with `render_as`.
    fn append_first(&mut self, b: &mut TokenBuilder, render_as: fn(char) -> bool) -> ScanResult<()> {
        match self.reader.peek() {
            Some('\\') => {
                let mark = self.reader.mark();
                self.reader.next();
                if !self.append_escape(b, render_as)? {
                    self.reader.reset(mark);
                }
            }
            Some(c) if chars::nmchar(c) => {
                self.reader.next();
                b.text.push(c);
            }
            _ => {}
        }
        Ok(())
    }

    /// Consume characters matching `accept`, decoding escapes along the way.
    fn append_while(&mut self, b: &mut TokenBuilder, accept: fn(char) -> bool) -> ScanResult<()> {
        loop {
            match self.reader.peek() {
                Some('\\') => {
                    let mark = self.reader.mark();
                    self.reader.next();
                    if !self.append_escape(b, accept)? {
                        self.reader.reset(mark);
                        break;
                    }
                }
                Some(c) if accept(c) => {
                    self.reader.next();
                    b.text.push(c);
                }
                _ => break,
            }
        }
        Ok(())
    }

    fn ident(&mut self, b: &mut TokenBuilder) -> ScanResult<()> {
        b.kind = TokenType::Ident;
        self.append_current(b, chars::nmstart)?;
        if self.reader.cur() == Some('-') && b.text == "-" {
            self.append_first(b, chars::nmstart)?;
        }
        self.append_while(b, chars::nmchar)?;
        if self.reader.peek() == Some('(') {
            self.reader.next();
            b.text.push('(');
            b.kind = TokenType::Function;
        }
        Ok(())
    }

    fn at_keyword(&mut self, b: &mut TokenBuilder) -> ScanResult<()> {
        b.kind = TokenType::AtKeyword;
        b.text.push('@');
        if self.reader.peek() == Some('-') {
            self.reader.next();
            b.text.push('-');
        }
        self.append_first(b, chars::nmstart)?;
        self.append_while(b, chars::nmchar)
    }

    fn number(&mut self, b: &mut TokenBuilder) -> ScanResult<()> {
        b.kind = TokenType::Integer;
        let first = self.reader.cur().unwrap_or_default();
        b.text.push(first);
        if first == '.' {
            b.kind = TokenType::Number;
        }
        while let Some(c) = self.reader.peek() {
            if !chars::numchar(c) {
                break;
            }
            if c == '.' {
                let fraction = self.reader.at(2).is_some_and(chars::digit);
                if !fraction || b.kind == TokenType::Number {
                    break;
                }
                b.kind = TokenType::Number;
            }
            self.reader.next();
            b.text.push(c);
        }

        let suffix_ahead = match self.reader.peek() {
            Some(c) if chars::qntstart(c) => true,
            Some('\\') => {
                let mut scratch = TokenBuilder::new(Location::default());
                matches!(self.escape_at(1, &mut scratch), Ok(Some(_)))
            }
            _ => false,
        };
        if suffix_ahead {
            self.quantity(b)?;
        }
        Ok(())
    }

    fn quantity(&mut self, b: &mut TokenBuilder) -> ScanResult<()> {
        let number_len = b.text.len();
        if self.reader.peek() == Some('%') {
            self.reader.next();
            b.text.push('%');
        } else {
            self.append_first(b, chars::nmstart)?;
            self.append_while(b, chars::nmchar)?;
        }
        let suffix = b.text.split_off(number_len);
        let known = if suffix.chars().count() <= MAX_UNIT_LEN {
            unit_for_suffix(&suffix)
        } else {
            None
        };
        match known {
            Some((canonical, unit)) => {
                b.text.push_str(canonical);
                b.kind = TokenType::Quantity(unit);
            }
            None => {
                b.text.push_str(&suffix);
                b.kind = TokenType::Quantity(QuantityUnit::Dimen);
            }
        }
        Ok(())
    }

    fn comment(&mut self, b: &mut TokenBuilder) -> ScanResult<()> {
        b.kind = TokenType::Comment;
        self.reader.next();
        loop {
            match self.reader.next() {
                None => {
                    let location = self.reader.location();
                    return self.report(b, CssErrorCode::ScannerPrematureEof, location, Vec::new());
                }
                Some('*') if self.reader.peek() == Some('/') => {
                    self.reader.next();
                    return Ok(());
                }
                Some(c) => b.text.push(c),
            }
        }
    }

    /// Read a quoted string body after the opening `quote` into `b.text`.
    fn string_body(&mut self, b: &mut TokenBuilder, quote: char) -> ScanResult<()> {
        loop {
            match self.reader.peek() {
                None => {
                    self.reader.next();
                    let location = self.reader.location();
                    return self.report(b, CssErrorCode::ScannerPrematureEof, location, Vec::new());
                }
                Some(c) if is_newline(c) => {
                    self.reader.next();
                    let location = self.reader.location();
                    let args = vec![
                        Phrase::Newline.text(self.locale).to_string(),
                        Phrase::StringToken.text(self.locale).to_string(),
                    ];
                    self.report(b, CssErrorCode::ScannerIllegalChar, location, args)?;
                    self.reader.forward_until(chars::terminator);
                    return Ok(());
                }
                Some('\\') => {
                    self.reader.next();
                    match self.reader.peek() {
                        Some(n) if is_newline(n) => {
                            self.reader.next();
                            if n == '\r' && self.reader.peek() == Some('\n') {
                                self.reader.next();
                            }
                        }
                        Some(n) => {
                            self.reader.next();
                            b.text.push('\\');
                            b.text.push(n);
                        }
                        None => b.text.push('\\'),
                    }
                }
                Some(c) if c == quote => {
                    self.reader.next();
                    return Ok(());
                }
                Some(c) => {
                    self.reader.next();
                    b.text.push(c);
                }
            }
        }
    }

    fn uri(&mut self, b: &mut TokenBuilder) -> ScanResult<()> {
        b.kind = TokenType::Uri;
        b.text.push_str("url(");
        self.reader.forward(3);
        self.reader.forward_until(|c| !is_whitespace(c));

        match self.reader.peek() {
            None => {
                self.reader.next();
                let location = self.reader.location();
                self.report(b, CssErrorCode::ScannerPrematureEof, location, Vec::new())?;
            }
            Some(q) if chars::quote(q) => {
                self.reader.next();
                b.text.push('\'');
                self.string_body(b, q)?;
                b.text.push('\'');
                self.reader.forward_until(|c| !is_whitespace(c));
                match self.reader.peek() {
                    Some(')') => {
                        self.reader.next();
                    }
                    None if b.errors.is_empty() => {
                        self.reader.next();
                        let location = self.reader.location();
                        self.report(b, CssErrorCode::ScannerPrematureEof, location, Vec::new())?;
                    }
                    Some(c) if b.errors.is_empty() => {
                        let location = self.reader.location();
                        self.report(b, CssErrorCode::ScannerIllegalSyntax, location, vec![c.to_string()])?;
                    }
                    _ => {}
                }
            }
            Some(_) => {
                let mut body = String::new();
                loop {
                    match self.reader.next() {
                        None => {
                            let location = self.reader.location();
                            self.report(b, CssErrorCode::ScannerPrematureEof, location, Vec::new())?;
                            break;
                        }
                        Some(')') => break,
                        Some('\\') => {
                            body.push('\\');
                            if let Some(n) = self.reader.next() {
                                body.push(n);
                            }
                        }
                        Some(c) => body.push(c),
                    }
                }
                b.text.push_str(body.trim_end_matches(is_whitespace));
            }
        }
        b.text.push(')');
        Ok(())
    }

    fn urange(&mut self, b: &mut TokenBuilder) -> ScanResult<()> {
        b.kind = TokenType::URange;
        b.text.push_str("U+");
        self.reader.next();
        let mut digits = 0;
        loop {
            match self.reader.peek() {
                Some(c) if chars::urange(c) => {
                    self.reader.next();
                    b.text.push(c);
                    if c == '-' {
                        digits = 0;
                    } else {
                        digits += 1;
                        if digits == 7 {
                            let location = self.reader.location();
                            let text = b.text.clone();
                            self.report(b, CssErrorCode::ScannerIllegalUnicodeRange, location, vec![text])?;
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    /// Match `word` case-insensitively after optional whitespace, consuming it on success.
    fn forward_match(&mut self, word: &str) -> bool {
        let mut n = 1;
        while self.reader.at(n).is_some_and(is_whitespace) {
            n += 1;
        }
        let matched = word.chars().enumerate().all(|(i, expected)| {
            self.reader
                .at(n + i)
                .is_some_and(|c| c.eq_ignore_ascii_case(&expected))
        });
        if matched {
            self.reader.forward(n - 1 + word.chars().count());
        }
        matched
    }
}

fn match_operator(c: char, next: Option<char>) -> Option<TokenType> {
    if next != Some('=') {
        return None;
    }
    match c {
        '~' => Some(TokenType::Includes),
        '|' => Some(TokenType::DashMatch),
        '^' => Some(TokenType::PrefixMatch),
        '$' => Some(TokenType::SuffixMatch),
        '*' => Some(TokenType::SubstringMatch),
        _ => None,
    }
}

/// Scan `text` into tokens with the default pushback capacity and locale.
pub fn scan(
    text: &str,
    source_id: &str,
    handler: &mut dyn ErrorHandler,
) -> Result<Vec<Token>, CssException> {
    let reader = CssReader::new(text, Arc::from(source_id));
    CssScanner::new(reader, handler, Locale::default()).scan()
}
