//! Parser driver: recognizes rule sets, at-rules and declarations and emits
//! them to a [`ContentHandler`].
//!
//! The whole source is scanned first; grammar routines then walk the token
//! list with a [`TokenIter`]. Recoverable errors are reported to the
//! [`ErrorHandler`] and parsing resynchronizes at the next `;` or `}`.
//! Premature end of input is reported once and ends the parse.

extern crate alloc;

use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;

use super::builders::{self, permitted, Interrupt, Reporter};
use super::grammar::{
    AtRule, Combinator, CombinatorKind, Construct, Declaration, PseudoKind, Selector,
};
use super::handler::{ContentHandler, ErrorHandler};
use super::location::Location;
use super::messages::{either, Locale, Phrase};
use super::reader::{CssReader, DEFAULT_PUSHBACK_CAPACITY};
use super::scanner::CssScanner;
use super::source::CssSource;
use super::token::{matchers, Token, TokenType};
use super::tokens::{filters, TokenIter};
use crate::error::{CssError, CssErrorCode, CssException};

/// Default upper bound on source size.
pub const DEFAULT_MAX_SOURCE_BYTES: usize = 16 * 1024 * 1024;

/// Parser configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParserOptions {
    /// Language of error messages.
    pub locale: Locale,
    /// Characters the reader can step back over.
    pub pushback_capacity: usize,
    /// Reject sources larger than this many bytes.
    pub max_source_bytes: Option<usize>,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            locale: Locale::default(),
            pushback_capacity: DEFAULT_PUSHBACK_CAPACITY,
            max_source_bytes: Some(DEFAULT_MAX_SOURCE_BYTES),
        }
    }
}

impl ParserOptions {
    /// Set the message locale.
    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    /// Set the reader pushback capacity.
    pub fn with_pushback_capacity(mut self, capacity: usize) -> Self {
        self.pushback_capacity = capacity;
        self
    }

    /// Set or clear the source size limit.
    pub fn with_max_source_bytes(mut self, limit: Option<usize>) -> Self {
        self.max_source_bytes = limit;
        self
    }
}

/// CSS parser.
///
/// A parser holds only configuration; each call owns its reader, scanner and
/// token list, so one parser can be shared across threads.
#[derive(Clone, Debug, Default)]
pub struct CssParser {
    options: ParserOptions,
}

impl CssParser {
    /// Parser with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parser with `options`.
    pub fn with_options(options: ParserOptions) -> Self {
        Self { options }
    }

    /// Active options.
    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    /// Parse a style sheet from a detected byte source.
    pub fn parse(
        &self,
        source: &CssSource,
        err: &mut dyn ErrorHandler,
        doc: &mut dyn ContentHandler,
    ) -> Result<(), CssError> {
        self.check_size(source.len())?;
        let text = source.decode();
        self.run(&text, source.source_id().clone(), err, doc, Mode::Stylesheet)
    }

    /// Parse a style sheet from decoded text.
    pub fn parse_str(
        &self,
        text: &str,
        source_id: &str,
        err: &mut dyn ErrorHandler,
        doc: &mut dyn ContentHandler,
    ) -> Result<(), CssError> {
        self.check_size(text.len())?;
        self.run(text, Arc::from(source_id), err, doc, Mode::Stylesheet)
    }

    /// Parse the body of a `style` attribute: declarations without braces.
    pub fn parse_style_attribute(
        &self,
        text: &str,
        source_id: &str,
        err: &mut dyn ErrorHandler,
        doc: &mut dyn ContentHandler,
    ) -> Result<(), CssError> {
        self.check_size(text.len())?;
        self.run(text, Arc::from(source_id), err, doc, Mode::StyleAttribute)
    }

    /// Scan `text` into tokens without parsing.
    pub fn scan(
        &self,
        text: &str,
        source_id: &str,
        err: &mut dyn ErrorHandler,
    ) -> Result<Vec<Token>, CssError> {
        self.check_size(text.len())?;
        Ok(self.tokens(text, Arc::from(source_id), err)?)
    }

    fn check_size(&self, size: usize) -> Result<(), CssError> {
        match self.options.max_source_bytes {
            Some(limit) if size > limit => Err(CssError::SourceTooLarge { size, limit }),
            _ => Ok(()),
        }
    }

    fn tokens(
        &self,
        text: &str,
        source_id: Arc<str>,
        err: &mut dyn ErrorHandler,
    ) -> Result<Vec<Token>, CssException> {
        let reader = CssReader::with_capacity(text, source_id, self.options.pushback_capacity);
        CssScanner::new(reader, err, self.options.locale).scan()
    }

    fn run(
        &self,
        text: &str,
        source_id: Arc<str>,
        err: &mut dyn ErrorHandler,
        doc: &mut dyn ContentHandler,
        mode: Mode,
    ) -> Result<(), CssError> {
        let tokens = self.tokens(text, source_id.clone(), &mut *err)?;
        #[cfg(feature = "std")]
        log::debug!("[CSS] {}: scanned {} tokens", source_id, tokens.len());

        let mut driver = Driver {
            iter: TokenIter::new(&tokens, filters::skip_whitespace_and_comments),
            rep: Reporter::new(err, self.options.locale),
            doc,
        };
        match mode {
            Mode::Stylesheet => driver.stylesheet()?,
            Mode::StyleAttribute => driver.style_attribute()?,
        }
        Ok(())
    }
}

#[derive(Clone, Copy)]
enum Mode {
    Stylesheet,
    StyleAttribute,
}

type GrammarResult<T> = Result<T, Interrupt>;

struct Driver<'a, 'h, 'd> {
    iter: TokenIter<'a>,
    rep: Reporter<'h>,
    doc: &'d mut dyn ContentHandler,
}

impl<'a> Driver<'a, '_, '_> {
    fn stylesheet(&mut self) -> Result<(), CssException> {
        self.doc.start_document();
        while let Ok(tk) = self.iter.next_with(filters::skip_top_level) {
            let result = if tk.kind == TokenType::AtKeyword {
                self.at_rule(tk)
            } else {
                self.rule_set(tk)
            };
            match result {
                Ok(()) => {}
                Err(Interrupt::Aborted(err)) => return Err(err),
                Err(Interrupt::PrematureEof | Interrupt::Exhausted) => break,
            }
        }
        self.doc.end_document();
        Ok(())
    }

    fn style_attribute(&mut self) -> Result<(), CssException> {
        self.doc.start_document();
        let mut leading = true;
        while let Ok(tk) = self.iter.next() {
            // a single leading ';' is tolerated
            if leading && matchers::semi(tk) {
                leading = false;
                continue;
            }
            leading = false;
            let interrupt = match self.declaration(tk, true) {
                Ok(Some(decl)) => {
                    self.doc.declaration(decl);
                    continue;
                }
                Ok(None) => break,
                Err(Interrupt::Exhausted) => {
                    let expecting = self.either("';'", "'}'");
                    self.premature_eof(expecting)
                }
                Err(other) => other,
            };
            if let Interrupt::Aborted(err) = interrupt {
                return Err(err);
            }
            break;
        }
        self.doc.end_document();
        Ok(())
    }

    fn either(&self, a: &str, b: &str) -> String {
        either(self.rep.locale(), a, b)
    }

    fn last_location(&self) -> Location {
        self.iter
            .last()
            .map(|t| t.location.clone())
            .unwrap_or_default()
    }

    fn premature_eof(&mut self, expecting: String) -> Interrupt {
        let location = self.last_location();
        match self.rep.premature_eof(location, expecting) {
            Ok(()) => Interrupt::PrematureEof,
            Err(err) => Interrupt::Aborted(err),
        }
    }

    /// Report running out of input while `expecting` was still open.
    fn close<T>(&mut self, result: GrammarResult<T>, expecting: String) -> GrammarResult<T> {
        match result {
            Err(Interrupt::Exhausted) => Err(self.premature_eof(expecting)),
            other => other,
        }
    }

    fn rule_set(&mut self, start: &'a Token) -> GrammarResult<()> {
        let selectors = self.selectors(start);
        let Some(selectors) = self.close(selectors, "'{'".to_string())? else {
            let skipped = self.skip_block();
            return self.close(skipped, "'}'".to_string());
        };

        self.doc.selectors(&selectors);
        let result = match self.iter.next() {
            Ok(first) => self.declaration_block(first),
            Err(e) => Err(e.into()),
        };
        let result = self.close(result, "'}'".to_string());
        if !matches!(result, Err(Interrupt::Aborted(_))) {
            self.doc.end_selectors(selectors);
        }
        result
    }

    /// Skip the block of a rejected rule set, up to its closing brace.
    fn skip_block(&mut self) -> GrammarResult<()> {
        let mut depth = 0usize;
        match self.iter.last() {
            Some(t) if matchers::close_brace(t) => return Ok(()),
            Some(t) if matchers::open_brace(t) => depth = 1,
            _ => {}
        }
        loop {
            let tk = self.iter.next()?;
            if matchers::open_brace(tk) {
                depth += 1;
            } else if matchers::close_brace(tk) {
                if depth <= 1 {
                    return Ok(());
                }
                depth -= 1;
            }
        }
    }

    /// Comma separated selectors; on success the last token is `{`.
    fn selectors(&mut self, first: &'a Token) -> GrammarResult<Option<Vec<Selector>>> {
        let mut selectors = Vec::new();
        let mut start = first;
        loop {
            let location = start.location.clone();
            let mut components = Vec::new();
            let at_block = loop {
                let Some(seq) =
                    builders::simple_selector_sequence(start, &mut self.iter, &mut self.rep)?
                else {
                    return Ok(None);
                };
                components.push(Construct::SimpleSelectorSequence(seq));

                let spaced = self.iter.whitespace_follows_last();
                let next = self.iter.next()?;
                if matchers::open_brace(next) {
                    break true;
                }
                if matchers::comma(next) {
                    break false;
                }
                if let Some(kind) = next.as_char().and_then(CombinatorKind::from_char) {
                    components.push(Construct::Combinator(Combinator {
                        kind,
                        location: next.location.clone(),
                    }));
                    start = self.iter.next()?;
                } else if spaced {
                    components.push(Construct::Combinator(Combinator {
                        kind: CombinatorKind::Descendant,
                        location: next.location.clone(),
                    }));
                    start = next;
                } else {
                    self.rep.unexpected(next)?;
                    return Ok(None);
                }
            };

            let selector = Selector {
                components,
                location,
            };
            if !self.check_pseudo_elements(&selector)? {
                return Ok(None);
            }
            selectors.push(selector);
            if at_block {
                return Ok(Some(selectors));
            }
            start = self.iter.next()?;
        }
    }

    /// At most one pseudo-element, and only in the last sequence.
    fn check_pseudo_elements(&mut self, selector: &Selector) -> GrammarResult<bool> {
        let last = selector.sequences().count().saturating_sub(1);
        let mut count = 0;
        let mut misplaced = false;
        for (i, seq) in selector.sequences().enumerate() {
            let elements = seq
                .components
                .iter()
                .filter(|c| matches!(c, Construct::Pseudo(p) if p.kind == PseudoKind::Element))
                .count();
            count += elements;
            misplaced |= elements > 0 && i < last;
        }
        let problem = if count > 1 {
            Phrase::MultiplePseudoElements
        } else if misplaced {
            Phrase::MisplacedPseudoElement
        } else {
            return Ok(true);
        };
        let reason = self.rep.phrase(problem).to_string();
        self.rep.report(
            CssErrorCode::GrammarInvalidSelector,
            selector.location.clone(),
            vec![selector.to_string(), reason],
            None,
        )?;
        Ok(false)
    }

    /// Declarations up to and including the closing `}`.
    fn declaration_block(&mut self, start: &'a Token) -> GrammarResult<()> {
        let result = self.declarations(start);
        let expecting = self.either("';'", "'}'");
        self.close(result, expecting)
    }

    fn declarations(&mut self, mut start: &'a Token) -> GrammarResult<()> {
        loop {
            if matchers::close_brace(start) {
                return Ok(());
            }
            match self.declaration(start, false)? {
                Some(decl) => {
                    self.doc.declaration(decl);
                    if self.iter.last().is_some_and(matchers::close_brace) {
                        return Ok(());
                    }
                    // ";}" ends the block as well
                    if self.iter.peek().is_ok_and(matchers::close_brace) {
                        self.iter.next()?;
                        return Ok(());
                    }
                    start = self.iter.next()?;
                }
                None => {
                    start = match self.iter.last() {
                        Some(t) if matchers::semi_or_close_brace(t) => t,
                        _ => self.skip_declaration()?,
                    };
                    if matchers::semi(start) {
                        start = self.iter.next()?;
                    }
                }
            }
        }
    }

    /// Skip to the `;` or `}` ending a rejected declaration, stepping over nested blocks.
    fn skip_declaration(&mut self) -> GrammarResult<&'a Token> {
        let mut depth = usize::from(self.iter.last().is_some_and(matchers::open_brace));
        loop {
            let tk = self.iter.next()?;
            if matchers::open_brace(tk) {
                depth += 1;
            } else if matchers::close_brace(tk) {
                if depth == 0 {
                    return Ok(tk);
                }
                depth -= 1;
            } else if matchers::semi(tk) && depth == 0 {
                return Ok(tk);
            }
        }
    }

    /// Open functions and groups between raw index `begin` and the last returned token.
    fn nesting_since(&self, begin: usize) -> usize {
        let end = self.iter.index().unwrap_or(begin);
        (begin..end)
            .filter_map(|i| self.iter.get(i))
            .fold(0, |depth, t| nesting_step(depth, t))
    }

    /// Skip a rejected declaration from inside `depth` open functions or
    /// groups, stopping at a `;` back at depth 0 or at any `}`.
    fn skip_nested(&mut self, mut depth: usize) -> GrammarResult<()> {
        loop {
            let tk = self.iter.next()?;
            if matchers::close_brace(tk) {
                return Ok(());
            }
            depth = nesting_step(depth, tk);
            if depth == 0 && matchers::semi(tk) {
                return Ok(());
            }
        }
    }

    /// `name : value+ [!important]`, ending at `;` or `}` (or end of input in
    /// a style attribute). Returns `None` after reporting an error.
    fn declaration(&mut self, name: &'a Token, is_style: bool) -> GrammarResult<Option<Declaration>> {
        let begin = self.iter.index().unwrap_or(0);
        if name.kind != TokenType::Ident {
            let expected = self.rep.phrase(Phrase::PropertyName);
            self.rep.expecting(name, expected)?;
            return Ok(None);
        }

        let colon = match self.iter.next() {
            Ok(tk) => tk,
            Err(_) => return Err(self.premature_eof("':'".to_string())),
        };
        if !matchers::colon(colon) {
            self.rep.expecting(colon, "':'")?;
            return Ok(None);
        }

        let mut decl = Declaration {
            name: name.text.to_ascii_lowercase(),
            components: Vec::new(),
            important: false,
            location: name.location.clone(),
        };
        loop {
            let value = self.iter.next()?;
            if matchers::semi_or_close_brace(value) {
                if decl.components.is_empty() {
                    let expected = self.rep.phrase(Phrase::PropertyValue);
                    self.rep.expecting(value, expected)?;
                    return Ok(None);
                }
                return Ok(Some(decl));
            }
            if !self.property_value(&mut decl, value, is_style)? {
                let last = self.iter.last().unwrap_or(value);
                self.rep.unexpected(last)?;
                if matchers::semi(last) {
                    let depth = self.nesting_since(begin);
                    if depth > 0 {
                        self.skip_nested(depth)?;
                    }
                }
                return Ok(None);
            }
            if is_style && !self.iter.has_next() {
                return Ok(Some(decl));
            }
        }
    }

    /// Append value constructs until the next token ends the declaration.
    /// Returns `false` with the offending token last returned.
    fn property_value(
        &mut self,
        decl: &mut Declaration,
        mut start: &'a Token,
        is_style: bool,
    ) -> GrammarResult<bool> {
        loop {
            if start.kind == TokenType::Important {
                decl.important = true;
            } else {
                match builders::create(
                    start,
                    &mut self.iter,
                    matchers::semi_or_close_brace,
                    permitted::property_value,
                )? {
                    Some(cc) => decl.components.push(cc),
                    None => return Ok(false),
                }
            }

            let done = if is_style && !self.iter.has_next() {
                true
            } else {
                match self.iter.peek() {
                    Ok(t) => matchers::semi(t) || (!is_style && matchers::close_brace(t)),
                    Err(_) => false,
                }
            };
            if done {
                return Ok(!decl.components.is_empty());
            }
            start = self.iter.next()?;
        }
    }

    fn at_rule(&mut self, start: &'a Token) -> GrammarResult<()> {
        let mut rule = AtRule {
            name: start.text.to_ascii_lowercase(),
            components: Vec::new(),
            has_block: false,
            location: start.location.clone(),
        };

        loop {
            let Ok(tk) = self.iter.next() else {
                return Err(self.unterminated_at_rule(rule));
            };
            if matchers::semi_or_open_brace(tk) {
                rule.has_block = matchers::open_brace(tk);
                break;
            }
            match builders::create(
                tk,
                &mut self.iter,
                matchers::semi_or_open_brace,
                permitted::at_rule_param,
            ) {
                Ok(Some(param)) => rule.components.push(param),
                Ok(None) => {
                    let last = self.iter.last().unwrap_or(tk);
                    self.rep.unexpected(last)?;
                    return self.skip_at_rule();
                }
                Err(_) => return Err(self.unterminated_at_rule(rule)),
            }
        }

        let name = rule.name.clone();
        let has_block = rule.has_block;
        self.doc.start_at_rule(rule);
        if !has_block {
            self.doc.end_at_rule(&name);
            return Ok(());
        }
        let result = self.at_rule_block();
        let result = self.close(result, "'}'".to_string());
        if !matches!(result, Err(Interrupt::Aborted(_))) {
            self.doc.end_at_rule(&name);
        }
        result
    }

    /// Input ended among the parameters; the rule is still opened and closed.
    fn unterminated_at_rule(&mut self, rule: AtRule) -> Interrupt {
        let name = rule.name.clone();
        self.doc.start_at_rule(rule);
        let expecting = self.either("';'", "'{'");
        let interrupt = self.premature_eof(expecting);
        if !matches!(interrupt, Interrupt::Aborted(_)) {
            self.doc.end_at_rule(&name);
        }
        interrupt
    }

    /// Skip a rejected at-rule: to a `;` at depth zero or past its block.
    fn skip_at_rule(&mut self) -> GrammarResult<()> {
        if self.iter.last().is_some_and(matchers::close_brace) {
            return Ok(());
        }
        let mut depth = 0usize;
        loop {
            let Ok(tk) = self.iter.next() else {
                let expecting = if depth == 0 {
                    self.either("';'", "'{'")
                } else {
                    "'}'".to_string()
                };
                return Err(self.premature_eof(expecting));
            };
            if matchers::semi(tk) && depth == 0 {
                return Ok(());
            } else if matchers::open_brace(tk) {
                depth += 1;
            } else if matchers::close_brace(tk) {
                if depth <= 1 {
                    return Ok(());
                }
                depth -= 1;
            }
        }
    }

    fn at_rule_block(&mut self) -> GrammarResult<()> {
        if !self.has_rule_set() {
            let first = self.iter.next()?;
            return self.declaration_block(first);
        }
        loop {
            let tk = self.iter.next()?;
            if matchers::close_brace(tk) {
                return Ok(());
            }
            if tk.kind == TokenType::AtKeyword {
                self.at_rule(tk)?;
            } else {
                self.rule_set(tk)?;
            }
        }
    }

    /// With `{` last returned: does the block hold rule sets, i.e. does
    /// another `{` come before the next `;` or `}`?
    fn has_rule_set(&self) -> bool {
        let Some(idx) = self.iter.index() else {
            return false;
        };
        let mut i = idx + 1;
        while let Some(tk) = self.iter.get(i) {
            if matchers::open_brace(tk) {
                return true;
            }
            if matchers::semi_or_close_brace(tk) {
                return false;
            }
            i += 1;
        }
        false
    }
}

fn nesting_step(depth: usize, t: &Token) -> usize {
    if t.kind == TokenType::Function || matchers::open_paren(t) || matchers::open_square(t) {
        depth + 1
    } else if matchers::close_paren(t) || matchers::close_square(t) {
        depth.saturating_sub(1)
    } else {
        depth
    }
}
