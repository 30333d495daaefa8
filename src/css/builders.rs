//! Token-to-construct builders.
//!
//! [`create`] is the table-driven factory for value-like constructs. It never
//! reports errors: a `None` result means "cannot build here" and the caller
//! decides what to report and how far to skip. The selector builders are
//! crate-private and report their own errors through a [`Reporter`].

extern crate alloc;

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use super::grammar::{
    Atom, AttributeMatch, AttributeSelector, Construct, Function, GroupKind, PseudoKind,
    PseudoSelector, Quantity, ScopedGroup, SimpleSelectorSequence, Uri,
};
use super::handler::ErrorHandler;
use super::location::Location;
use super::messages::{Locale, Phrase};
use super::token::{matchers, MatchOperator, QuantityUnit, Token, TokenMatcher, TokenType};
use super::tokens::{filters, NoMoreTokens, TokenIter};
use crate::error::{CssErrorCode, CssException};

/// Predicate deciding which constructs a grammatical context accepts.
pub type Permitted = fn(&Construct) -> bool;

/// Stock grammatical contexts.
pub mod permitted {
    use super::{Construct, PseudoKind};

    /// Function arguments: anything but an at-rule.
    pub fn function(c: &Construct) -> bool {
        !matches!(c, Construct::AtRule(_))
    }

    /// Property values: anything but an at-rule.
    pub fn property_value(c: &Construct) -> bool {
        !matches!(c, Construct::AtRule(_))
    }

    /// At-rule parameters accept everything, symbols included.
    pub fn at_rule_param(_: &Construct) -> bool {
        true
    }

    /// Value of `[attr=value]`.
    pub fn attribute_selector_value(c: &Construct) -> bool {
        matches!(c, Construct::Keyword(_) | Construct::String(_))
    }

    /// Arguments of a functional pseudo-class such as `:nth-child(2n+1)`.
    pub fn pseudo_functional(c: &Construct) -> bool {
        match c {
            Construct::Keyword(_) | Construct::String(_) | Construct::Quantity(_) => true,
            Construct::Symbol(_) => c.is_symbol('+') || c.is_symbol('-'),
            _ => false,
        }
    }

    /// Argument of `:not(...)`.
    pub fn pseudo_negation(c: &Construct) -> bool {
        match c {
            Construct::TypeSelector(_)
            | Construct::HashName(_)
            | Construct::ClassName(_)
            | Construct::AttributeSelector(_) => true,
            Construct::Pseudo(p) => p.kind == PseudoKind::Class && !p.is_negation(),
            _ => false,
        }
    }
}

type BuildResult = Result<Option<Construct>, NoMoreTokens>;

type BuildFn =
    for<'a, 'b> fn(&'a Token, &'b mut TokenIter<'a>, TokenMatcher, Permitted) -> BuildResult;

fn builder_for(kind: TokenType) -> Option<BuildFn> {
    match kind {
        TokenType::Function => Some(build_function),
        TokenType::Char => Some(build_char),
        TokenType::Ident
        | TokenType::And
        | TokenType::Not
        | TokenType::Only
        | TokenType::Uri
        | TokenType::String
        | TokenType::URange
        | TokenType::HashName
        | TokenType::ClassName => Some(build_atomic),
        TokenType::Quantity(_) | TokenType::Number | TokenType::Integer => Some(build_quantity),
        _ => None,
    }
}

/// Build the construct starting at `start`.
///
/// Composed constructs consume tokens from `iter` up to their closing token
/// and fail if `limit` matches first. Returns `Ok(None)` when no construct
/// can be built or the result is not `permitted`; `Err` when input runs out.
pub fn create<'a>(
    start: &'a Token,
    iter: &mut TokenIter<'a>,
    limit: TokenMatcher,
    permitted: Permitted,
) -> BuildResult {
    match builder_for(start.kind) {
        Some(build) => build(start, iter, limit, permitted),
        None => Ok(None),
    }
}

fn accept(construct: Construct, permitted: Permitted) -> BuildResult {
    Ok(permitted(&construct).then_some(construct))
}

fn function_name(token: &Token) -> String {
    token
        .text
        .strip_suffix('(')
        .unwrap_or(&token.text)
        .to_ascii_lowercase()
}

/// Collect members until `end`, building each in the function context.
fn collect_until<'a>(
    iter: &mut TokenIter<'a>,
    end: TokenMatcher,
    limit: TokenMatcher,
    permitted: Permitted,
) -> Result<Option<Vec<Construct>>, NoMoreTokens> {
    let mut components = Vec::new();
    loop {
        let tk = iter.next()?;
        if end(tk) {
            return Ok(Some(components));
        }
        if limit(tk) {
            return Ok(None);
        }
        match create(tk, iter, limit, permitted::function)? {
            Some(cc) if permitted(&cc) => components.push(cc),
            _ => return Ok(None),
        }
    }
}

fn build_function<'a>(
    start: &'a Token,
    iter: &mut TokenIter<'a>,
    limit: TokenMatcher,
    permitted: Permitted,
) -> BuildResult {
    let Some(components) = collect_until(iter, matchers::close_paren, limit, permitted)? else {
        return Ok(None);
    };
    accept(
        Construct::Function(Function {
            name: function_name(start),
            components,
            location: start.location.clone(),
        }),
        permitted,
    )
}

fn build_char<'a>(
    start: &'a Token,
    iter: &mut TokenIter<'a>,
    limit: TokenMatcher,
    permitted: Permitted,
) -> BuildResult {
    let (kind, end): (GroupKind, TokenMatcher) = match start.as_char() {
        Some('{' | '}' | ';') | None => return Ok(None),
        Some('(') => (GroupKind::Paren, matchers::close_paren),
        Some('[') => (GroupKind::Bracket, matchers::close_square),
        Some(_) => {
            return accept(
                Construct::Symbol(Atom::new(start.text.clone(), start.location.clone())),
                permitted,
            )
        }
    };
    let Some(components) = collect_until(iter, end, limit, permitted)? else {
        return Ok(None);
    };
    accept(
        Construct::ScopedGroup(ScopedGroup {
            kind,
            components,
            location: start.location.clone(),
        }),
        permitted,
    )
}

fn build_atomic<'a>(
    start: &'a Token,
    _iter: &mut TokenIter<'a>,
    _limit: TokenMatcher,
    permitted: Permitted,
) -> BuildResult {
    let atom = || Atom::new(start.text.clone(), start.location.clone());
    let construct = match start.kind {
        TokenType::Ident | TokenType::And | TokenType::Not | TokenType::Only => {
            Construct::Keyword(atom())
        }
        TokenType::Uri => Construct::Uri(Uri {
            value: start.text.clone(),
            location: start.location.clone(),
        }),
        TokenType::String => Construct::String(atom()),
        TokenType::URange => Construct::UnicodeRange(atom()),
        TokenType::HashName => Construct::HashName(atom()),
        TokenType::ClassName => Construct::ClassName(atom()),
        _ => return Ok(None),
    };
    accept(construct, permitted)
}

fn quantity(start: &Token) -> Option<Quantity> {
    let unit = match start.kind {
        TokenType::Quantity(unit) => unit,
        TokenType::Number => QuantityUnit::Number,
        TokenType::Integer => QuantityUnit::Integer,
        _ => return None,
    };
    Some(Quantity {
        value: start.text.clone(),
        unit,
        location: start.location.clone(),
    })
}

fn build_quantity<'a>(
    start: &'a Token,
    _iter: &mut TokenIter<'a>,
    _limit: TokenMatcher,
    permitted: Permitted,
) -> BuildResult {
    match quantity(start) {
        Some(q) => accept(Construct::Quantity(q), permitted),
        None => Ok(None),
    }
}

/// Why a grammar routine stopped early.
#[derive(Debug)]
pub(crate) enum Interrupt {
    /// Input ran out; not yet reported.
    Exhausted,
    /// Input ran out and premature end of file has been reported.
    PrematureEof,
    /// The error handler aborted the parse.
    Aborted(CssException),
}

impl From<NoMoreTokens> for Interrupt {
    fn from(_: NoMoreTokens) -> Self {
        Interrupt::Exhausted
    }
}

impl From<CssException> for Interrupt {
    fn from(err: CssException) -> Self {
        Interrupt::Aborted(err)
    }
}

/// Sends grammar errors to the error handler in the parser's locale.
pub(crate) struct Reporter<'h> {
    handler: &'h mut dyn ErrorHandler,
    locale: Locale,
}

impl<'h> Reporter<'h> {
    pub(crate) fn new(handler: &'h mut dyn ErrorHandler, locale: Locale) -> Self {
        Self { handler, locale }
    }

    pub(crate) fn locale(&self) -> Locale {
        self.locale
    }

    pub(crate) fn phrase(&self, phrase: Phrase) -> &'static str {
        phrase.text(self.locale)
    }

    pub(crate) fn report(
        &mut self,
        code: CssErrorCode,
        location: Location,
        arguments: Vec<String>,
        token: Option<&Token>,
    ) -> Result<(), CssException> {
        let mut err = CssException::new(code, location, arguments, self.locale);
        if let Some(token) = token {
            err = err.with_token(token.clone());
        }
        self.handler.error(err)
    }

    pub(crate) fn unexpected(&mut self, token: &Token) -> Result<(), CssException> {
        self.report(
            CssErrorCode::GrammarUnexpectedToken,
            token.location.clone(),
            vec![token.text.clone()],
            Some(token),
        )
    }

    pub(crate) fn expecting(&mut self, token: &Token, what: &str) -> Result<(), CssException> {
        self.report(
            CssErrorCode::GrammarExpectingToken,
            token.location.clone(),
            vec![token.text.clone(), String::from(what)],
            Some(token),
        )
    }

    pub(crate) fn premature_eof(
        &mut self,
        location: Location,
        expecting: String,
    ) -> Result<(), CssException> {
        self.report(
            CssErrorCode::GrammarPrematureEof,
            location,
            vec![expecting],
            None,
        )
    }
}

type SelectorResult<T> = Result<Option<T>, Interrupt>;

/// Build a simple selector sequence starting at `start`.
///
/// Stops before whitespace, a comment, `,`, `{` or a combinator character.
pub(crate) fn simple_selector_sequence<'a>(
    start: &'a Token,
    iter: &mut TokenIter<'a>,
    rep: &mut Reporter<'_>,
) -> SelectorResult<SimpleSelectorSequence> {
    let Some(first) = simple_selector(start, iter, rep)? else {
        return Ok(None);
    };
    let mut components = vec![first];
    loop {
        let next = iter.peek_with(filters::none)?;
        if matches!(next.kind, TokenType::S | TokenType::Comment)
            || matchers::comma_or_open_brace(next)
            || matchers::combinator_char(next)
        {
            break;
        }
        let tk = iter.next_with(filters::none)?;
        match simple_selector(tk, iter, rep)? {
            Some(Construct::TypeSelector(_)) => {
                rep.unexpected(tk)?;
                return Ok(None);
            }
            Some(item) => components.push(item),
            None => return Ok(None),
        }
    }
    Ok(Some(SimpleSelectorSequence {
        components,
        location: start.location.clone(),
    }))
}

fn simple_selector<'a>(
    start: &'a Token,
    iter: &mut TokenIter<'a>,
    rep: &mut Reporter<'_>,
) -> SelectorResult<Construct> {
    let atom = || Atom::new(start.text.clone(), start.location.clone());
    match start.kind {
        TokenType::Ident => Ok(type_selector(start, iter, rep)?.map(Construct::TypeSelector)),
        TokenType::Char if matchers::star_or_pipe(start) => {
            Ok(type_selector(start, iter, rep)?.map(Construct::TypeSelector))
        }
        TokenType::HashName => Ok(Some(Construct::HashName(atom()))),
        TokenType::ClassName => Ok(Some(Construct::ClassName(atom()))),
        TokenType::Char if start.is_char('[') => {
            let first = iter.next()?;
            Ok(attribute_selector(start, first, iter, rep)?.map(Construct::AttributeSelector))
        }
        TokenType::Char if start.is_char(':') => {
            Ok(pseudo_selector(start, iter, rep)?.map(Construct::Pseudo))
        }
        // keyframe selectors
        TokenType::Quantity(QuantityUnit::Percentage) => Ok(quantity(start).map(Construct::Quantity)),
        _ => {
            rep.unexpected(start)?;
            Ok(None)
        }
    }
}

/// `ns|E`, `*|E`, `|E`, `E` or `*`.
fn type_selector<'a>(
    start: &'a Token,
    iter: &mut TokenIter<'a>,
    rep: &mut Reporter<'_>,
) -> SelectorResult<Atom> {
    let expected = rep.phrase(Phrase::TypeOrUniversalSelector);
    if start.kind != TokenType::Ident && !matchers::star_or_pipe(start) {
        rep.expecting(start, expected)?;
        return Ok(None);
    }
    let mut name = start.text.clone();
    if start.is_char('|') {
        let next = iter.peek_with(filters::none)?;
        if next.kind != TokenType::Ident {
            rep.expecting(next, expected)?;
            return Ok(None);
        }
        name.push_str(&iter.next_with(filters::none)?.text);
    } else if matches!(iter.peek_with(filters::none), Ok(t) if matchers::pipe(t)) {
        name.push('|');
        iter.next_with(filters::none)?;
        let next = iter.next_with(filters::none)?;
        if next.kind != TokenType::Ident && !next.is_char('*') {
            rep.expecting(next, expected)?;
            return Ok(None);
        }
        name.push_str(&next.text);
    }
    Ok(Some(Atom::new(name, start.location.clone())))
}

/// `[` type-selector ( `]` | match-operator value `]` ).
fn attribute_selector<'a>(
    open: &'a Token,
    start: &'a Token,
    iter: &mut TokenIter<'a>,
    rep: &mut Reporter<'_>,
) -> SelectorResult<AttributeSelector> {
    let Some(name) = type_selector(start, iter, rep)? else {
        return Ok(None);
    };
    let mut components = vec![Construct::TypeSelector(name)];

    let next = iter.next()?;
    if !matchers::close_square(next) {
        let Some(operator) = MatchOperator::from_token(next) else {
            rep.expecting(next, rep.phrase(Phrase::AttributeValueMatcher))?;
            return Ok(None);
        };
        components.push(Construct::AttributeMatch(AttributeMatch {
            operator,
            location: next.location.clone(),
        }));

        let value = iter.next()?;
        match create(
            value,
            iter,
            matchers::close_square,
            permitted::attribute_selector_value,
        )? {
            Some(v) => components.push(v),
            None => {
                rep.expecting(value, rep.phrase(Phrase::StringOrIdentifier))?;
                return Ok(None);
            }
        }

        let close = iter.next()?;
        if !matchers::close_square(close) {
            rep.expecting(close, "']'")?;
            return Ok(None);
        }
    }
    Ok(Some(AttributeSelector {
        components,
        location: open.location.clone(),
    }))
}

enum PseudoArgs {
    Built(Vec<Construct>),
    /// Not buildable; the caller reports.
    Rejected,
    /// Not buildable; an error has already been reported.
    Reported,
}

/// `:name`, `::name`, `:name(args)` or `:not(selector)`.
fn pseudo_selector<'a>(
    colon: &'a Token,
    iter: &mut TokenIter<'a>,
    rep: &mut Reporter<'_>,
) -> SelectorResult<PseudoSelector> {
    let mut name = String::from(":");
    let mut next = iter.next_with(filters::none)?;
    let kind = if matchers::colon(next) {
        name.push(':');
        next = iter.next_with(filters::none)?;
        PseudoKind::Element
    } else {
        PseudoKind::Class
    };

    let arguments = match next.kind {
        TokenType::Ident => {
            name.push_str(&next.text);
            None
        }
        TokenType::Function => {
            let fname = function_name(next);
            let args = if fname == "not" {
                negation_args(iter, rep)?
            } else {
                functional_args(iter)?
            };
            name.push_str(&fname);
            match args {
                PseudoArgs::Built(args) => Some(args),
                PseudoArgs::Rejected => {
                    let last = iter.last().unwrap_or(next);
                    rep.unexpected(last)?;
                    return Ok(None);
                }
                PseudoArgs::Reported => return Ok(None),
            }
        }
        _ => {
            rep.unexpected(next)?;
            return Ok(None);
        }
    };

    Ok(Some(PseudoSelector {
        kind,
        name,
        arguments,
        location: colon.location.clone(),
    }))
}

fn functional_args(iter: &mut TokenIter<'_>) -> Result<PseudoArgs, Interrupt> {
    let mut args = Vec::new();
    loop {
        let tk = iter.next()?;
        if matchers::close_paren(tk) {
            return Ok(PseudoArgs::Built(args));
        }
        if matchers::open_brace(tk) {
            return Ok(PseudoArgs::Rejected);
        }
        match create(tk, iter, matchers::open_brace, permitted::pseudo_functional)? {
            Some(cc) => args.push(cc),
            None => return Ok(PseudoArgs::Rejected),
        }
    }
}

fn negation_args(iter: &mut TokenIter<'_>, rep: &mut Reporter<'_>) -> Result<PseudoArgs, Interrupt> {
    let tk = iter.next()?;
    let Some(inner) = simple_selector(tk, iter, rep)? else {
        return Ok(PseudoArgs::Reported);
    };
    if !permitted::pseudo_negation(&inner) {
        return Ok(PseudoArgs::Rejected);
    }
    if !matchers::close_paren(iter.next()?) {
        return Ok(PseudoArgs::Rejected);
    }
    Ok(PseudoArgs::Built(vec![inner]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::css::scanner::scan;
    use alloc::string::ToString;

    fn tokens(text: &str) -> Vec<Token> {
        let mut errors: Vec<CssException> = Vec::new();
        scan(text, "t.css", &mut errors).unwrap()
    }

    fn build(text: &str, permitted: Permitted) -> Option<Construct> {
        let toks = tokens(text);
        let mut iter = TokenIter::new(&toks, filters::skip_whitespace_and_comments);
        let start = iter.next().unwrap();
        create(start, &mut iter, matchers::semi_or_close_brace, permitted).unwrap()
    }

    fn sequence(text: &str) -> (Option<SimpleSelectorSequence>, Vec<CssException>) {
        let toks = tokens(text);
        let mut errors: Vec<CssException> = Vec::new();
        let seq = {
            let mut rep = Reporter::new(&mut errors, Locale::English);
            let mut iter = TokenIter::new(&toks, filters::skip_whitespace_and_comments);
            let start = iter.next().unwrap();
            match simple_selector_sequence(start, &mut iter, &mut rep) {
                Ok(seq) => seq,
                Err(_) => None,
            }
        };
        (seq, errors)
    }

    #[test]
    fn test_function_with_arguments() {
        let built = build("RGB(1, 2, 3)", permitted::property_value).unwrap();
        let Construct::Function(f) = &built else {
            panic!("expected function, got {:?}", built);
        };
        assert_eq!(f.name, "rgb");
        assert_eq!(f.components.len(), 5);
        assert!(f.components[1].is_symbol(','));
        assert_eq!(built.to_css_string(), "rgb(1 , 2 , 3)");
    }

    #[test]
    fn test_function_fails_at_limit() {
        assert_eq!(build("attr(title; x)", permitted::property_value), None);
    }

    #[test]
    fn test_braces_and_at_keywords_do_not_build() {
        assert_eq!(build("{", permitted::property_value), None);
        assert_eq!(build("@media", permitted::at_rule_param), None);
    }

    #[test]
    fn test_scoped_group() {
        let built = build("(min-width:10px)", permitted::at_rule_param).unwrap();
        let Construct::ScopedGroup(g) = &built else {
            panic!("expected group, got {:?}", built);
        };
        assert_eq!(g.kind, GroupKind::Paren);
        assert!(g.components[0].is_keyword("min-width"));
        assert!(g.components[1].is_symbol(':'));
        assert!(matches!(
            &g.components[2],
            Construct::Quantity(q) if q.unit == QuantityUnit::Length && q.value == "10px"
        ));
    }

    #[test]
    fn test_context_restrictions() {
        assert!(build("foo", permitted::attribute_selector_value).is_some());
        assert!(build("12px", permitted::attribute_selector_value).is_none());
        assert!(build("+", permitted::pseudo_functional).is_some());
        assert!(build("*", permitted::pseudo_functional).is_none());
        assert!(build("url(a.png)", permitted::property_value).is_some());
    }

    #[test]
    fn test_sequence_with_type_class_and_pseudo() {
        let (seq, errors) = sequence("p.note:first-child ");
        assert!(errors.is_empty(), "{:?}", errors);
        let seq = seq.unwrap();
        assert_eq!(seq.components.len(), 3);
        assert_eq!(
            Construct::SimpleSelectorSequence(seq).to_css_string(),
            "p.note:first-child"
        );
    }

    #[test]
    fn test_namespaced_type_selectors() {
        for text in ["svg|rect{", "*|*{", "|p{"] {
            let (seq, errors) = sequence(text);
            assert!(errors.is_empty(), "{}: {:?}", text, errors);
            let css = Construct::SimpleSelectorSequence(seq.unwrap()).to_css_string();
            assert_eq!(css, text.trim_end_matches('{'));
        }
    }

    #[test]
    fn test_attribute_selectors() {
        let (seq, errors) = sequence("a[href^='http']{");
        assert!(errors.is_empty(), "{:?}", errors);
        let seq = seq.unwrap();
        let Construct::AttributeSelector(attr) = &seq.components[1] else {
            panic!("expected attribute selector");
        };
        assert!(matches!(
            &attr.components[1],
            Construct::AttributeMatch(m) if m.operator == MatchOperator::PrefixMatch
        ));
        assert_eq!(seq.components[1].to_css_string(), "[href^='http']");

        let (seq, errors) = sequence("[lang]{");
        assert!(errors.is_empty());
        assert_eq!(seq.unwrap().components.len(), 1);
    }

    #[test]
    fn test_attribute_selector_errors() {
        let (seq, errors) = sequence("[a=12px]{");
        assert!(seq.is_none());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, CssErrorCode::GrammarExpectingToken);
        assert_eq!(errors[0].arguments[1], "a string or identifier");

        let (_, errors) = sequence("[a b]{");
        assert_eq!(errors[0].arguments[1], "an attribute value matcher");

        let (_, errors) = sequence("[a=b c]{");
        assert_eq!(errors[0].arguments, vec!["c".to_string(), "']'".to_string()]);
    }

    #[test]
    fn test_pseudo_forms() {
        let (seq, _) = sequence("li:nth-child(2n+1){");
        let seq = seq.unwrap();
        let Construct::Pseudo(p) = &seq.components[1] else {
            panic!("expected pseudo");
        };
        assert_eq!(p.kind, PseudoKind::Class);
        assert_eq!(p.name, ":nth-child");
        assert_eq!(seq.components[1].to_css_string(), ":nth-child(2n+1)");

        let (seq, _) = sequence("p::first-line{");
        let seq = seq.unwrap();
        assert!(matches!(
            &seq.components[1],
            Construct::Pseudo(p) if p.kind == PseudoKind::Element && p.name == "::first-line"
        ));
    }

    #[test]
    fn test_negation() {
        let (seq, errors) = sequence("p:not(.a){");
        assert!(errors.is_empty());
        let seq = seq.unwrap();
        assert!(matches!(&seq.components[1], Construct::Pseudo(p) if p.is_negation()));
        assert_eq!(seq.components[1].to_css_string(), ":not(.a)");

        let (seq, errors) = sequence("p:not(:not(a)){");
        assert!(seq.is_none());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, CssErrorCode::GrammarUnexpectedToken);
    }

    #[test]
    fn test_keyframe_percentage() {
        let (seq, errors) = sequence("50%{");
        assert!(errors.is_empty());
        assert!(matches!(
            &seq.unwrap().components[0],
            Construct::Quantity(q) if q.unit == QuantityUnit::Percentage
        ));
    }

    #[test]
    fn test_unexpected_start_token() {
        let (seq, errors) = sequence("){");
        assert!(seq.is_none());
        assert_eq!(errors[0].code, CssErrorCode::GrammarUnexpectedToken);
        assert_eq!(errors[0].arguments, vec![")".to_string()]);
    }
}
