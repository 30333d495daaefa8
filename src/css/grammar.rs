//! Parsed CSS constructs.
//!
//! Atomic constructs wrap a single token; composed constructs own an ordered
//! list of children. Everything here is handed to a
//! [`ContentHandler`](super::handler::ContentHandler) by value.

extern crate alloc;

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use super::escape::is_whitespace;
use super::location::Location;
use super::token::{chars, MatchOperator, QuantityUnit};

/// Value of an atomic construct and where it was found.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Atom {
    /// Token text, normalized by the scanner.
    pub value: String,
    /// Location of the originating token.
    pub location: Location,
}

impl Atom {
    /// Create an atom.
    pub fn new(value: impl Into<String>, location: Location) -> Self {
        Self {
            value: value.into(),
            location,
        }
    }
}

/// A `url(...)` reference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Uri {
    /// Full token text, `url(...)` included.
    pub value: String,
    /// Location of the originating token.
    pub location: Location,
}

impl Uri {
    /// The bare URL: `url(`, `)`, quotes and surrounding whitespace removed.
    pub fn uri(&self) -> &str {
        let inner = self
            .value
            .get(4..self.value.len().saturating_sub(1))
            .unwrap_or("");
        inner.trim_matches(|c: char| chars::quote(c) || is_whitespace(c))
    }
}

/// A number with its unit class.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Quantity {
    /// Number text including the (canonical) unit suffix.
    pub value: String,
    /// Unit class.
    pub unit: QuantityUnit,
    /// Location of the originating token.
    pub location: Location,
}

/// Selector combinator kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum CombinatorKind {
    /// Whitespace.
    Descendant,
    /// `>`
    Child,
    /// `+`
    Adjacent,
    /// `~`
    General,
}

impl CombinatorKind {
    /// Kind for a combinator character.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '>' => Some(CombinatorKind::Child),
            '+' => Some(CombinatorKind::Adjacent),
            '~' => Some(CombinatorKind::General),
            _ => None,
        }
    }

    /// CSS spelling, a single space for descendant.
    pub fn as_str(self) -> &'static str {
        match self {
            CombinatorKind::Descendant => " ",
            CombinatorKind::Child => ">",
            CombinatorKind::Adjacent => "+",
            CombinatorKind::General => "~",
        }
    }
}

/// A combinator between two simple selector sequences.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Combinator {
    /// Kind.
    pub kind: CombinatorKind,
    /// Location of the combinator token.
    pub location: Location,
}

/// An attribute selector match operator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributeMatch {
    /// Operator.
    pub operator: MatchOperator,
    /// Location of the operator token.
    pub location: Location,
}

/// A function call: `name(args)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Function {
    /// Lowercase function name without the parenthesis.
    pub name: String,
    /// Arguments in source order, separators included as symbols.
    pub components: Vec<Construct>,
    /// Location of the function token.
    pub location: Location,
}

/// Delimiter of a [`ScopedGroup`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GroupKind {
    /// `( ... )`
    Paren,
    /// `[ ... ]`
    Bracket,
}

/// A parenthesized or bracketed group outside a selector.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScopedGroup {
    /// Delimiter.
    pub kind: GroupKind,
    /// Members in source order.
    pub components: Vec<Construct>,
    /// Location of the opening delimiter.
    pub location: Location,
}

/// A property declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Declaration {
    /// Lowercase property name.
    pub name: String,
    /// Value constructs, at least one.
    pub components: Vec<Construct>,
    /// `!important` was present.
    pub important: bool,
    /// Location of the property name.
    pub location: Location,
}

/// An at-rule header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AtRule {
    /// Lowercase name including `@`.
    pub name: String,
    /// Parameters before `;` or `{`.
    pub components: Vec<Construct>,
    /// The rule has a `{ ... }` block.
    pub has_block: bool,
    /// Location of the at-keyword.
    pub location: Location,
}

/// A complex selector: simple selector sequences joined by combinators.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selector {
    /// Alternating [`Construct::SimpleSelectorSequence`] and [`Construct::Combinator`].
    pub components: Vec<Construct>,
    /// Location of the first token.
    pub location: Location,
}

impl Selector {
    /// The simple selector sequences, in order.
    pub fn sequences(&self) -> impl Iterator<Item = &SimpleSelectorSequence> {
        self.components.iter().filter_map(|c| match c {
            Construct::SimpleSelectorSequence(seq) => Some(seq),
            _ => None,
        })
    }
}

/// Simple selectors with no combinator between them, e.g. `p.note:hover`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimpleSelectorSequence {
    /// Members in source order.
    pub components: Vec<Construct>,
    /// Location of the first token.
    pub location: Location,
}

/// `[attr]` or `[attr op value]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributeSelector {
    /// Type selector, then optionally the match operator and the value.
    pub components: Vec<Construct>,
    /// Location of `[`.
    pub location: Location,
}

/// Pseudo-element or pseudo-class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PseudoKind {
    /// `::name`
    Element,
    /// `:name` or `:name(...)`
    Class,
}

/// A pseudo selector.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PseudoSelector {
    /// Element or class.
    pub kind: PseudoKind,
    /// Name with its leading colons, lowercased for functional forms, e.g. `:nth-child`.
    pub name: String,
    /// Arguments of a functional pseudo-class, `None` otherwise.
    pub arguments: Option<Vec<Construct>>,
    /// Location of the first colon.
    pub location: Location,
}

impl PseudoSelector {
    /// Returns `true` for `:not(...)`.
    pub fn is_negation(&self) -> bool {
        self.arguments.is_some() && self.name.eq_ignore_ascii_case(":not")
    }
}

/// A parsed CSS construct.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Construct {
    /// Quoted string, value excludes the quotes.
    String(Atom),
    /// Identifier, including the media query keywords.
    Keyword(Atom),
    /// `#name`
    HashName(Atom),
    /// `.name`
    ClassName(Atom),
    /// `U+...`
    UnicodeRange(Atom),
    /// `url(...)`
    Uri(Uri),
    /// Any single-character token that has no structural meaning in context.
    Symbol(Atom),
    /// Selector combinator.
    Combinator(Combinator),
    /// Attribute selector match operator.
    AttributeMatch(AttributeMatch),
    /// Type or universal selector, optionally namespace qualified (`ns|E`, `*|*`).
    TypeSelector(Atom),
    /// Number, with or without a unit.
    Quantity(Quantity),
    /// At-rule header.
    AtRule(AtRule),
    /// Function call.
    Function(Function),
    /// Property declaration.
    Declaration(Declaration),
    /// Complex selector.
    Selector(Selector),
    /// Simple selector sequence.
    SimpleSelectorSequence(SimpleSelectorSequence),
    /// Attribute selector.
    AttributeSelector(AttributeSelector),
    /// `( ... )` or `[ ... ]`.
    ScopedGroup(ScopedGroup),
    /// Pseudo selector.
    Pseudo(PseudoSelector),
}

impl Construct {
    /// Location of the first token of this construct.
    pub fn location(&self) -> &Location {
        match self {
            Construct::String(a)
            | Construct::Keyword(a)
            | Construct::HashName(a)
            | Construct::ClassName(a)
            | Construct::UnicodeRange(a)
            | Construct::Symbol(a)
            | Construct::TypeSelector(a) => &a.location,
            Construct::Uri(u) => &u.location,
            Construct::Combinator(c) => &c.location,
            Construct::AttributeMatch(m) => &m.location,
            Construct::Quantity(q) => &q.location,
            Construct::AtRule(r) => &r.location,
            Construct::Function(f) => &f.location,
            Construct::Declaration(d) => &d.location,
            Construct::Selector(s) => &s.location,
            Construct::SimpleSelectorSequence(s) => &s.location,
            Construct::AttributeSelector(s) => &s.location,
            Construct::ScopedGroup(g) => &g.location,
            Construct::Pseudo(p) => &p.location,
        }
    }

    /// Returns `true` for a keyword equal to `value`, ignoring ASCII case.
    pub fn is_keyword(&self, value: &str) -> bool {
        matches!(self, Construct::Keyword(a) if a.value.eq_ignore_ascii_case(value))
    }

    /// Returns `true` for the symbol `c`.
    pub fn is_symbol(&self, c: char) -> bool {
        matches!(self, Construct::Symbol(a) if a.value.len() == c.len_utf8() && a.value.starts_with(c))
    }

    /// Serialize back to CSS text.
    pub fn to_css_string(&self) -> String {
        let mut out = String::new();
        self.write_css(&mut out);
        out
    }

    fn write_css(&self, out: &mut String) {
        match self {
            Construct::String(a) => {
                out.push('\'');
                out.push_str(&a.value);
                out.push('\'');
            }
            Construct::Keyword(a)
            | Construct::HashName(a)
            | Construct::ClassName(a)
            | Construct::UnicodeRange(a)
            | Construct::Symbol(a)
            | Construct::TypeSelector(a) => out.push_str(&a.value),
            Construct::Uri(u) => out.push_str(&u.value),
            Construct::Combinator(c) => out.push_str(c.kind.as_str()),
            Construct::AttributeMatch(m) => out.push_str(m.operator.as_str()),
            Construct::Quantity(q) => out.push_str(&q.value),
            Construct::AtRule(r) => {
                out.push_str(&r.name);
                for c in &r.components {
                    out.push(' ');
                    c.write_css(out);
                }
            }
            Construct::Function(f) => {
                out.push_str(&f.name);
                out.push('(');
                write_joined(out, &f.components, " ");
                out.push(')');
            }
            Construct::Declaration(d) => {
                out.push_str(&d.name);
                out.push_str(" : ");
                write_joined(out, &d.components, " ");
                if d.important {
                    out.push_str(" !important");
                }
                out.push_str(" ;");
            }
            Construct::Selector(s) => write_joined(out, &s.components, ""),
            Construct::SimpleSelectorSequence(s) => write_joined(out, &s.components, ""),
            Construct::AttributeSelector(s) => {
                out.push('[');
                write_joined(out, &s.components, "");
                out.push(']');
            }
            Construct::ScopedGroup(g) => {
                let (open, close) = match g.kind {
                    GroupKind::Paren => ('(', ')'),
                    GroupKind::Bracket => ('[', ']'),
                };
                out.push(open);
                write_joined(out, &g.components, " ");
                out.push(close);
            }
            Construct::Pseudo(p) => {
                out.push_str(&p.name);
                if let Some(args) = &p.arguments {
                    out.push('(');
                    write_joined(out, args, "");
                    out.push(')');
                }
            }
        }
    }
}

fn write_joined(out: &mut String, items: &[Construct], sep: &str) {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(sep);
        }
        item.write_css(out);
    }
}

impl fmt::Display for Construct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_css_string())
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        write_joined(&mut out, &self.components, "");
        f.write_str(&out)
    }
}

impl fmt::Display for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&Construct::Declaration(self.clone()).to_css_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;
    use alloc::vec;

    fn kw(v: &str) -> Construct {
        Construct::Keyword(Atom::new(v, Location::default()))
    }

    #[test]
    fn test_uri_strips_function_and_quotes() {
        let uri = |v: &str| Uri {
            value: v.to_string(),
            location: Location::default(),
        };
        assert_eq!(uri("url(a.png)").uri(), "a.png");
        assert_eq!(uri("url('fonts/a b.otf')").uri(), "fonts/a b.otf");
        assert_eq!(uri("url()").uri(), "");
        assert_eq!(uri("url('')").uri(), "");
    }

    #[test]
    fn test_declaration_serialization() {
        let decl = Construct::Declaration(Declaration {
            name: "margin".to_string(),
            components: vec![kw("0"), kw("auto")],
            important: true,
            location: Location::default(),
        });
        assert_eq!(decl.to_css_string(), "margin : 0 auto !important ;");
    }

    #[test]
    fn test_string_and_function_serialization() {
        let s = Construct::String(Atom::new("a b", Location::default()));
        assert_eq!(s.to_css_string(), "'a b'");
        let f = Construct::Function(Function {
            name: "attr".to_string(),
            components: vec![kw("title")],
            location: Location::default(),
        });
        assert_eq!(f.to_string(), "attr(title)");
    }

    #[test]
    fn test_selector_serialization() {
        let seq = |items: Vec<Construct>| {
            Construct::SimpleSelectorSequence(SimpleSelectorSequence {
                components: items,
                location: Location::default(),
            })
        };
        let selector = Selector {
            components: vec![
                seq(vec![
                    Construct::TypeSelector(Atom::new("a", Location::default())),
                    Construct::Pseudo(PseudoSelector {
                        kind: PseudoKind::Class,
                        name: ":nth-child".to_string(),
                        arguments: Some(vec![Construct::Quantity(Quantity {
                            value: "2n".to_string(),
                            unit: QuantityUnit::Dimen,
                            location: Location::default(),
                        })]),
                        location: Location::default(),
                    }),
                ]),
                Construct::Combinator(Combinator {
                    kind: CombinatorKind::Child,
                    location: Location::default(),
                }),
                seq(vec![Construct::ClassName(Atom::new(".b", Location::default()))]),
            ],
            location: Location::default(),
        };
        assert_eq!(selector.to_string(), "a:nth-child(2n)>.b");
        assert_eq!(selector.sequences().count(), 2);
    }

    #[test]
    fn test_symbol_and_keyword_checks() {
        let sym = Construct::Symbol(Atom::new(",", Location::default()));
        assert!(sym.is_symbol(','));
        assert!(!sym.is_symbol('/'));
        assert!(kw("Screen").is_keyword("screen"));
    }
}
