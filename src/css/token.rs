//! Token model produced by the scanner.

extern crate alloc;

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use super::location::Location;
use crate::error::CssException;

/// Unit class of a numeric quantity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum QuantityUnit {
    /// Number with an unrecognised suffix.
    Dimen,
    /// `%`
    Percentage,
    /// `cm`, `mm`, `in`, `pt`, `pc`, `px`, `vw`, `vh`, `vmin`, `ch`
    Length,
    /// `em`
    Ems,
    /// `ex`
    Exs,
    /// `deg`, `rad`, `grad`, `turn`
    Angle,
    /// `ms`, `s`
    Time,
    /// `hz`, `khz`
    Freq,
    /// `dpi`, `dpcm`, `dppx`
    Resolution,
    /// `rem`
    Rems,
    /// Unitless real number.
    Number,
    /// Unitless integer.
    Integer,
}

/// Longest suffix looked up in the unit table.
pub(crate) const MAX_UNIT_LEN: usize = 4;

const UNITS: &[(&str, QuantityUnit)] = &[
    ("dpcm", QuantityUnit::Resolution),
    ("dppx", QuantityUnit::Resolution),
    ("grad", QuantityUnit::Angle),
    ("turn", QuantityUnit::Angle),
    ("vmin", QuantityUnit::Length),
    ("deg", QuantityUnit::Angle),
    ("rad", QuantityUnit::Angle),
    ("dpi", QuantityUnit::Resolution),
    ("khz", QuantityUnit::Freq),
    ("rem", QuantityUnit::Rems),
    ("cm", QuantityUnit::Length),
    ("px", QuantityUnit::Length),
    ("mm", QuantityUnit::Length),
    ("in", QuantityUnit::Length),
    ("pt", QuantityUnit::Length),
    ("pc", QuantityUnit::Length),
    ("ch", QuantityUnit::Length),
    ("vw", QuantityUnit::Length),
    ("vh", QuantityUnit::Length),
    ("em", QuantityUnit::Ems),
    ("ex", QuantityUnit::Exs),
    ("ms", QuantityUnit::Time),
    ("hz", QuantityUnit::Freq),
    ("s", QuantityUnit::Time),
    ("%", QuantityUnit::Percentage),
];

/// Look up a unit suffix, case-insensitively. Returns the canonical spelling.
pub fn unit_for_suffix(suffix: &str) -> Option<(&'static str, QuantityUnit)> {
    UNITS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(suffix))
        .copied()
}

/// Token classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum TokenType {
    /// Whitespace run.
    S,
    /// `/* ... */`, text excludes the delimiters.
    Comment,
    /// `<!--`
    Cdo,
    /// `-->`
    Cdc,
    /// Identifier.
    Ident,
    /// Identifier immediately followed by `(`, text includes the paren.
    Function,
    /// `@name`
    AtKeyword,
    /// Unitless real number.
    Number,
    /// Unitless integer.
    Integer,
    /// Quoted string, text excludes the quotes.
    String,
    /// `url(...)`
    Uri,
    /// `#name`
    HashName,
    /// `.name`
    ClassName,
    /// `U+...`
    URange,
    /// `~=`
    Includes,
    /// `|=`
    DashMatch,
    /// `^=`
    PrefixMatch,
    /// `$=`
    SuffixMatch,
    /// `*=`
    SubstringMatch,
    /// Number with a unit.
    Quantity(QuantityUnit),
    /// Media query `only`.
    Only,
    /// Media query `not`.
    Not,
    /// Media query `and`.
    And,
    /// `!important`
    Important,
    /// Any other single character.
    Char,
}

impl TokenType {
    /// Short stable name, used by tooling output.
    pub fn name(self) -> &'static str {
        match self {
            TokenType::S => "S",
            TokenType::Comment => "COMMENT",
            TokenType::Cdo => "CDO",
            TokenType::Cdc => "CDC",
            TokenType::Ident => "IDENT",
            TokenType::Function => "FUNCTION",
            TokenType::AtKeyword => "ATKEYWORD",
            TokenType::Number => "NUMBER",
            TokenType::Integer => "INTEGER",
            TokenType::String => "STRING",
            TokenType::Uri => "URI",
            TokenType::HashName => "HASHNAME",
            TokenType::ClassName => "CLASSNAME",
            TokenType::URange => "URANGE",
            TokenType::Includes => "INCLUDES",
            TokenType::DashMatch => "DASHMATCH",
            TokenType::PrefixMatch => "PREFIXMATCH",
            TokenType::SuffixMatch => "SUFFIXMATCH",
            TokenType::SubstringMatch => "SUBSTRINGMATCH",
            TokenType::Quantity(unit) => match unit {
                QuantityUnit::Dimen => "QNTY_DIMEN",
                QuantityUnit::Percentage => "QNTY_PERCENTAGE",
                QuantityUnit::Length => "QNTY_LENGTH",
                QuantityUnit::Ems => "QNTY_EMS",
                QuantityUnit::Exs => "QNTY_EXS",
                QuantityUnit::Angle => "QNTY_ANGLE",
                QuantityUnit::Time => "QNTY_TIME",
                QuantityUnit::Freq => "QNTY_FREQ",
                QuantityUnit::Resolution => "QNTY_RESOLUTION",
                QuantityUnit::Rems => "QNTY_REMS",
                QuantityUnit::Number => "NUMBER",
                QuantityUnit::Integer => "INTEGER",
            },
            TokenType::Only => "ONLY",
            TokenType::Not => "NOT",
            TokenType::And => "AND",
            TokenType::Important => "IMPORTANT",
            TokenType::Char => "CHAR",
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A scanned token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    /// Token classification.
    pub kind: TokenType,
    /// Location of the first character.
    pub location: Location,
    /// Token text, normalized as described on each [`TokenType`].
    pub text: String,
    /// Lexical errors found while scanning this token.
    pub errors: Vec<CssException>,
}

impl Token {
    /// Returns `true` for a `Char` token holding `c`.
    pub fn is_char(&self, c: char) -> bool {
        self.kind == TokenType::Char && self.text.len() == c.len_utf8() && self.text.starts_with(c)
    }

    /// The character of a `Char` token.
    pub fn as_char(&self) -> Option<char> {
        if self.kind == TokenType::Char {
            self.text.chars().next()
        } else {
            None
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.kind, self.text)
    }
}

/// Attribute selector match operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum MatchOperator {
    /// `=`
    Equals,
    /// `~=`
    Includes,
    /// `|=`
    DashMatch,
    /// `^=`
    PrefixMatch,
    /// `$=`
    SuffixMatch,
    /// `*=`
    SubstringMatch,
}

impl MatchOperator {
    /// Operator for a match token, if it is one.
    pub fn from_token(token: &Token) -> Option<Self> {
        match token.kind {
            TokenType::Includes => Some(MatchOperator::Includes),
            TokenType::DashMatch => Some(MatchOperator::DashMatch),
            TokenType::PrefixMatch => Some(MatchOperator::PrefixMatch),
            TokenType::SuffixMatch => Some(MatchOperator::SuffixMatch),
            TokenType::SubstringMatch => Some(MatchOperator::SubstringMatch),
            TokenType::Char if token.is_char('=') => Some(MatchOperator::Equals),
            _ => None,
        }
    }

    /// CSS spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            MatchOperator::Equals => "=",
            MatchOperator::Includes => "~=",
            MatchOperator::DashMatch => "|=",
            MatchOperator::PrefixMatch => "^=",
            MatchOperator::SuffixMatch => "$=",
            MatchOperator::SubstringMatch => "*=",
        }
    }
}

/// Predicate over tokens, used for stop conditions and filters.
pub type TokenMatcher = fn(&Token) -> bool;

/// Stock token predicates.
pub mod matchers {
    use super::{Token, TokenType};

    /// `;` or `{`
    pub fn semi_or_open_brace(t: &Token) -> bool {
        t.is_char(';') || t.is_char('{')
    }
    /// `;` or `}`
    pub fn semi_or_close_brace(t: &Token) -> bool {
        t.is_char(';') || t.is_char('}')
    }
    /// `,` or `{`
    pub fn comma_or_open_brace(t: &Token) -> bool {
        t.is_char(',') || t.is_char('{')
    }
    /// `:`
    pub fn colon(t: &Token) -> bool {
        t.is_char(':')
    }
    /// `|`
    pub fn pipe(t: &Token) -> bool {
        t.is_char('|')
    }
    /// `;`
    pub fn semi(t: &Token) -> bool {
        t.is_char(';')
    }
    /// `,`
    pub fn comma(t: &Token) -> bool {
        t.is_char(',')
    }
    /// `{`
    pub fn open_brace(t: &Token) -> bool {
        t.is_char('{')
    }
    /// `}`
    pub fn close_brace(t: &Token) -> bool {
        t.is_char('}')
    }
    /// `(`
    pub fn open_paren(t: &Token) -> bool {
        t.is_char('(')
    }
    /// `)`
    pub fn close_paren(t: &Token) -> bool {
        t.is_char(')')
    }
    /// `[`
    pub fn open_square(t: &Token) -> bool {
        t.is_char('[')
    }
    /// `]`
    pub fn close_square(t: &Token) -> bool {
        t.is_char(']')
    }
    /// `*`
    pub fn star(t: &Token) -> bool {
        t.is_char('*')
    }
    /// `*` or `|`
    pub fn star_or_pipe(t: &Token) -> bool {
        t.is_char('*') || t.is_char('|')
    }
    /// `>`, `+` or `~`
    pub fn combinator_char(t: &Token) -> bool {
        t.is_char('>') || t.is_char('+') || t.is_char('~')
    }
    /// A string or an identifier.
    pub fn string_or_ident(t: &Token) -> bool {
        matches!(t.kind, TokenType::String | TokenType::Ident)
    }
    /// `=` or one of the attribute match operators.
    pub fn attribute_match(t: &Token) -> bool {
        t.is_char('=')
            || matches!(
                t.kind,
                TokenType::Includes
                    | TokenType::DashMatch
                    | TokenType::PrefixMatch
                    | TokenType::SuffixMatch
                    | TokenType::SubstringMatch
            )
    }
}

/// Character classes used by the scanner.
pub(crate) mod chars {
    pub fn nmstart(c: char) -> bool {
        c.is_ascii_alphabetic() || c == '_' || c >= '\u{80}'
    }

    pub fn nmchar(c: char) -> bool {
        nmstart(c) || c.is_ascii_digit() || c == '-'
    }

    pub fn digit(c: char) -> bool {
        c.is_ascii_digit()
    }

    pub fn numchar(c: char) -> bool {
        c.is_ascii_digit() || c == '.'
    }

    pub fn numstart(c: char) -> bool {
        numchar(c) || c == '+' || c == '-'
    }

    pub fn unary(c: char) -> bool {
        c == '+' || c == '-'
    }

    pub fn qntstart(c: char) -> bool {
        nmstart(c) || c == '%'
    }

    pub fn urange(c: char) -> bool {
        c.is_ascii_hexdigit() || c == '?' || c == '-'
    }

    pub fn terminator(c: char) -> bool {
        matches!(c, ';' | '{' | '}')
    }

    pub fn quote(c: char) -> bool {
        c == '"' || c == '\''
    }
}
