//! Localized message text for CSS diagnostics.
//!
//! The locale only changes the human-readable message; codes, locations and
//! arguments are the same for every locale.

extern crate alloc;

use alloc::string::String;

use crate::error::CssErrorCode;

/// Language used for rendered messages.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Locale {
    /// English (default).
    #[default]
    English,
    /// French.
    French,
}

impl Locale {
    /// Resolve a BCP 47 style tag (`en`, `fr-CA`, ...). Unknown tags map to English.
    pub fn from_tag(tag: &str) -> Self {
        let primary = tag.split(['-', '_']).next().unwrap_or("");
        if primary.eq_ignore_ascii_case("fr") {
            Locale::French
        } else {
            Locale::English
        }
    }
}

/// Fixed phrases used as message arguments by the grammar.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Phrase {
    /// "a property name"
    PropertyName,
    /// "a property value"
    PropertyValue,
    /// "a type or universal selector"
    TypeOrUniversalSelector,
    /// "a string or identifier"
    StringOrIdentifier,
    /// "an attribute value matcher"
    AttributeValueMatcher,
    /// "a newline"
    Newline,
    /// "a string"
    StringToken,
    /// "more than one pseudo-element"
    MultiplePseudoElements,
    /// "a pseudo-element before the last sequence"
    MisplacedPseudoElement,
}

impl Phrase {
    /// Phrase text in `locale`.
    pub fn text(self, locale: Locale) -> &'static str {
        match locale {
            Locale::English => match self {
                Phrase::PropertyName => "a property name",
                Phrase::PropertyValue => "a property value",
                Phrase::TypeOrUniversalSelector => "a type or universal selector",
                Phrase::StringOrIdentifier => "a string or identifier",
                Phrase::AttributeValueMatcher => "an attribute value matcher",
                Phrase::Newline => "a newline",
                Phrase::StringToken => "a string",
                Phrase::MultiplePseudoElements => "more than one pseudo-element",
                Phrase::MisplacedPseudoElement => "a pseudo-element before the last sequence",
            },
            Locale::French => match self {
                Phrase::PropertyName => "un nom de propriété",
                Phrase::PropertyValue => "une valeur de propriété",
                Phrase::TypeOrUniversalSelector => "un sélecteur de type ou universel",
                Phrase::StringOrIdentifier => "une chaîne ou un identifiant",
                Phrase::AttributeValueMatcher => "un opérateur de comparaison d'attribut",
                Phrase::Newline => "un saut de ligne",
                Phrase::StringToken => "une chaîne",
                Phrase::MultiplePseudoElements => "plusieurs pseudo-éléments",
                Phrase::MisplacedPseudoElement => {
                    "un pseudo-élément avant la dernière séquence"
                }
            },
        }
    }
}

/// Join two alternatives, e.g. `';' or '{'`.
pub fn either(locale: Locale, a: &str, b: &str) -> String {
    let or = match locale {
        Locale::English => " or ",
        Locale::French => " ou ",
    };
    let mut out = String::with_capacity(a.len() + or.len() + b.len());
    out.push_str(a);
    out.push_str(or);
    out.push_str(b);
    out
}

fn template(locale: Locale, code: CssErrorCode) -> &'static str {
    match locale {
        Locale::English => match code {
            CssErrorCode::ScannerIllegalSyntax => "Illegal token syntax near '{0}'",
            CssErrorCode::ScannerIllegalChar => "Illegal character ({0}) in {1}",
            CssErrorCode::ScannerIllegalFirstChar => "Illegal first character ({0}) in {1}",
            CssErrorCode::ScannerMalformedEscape => "Malformed escape sequence '{0}'",
            CssErrorCode::ScannerIllegalUnicodeRange => "Unicode range '{0}' has too many digits",
            CssErrorCode::ScannerPrematureEof => "Premature end of file",
            CssErrorCode::GrammarPrematureEof => "Premature end of file, expecting {0}",
            CssErrorCode::GrammarUnexpectedToken => "Unexpected token '{0}'",
            CssErrorCode::GrammarExpectingToken => "Found '{0}' where {1} was expected",
            CssErrorCode::GrammarInvalidSelector => "Invalid selector '{0}': {1}",
        },
        Locale::French => match code {
            CssErrorCode::ScannerIllegalSyntax => "Syntaxe de jeton illégale près de '{0}'",
            CssErrorCode::ScannerIllegalChar => "Caractère illégal ({0}) dans {1}",
            CssErrorCode::ScannerIllegalFirstChar => "Premier caractère illégal ({0}) dans {1}",
            CssErrorCode::ScannerMalformedEscape => "Séquence d'échappement '{0}' malformée",
            CssErrorCode::ScannerIllegalUnicodeRange => {
                "La plage unicode '{0}' contient trop de chiffres"
            }
            CssErrorCode::ScannerPrematureEof => "Fin de fichier prématurée",
            CssErrorCode::GrammarPrematureEof => "Fin de fichier prématurée, attendu : {0}",
            CssErrorCode::GrammarUnexpectedToken => "Jeton '{0}' inattendu",
            CssErrorCode::GrammarExpectingToken => "'{0}' trouvé, attendu : {1}",
            CssErrorCode::GrammarInvalidSelector => "Sélecteur '{0}' invalide : {1}",
        },
    }
}

/// Render the message for `code` with positional `{n}` arguments substituted.
pub fn render<S: AsRef<str>>(locale: Locale, code: CssErrorCode, args: &[S]) -> String {
    let tpl = template(locale, code);
    let mut out = String::with_capacity(tpl.len() + 16);
    let mut rest = tpl;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                match after[..close].parse::<usize>() {
                    Ok(idx) => {
                        if let Some(arg) = args.get(idx) {
                            out.push_str(arg.as_ref());
                        }
                    }
                    Err(_) => {
                        out.push('{');
                        out.push_str(&after[..=close]);
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_substitutes_arguments() {
        let msg = render(
            Locale::English,
            CssErrorCode::GrammarExpectingToken,
            &["}", "a property value"],
        );
        assert_eq!(msg, "Found '}' where a property value was expected");
    }

    #[test]
    fn test_render_missing_argument_is_empty() {
        let msg = render::<&str>(Locale::English, CssErrorCode::GrammarPrematureEof, &[]);
        assert_eq!(msg, "Premature end of file, expecting ");
    }

    #[test]
    fn test_french_messages() {
        let msg = render(Locale::French, CssErrorCode::GrammarUnexpectedToken, &["}"]);
        assert_eq!(msg, "Jeton '}' inattendu");
        assert_eq!(
            Phrase::PropertyValue.text(Locale::French),
            "une valeur de propriété"
        );
        assert_eq!(either(Locale::French, "';'", "'{'"), "';' ou '{'");
    }

    #[test]
    fn test_french_expected_phrases_read_for_any_gender() {
        let value = Phrase::PropertyValue.text(Locale::French);
        let msg = render(Locale::French, CssErrorCode::GrammarExpectingToken, &["}", value]);
        assert_eq!(msg, "'}' trouvé, attendu : une valeur de propriété");
        let eof = render(
            Locale::French,
            CssErrorCode::GrammarPrematureEof,
            &[either(Locale::French, "';'", "'}'")],
        );
        assert_eq!(eof, "Fin de fichier prématurée, attendu : ';' ou '}'");
    }

    #[test]
    fn test_locale_from_tag() {
        assert_eq!(Locale::from_tag("fr-CA"), Locale::French);
        assert_eq!(Locale::from_tag("de"), Locale::English);
        assert_eq!(Locale::from_tag(""), Locale::English);
    }
}
