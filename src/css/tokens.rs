//! Filtered iteration over a materialized token list.

use core::fmt;

use super::token::{Token, TokenType};

/// Predicate selecting which tokens an iteration step may return.
pub type TokenFilter = fn(&Token) -> bool;

/// Stock filters.
pub mod filters {
    use super::{Token, TokenType};

    /// Skips whitespace and comments. The default filter.
    pub fn skip_whitespace_and_comments(t: &Token) -> bool {
        !matches!(t.kind, TokenType::S | TokenType::Comment)
    }

    /// Skips whitespace, comments, `<!--` and `-->`. Used between top-level statements.
    pub fn skip_top_level(t: &Token) -> bool {
        !matches!(
            t.kind,
            TokenType::S | TokenType::Comment | TokenType::Cdo | TokenType::Cdc
        )
    }

    /// Returns every token.
    pub fn none(_: &Token) -> bool {
        true
    }
}

/// No token satisfies the request; the input is exhausted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NoMoreTokens;

impl fmt::Display for NoMoreTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("no more tokens")
    }
}

/// Cursor over a token slice.
///
/// Returned tokens borrow from the slice, not from the cursor, so a caller
/// can hold a token while advancing further.
#[derive(Clone, Debug)]
pub struct TokenIter<'a> {
    tokens: &'a [Token],
    next: usize,
    last: Option<usize>,
    filter: TokenFilter,
}

impl<'a> TokenIter<'a> {
    /// Iterate `tokens` with `filter` as the default filter.
    pub fn new(tokens: &'a [Token], filter: TokenFilter) -> Self {
        Self {
            tokens,
            next: 0,
            last: None,
            filter,
        }
    }

    fn find(&self, filter: TokenFilter) -> Option<usize> {
        (self.next..self.tokens.len()).find(|&i| filter(&self.tokens[i]))
    }

    /// Next token passing the default filter.
    pub fn next(&mut self) -> Result<&'a Token, NoMoreTokens> {
        self.next_with(self.filter)
    }

    /// Next token passing `filter`; skipped tokens are consumed.
    pub fn next_with(&mut self, filter: TokenFilter) -> Result<&'a Token, NoMoreTokens> {
        let idx = self.find(filter).ok_or(NoMoreTokens)?;
        self.next = idx + 1;
        self.last = Some(idx);
        Ok(&self.tokens[idx])
    }

    /// Next token passing the default filter, without consuming anything.
    pub fn peek(&self) -> Result<&'a Token, NoMoreTokens> {
        self.peek_with(self.filter)
    }

    /// Next token passing `filter`, without consuming anything.
    pub fn peek_with(&self, filter: TokenFilter) -> Result<&'a Token, NoMoreTokens> {
        let tokens = self.tokens;
        self.find(filter).map(|i| &tokens[i]).ok_or(NoMoreTokens)
    }

    /// Returns `true` if a token passing the default filter remains.
    pub fn has_next(&self) -> bool {
        self.has_next_with(self.filter)
    }

    /// Returns `true` if a token passing `filter` remains.
    pub fn has_next_with(&self, filter: TokenFilter) -> bool {
        self.find(filter).is_some()
    }

    /// Raw index of the last returned token.
    pub fn index(&self) -> Option<usize> {
        self.last
    }

    /// The last returned token.
    pub fn last(&self) -> Option<&'a Token> {
        let tokens = self.tokens;
        self.last.map(|i| &tokens[i])
    }

    /// Token at raw index `idx`, ignoring filters.
    pub fn get(&self, idx: usize) -> Option<&'a Token> {
        self.tokens.get(idx)
    }

    /// Returns `true` if the token right after the last returned one is whitespace.
    pub fn whitespace_follows_last(&self) -> bool {
        self.last
            .and_then(|i| self.tokens.get(i + 1))
            .is_some_and(|t| t.kind == TokenType::S)
    }
}
