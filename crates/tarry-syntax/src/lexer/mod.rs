//! Lexer for the tarry expression language.
//!
//! This module provides a lexer that tokenizes source text into a stream of
//! tokens with their positions in the source text.

mod tokens;

pub use tokens::TokenKind;

use logos::Logos;
use text_size::{TextRange, TextSize};

/// A token produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    /// The kind of token.
    pub kind: TokenKind,
    /// The byte range of the token in the source text.
    pub range: TextRange,
}

impl Token {
    /// Creates a new token.
    #[must_use]
    pub fn new(kind: TokenKind, range: TextRange) -> Self {
        Self { kind, range }
    }

    /// Returns the length of the token in bytes.
    #[must_use]
    pub fn len(&self) -> TextSize {
        self.range.len()
    }

    /// Returns true if the token has zero length.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

/// Lexer over source text.
///
/// Unrecognized characters are returned as `TokenKind::Error`; the lexer
/// itself never fails.
pub struct Lexer<'src> {
    inner: logos::Lexer<'src, TokenKind>,
}

impl<'src> Lexer<'src> {
    /// Creates a new lexer for the given source text.
    #[must_use]
    pub fn new(source: &'src str) -> Self {
        Self {
            inner: TokenKind::lexer(source),
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        let kind = self.inner.next()?;
        let span = self.inner.span();
        let kind = kind.unwrap_or(TokenKind::Error);
        let range = TextRange::new(
            TextSize::from(span.start as u32),
            TextSize::from(span.end as u32),
        );
        Some(Token::new(kind, range))
    }
}

/// Lex the entire source and return all tokens.
#[must_use]
pub fn lex(source: &str) -> Vec<Token> {
    Lexer::new(source).collect()
}

/// Lex source and return tokens paired with their text.
///
/// Useful for debugging and testing.
#[must_use]
pub fn lex_with_text(source: &str) -> Vec<(Token, &str)> {
    Lexer::new(source)
        .map(|token| (token, &source[token.range]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source)
            .into_iter()
            .filter(|t| !t.kind.is_trivia())
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_lexer_basic() {
        assert_eq!(
            kinds("(+ x 42)"),
            vec![
                TokenKind::LParen,
                TokenKind::Symbol,
                TokenKind::Symbol,
                TokenKind::IntLiteral,
                TokenKind::RParen,
            ]
        );
    }

    #[test]
    fn test_lexer_preserves_positions() {
        let tokens = lex("abc 123");
        assert_eq!(tokens[0].range, TextRange::new(0.into(), 3.into()));
        assert_eq!(tokens[1].range, TextRange::new(3.into(), 4.into()));
        assert_eq!(tokens[2].range, TextRange::new(4.into(), 7.into()));
    }

    #[test]
    fn negative_numbers_beat_minus_symbol() {
        assert_eq!(kinds("-5"), vec![TokenKind::IntLiteral]);
        assert_eq!(kinds("-2.5"), vec![TokenKind::FloatLiteral]);
        assert_eq!(
            kinds("(- 5 1)"),
            vec![
                TokenKind::LParen,
                TokenKind::Symbol,
                TokenKind::IntLiteral,
                TokenKind::IntLiteral,
                TokenKind::RParen,
            ]
        );
    }

    #[test]
    fn break_tag_and_comments() {
        let tokens = lex_with_text("#break x ; trailing");
        assert_eq!(tokens[0].0.kind, TokenKind::BreakTag);
        assert_eq!(tokens[2].1, "x");
        assert_eq!(tokens[4].0.kind, TokenKind::Comment);
    }

    #[test]
    fn stray_hash_is_an_error_token() {
        assert_eq!(kinds("#foo")[0], TokenKind::Error);
    }
}
