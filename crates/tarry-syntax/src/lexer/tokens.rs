//! Token definitions for the tarry expression language.
//!
//! The language is a small s-expression dialect. Besides the usual atoms and
//! delimiters there is one reader tag, `#break`, which marks the following
//! form as a breakpoint site.

use logos::Logos;

/// All token kinds produced by the lexer.
///
/// Trivia (whitespace, commas, comments) is kept as tokens so positions stay
/// exact; the reader skips it.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u16)]
#[derive(Default)]
pub enum TokenKind {
    // =========================================================================
    // TRIVIA
    // =========================================================================
    /// Whitespace and commas.
    #[regex(r"[ \t\r\n,]+")]
    Whitespace,

    /// Line comment (`; ...`).
    #[regex(r";[^\r\n]*", allow_greedy = true)]
    Comment,

    // =========================================================================
    // DELIMITERS
    // =========================================================================
    /// `(`
    #[token("(")]
    LParen,

    /// `)`
    #[token(")")]
    RParen,

    /// `[`
    #[token("[")]
    LBracket,

    /// `]`
    #[token("]")]
    RBracket,

    /// `'` quote shorthand.
    #[token("'")]
    Quote,

    /// `#break` breakpoint tag.
    #[token("#break")]
    BreakTag,

    // =========================================================================
    // LITERALS
    // =========================================================================
    /// Integer literal, optionally negative.
    #[regex(r"-?[0-9]+", priority = 4)]
    IntLiteral,

    /// Float literal with a mandatory fractional part.
    #[regex(r"-?[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?", priority = 4)]
    FloatLiteral,

    /// Double-quoted string literal.
    #[regex(r#""([^"\\]|\\.)*""#)]
    StringLiteral,

    /// Symbol (also covers `nil`, `true` and `false`).
    #[regex(r"[A-Za-z_+\-*/<>=!?.%&][A-Za-z0-9_+\-*/<>=!?.%&']*", priority = 2)]
    Symbol,

    // =========================================================================
    // SPECIAL
    // =========================================================================
    /// Unrecognized input.
    #[default]
    Error,
}

impl TokenKind {
    /// Returns true for tokens the reader ignores.
    #[must_use]
    pub fn is_trivia(self) -> bool {
        matches!(self, Self::Whitespace | Self::Comment)
    }

    /// Human-readable description used in parse errors.
    #[must_use]
    pub fn describe(self) -> &'static str {
        match self {
            Self::Whitespace => "whitespace",
            Self::Comment => "comment",
            Self::LParen => "`(`",
            Self::RParen => "`)`",
            Self::LBracket => "`[`",
            Self::RBracket => "`]`",
            Self::Quote => "`'`",
            Self::BreakTag => "`#break`",
            Self::IntLiteral => "integer literal",
            Self::FloatLiteral => "float literal",
            Self::StringLiteral => "string literal",
            Self::Symbol => "symbol",
            Self::Error => "unrecognized input",
        }
    }
}
