//! Reader: turns tokens into [`Form`]s.

use smol_str::SmolStr;
use text_size::{TextRange, TextSize};
use thiserror::Error;

use crate::form::Form;
use crate::lexer::{Lexer, Token, TokenKind};

/// Reader error with the offending source range.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at {range:?}")]
pub struct ParseError {
    /// Description of the problem.
    pub message: String,
    /// Byte range the error points at.
    pub range: TextRange,
}

impl ParseError {
    fn new(message: impl Into<String>, range: TextRange) -> Self {
        Self {
            message: message.into(),
            range,
        }
    }
}

/// Deepest collection, quote or `#break` nesting the reader accepts.
pub const MAX_NESTING: usize = 512;

/// Reads every top-level form in `source`.
pub fn parse_forms(source: &str) -> Result<Vec<Form>, ParseError> {
    let mut reader = Reader::new(source);
    let mut forms = Vec::new();
    while reader.peek().is_some() {
        forms.push(reader.read_form()?);
    }
    Ok(forms)
}

/// Reads exactly one form; anything after it is an error.
pub fn parse_form(source: &str) -> Result<Form, ParseError> {
    let mut reader = Reader::new(source);
    if reader.peek().is_none() {
        return Err(ParseError::new("expected a form", reader.eof_range()));
    }
    let form = reader.read_form()?;
    if let Some(extra) = reader.peek() {
        return Err(ParseError::new(
            format!("unexpected {} after form", extra.kind.describe()),
            extra.range,
        ));
    }
    Ok(form)
}

struct Reader<'src> {
    source: &'src str,
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl<'src> Reader<'src> {
    fn new(source: &'src str) -> Self {
        let tokens = Lexer::new(source)
            .filter(|token| !token.kind.is_trivia())
            .collect();
        Self {
            source,
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.peek()?;
        self.pos += 1;
        Some(token)
    }

    fn eof_range(&self) -> TextRange {
        let end = TextSize::from(self.source.len() as u32);
        TextRange::empty(end)
    }

    fn text(&self, token: Token) -> &'src str {
        &self.source[token.range]
    }

    fn read_form(&mut self) -> Result<Form, ParseError> {
        if self.depth >= MAX_NESTING {
            let range = self.peek().map_or_else(|| self.eof_range(), |token| token.range);
            return Err(ParseError::new(
                format!("forms nested deeper than {MAX_NESTING} levels"),
                range,
            ));
        }
        self.depth += 1;
        let form = self.read_nested();
        self.depth -= 1;
        form
    }

    fn read_nested(&mut self) -> Result<Form, ParseError> {
        let Some(token) = self.bump() else {
            return Err(ParseError::new("unexpected end of input", self.eof_range()));
        };
        match token.kind {
            TokenKind::LParen => self.read_seq(TokenKind::RParen).map(Form::List),
            TokenKind::LBracket => self.read_seq(TokenKind::RBracket).map(Form::Vector),
            TokenKind::RParen | TokenKind::RBracket => Err(ParseError::new(
                format!("unexpected {}", token.kind.describe()),
                token.range,
            )),
            TokenKind::Quote => {
                let quoted = self.read_form()?;
                Ok(Form::List(vec![Form::Symbol(SmolStr::new("quote")), quoted]))
            }
            TokenKind::BreakTag => {
                let tagged = self.read_form()?;
                Ok(Form::Break(Box::new(tagged)))
            }
            TokenKind::IntLiteral => self
                .text(token)
                .parse::<i64>()
                .map(Form::Int)
                .map_err(|_| ParseError::new("integer literal out of range", token.range)),
            TokenKind::FloatLiteral => self
                .text(token)
                .parse::<f64>()
                .map(Form::Float)
                .map_err(|_| ParseError::new("invalid float literal", token.range)),
            TokenKind::StringLiteral => unescape(self.text(token), token.range).map(Form::Str),
            TokenKind::Symbol => Ok(match self.text(token) {
                "nil" => Form::Nil,
                "true" => Form::Bool(true),
                "false" => Form::Bool(false),
                name => Form::Symbol(SmolStr::new(name)),
            }),
            TokenKind::Error => Err(ParseError::new(
                format!("unrecognized input `{}`", self.text(token)),
                token.range,
            )),
            TokenKind::Whitespace | TokenKind::Comment => {
                unreachable!("trivia is filtered before reading")
            }
        }
    }

    fn read_seq(&mut self, close: TokenKind) -> Result<Vec<Form>, ParseError> {
        let mut items = Vec::new();
        loop {
            match self.peek() {
                None => {
                    return Err(ParseError::new(
                        format!("unclosed collection, expected {}", close.describe()),
                        self.eof_range(),
                    ))
                }
                Some(token) if token.kind == close => {
                    self.pos += 1;
                    return Ok(items);
                }
                Some(_) => items.push(self.read_form()?),
            }
        }
    }
}

fn unescape(literal: &str, range: TextRange) -> Result<SmolStr, ParseError> {
    let body = &literal[1..literal.len() - 1];
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                return Err(ParseError::new(
                    format!("unknown escape `\\{other}`"),
                    range,
                ))
            }
            None => return Err(ParseError::new("dangling escape", range)),
        }
    }
    Ok(SmolStr::new(out))
}
