//! Tokenizer for Gradle Kotlin DSL scripts.
//!
//! String literals are split into their template parts so that names used in
//! `"$name"` and `"${expr}"` reach the parser as ordinary tokens.

pub(crate) mod winnow;

use self::winnow::{
    backtick_identifier, backtrack_err, char_literal, identifier, number, symbol, trivia,
};
use ::winnow::combinator::alt;
use ::winnow::error::{ContextError, ErrMode};
use ::winnow::{ModalResult, Parser};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Val,
    Var,
    Fun,
    Class,
    Object,
    Interface,
    If,
    Else,
    Return,
    This,
    Super,
    Null,
    True,
    False,
    Import,
    Package,
    As,
    Is,
    In,
    Throw,
    Typealias,
}

impl Keyword {
    fn from_lexeme(lexeme: &str) -> Option<Self> {
        match lexeme {
            "val" => Some(Self::Val),
            "var" => Some(Self::Var),
            "fun" => Some(Self::Fun),
            "class" => Some(Self::Class),
            "object" => Some(Self::Object),
            "interface" => Some(Self::Interface),
            "if" => Some(Self::If),
            "else" => Some(Self::Else),
            "return" => Some(Self::Return),
            "this" => Some(Self::This),
            "super" => Some(Self::Super),
            "null" => Some(Self::Null),
            "true" => Some(Self::True),
            "false" => Some(Self::False),
            "import" => Some(Self::Import),
            "package" => Some(Self::Package),
            "as" => Some(Self::As),
            "is" => Some(Self::Is),
            "in" => Some(Self::In),
            "throw" => Some(Self::Throw),
            "typealias" => Some(Self::Typealias),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub span: Span,
    /// A line break separates this token from the previous one.
    pub newline_before: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Number,
    Char,
    Symbol,
    Keyword(Keyword),
    /// Opening `"` or `"""`.
    StringStart,
    /// Literal text between template entries.
    StringText,
    /// `${`
    TemplateStart,
    /// `}` closing a `${` entry.
    TemplateEnd,
    StringEnd,
}

#[derive(Debug, Error)]
pub enum LexerError {
    #[error("lexer error at byte {offset}: {message}")]
    Message { offset: usize, message: String },
    #[error("unterminated string literal starting at byte {0}")]
    UnterminatedString(usize),
}

impl LexerError {
    fn at(offset: usize, err: ErrMode<ContextError>) -> Self {
        let message = match err {
            ErrMode::Backtrack(ctx) | ErrMode::Cut(ctx) => {
                let text = ctx.to_string();
                if text.is_empty() {
                    "unexpected character".to_string()
                } else {
                    text
                }
            }
            ErrMode::Incomplete(_) => "incomplete input".to_string(),
        };
        LexerError::Message { offset, message }
    }
}

pub fn lex(source: &str) -> Result<Vec<Token>, LexerError> {
    let mut lexer = Lexer {
        source,
        input: source,
        tokens: Vec::new(),
        newline: false,
    };
    lexer.lex_tokens(false)?;
    Ok(lexer.tokens)
}

struct Lexer<'a> {
    source: &'a str,
    input: &'a str,
    tokens: Vec<Token>,
    newline: bool,
}

impl<'a> Lexer<'a> {
    fn offset(&self) -> usize {
        self.source.len() - self.input.len()
    }

    fn push(&mut self, kind: TokenKind, lexeme: &str, start: usize, end: usize) {
        self.tokens.push(Token {
            kind,
            lexeme: lexeme.to_string(),
            span: Span { start, end },
            newline_before: std::mem::take(&mut self.newline),
        });
    }

    /// Consume `len` bytes as one token.
    fn push_fixed(&mut self, kind: TokenKind, len: usize) {
        let start = self.offset();
        let input = self.input;
        let lexeme = &input[..len];
        self.input = &input[len..];
        self.push(kind, lexeme, start, start + len);
    }

    /// Tokens up to end of input, or up to the `}` closing a template entry.
    fn lex_tokens(&mut self, in_template: bool) -> Result<(), LexerError> {
        let mut depth = 0usize;
        loop {
            let at = self.offset();
            if trivia(&mut self.input).map_err(|err| LexerError::at(at, err))? {
                self.newline = true;
            }
            if self.input.is_empty() {
                return if in_template {
                    Err(LexerError::UnterminatedString(at))
                } else {
                    Ok(())
                };
            }
            if self.input.starts_with("\"\"\"") {
                self.lex_string(true)?;
                continue;
            }
            if self.input.starts_with('"') {
                self.lex_string(false)?;
                continue;
            }
            if in_template {
                if self.input.starts_with('}') {
                    if depth == 0 {
                        self.push_fixed(TokenKind::TemplateEnd, 1);
                        return Ok(());
                    }
                    depth -= 1;
                } else if self.input.starts_with('{') {
                    depth += 1;
                }
            }

            let start = self.offset();
            let kind = token_parser()
                .parse_next(&mut self.input)
                .map_err(|err| LexerError::at(start, err))?;
            let end = self.offset();
            let source = self.source;
            let raw = &source[start..end];
            match kind {
                RawTokenKind::Ident => {
                    let kind = Keyword::from_lexeme(raw)
                        .map(TokenKind::Keyword)
                        .unwrap_or(TokenKind::Ident);
                    self.push(kind, raw, start, end);
                }
                RawTokenKind::QuotedIdent => {
                    self.push(TokenKind::Ident, raw.trim_matches('`'), start, end)
                }
                RawTokenKind::Number => self.push(TokenKind::Number, raw, start, end),
                RawTokenKind::Char => self.push(TokenKind::Char, raw, start, end),
                RawTokenKind::Symbol => self.push(TokenKind::Symbol, raw, start, end),
            }
        }
    }

    fn lex_string(&mut self, raw: bool) -> Result<(), LexerError> {
        let quote = if raw { "\"\"\"" } else { "\"" };
        let opened_at = self.offset();
        self.push_fixed(TokenKind::StringStart, quote.len());
        let mut text_start = self.offset();
        loop {
            if self.input.is_empty() || (!raw && self.input.starts_with('\n')) {
                return Err(LexerError::UnterminatedString(opened_at));
            }
            if self.input.starts_with(quote) {
                self.flush_text(text_start);
                self.push_fixed(TokenKind::StringEnd, quote.len());
                return Ok(());
            }
            if !raw && self.input.starts_with('\\') {
                self.advance_chars(2);
                continue;
            }
            if self.input.starts_with("${") {
                self.flush_text(text_start);
                self.push_fixed(TokenKind::TemplateStart, 2);
                self.lex_tokens(true)?;
                text_start = self.offset();
                continue;
            }
            if self.input.starts_with('$') && self.input[1..].starts_with(winnow::is_ident_start) {
                self.flush_text(text_start);
                self.input = &self.input[1..];
                let start = self.offset();
                let name = identifier
                    .parse_next(&mut self.input)
                    .map_err(|err| LexerError::at(start, err))?;
                self.push(TokenKind::Ident, name, start, start + name.len());
                text_start = self.offset();
                continue;
            }
            self.advance_chars(1);
        }
    }

    fn flush_text(&mut self, text_start: usize) {
        let end = self.offset();
        if end > text_start {
            let source = self.source;
            let text = &source[text_start..end];
            self.push(TokenKind::StringText, text, text_start, end);
        }
    }

    fn advance_chars(&mut self, count: usize) {
        let mut chars = self.input.char_indices();
        let skip = chars
            .nth(count)
            .map(|(idx, _)| idx)
            .unwrap_or(self.input.len());
        self.input = &self.input[skip..];
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RawTokenKind {
    Ident,
    QuotedIdent,
    Number,
    Char,
    Symbol,
}

fn token_parser<'a>() -> impl Parser<&'a str, RawTokenKind, ErrMode<ContextError>> {
    alt((
        number_token,
        char_token,
        quoted_identifier_token,
        ident_token,
        symbol_token,
    ))
}

fn number_token(input: &mut &str) -> ModalResult<RawTokenKind> {
    number.map(|_| RawTokenKind::Number).parse_next(input)
}

fn char_token(input: &mut &str) -> ModalResult<RawTokenKind> {
    char_literal.map(|_| RawTokenKind::Char).parse_next(input)
}

fn quoted_identifier_token(input: &mut &str) -> ModalResult<RawTokenKind> {
    backtick_identifier
        .map(|_| RawTokenKind::QuotedIdent)
        .parse_next(input)
}

fn ident_token(input: &mut &str) -> ModalResult<RawTokenKind> {
    identifier.map(|_| RawTokenKind::Ident).parse_next(input)
}

fn symbol_token(input: &mut &str) -> ModalResult<RawTokenKind> {
    if input.is_empty() {
        return Err(backtrack_err());
    }
    symbol.map(|_| RawTokenKind::Symbol).parse_next(input)
}
