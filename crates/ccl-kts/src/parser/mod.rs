//! Recursive-descent parser for Gradle Kotlin DSL scripts.
//!
//! The parser never gives up on a file: a statement it cannot make sense of
//! becomes an `Error` node covering the skipped tokens, a diagnostic is
//! recorded, and parsing resumes at the next statement boundary.

mod expr;
mod items;

use crate::lexer::{self, Keyword, LexerError, Token, TokenKind};
use crate::tree::{ScriptTree, SyntaxKind};
use ccl_core::diagnostics::{Diagnostic, DiagnosticManager};
use ccl_core::span::{SourceFile, Span};
use ccl_core::syntax::NodeId;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

const PARSER_CONTEXT: &str = "ccl.parser";

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("lex error: {0}")]
    Lex(#[from] LexerError),
    #[error("expected {expected}, found '{found}'")]
    Unexpected {
        expected: &'static str,
        found: String,
        offset: usize,
    },
    #[error("expected {expected}, found end of input")]
    UnexpectedEof { expected: &'static str },
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Parser front end; keeps the diagnostics of every file it parsed.
pub struct ScriptParser {
    diagnostics: Arc<DiagnosticManager>,
}

impl Default for ScriptParser {
    fn default() -> Self {
        Self {
            diagnostics: Arc::new(DiagnosticManager::new()),
        }
    }
}

impl ScriptParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diagnostics(&self) -> Arc<DiagnosticManager> {
        self.diagnostics.clone()
    }

    pub fn clear_diagnostics(&self) {
        self.diagnostics.clear();
    }

    /// Parse a whole script. Only a lexer failure aborts; syntax errors are
    /// recovered from and reported through [`diagnostics`](Self::diagnostics).
    pub fn parse(&self, file: SourceFile) -> ParseResult<ScriptTree> {
        let source = file.source.clone();
        let tokens = lexer::lex(&source)?;
        let mut parser = Parser::new(&tokens, ScriptTree::new(file));
        let items = parser.parse_statements(DeclContext::TopLevel, false);
        let root = parser.alloc(SyntaxKind::File, 0, source.len(), items);
        let Parser { mut tree, issues, .. } = parser;
        tree.finish(root);

        for issue in issues {
            let span = Span::new(tree.file().id, issue.lo as u32, issue.hi as u32);
            self.diagnostics.add_diagnostic(
                Diagnostic::error(issue.message)
                    .with_span(span)
                    .with_source_context(PARSER_CONTEXT),
            );
        }
        Ok(tree)
    }
}

/// Where a declaration appears; decides whether `val`/`var` is a local.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DeclContext {
    TopLevel,
    ClassBody,
    Local,
}

struct Issue {
    message: String,
    lo: usize,
    hi: usize,
}

pub(crate) struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    tree: ScriptTree,
    issues: Vec<Issue>,
}

impl<'t> Parser<'t> {
    fn new(tokens: &'t [Token], tree: ScriptTree) -> Self {
        Self {
            tokens,
            pos: 0,
            tree,
            issues: Vec::new(),
        }
    }

    // ---- token cursor -------------------------------------------------

    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn peek_nth(&self, n: usize) -> Option<&'t Token> {
        self.tokens.get(self.pos + n)
    }

    fn bump(&mut self) -> Option<&'t Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn at_symbol(&self, symbol: &str) -> bool {
        self.peek()
            .is_some_and(|t| t.kind == TokenKind::Symbol && t.lexeme == symbol)
    }

    fn at_keyword(&self, keyword: Keyword) -> bool {
        self.peek()
            .is_some_and(|t| t.kind == TokenKind::Keyword(keyword))
    }

    /// Soft keywords such as `when` or `init` lex as identifiers.
    fn at_soft_keyword(&self, word: &str) -> bool {
        self.peek()
            .is_some_and(|t| t.kind == TokenKind::Ident && t.lexeme == word)
    }

    fn at_kind(&self, kind: TokenKind) -> bool {
        self.peek().is_some_and(|t| t.kind == kind)
    }

    /// The next token starts a new line.
    fn at_newline(&self) -> bool {
        self.peek().is_some_and(|t| t.newline_before)
    }

    fn eat_symbol(&mut self, symbol: &str) -> bool {
        if self.at_symbol(symbol) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: Keyword) -> bool {
        if self.at_keyword(keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_symbol(&mut self, symbol: &'static str) -> ParseResult<&'t Token> {
        if self.at_symbol(symbol) {
            let tokens = self.tokens;
            let token = &tokens[self.pos];
            self.pos += 1;
            Ok(token)
        } else {
            Err(self.unexpected(symbol))
        }
    }

    fn expect_ident(&mut self, expected: &'static str) -> ParseResult<&'t Token> {
        match self.peek() {
            Some(token) if token.kind == TokenKind::Ident => {
                self.pos += 1;
                Ok(token)
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    fn unexpected(&self, expected: &'static str) -> ParseError {
        match self.peek() {
            Some(token) => ParseError::Unexpected {
                expected,
                found: token.lexeme.clone(),
                offset: token.span.start,
            },
            None => ParseError::UnexpectedEof { expected },
        }
    }

    /// Start offset of the next token, or end of input.
    fn offset(&self) -> usize {
        self.peek()
            .map(|t| t.span.start)
            .or_else(|| self.tokens.last().map(|t| t.span.end))
            .unwrap_or(0)
    }

    /// End offset of the last consumed token.
    fn last_end(&self) -> usize {
        self.pos
            .checked_sub(1)
            .and_then(|idx| self.tokens.get(idx))
            .map(|t| t.span.end)
            .unwrap_or(0)
    }

    fn alloc(&mut self, kind: SyntaxKind, lo: usize, hi: usize, children: Vec<NodeId>) -> NodeId {
        self.tree.alloc(kind, lo, hi, children)
    }

    fn lo_of(&self, node: NodeId) -> usize {
        self.tree.node(node).span.lo as usize
    }

    /// Skip a balanced `open ... close` group starting at the current token.
    fn skip_balanced(&mut self, open: &str, close: &str) -> ParseResult<()> {
        let mut depth = 0usize;
        loop {
            let Some(token) = self.bump() else {
                return Err(ParseError::UnexpectedEof { expected: "closing delimiter" });
            };
            if token.kind != TokenKind::Symbol {
                continue;
            }
            if token.lexeme == open {
                depth += 1;
            } else if token.lexeme == close {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Ok(());
                }
            }
        }
    }

    /// Skip the rest of the current line.
    fn skip_line(&mut self) {
        self.bump();
        while !self.at_end() && !self.at_newline() && !self.at_symbol(";") {
            self.bump();
        }
    }

    // ---- statements ---------------------------------------------------

    pub(crate) fn parse_statements(&mut self, ctx: DeclContext, in_braces: bool) -> Vec<NodeId> {
        let mut items = Vec::new();
        loop {
            while self.eat_symbol(";") {}
            if self.at_end() || (in_braces && self.at_symbol("}")) {
                break;
            }
            let start = self.pos;
            match self.parse_statement(ctx) {
                Ok(Some(node)) => items.push(node),
                Ok(None) => {}
                Err(err) => {
                    items.push(self.recover(start, err));
                    continue;
                }
            }
            let terminated = self.at_end()
                || self.at_newline()
                || self.at_symbol(";")
                || (in_braces && self.at_symbol("}"));
            if !terminated {
                let start = self.pos;
                let err = self.unexpected("end of statement");
                items.push(self.recover(start, err));
            }
        }
        items
    }

    fn parse_statement(&mut self, ctx: DeclContext) -> ParseResult<Option<NodeId>> {
        let start = self.offset();
        self.skip_annotations()?;
        if self.at_end() || self.at_symbol("}") {
            return Ok(None);
        }
        if self.at_keyword(Keyword::Import) || self.at_keyword(Keyword::Package) {
            self.skip_line();
            let node = self.alloc(SyntaxKind::Import, start, self.last_end(), Vec::new());
            return Ok(Some(node));
        }
        if self.at_keyword(Keyword::Typealias) {
            self.skip_line();
            return Ok(None);
        }

        let modifiers = self.parse_modifiers();
        match self.peek().map(|t| t.kind) {
            Some(TokenKind::Keyword(Keyword::Val)) | Some(TokenKind::Keyword(Keyword::Var)) => {
                self.parse_property(ctx, start).map(Some)
            }
            Some(TokenKind::Keyword(Keyword::Fun)) => self.parse_function(start).map(Some),
            Some(TokenKind::Keyword(Keyword::Class))
            | Some(TokenKind::Keyword(Keyword::Interface))
            | Some(TokenKind::Keyword(Keyword::Object)) => {
                self.parse_class(start, modifiers.is_enum).map(Some)
            }
            _ if ctx == DeclContext::ClassBody && self.at_soft_keyword("init") => {
                self.bump();
                self.parse_block().map(Some)
            }
            _ if ctx == DeclContext::ClassBody && self.at_soft_keyword("constructor") => {
                self.skip_secondary_constructor()?;
                Ok(None)
            }
            _ => self.parse_expression_statement().map(Some),
        }
    }

    fn parse_expression_statement(&mut self) -> ParseResult<NodeId> {
        let target = self.parse_expr()?;
        let assignment = ["=", "+=", "-=", "*=", "/=", "%="]
            .iter()
            .any(|op| self.at_symbol(op));
        if !assignment || self.at_newline() {
            return Ok(target);
        }
        self.bump();
        let value = self.parse_expr()?;
        let lo = self.lo_of(target);
        Ok(self.alloc(SyntaxKind::Assignment, lo, self.last_end(), vec![target, value]))
    }

    /// `{ statements }` as a block body.
    pub(crate) fn parse_block(&mut self) -> ParseResult<NodeId> {
        let lo = self.offset();
        self.expect_symbol("{")?;
        let statements = self.parse_statements(DeclContext::Local, true);
        self.expect_symbol("}")?;
        Ok(self.alloc(SyntaxKind::Block, lo, self.last_end(), statements))
    }

    /// Turn the tokens of a failed statement into an `Error` node.
    fn recover(&mut self, start: usize, err: ParseError) -> NodeId {
        let (lo, hi) = match &err {
            ParseError::Unexpected { offset, found, .. } => (*offset, *offset + found.len()),
            _ => (self.offset(), self.offset()),
        };
        debug!(error = %err, offset = lo, "recovering from parse error");
        self.issues.push(Issue {
            message: err.to_string(),
            lo,
            hi,
        });

        self.pos = start;
        let node_lo = self.offset();
        let mut depth = 0usize;
        let mut first = true;
        while let Some(token) = self.peek() {
            let is_symbol = |s: &str| token.kind == TokenKind::Symbol && token.lexeme == s;
            if first {
                first = false;
                self.bump();
                // a stray closing brace is skipped on its own
                if is_symbol("}") {
                    break;
                }
                depth += usize::from(is_symbol("(") || is_symbol("[") || is_symbol("{"));
                depth += usize::from(matches!(
                    token.kind,
                    TokenKind::StringStart | TokenKind::TemplateStart
                ));
                continue;
            }
            if depth == 0 && (token.newline_before || is_symbol(";") || is_symbol("}")) {
                break;
            }
            match token.kind {
                TokenKind::StringStart | TokenKind::TemplateStart => depth += 1,
                TokenKind::StringEnd | TokenKind::TemplateEnd => depth = depth.saturating_sub(1),
                TokenKind::Symbol if matches!(token.lexeme.as_str(), "(" | "[" | "{") => depth += 1,
                TokenKind::Symbol if matches!(token.lexeme.as_str(), ")" | "]" | "}") => {
                    depth = depth.saturating_sub(1)
                }
                _ => {}
            }
            self.bump();
        }
        self.alloc(SyntaxKind::Error, node_lo, self.last_end().max(node_lo), Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccl_core::syntax::SyntaxTree;
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> (ScriptTree, Vec<Diagnostic>) {
        let parser = ScriptParser::new();
        let tree = parser
            .parse(SourceFile::new(1, "build.gradle.kts", source))
            .unwrap();
        (tree, parser.diagnostics().get_diagnostics())
    }

    #[test]
    fn parses_task_registration() {
        let (tree, diagnostics) = parse(
            "tasks.register(\"myTask\") {\n    doLast {\n        println(project)\n    }\n}\n",
        );
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
        let dump = tree.dump();
        assert_eq!(
            dump,
            "File\n\
             \x20 DotQualified\n\
             \x20   NameRef tasks\n\
             \x20   Call\n\
             \x20     NameRef register\n\
             \x20     Literal(String)\n\
             \x20     Lambda\n\
             \x20       Call\n\
             \x20         NameRef doLast\n\
             \x20         Lambda\n\
             \x20           Call\n\
             \x20             NameRef println\n\
             \x20             NameRef project\n"
        );
    }

    #[test]
    fn call_spans_include_arguments() {
        let (tree, _) = parse("println(myMethod())");
        let calls = tree.find_by_text(SyntaxKind::Call, "myMethod()");
        assert_eq!(calls.len(), 1);
        let callee = tree.callee(calls[0]).unwrap();
        assert_eq!(tree.text(callee), "myMethod");
    }

    #[test]
    fn statements_end_at_line_breaks() {
        let (tree, diagnostics) = parse("val a = 1\n-2\nval b = a\n  .toString()");
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
        let root = tree.root();
        assert_eq!(tree.children(root).len(), 3);
    }

    #[test]
    fn recovers_from_broken_statements() {
        let (tree, diagnostics) = parse("val a = \nval b = )\nprintln(b)\n");
        assert_eq!(diagnostics.len(), 2);
        let kinds: Vec<_> = tree
            .children(tree.root())
            .iter()
            .map(|&c| tree.syntax_kind(c))
            .collect();
        assert_eq!(kinds.len(), 3);
        assert_eq!(kinds[2], SyntaxKind::Call);
        assert!(kinds.contains(&SyntaxKind::Error));
    }

    #[test]
    fn recovery_stays_inside_lambdas() {
        let (tree, diagnostics) = parse("tasks.register(\"t\") {\n    doLast {\n        ) oops\n        println(layout)\n    }\n}\n");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(tree.find_by_text(SyntaxKind::NameRef, "layout").len(), 1);
    }
}
