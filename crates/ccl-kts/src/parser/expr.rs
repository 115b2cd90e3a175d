use super::{DeclContext, ParseError, ParseResult, Parser};
use crate::lexer::{Keyword, TokenKind};
use crate::tree::{BinaryOp, LiteralKind, PrefixOp, SyntaxKind};
use ccl_core::syntax::NodeId;

#[derive(Debug, Clone, Copy)]
enum InfixOp {
    Binary(BinaryOp),
    /// `a to b`, `1 until 3`
    Named,
    Cast { safe: bool },
}

impl<'t> Parser<'t> {
    pub(crate) fn parse_expr(&mut self) -> ParseResult<NodeId> {
        self.parse_expr_prec(0)
    }

    fn parse_expr_prec(&mut self, min_prec: u8) -> ParseResult<NodeId> {
        let mut left = self.parse_prefix()?;
        loop {
            let Some((prec, op, width)) = self.peek_binop() else {
                break;
            };
            if prec < min_prec {
                break;
            }
            let lo = self.lo_of(left);
            let op_lo = self.offset();
            for _ in 0..width {
                self.bump();
            }
            left = match op {
                InfixOp::Cast { safe } => {
                    let ty = self.parse_type_ref()?;
                    self.alloc(SyntaxKind::Cast { safe }, lo, self.last_end(), vec![left, ty])
                }
                InfixOp::Binary(BinaryOp::Is) => {
                    let ty = self.parse_type_ref()?;
                    self.alloc(
                        SyntaxKind::Binary(BinaryOp::Is),
                        lo,
                        self.last_end(),
                        vec![left, ty],
                    )
                }
                InfixOp::Binary(kind) => {
                    let right = self.parse_expr_prec(prec + 1)?;
                    self.alloc(SyntaxKind::Binary(kind), lo, self.last_end(), vec![left, right])
                }
                InfixOp::Named => {
                    let name = self.tokens[self.pos - 1].lexeme.clone();
                    let operator = self.alloc(SyntaxKind::NameRef, op_lo, self.last_end(), Vec::new());
                    self.tree.node_mut(operator).name = Some(name);
                    let right = self.parse_expr_prec(prec + 1)?;
                    self.alloc(
                        SyntaxKind::Binary(BinaryOp::Comparison),
                        lo,
                        self.last_end(),
                        vec![left, operator, right],
                    )
                }
            };
        }
        Ok(left)
    }

    /// Precedence, operator and token count of the binary operator ahead.
    fn peek_binop(&self) -> Option<(u8, InfixOp, usize)> {
        let token = self.peek()?;
        let continues_line = matches!(token.lexeme.as_str(), "?:" | "&&" | "||");
        if token.newline_before && !continues_line {
            return None;
        }
        let op = match token.kind {
            TokenKind::Symbol => match token.lexeme.as_str() {
                "||" => (1, InfixOp::Binary(BinaryOp::Or), 1),
                "&&" => (2, InfixOp::Binary(BinaryOp::And), 1),
                "==" | "!=" | "===" | "!==" => (3, InfixOp::Binary(BinaryOp::Equality), 1),
                "<" | ">" | "<=" | ">=" => (4, InfixOp::Binary(BinaryOp::Comparison), 1),
                "!" => match self.peek_nth(1).map(|t| t.kind) {
                    Some(TokenKind::Keyword(Keyword::Is)) => (4, InfixOp::Binary(BinaryOp::Is), 2),
                    Some(TokenKind::Keyword(Keyword::In)) => (4, InfixOp::Binary(BinaryOp::In), 2),
                    _ => return None,
                },
                "?:" => (5, InfixOp::Binary(BinaryOp::Elvis), 1),
                ".." | "..<" => (7, InfixOp::Binary(BinaryOp::Range), 1),
                "+" | "-" => (8, InfixOp::Binary(BinaryOp::Additive), 1),
                "*" | "/" | "%" => (9, InfixOp::Binary(BinaryOp::Multiplicative), 1),
                _ => return None,
            },
            TokenKind::Keyword(Keyword::Is) => (4, InfixOp::Binary(BinaryOp::Is), 1),
            TokenKind::Keyword(Keyword::In) => (4, InfixOp::Binary(BinaryOp::In), 1),
            TokenKind::Keyword(Keyword::As) => {
                let safe = self.peek_nth(1).is_some_and(|t| t.lexeme == "?" && !t.newline_before);
                (10, InfixOp::Cast { safe }, if safe { 2 } else { 1 })
            }
            TokenKind::Ident if self.starts_operand(1) => (6, InfixOp::Named, 1),
            _ => return None,
        };
        Some(op)
    }

    /// Whether the token `n` ahead can begin an operand on the same line.
    fn starts_operand(&self, n: usize) -> bool {
        let Some(token) = self.peek_nth(n) else {
            return false;
        };
        if token.newline_before {
            return false;
        }
        match token.kind {
            TokenKind::Ident
            | TokenKind::Number
            | TokenKind::Char
            | TokenKind::StringStart
            | TokenKind::Keyword(Keyword::This | Keyword::Null | Keyword::True | Keyword::False) => {
                true
            }
            TokenKind::Symbol => token.lexeme == "(",
            _ => false,
        }
    }

    fn parse_prefix(&mut self) -> ParseResult<NodeId> {
        let op = match self.peek() {
            Some(token) if token.kind == TokenKind::Symbol => match token.lexeme.as_str() {
                "!" => Some(PrefixOp::Not),
                "-" => Some(PrefixOp::Minus),
                "+" => Some(PrefixOp::Plus),
                "++" => Some(PrefixOp::Increment),
                "--" => Some(PrefixOp::Decrement),
                _ => None,
            },
            _ => None,
        };
        let Some(op) = op else {
            let atom = self.parse_atom()?;
            return self.parse_postfix(atom);
        };
        let lo = self.offset();
        self.bump();
        let operand = self.parse_prefix()?;
        Ok(self.alloc(SyntaxKind::Prefix(op), lo, self.last_end(), vec![operand]))
    }

    fn parse_postfix(&mut self, mut expr: NodeId) -> ParseResult<NodeId> {
        loop {
            let lo = self.lo_of(expr);
            if self.at_symbol(".") || self.at_symbol("?.") {
                let safe = self.at_symbol("?.");
                self.bump();
                let selector = self.parse_selector()?;
                let kind = if safe {
                    SyntaxKind::SafeQualified
                } else {
                    SyntaxKind::DotQualified
                };
                expr = self.alloc(kind, lo, self.last_end(), vec![expr, selector]);
                continue;
            }
            if self.at_newline() {
                break;
            }
            if self.at_symbol("!!") {
                self.bump();
                expr = self.alloc(SyntaxKind::NotNull, lo, self.last_end(), vec![expr]);
            } else if self.at_symbol("++") || self.at_symbol("--") {
                self.bump();
            } else if self.at_symbol("::") {
                // `Foo::class`
                self.bump();
                if !self.eat_keyword(Keyword::Class) {
                    self.expect_ident("member name")?;
                }
                expr = self.alloc(SyntaxKind::Paren, lo, self.last_end(), vec![expr]);
            } else if self.at_symbol("[") {
                self.bump();
                let mut children = vec![expr];
                while !self.at_symbol("]") {
                    children.push(self.parse_expr()?);
                    if !self.eat_symbol(",") {
                        break;
                    }
                }
                self.expect_symbol("]")?;
                expr = self.alloc(SyntaxKind::Index, lo, self.last_end(), children);
            } else if self.at_symbol("(") || self.at_symbol("{") {
                expr = self.parse_call_suffix(expr, Vec::new())?;
            } else {
                break;
            }
        }
        Ok(expr)
    }

    /// Member name after `.`, with its call suffix when one follows.
    fn parse_selector(&mut self) -> ParseResult<NodeId> {
        let name = self.parse_name_ref()?;
        let type_arguments = self.try_type_arguments().unwrap_or_default();
        if !self.at_newline() && (self.at_symbol("(") || self.at_symbol("{")) {
            return self.parse_call_suffix(name, type_arguments);
        }
        Ok(name)
    }

    fn parse_name_ref(&mut self) -> ParseResult<NodeId> {
        let lo = self.offset();
        let name = match self.peek() {
            Some(token) if token.kind == TokenKind::Ident => token.lexeme.clone(),
            _ => return Err(self.unexpected("name")),
        };
        self.bump();
        let node = self.alloc(SyntaxKind::NameRef, lo, self.last_end(), Vec::new());
        self.tree.node_mut(node).name = Some(name);
        Ok(node)
    }

    /// `(args) { lambda }` applied to `callee`.
    fn parse_call_suffix(&mut self, callee: NodeId, type_arguments: Vec<String>) -> ParseResult<NodeId> {
        let lo = self.lo_of(callee);
        let mut children = vec![callee];
        if self.at_symbol("(") {
            self.bump();
            while !self.at_symbol(")") {
                // named argument `name = value`
                if self.peek().is_some_and(|t| t.kind == TokenKind::Ident)
                    && self.peek_nth(1).is_some_and(|t| t.lexeme == "=")
                {
                    self.bump();
                    self.bump();
                }
                if self.at_symbol("*") {
                    self.bump();
                }
                children.push(self.parse_expr()?);
                if !self.eat_symbol(",") {
                    break;
                }
            }
            self.expect_symbol(")")?;
        }
        let lambda = if self.at_symbol("{") && !self.at_newline() {
            let lambda = self.parse_lambda()?;
            children.push(lambda);
            Some(lambda)
        } else {
            None
        };
        let call = self.alloc(SyntaxKind::Call, lo, self.last_end(), children);
        let slots = &mut self.tree.node_mut(call).slots;
        slots.callee = Some(callee);
        slots.lambda = lambda;
        slots.type_arguments = type_arguments;
        Ok(call)
    }

    fn parse_atom(&mut self) -> ParseResult<NodeId> {
        let Some(token) = self.peek() else {
            return Err(ParseError::UnexpectedEof { expected: "expression" });
        };
        let lo = token.span.start;
        match token.kind {
            TokenKind::Number => {
                self.bump();
                let kind = number_kind(&token.lexeme);
                Ok(self.alloc(SyntaxKind::Literal(kind), lo, self.last_end(), Vec::new()))
            }
            TokenKind::Char => {
                self.bump();
                Ok(self.alloc(SyntaxKind::Literal(LiteralKind::Char), lo, self.last_end(), Vec::new()))
            }
            TokenKind::StringStart => self.parse_string(),
            TokenKind::Keyword(Keyword::True) | TokenKind::Keyword(Keyword::False) => {
                self.bump();
                Ok(self.alloc(SyntaxKind::Literal(LiteralKind::Boolean), lo, self.last_end(), Vec::new()))
            }
            TokenKind::Keyword(Keyword::Null) => {
                self.bump();
                Ok(self.alloc(SyntaxKind::Literal(LiteralKind::Null), lo, self.last_end(), Vec::new()))
            }
            TokenKind::Keyword(Keyword::This) | TokenKind::Keyword(Keyword::Super) => {
                self.bump();
                // `this@label`
                if self.at_symbol("@") && !self.at_newline() {
                    self.bump();
                    self.expect_ident("label")?;
                }
                Ok(self.alloc(SyntaxKind::This, lo, self.last_end(), Vec::new()))
            }
            TokenKind::Keyword(Keyword::If) => self.parse_if(),
            TokenKind::Keyword(Keyword::Return) => {
                self.bump();
                if self.at_symbol("@") && !self.at_newline() {
                    self.bump();
                    self.expect_ident("label")?;
                }
                let mut children = Vec::new();
                if !self.at_end() && !self.at_newline() && !self.at_symbol("}") && !self.at_symbol(";") {
                    children.push(self.parse_expr()?);
                }
                Ok(self.alloc(SyntaxKind::Return, lo, self.last_end(), children))
            }
            TokenKind::Keyword(Keyword::Throw) => {
                self.bump();
                let value = self.parse_expr()?;
                Ok(self.alloc(SyntaxKind::Throw, lo, self.last_end(), vec![value]))
            }
            TokenKind::Keyword(Keyword::Object) => self.parse_class(lo, false),
            TokenKind::Symbol if token.lexeme == "(" => {
                self.bump();
                let inner = self.parse_expr()?;
                self.expect_symbol(")")?;
                Ok(self.alloc(SyntaxKind::Paren, lo, self.last_end(), vec![inner]))
            }
            TokenKind::Symbol if token.lexeme == "{" => self.parse_lambda(),
            TokenKind::Symbol if token.lexeme == "::" => {
                // `::function`
                self.bump();
                let name = self.parse_name_ref()?;
                Ok(self.alloc(SyntaxKind::Paren, lo, self.last_end(), vec![name]))
            }
            TokenKind::Ident => match token.lexeme.as_str() {
                "when" if self.peek_nth(1).is_some_and(|t| t.lexeme == "(" || t.lexeme == "{") => {
                    self.parse_when()
                }
                "try" if self.peek_nth(1).is_some_and(|t| t.lexeme == "{") => self.parse_try(),
                "for" | "while" if self.peek_nth(1).is_some_and(|t| t.lexeme == "(") => {
                    self.parse_loop()
                }
                "do" if self.peek_nth(1).is_some_and(|t| t.lexeme == "{") => self.parse_do_while(),
                _ => {
                    let name = self.parse_name_ref()?;
                    match self.try_type_arguments() {
                        Some(arguments) => self.parse_call_suffix(name, arguments),
                        None => Ok(name),
                    }
                }
            },
            _ => Err(self.unexpected("expression")),
        }
    }

    /// String literal; `$name` and `${expr}` entries become children.
    fn parse_string(&mut self) -> ParseResult<NodeId> {
        let lo = self.offset();
        self.bump();
        let mut entries = Vec::new();
        loop {
            let Some(token) = self.peek() else {
                return Err(ParseError::UnexpectedEof { expected: "end of string" });
            };
            match token.kind {
                TokenKind::StringEnd => {
                    self.bump();
                    break;
                }
                TokenKind::StringText => {
                    self.bump();
                }
                TokenKind::Ident => entries.push(self.parse_name_ref()?),
                TokenKind::TemplateStart => {
                    self.bump();
                    entries.push(self.parse_expr()?);
                    if !self.at_kind(TokenKind::TemplateEnd) {
                        return Err(self.unexpected("'}'"));
                    }
                    self.bump();
                }
                _ => return Err(self.unexpected("string content")),
            }
        }
        let kind = if entries.is_empty() {
            SyntaxKind::Literal(LiteralKind::String)
        } else {
            SyntaxKind::StringTemplate
        };
        Ok(self.alloc(kind, lo, self.last_end(), entries))
    }

    /// `{ a, b -> statements }`
    pub(crate) fn parse_lambda(&mut self) -> ParseResult<NodeId> {
        let lo = self.offset();
        self.expect_symbol("{")?;
        let mut children = self.try_lambda_parameters().unwrap_or_default();
        children.extend(self.parse_statements(DeclContext::Local, true));
        self.expect_symbol("}")?;
        Ok(self.alloc(SyntaxKind::Lambda, lo, self.last_end(), children))
    }

    fn try_lambda_parameters(&mut self) -> Option<Vec<NodeId>> {
        let start = self.pos;
        let mut params = Vec::new();
        loop {
            if self.at_symbol("->") && !params.is_empty() {
                self.bump();
                return Some(params);
            }
            // `(key, value) ->` destructures into plain parameters
            let destructuring = self.eat_symbol("(");
            let parsed = loop {
                let lo = self.offset();
                let Some(token) = self.peek().filter(|t| t.kind == TokenKind::Ident) else {
                    break false;
                };
                self.bump();
                let mut children = Vec::new();
                let mut type_ref = None;
                if self.at_symbol(":") {
                    self.bump();
                    match self.parse_type_ref() {
                        Ok(ty) => {
                            children.push(ty);
                            type_ref = Some(ty);
                        }
                        Err(_) => break false,
                    }
                }
                let param = self.alloc(
                    SyntaxKind::Parameter { property: false },
                    lo,
                    self.last_end(),
                    children,
                );
                let data = self.tree.node_mut(param);
                data.name = Some(token.lexeme.clone());
                data.slots.type_ref = type_ref;
                params.push(param);
                if !destructuring || !self.eat_symbol(",") {
                    break true;
                }
            };
            if !parsed || (destructuring && !self.eat_symbol(")")) {
                break;
            }
            if !self.eat_symbol(",") && !self.at_symbol("->") {
                break;
            }
        }
        self.pos = start;
        None
    }

    fn parse_if(&mut self) -> ParseResult<NodeId> {
        let lo = self.offset();
        self.bump();
        self.expect_symbol("(")?;
        let condition = self.parse_expr()?;
        self.expect_symbol(")")?;
        let mut children = vec![condition, self.parse_branch()?];

        // `else` may sit on the next line
        let mut lookahead = self.pos;
        while self.tokens.get(lookahead).is_some_and(|t| t.lexeme == ";") {
            lookahead += 1;
        }
        if self
            .tokens
            .get(lookahead)
            .is_some_and(|t| t.kind == TokenKind::Keyword(Keyword::Else))
        {
            self.pos = lookahead + 1;
            children.push(self.parse_branch()?);
        }
        Ok(self.alloc(SyntaxKind::If, lo, self.last_end(), children))
    }

    fn parse_branch(&mut self) -> ParseResult<NodeId> {
        if self.at_symbol("{") {
            self.parse_block()
        } else {
            self.parse_expression_statement()
        }
    }

    /// `when (subject) { a, b -> x; is T -> y; else -> z }`
    fn parse_when(&mut self) -> ParseResult<NodeId> {
        let lo = self.offset();
        self.bump();
        let mut children = Vec::new();
        if self.eat_symbol("(") {
            if self.at_keyword(Keyword::Val) {
                children.push(self.parse_property(DeclContext::Local, self.offset())?);
            } else {
                children.push(self.parse_expr()?);
            }
            self.expect_symbol(")")?;
        }
        self.expect_symbol("{")?;
        loop {
            while self.eat_symbol(";") {}
            if self.at_symbol("}") || self.at_end() {
                break;
            }
            if !self.eat_keyword(Keyword::Else) {
                loop {
                    let negated = self.at_symbol("!");
                    if negated {
                        self.bump();
                    }
                    if self.eat_keyword(Keyword::Is) {
                        children.push(self.parse_type_ref()?);
                    } else {
                        self.eat_keyword(Keyword::In);
                        children.push(self.parse_expr()?);
                    }
                    if !self.eat_symbol(",") {
                        break;
                    }
                }
            }
            self.expect_symbol("->")?;
            children.push(self.parse_branch()?);
        }
        self.expect_symbol("}")?;
        Ok(self.alloc(SyntaxKind::If, lo, self.last_end(), children))
    }

    /// `try { } catch (e: T) { } finally { }`
    fn parse_try(&mut self) -> ParseResult<NodeId> {
        let lo = self.offset();
        self.bump();
        let mut children = vec![self.parse_block()?];
        loop {
            if self.at_soft_keyword("catch") {
                let catch_lo = self.offset();
                self.bump();
                let params = self.parse_parameters(false)?;
                let body = self.parse_block()?;
                let mut catch_children = params;
                catch_children.push(body);
                children.push(self.alloc(SyntaxKind::Block, catch_lo, self.last_end(), catch_children));
            } else if self.at_soft_keyword("finally") {
                self.bump();
                children.push(self.parse_block()?);
            } else {
                break;
            }
        }
        Ok(self.alloc(SyntaxKind::Block, lo, self.last_end(), children))
    }

    /// `for (x in xs) body` and `while (cond) body`
    fn parse_loop(&mut self) -> ParseResult<NodeId> {
        let lo = self.offset();
        let is_for = self.at_soft_keyword("for");
        self.bump();
        self.expect_symbol("(")?;
        let mut children = Vec::new();
        if is_for {
            let params = self.parse_loop_variables()?;
            children.extend(params);
            if !self.eat_keyword(Keyword::In) {
                return Err(self.unexpected("'in'"));
            }
        }
        children.push(self.parse_expr()?);
        self.expect_symbol(")")?;
        if !self.at_symbol(";") {
            children.push(self.parse_branch()?);
        }
        Ok(self.alloc(SyntaxKind::Block, lo, self.last_end(), children))
    }

    /// `do { body } while (cond)`
    fn parse_do_while(&mut self) -> ParseResult<NodeId> {
        let lo = self.offset();
        self.bump();
        let body = self.parse_block()?;
        if !self.at_soft_keyword("while") {
            return Err(self.unexpected("'while'"));
        }
        self.bump();
        self.expect_symbol("(")?;
        let condition = self.parse_expr()?;
        self.expect_symbol(")")?;
        Ok(self.alloc(SyntaxKind::Block, lo, self.last_end(), vec![body, condition]))
    }

    /// Loop variables of `for`: `x`, `x: T` or `(k, v)`.
    fn parse_loop_variables(&mut self) -> ParseResult<Vec<NodeId>> {
        let destructuring = self.eat_symbol("(");
        let mut params = Vec::new();
        loop {
            let lo = self.offset();
            let name = self.expect_ident("loop variable")?.lexeme.clone();
            let mut children = Vec::new();
            let type_ref = if self.eat_symbol(":") {
                let ty = self.parse_type_ref()?;
                children.push(ty);
                Some(ty)
            } else {
                None
            };
            let param = self.alloc(SyntaxKind::Parameter { property: false }, lo, self.last_end(), children);
            let data = self.tree.node_mut(param);
            data.name = Some(name);
            data.slots.type_ref = type_ref;
            params.push(param);
            if !destructuring || !self.eat_symbol(",") {
                break;
            }
        }
        if destructuring {
            self.expect_symbol(")")?;
        }
        Ok(params)
    }
}

fn number_kind(lexeme: &str) -> LiteralKind {
    let lower = lexeme.to_ascii_lowercase();
    if lower.starts_with("0x") || lower.starts_with("0b") {
        if lower.ends_with('l') {
            LiteralKind::Long
        } else {
            LiteralKind::Integer
        }
    } else if lower.ends_with('l') {
        LiteralKind::Long
    } else if lower.ends_with('f') {
        LiteralKind::Float
    } else if lower.contains('.') || lower.contains('e') {
        LiteralKind::Double
    } else {
        LiteralKind::Integer
    }
}
