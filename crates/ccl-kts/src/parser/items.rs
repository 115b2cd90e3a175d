use super::{DeclContext, ParseResult, Parser};
use crate::lexer::{Keyword, TokenKind};
use crate::tree::SyntaxKind;
use ccl_core::syntax::NodeId;

const MODIFIERS: &[&str] = &[
    "private", "public", "internal", "protected", "open", "abstract", "override", "final",
    "lateinit", "const", "inline", "data", "enum", "sealed", "inner", "companion", "operator",
    "infix", "tailrec", "suspend", "external", "annotation", "value", "noinline", "crossinline",
    "vararg", "reified",
];

#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct Modifiers {
    pub is_enum: bool,
}

impl<'t> Parser<'t> {
    /// `@Suppress("x")`, `@file:JvmName("n")`
    pub(crate) fn skip_annotations(&mut self) -> ParseResult<()> {
        while self.at_symbol("@") {
            self.bump();
            if self.peek_nth(1).is_some_and(|t| t.lexeme == ":") {
                self.bump();
                self.bump();
            }
            self.expect_ident("annotation name")?;
            while self.at_symbol(".") {
                self.bump();
                self.expect_ident("annotation name")?;
            }
            if self.at_symbol("(") && !self.at_newline() {
                self.skip_balanced("(", ")")?;
            }
        }
        Ok(())
    }

    /// Modifiers are soft keywords; one only counts when a declaration or
    /// another modifier follows it.
    pub(crate) fn parse_modifiers(&mut self) -> Modifiers {
        let mut modifiers = Modifiers::default();
        loop {
            let Some(token) = self.peek() else { break };
            if token.kind != TokenKind::Ident || !MODIFIERS.contains(&token.lexeme.as_str()) {
                break;
            }
            let followed = self.peek_nth(1).is_some_and(|next| match next.kind {
                TokenKind::Keyword(
                    Keyword::Val
                    | Keyword::Var
                    | Keyword::Fun
                    | Keyword::Class
                    | Keyword::Object
                    | Keyword::Interface,
                ) => true,
                TokenKind::Ident => MODIFIERS.contains(&next.lexeme.as_str()),
                _ => false,
            });
            if !followed {
                break;
            }
            modifiers.is_enum |= token.lexeme == "enum";
            self.bump();
        }
        modifiers
    }

    pub(crate) fn parse_property(&mut self, ctx: DeclContext, lo: usize) -> ParseResult<NodeId> {
        let mutable = self.at_keyword(Keyword::Var);
        self.bump();
        if self.at_symbol("<") {
            self.skip_balanced("<", ">")?;
        }

        // `val Project.extra: String get() = ...`
        let head_lo = self.offset();
        let mut segments = vec![self.expect_ident("property name")?.lexeme.clone()];
        while self.eat_symbol(".") {
            segments.push(self.expect_ident("property name")?.lexeme.clone());
        }
        let name = segments.pop().unwrap_or_default();

        let mut children = Vec::new();
        let receiver = if segments.is_empty() {
            None
        } else {
            let receiver = self.alloc_type_ref(segments.join("."), false, head_lo);
            children.push(receiver);
            Some(receiver)
        };
        let type_ref = if self.eat_symbol(":") {
            let ty = self.parse_type_ref()?;
            children.push(ty);
            Some(ty)
        } else {
            None
        };

        let delegated = self.at_soft_keyword("by");
        if delegated {
            self.bump();
        }
        let value = if delegated || self.eat_symbol("=") {
            let value = self.parse_expr()?;
            children.push(value);
            Some(value)
        } else {
            None
        };

        // accessor bodies on the following lines
        while self.at_soft_keyword("get") || self.at_soft_keyword("set") {
            if !self.peek_nth(1).is_some_and(|t| t.lexeme == "(") {
                break;
            }
            self.bump();
            self.skip_balanced("(", ")")?;
            if self.eat_symbol("=") {
                children.push(self.parse_expr()?);
            } else if self.at_symbol("{") {
                children.push(self.parse_block()?);
            }
        }

        let local = ctx == DeclContext::Local;
        let node = self.alloc(
            SyntaxKind::Property { mutable, local },
            lo,
            self.last_end(),
            children,
        );
        let data = self.tree.node_mut(node);
        data.name = Some(name);
        data.slots.type_ref = type_ref;
        data.slots.receiver = receiver;
        data.slots.value = value;
        Ok(node)
    }

    pub(crate) fn parse_function(&mut self, lo: usize) -> ParseResult<NodeId> {
        self.expect_keyword(Keyword::Fun)?;
        if self.at_symbol("<") {
            self.skip_balanced("<", ">")?;
        }

        // `fun name(`, `fun Receiver.name(` or `fun List<T>.name(`
        let head_lo = self.offset();
        let (mut segments, simple) = self.parse_dotted_type()?;
        let mut receiver = None;
        let name = if simple && self.at_symbol("(") {
            let name = segments.pop().unwrap_or_default();
            if !segments.is_empty() {
                let text = segments.join(".");
                receiver = Some(self.alloc_type_ref(text, false, head_lo));
            }
            name
        } else {
            let nullable = self.eat_symbol("?");
            receiver = Some(self.alloc_type_ref(segments.join("."), nullable, head_lo));
            self.expect_symbol(".")?;
            self.expect_ident("function name")?.lexeme.clone()
        };

        let mut children = Vec::new();
        children.extend(receiver);
        children.extend(self.parse_parameters(false)?);

        let type_ref = if self.eat_symbol(":") {
            let ty = self.parse_type_ref()?;
            children.push(ty);
            Some(ty)
        } else {
            None
        };
        if self.at_soft_keyword("where") {
            while !self.at_end() && !self.at_symbol("{") && !self.at_symbol("=") && !self.at_newline() {
                self.bump();
            }
        }

        let body = if self.at_symbol("{") {
            Some(self.parse_block()?)
        } else if self.eat_symbol("=") {
            Some(self.parse_expr()?)
        } else {
            None
        };
        children.extend(body);

        let node = self.alloc(SyntaxKind::Function, lo, self.last_end(), children);
        let data = self.tree.node_mut(node);
        data.name = Some(name);
        data.slots.type_ref = type_ref;
        data.slots.receiver = receiver;
        data.slots.value = body;
        Ok(node)
    }

    /// `class`, `interface` and `object` declarations, and anonymous
    /// `object : T { }` expressions.
    pub(crate) fn parse_class(&mut self, lo: usize, is_enum: bool) -> ParseResult<NodeId> {
        self.bump();
        let name = match self.peek() {
            Some(token) if token.kind == TokenKind::Ident && token.lexeme != "constructor" => {
                self.bump();
                Some(token.lexeme.clone())
            }
            _ => None,
        };
        if self.at_symbol("<") {
            self.skip_balanced("<", ">")?;
        }

        let mut children = Vec::new();
        self.skip_annotations()?;
        let visibility = self.peek().is_some_and(|t| MODIFIERS.contains(&t.lexeme.as_str()))
            && self.peek_nth(1).is_some_and(|t| t.lexeme == "constructor");
        if visibility {
            self.bump();
        }
        if self.at_soft_keyword("constructor") {
            self.bump();
        }
        if self.at_symbol("(") && !self.at_newline() {
            children.extend(self.parse_parameters(true)?);
        }

        if self.eat_symbol(":") {
            loop {
                let ty = self.parse_type_ref()?;
                children.push(ty);
                if self.at_symbol("(") && !self.at_newline() {
                    self.skip_balanced("(", ")")?;
                }
                if self.at_soft_keyword("by") {
                    self.bump();
                    children.push(self.parse_expr()?);
                }
                if !self.eat_symbol(",") {
                    break;
                }
            }
        }

        if self.at_symbol("{") {
            self.bump();
            if is_enum {
                self.skip_enum_entries()?;
            }
            children.extend(self.parse_statements(DeclContext::ClassBody, true));
            self.expect_symbol("}")?;
        }

        let node = self.alloc(SyntaxKind::Class, lo, self.last_end(), children);
        self.tree.node_mut(node).name = name;
        Ok(node)
    }

    fn skip_enum_entries(&mut self) -> ParseResult<()> {
        let mut depth = 0usize;
        while let Some(token) = self.peek() {
            if depth == 0 && token.kind == TokenKind::Symbol {
                if token.lexeme == ";" {
                    self.bump();
                    break;
                }
                if token.lexeme == "}" {
                    break;
                }
            }
            if token.kind == TokenKind::Symbol {
                match token.lexeme.as_str() {
                    "(" | "{" => depth += 1,
                    ")" | "}" => depth = depth.saturating_sub(1),
                    _ => {}
                }
            }
            self.bump();
        }
        Ok(())
    }

    pub(crate) fn skip_secondary_constructor(&mut self) -> ParseResult<()> {
        self.bump();
        self.skip_balanced("(", ")")?;
        if self.eat_symbol(":") {
            self.bump();
            self.skip_balanced("(", ")")?;
        }
        if self.at_symbol("{") {
            self.skip_balanced("{", "}")?;
        }
        Ok(())
    }

    /// `(a: Int, b: String = "x")`; `val`/`var` mark constructor properties.
    pub(crate) fn parse_parameters(&mut self, constructor: bool) -> ParseResult<Vec<NodeId>> {
        self.expect_symbol("(")?;
        let mut params = Vec::new();
        while !self.at_symbol(")") {
            let lo = self.offset();
            self.skip_annotations()?;
            self.parse_modifiers();
            if self.at_soft_keyword("vararg") {
                self.bump();
            }
            let property =
                constructor && (self.eat_keyword(Keyword::Val) || self.eat_keyword(Keyword::Var));
            let name = self.expect_ident("parameter name")?.lexeme.clone();
            let mut children = Vec::new();
            let type_ref = if self.eat_symbol(":") {
                let ty = self.parse_type_ref()?;
                children.push(ty);
                Some(ty)
            } else {
                None
            };
            let value = if self.eat_symbol("=") {
                let value = self.parse_expr()?;
                children.push(value);
                Some(value)
            } else {
                None
            };
            let param = self.alloc(
                SyntaxKind::Parameter { property },
                lo,
                self.last_end(),
                children,
            );
            let data = self.tree.node_mut(param);
            data.name = Some(name);
            data.slots.type_ref = type_ref;
            data.slots.value = value;
            params.push(param);
            if !self.eat_symbol(",") {
                break;
            }
        }
        self.expect_symbol(")")?;
        Ok(params)
    }

    /// A type reference. Generic arguments are skipped; function types
    /// collapse to `kotlin.Function`.
    pub(crate) fn parse_type_ref(&mut self) -> ParseResult<NodeId> {
        let lo = self.offset();
        self.skip_annotations()?;
        if self.at_soft_keyword("suspend") {
            self.bump();
        }
        if self.at_symbol("(") {
            self.skip_balanced("(", ")")?;
            if self.eat_symbol("->") {
                self.parse_type_ref()?;
                return Ok(self.alloc_type_ref("kotlin.Function".to_string(), false, lo));
            }
            // parenthesised `(() -> Unit)?`
            let nullable = self.eat_symbol("?");
            return Ok(self.alloc_type_ref("kotlin.Function".to_string(), nullable, lo));
        }

        let (segments, _) = self.parse_dotted_type()?;
        // receiver function type `T.() -> Unit`
        if self.at_symbol(".") && self.peek_nth(1).is_some_and(|t| t.lexeme == "(") {
            self.bump();
            self.skip_balanced("(", ")")?;
            self.expect_symbol("->")?;
            self.parse_type_ref()?;
            return Ok(self.alloc_type_ref("kotlin.Function".to_string(), false, lo));
        }
        let nullable = self.eat_symbol("?");
        Ok(self.alloc_type_ref(segments.join("."), nullable, lo))
    }

    /// `a.b.C<...>`; the flag is false when type arguments were present.
    fn parse_dotted_type(&mut self) -> ParseResult<(Vec<String>, bool)> {
        let mut segments = vec![self.expect_ident("type name")?.lexeme.clone()];
        let mut simple = true;
        loop {
            if self.at_symbol("<") {
                self.skip_balanced("<", ">")?;
                simple = false;
                break;
            }
            let continues = self.at_symbol(".")
                && self.peek_nth(1).is_some_and(|t| t.kind == TokenKind::Ident);
            if !continues {
                break;
            }
            self.bump();
            segments.push(self.expect_ident("type name")?.lexeme.clone());
        }
        Ok((segments, simple))
    }

    fn alloc_type_ref(&mut self, name: String, nullable: bool, lo: usize) -> NodeId {
        let hi = self.last_end().max(lo);
        let node = self.alloc(SyntaxKind::TypeRef { nullable }, lo, hi, Vec::new());
        self.tree.node_mut(node).name = Some(name);
        node
    }

    /// Speculatively read `<A, B<C>>` after a callee name. Restores the
    /// cursor and returns `None` when the tokens are not type arguments.
    pub(crate) fn try_type_arguments(&mut self) -> Option<Vec<String>> {
        if !self.at_symbol("<") || self.at_newline() {
            return None;
        }
        let start = self.pos;
        self.bump();
        let mut depth = 1usize;
        let mut arguments = Vec::new();
        let mut current = String::new();
        while let Some(token) = self.bump() {
            match (token.kind, token.lexeme.as_str()) {
                (TokenKind::Symbol, "<") => {
                    depth += 1;
                    current.push('<');
                }
                (TokenKind::Symbol, ">") => {
                    depth -= 1;
                    if depth == 0 {
                        arguments.push(std::mem::take(&mut current));
                        break;
                    }
                    current.push('>');
                }
                (TokenKind::Symbol, ",") if depth == 1 => arguments.push(std::mem::take(&mut current)),
                (TokenKind::Symbol, "." | "?" | "*" | ",") | (TokenKind::Ident, _) => {
                    current.push_str(&token.lexeme)
                }
                _ => {
                    self.pos = start;
                    return None;
                }
            }
        }
        let follows_call = self.at_symbol("(") || self.at_symbol("{") || self.at_symbol("::");
        if depth != 0 || !follows_call || self.at_newline() {
            self.pos = start;
            return None;
        }
        Some(
            arguments
                .into_iter()
                .map(|a| a.split('<').next().unwrap_or_default().trim().to_string())
                .collect(),
        )
    }

    pub(crate) fn expect_keyword(&mut self, keyword: Keyword) -> ParseResult<()> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(self.unexpected("keyword"))
        }
    }
}
