use winnow::combinator::{alt, cut_err, opt, repeat};
use winnow::error::{ContextError, ErrMode};
use winnow::token::{literal, take_till, take_until, take_while};
use winnow::{ModalResult, Parser};

pub(crate) const MULTI_PUNCT: &[&str] = &[
    "===", "!==", "..<", "?.", "?:", "!!", "::", "->", "==", "!=", "<=", ">=", "&&", "||", "+=",
    "-=", "*=", "/=", "%=", "++", "--", "..",
];
pub(crate) const SINGLE_PUNCT: &str = "=+-*/%!<>?:;,.()[]{}@&|";

/// Skip whitespace and comments, reporting whether a line break was crossed.
pub(crate) fn trivia(input: &mut &str) -> ModalResult<bool> {
    let before = *input;
    repeat::<_, _, (), _, _>(0.., alt((whitespace, line_comment, block_comment)))
        .parse_next(input)?;
    let consumed = &before[..before.len() - input.len()];
    Ok(consumed.contains('\n'))
}

pub(crate) fn whitespace(input: &mut &str) -> ModalResult<()> {
    take_while(1.., char::is_whitespace)
        .map(|_| ())
        .parse_next(input)
}

pub(crate) fn line_comment(input: &mut &str) -> ModalResult<()> {
    literal("//").parse_next(input)?;
    take_till(0.., |c: char| c == '\n').parse_next(input)?;
    opt(literal("\n")).parse_next(input)?;
    Ok(())
}

pub(crate) fn block_comment(input: &mut &str) -> ModalResult<()> {
    literal("/*").parse_next(input)?;
    cut_err(take_until(0.., "*/")).parse_next(input)?;
    literal("*/").parse_next(input)?;
    Ok(())
}

/// `'a'`, `'\n'`, `'A'`
pub(crate) fn char_literal(input: &mut &str) -> ModalResult<()> {
    literal("'").parse_next(input)?;
    let slice = *input;
    let mut chars = slice.char_indices();
    let mut escape = false;
    for (idx, ch) in chars.by_ref() {
        if ch == '\\' && !escape {
            escape = true;
            continue;
        }
        if ch == '\'' && !escape {
            *input = &slice[idx + 1..];
            return Ok(());
        }
        if ch == '\n' {
            break;
        }
        escape = false;
    }
    Err(ErrMode::Cut(ContextError::new()))
}

/// `` `name with spaces` ``; returns the name without backticks.
pub(crate) fn backtick_identifier<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    literal("`").parse_next(input)?;
    let name = cut_err(take_till(1.., |c: char| c == '`' || c == '\n')).parse_next(input)?;
    cut_err(literal("`")).parse_next(input)?;
    Ok(name)
}

pub(crate) fn number(input: &mut &str) -> ModalResult<()> {
    take_while(1.., |c: char| c.is_ascii_digit()).parse_next(input)?;
    take_while(0.., |c: char| c.is_ascii_alphanumeric() || c == '_').parse_next(input)?;
    let mut chars = input.chars();
    if chars.next() == Some('.') && chars.next().is_some_and(|c| c.is_ascii_digit()) {
        literal(".").parse_next(input)?;
        take_while(1.., |c: char| c.is_ascii_alphanumeric() || c == '_').parse_next(input)?;
    }
    Ok(())
}

pub(crate) fn identifier<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    (take_while(1.., is_ident_start), take_while(0.., is_ident_continue))
        .take()
        .parse_next(input)
}

pub(crate) fn symbol<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    let slice: &'a str = *input;
    for sym in MULTI_PUNCT {
        if let Some(rest) = slice.strip_prefix(sym) {
            *input = rest;
            return Ok(&slice[..sym.len()]);
        }
    }
    take_while(1..=1, |c: char| SINGLE_PUNCT.contains(c)).parse_next(input)
}

pub(crate) fn is_ident_start(ch: char) -> bool {
    ch == '_' || ch.is_alphabetic()
}

pub(crate) fn is_ident_continue(ch: char) -> bool {
    ch == '_' || ch.is_alphanumeric()
}

pub(crate) fn backtrack_err() -> ErrMode<ContextError> {
    ErrMode::Backtrack(ContextError::new())
}
