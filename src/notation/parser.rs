//! Einops pattern parser.
//!
//! Parses token streams produced by [`tokenize`] into an [`EinopsPattern`].

use alloc::vec::Vec;
use core::mem;

use super::axis::AxisPattern;
use super::pattern::EinopsPattern;
use super::scanner::tokenize;
use super::token::{Token, TokenKind};
use crate::error::{EinopsError, EinopsResult};

/// Parses an einops pattern string.
///
/// # Grammar
///
/// ```text
/// pattern     ::= side '->' side
/// side        ::= ( ws? term (ws term)* ws? )?
/// term        ::= axisName | '1' | '...' | '(' ws? term (ws term)* ws? ')'
/// axisName    ::= [A-Za-z_][A-Za-z0-9_]*
/// ws          ::= (' ' | '\t' | '\n')+
/// ```
///
/// # Examples
///
/// ```
/// use cubek_einops::notation::parse_pattern;
///
/// let pattern = parse_pattern("b (h w) c -> b h w c").unwrap();
/// assert_eq!(pattern.input().len(), 3);
/// assert_eq!(pattern.output().len(), 4);
/// ```
pub fn parse_pattern(pattern: &str) -> EinopsResult<EinopsPattern> {
    let tokens = tokenize(pattern)?;
    Ok(parse_tokens(&tokens)?.with_original(pattern))
}

/// Parses a token stream into an AST.
///
/// An empty side is legal here: an empty output denotes a reduction to a scalar,
/// and an empty input is only rejected once the input rank is known.
pub fn parse_tokens(tokens: &[Token]) -> EinopsResult<EinopsPattern> {
    let mut arrows = tokens
        .iter()
        .enumerate()
        .filter(|(_, t)| t.kind == TokenKind::Arrow);

    let (arrow_idx, _) = arrows.next().ok_or_else(|| {
        let end = tokens.last().map(|t| t.span.end).unwrap_or(0);
        EinopsError::parse("missing '->' between input and output", end)
    })?;

    if let Some((_, second)) = arrows.next() {
        return Err(EinopsError::parse(
            "more than one '->' in pattern",
            second.span.start,
        ));
    }

    let input = parse_side(&tokens[..arrow_idx])?;
    let output = parse_side(&tokens[arrow_idx + 1..])?;

    Ok(EinopsPattern::new(input, output))
}

/// Parses one side of the arrow into its ordered terms.
fn parse_side(tokens: &[Token]) -> EinopsResult<Vec<AxisPattern>> {
    // Open groups: position of '(' and the terms collected before it.
    let mut open: Vec<(usize, Vec<AxisPattern>)> = Vec::new();
    let mut current: Vec<AxisPattern> = Vec::new();
    let mut after_term = false;
    let mut seen_ellipsis = false;

    for token in tokens {
        let position = token.span.start;
        let starts_term = matches!(
            token.kind,
            TokenKind::Axis(_) | TokenKind::Singleton | TokenKind::Ellipsis | TokenKind::LeftParen
        );
        if starts_term && after_term {
            return Err(EinopsError::parse(
                "terms must be separated by whitespace",
                position,
            ));
        }

        match &token.kind {
            TokenKind::Whitespace => {
                after_term = false;
            }
            TokenKind::Axis(name) => {
                current.push(AxisPattern::Name(name.clone()));
                after_term = true;
            }
            TokenKind::Singleton => {
                current.push(AxisPattern::Singleton);
                after_term = true;
            }
            TokenKind::Ellipsis => {
                if seen_ellipsis {
                    return Err(EinopsError::parse(
                        "more than one '...' on one side",
                        position,
                    ));
                }
                seen_ellipsis = true;
                current.push(AxisPattern::Ellipsis);
                after_term = true;
            }
            TokenKind::LeftParen => {
                open.push((position, mem::take(&mut current)));
                after_term = false;
            }
            TokenKind::RightParen => {
                let (_, parent) = open
                    .pop()
                    .ok_or_else(|| EinopsError::parse("unmatched ')'", position))?;
                if current.is_empty() {
                    return Err(EinopsError::parse("empty '()' group", position));
                }
                let group = mem::replace(&mut current, parent);
                current.push(AxisPattern::Composite(group));
                after_term = true;
            }
            TokenKind::Arrow => {
                return Err(EinopsError::parse("unexpected '->'", position));
            }
        }
    }

    if let Some((position, _)) = open.last() {
        return Err(EinopsError::parse("unclosed '('", *position));
    }

    Ok(current)
}

/// Parses several patterns separated by `;`.
///
/// Format: `"b h w -> b (h w); b n -> n b"`
pub fn parse_pattern_chain(patterns: &str) -> EinopsResult<Vec<EinopsPattern>> {
    patterns
        .split(';')
        .map(|s| parse_pattern(s.trim()))
        .collect()
}
