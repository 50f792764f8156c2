//! Pattern scanner.
//!
//! Turns a pattern string like `"b (h w) c -> b h w c"` into a token stream.

use alloc::string::String;
use alloc::vec::Vec;

use super::token::{Token, TokenKind};
use crate::error::{EinopsError, EinopsResult};

/// Tokenizes an einops pattern.
///
/// Every byte of the input is covered by exactly one token, so concatenating the
/// token spans reproduces the pattern. Whitespace runs collapse into one token.
/// The empty string yields no tokens.
///
/// # Errors
///
/// - [`EinopsError::InvalidCharacter`] for characters outside
///   `[A-Za-z0-9_ \t\n()>-.]`, axis names starting with a digit (other than the
///   literal `1`), and one or two dots that do not form an ellipsis.
/// - [`EinopsError::MalformedArrow`] for `-` not followed by `>` and for a lone `>`.
pub fn tokenize(pattern: &str) -> EinopsResult<Vec<Token>> {
    let bytes = pattern.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let start = pos;
        match bytes[pos] {
            b' ' | b'\t' | b'\n' => {
                while pos < bytes.len() && matches!(bytes[pos], b' ' | b'\t' | b'\n') {
                    pos += 1;
                }
                tokens.push(Token::new(TokenKind::Whitespace, start, pos));
            }
            b'(' => {
                pos += 1;
                tokens.push(Token::new(TokenKind::LeftParen, start, pos));
            }
            b')' => {
                pos += 1;
                tokens.push(Token::new(TokenKind::RightParen, start, pos));
            }
            b'-' => {
                if bytes.get(pos + 1) != Some(&b'>') {
                    return Err(EinopsError::MalformedArrow { position: pos });
                }
                pos += 2;
                tokens.push(Token::new(TokenKind::Arrow, start, pos));
            }
            b'>' => return Err(EinopsError::MalformedArrow { position: pos }),
            b'.' => {
                if !bytes[pos..].starts_with(b"...") {
                    return Err(EinopsError::InvalidCharacter {
                        character: '.',
                        position: pos,
                    });
                }
                pos += 3;
                tokens.push(Token::new(TokenKind::Ellipsis, start, pos));
            }
            b if is_ident_byte(b) => {
                while pos < bytes.len() && is_ident_byte(bytes[pos]) {
                    pos += 1;
                }
                let word = &pattern[start..pos];
                let kind = if word == "1" {
                    TokenKind::Singleton
                } else if b.is_ascii_digit() {
                    return Err(EinopsError::InvalidCharacter {
                        character: b as char,
                        position: start,
                    });
                } else {
                    TokenKind::Axis(String::from(word))
                };
                tokens.push(Token::new(kind, start, pos));
            }
            _ => {
                // Non-ASCII bytes are reported as the full character.
                let character = pattern[pos..].chars().next().unwrap_or('\u{FFFD}');
                return Err(EinopsError::InvalidCharacter {
                    character,
                    position: pos,
                });
            }
        }
    }

    Ok(tokens)
}

#[inline]
fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}
