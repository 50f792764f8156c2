//! Einops pattern compilation front end.
//!
//! Supports the einops grammar:
//! - Permutation: `b h w c -> b c h w`
//! - Split/merge: `b (h ph) (w pw) c -> b h w (ph pw c)`
//! - Ellipsis: `b ... c -> b c ...`
//! - Singletons: `h w -> 1 h w`

mod axis;
mod parser;
mod pattern;
mod resolver;
mod scanner;
mod token;

pub use axis::AxisPattern;
pub use parser::{parse_pattern, parse_pattern_chain, parse_tokens};
pub use pattern::EinopsPattern;
pub use resolver::{AxisId, ResolvedPattern, TransformKind, resolve};
pub use scanner::tokenize;
pub use token::{Span, Token, TokenKind};
