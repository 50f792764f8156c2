//! Error types for einops pattern compilation and layout operations.

use alloc::string::String;

/// Coarse classification of an [`EinopsError`].
///
/// Scan and parse errors are pattern-authoring mistakes. Axis errors depend on the
/// pattern together with the call-site axis sizes. Shape errors depend on the
/// concrete input shape and must never be cached against the pattern alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    Scan,
    Parse,
    Axis,
    Shape,
    Layout,
}

/// Errors that can occur while compiling or applying an einops pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(thiserror::Error))]
pub enum EinopsError {
    /// A character outside the pattern alphabet, or a malformed axis name/ellipsis.
    #[cfg_attr(feature = "std", error("invalid character '{character}' at position {position}"))]
    InvalidCharacter { character: char, position: usize },

    /// A `-` not followed by `>`, or a dangling `>`.
    #[cfg_attr(feature = "std", error("malformed arrow at position {position}"))]
    MalformedArrow { position: usize },

    /// Structural error in the token stream.
    #[cfg_attr(feature = "std", error("parse error at position {position}: {message}"))]
    ParseError { message: String, position: usize },

    /// Duplicate, unknown or unsized axis.
    #[cfg_attr(feature = "std", error("axis error: {message}"))]
    AxisError { message: String },

    /// The pattern does not fit the concrete input shape.
    #[cfg_attr(feature = "std", error("shape error: {message}"))]
    ShapeError { message: String },

    /// Invalid request against a tensor layout.
    #[cfg_attr(feature = "std", error("layout error: {message}"))]
    LayoutError { message: String },
}

impl EinopsError {
    pub fn parse(message: impl Into<String>, position: usize) -> Self {
        Self::ParseError {
            message: message.into(),
            position,
        }
    }

    pub fn axis(message: impl Into<String>) -> Self {
        Self::AxisError {
            message: message.into(),
        }
    }

    pub fn shape(message: impl Into<String>) -> Self {
        Self::ShapeError {
            message: message.into(),
        }
    }

    pub fn layout(message: impl Into<String>) -> Self {
        Self::LayoutError {
            message: message.into(),
        }
    }

    /// Returns the taxonomy class of this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidCharacter { .. } | Self::MalformedArrow { .. } => ErrorClass::Scan,
            Self::ParseError { .. } => ErrorClass::Parse,
            Self::AxisError { .. } => ErrorClass::Axis,
            Self::ShapeError { .. } => ErrorClass::Shape,
            Self::LayoutError { .. } => ErrorClass::Layout,
        }
    }

    /// Byte position in the pattern the error points at, if any.
    pub fn position(&self) -> Option<usize> {
        match self {
            Self::InvalidCharacter { position, .. }
            | Self::MalformedArrow { position }
            | Self::ParseError { position, .. } => Some(*position),
            _ => None,
        }
    }

    /// Renders the pattern with a caret under the offending byte.
    ///
    /// ```text
    /// a b -> c-d
    ///          ^
    /// ```
    ///
    /// Errors without a position render the pattern alone.
    pub fn diagnostic(&self, pattern: &str) -> String {
        let mut out = String::from(pattern);
        if let Some(position) = self.position() {
            out.push('\n');
            // Multi-byte characters never reach a valid position, but keep the
            // marker aligned on char boundaries anyway.
            let column = pattern
                .char_indices()
                .take_while(|&(i, _)| i < position)
                .count();
            for _ in 0..column {
                out.push(' ');
            }
            out.push('^');
        }
        out
    }
}

/// Result type for einops operations.
pub type EinopsResult<T> = core::result::Result<T, EinopsError>;
