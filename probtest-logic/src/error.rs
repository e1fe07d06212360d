// probtest-logic/src/error.rs
// ============================================================================
// Module: Success Criteria Errors
// Description: Parse-time error taxonomy for the expression language.
// Purpose: Provide precise, position-aware parse diagnostics.
// Dependencies: none
// ============================================================================

//! ## Overview
//! Parsing is the only fallible stage of success-criteria handling; once an
//! [`Expr`](crate::ast::Expr) exists, evaluation is total and infallible.

use std::fmt;

// ============================================================================
// SECTION: Parse Error
// ============================================================================

/// An error produced while lexing or parsing a success-criteria expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The expression was empty or contained only whitespace.
    EmptyExpression,
    /// An unexpected character was encountered while lexing.
    UnexpectedCharacter {
        /// Offending character.
        character: char,
        /// Byte offset of the character within the source expression.
        position: usize,
    },
    /// A string literal was never closed with a matching quote.
    UnterminatedString {
        /// Byte offset where the string literal began.
        position: usize,
    },
    /// The token stream ended where more tokens were expected.
    UnexpectedEndOfInput,
    /// A token appeared where it could not be used.
    UnexpectedToken {
        /// Human-readable description of what was found.
        found: String,
    },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyExpression => write!(f, "success criteria expression is empty"),
            Self::UnexpectedCharacter {
                character,
                position,
            } => write!(f, "unexpected character '{character}' at position {position}"),
            Self::UnterminatedString {
                position,
            } => write!(f, "unterminated string literal starting at position {position}"),
            Self::UnexpectedEndOfInput => write!(f, "unexpected end of expression"),
            Self::UnexpectedToken {
                found,
            } => write!(f, "unexpected token: {found}"),
        }
    }
}

impl std::error::Error for ParseError {}
