// probtest-logic/src/lexer.rs
// ============================================================================
// Module: Success Criteria Lexer
// Description: Tokenizer for the success-criteria expression language.
// Purpose: Convert source text into a flat token stream for the parser.
// Dependencies: crate::error
// ============================================================================

//! ## Overview
//! A minimal hand-written lexer. The language is small enough that a table-
//! driven or generated lexer would be over-engineering.

use crate::error::ParseError;

// ============================================================================
// SECTION: Tokens
// ============================================================================

/// A single lexical token.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Bare identifier (an observation key, or `true`/`false`).
    Ident(String),
    /// Numeric literal.
    Number(f64),
    /// Single-quoted string literal (quotes stripped).
    StringLit(String),
    /// `==`
    EqEq,
    /// `!=`
    NotEq,
    /// `<=`
    LessEq,
    /// `>=`
    GreaterEq,
    /// `<`
    Less,
    /// `>`
    Greater,
    /// `&&`
    AndAnd,
    /// `||`
    OrOr,
    /// `!`
    Bang,
    /// `(`
    LParen,
    /// `)`
    RParen,
}

impl Token {
    /// Returns a human-readable label for error messages.
    pub(crate) fn describe(&self) -> String {
        match self {
            Self::Ident(name) => format!("identifier '{name}'"),
            Self::Number(value) => format!("number '{value}'"),
            Self::StringLit(value) => format!("string '{value}'"),
            Self::EqEq => "'=='".to_string(),
            Self::NotEq => "'!='".to_string(),
            Self::LessEq => "'<='".to_string(),
            Self::GreaterEq => "'>='".to_string(),
            Self::Less => "'<'".to_string(),
            Self::Greater => "'>'".to_string(),
            Self::AndAnd => "'&&'".to_string(),
            Self::OrOr => "'||'".to_string(),
            Self::Bang => "'!'".to_string(),
            Self::LParen => "'('".to_string(),
            Self::RParen => "')'".to_string(),
        }
    }
}

// ============================================================================
// SECTION: Tokenizer
// ============================================================================

/// Tokenizes a success-criteria expression.
///
/// # Errors
///
/// Returns [`ParseError`] on an unexpected character or unterminated string.
pub fn tokenize(source: &str) -> Result<Vec<Token>, ParseError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut index = 0;

    while index < chars.len() {
        let ch = chars[index];

        if ch.is_whitespace() {
            index += 1;
            continue;
        }

        match ch {
            '(' => {
                tokens.push(Token::LParen);
                index += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                index += 1;
            }
            '=' if chars.get(index + 1) == Some(&'=') => {
                tokens.push(Token::EqEq);
                index += 2;
            }
            '!' if chars.get(index + 1) == Some(&'=') => {
                tokens.push(Token::NotEq);
                index += 2;
            }
            '!' => {
                tokens.push(Token::Bang);
                index += 1;
            }
            '<' if chars.get(index + 1) == Some(&'=') => {
                tokens.push(Token::LessEq);
                index += 2;
            }
            '<' => {
                tokens.push(Token::Less);
                index += 1;
            }
            '>' if chars.get(index + 1) == Some(&'=') => {
                tokens.push(Token::GreaterEq);
                index += 2;
            }
            '>' => {
                tokens.push(Token::Greater);
                index += 1;
            }
            '&' if chars.get(index + 1) == Some(&'&') => {
                tokens.push(Token::AndAnd);
                index += 2;
            }
            '|' if chars.get(index + 1) == Some(&'|') => {
                tokens.push(Token::OrOr);
                index += 2;
            }
            '\'' => {
                let (token, next) = scan_string(&chars, index)?;
                tokens.push(token);
                index = next;
            }
            c if c.is_ascii_digit() || (c == '-' && chars.get(index + 1).is_some_and(char::is_ascii_digit)) => {
                let (token, next) = scan_number(&chars, index)?;
                tokens.push(token);
                index = next;
            }
            c if c.is_alphabetic() || c == '_' => {
                let (token, next) = scan_ident(&chars, index);
                tokens.push(token);
                index = next;
            }
            other => {
                return Err(ParseError::UnexpectedCharacter {
                    character: other,
                    position: index,
                });
            }
        }
    }

    Ok(tokens)
}

/// Scans a single-quoted string literal starting at `start`. Returns the
/// token and the index just past the closing quote.
fn scan_string(chars: &[char], start: usize) -> Result<(Token, usize), ParseError> {
    let mut index = start + 1;
    let mut value = String::new();
    while index < chars.len() {
        if chars[index] == '\'' {
            return Ok((Token::StringLit(value), index + 1));
        }
        value.push(chars[index]);
        index += 1;
    }
    Err(ParseError::UnterminatedString {
        position: start,
    })
}

/// Scans a numeric literal (optionally negative) starting at `start`.
/// Returns the token and the index just past the last consumed character.
fn scan_number(chars: &[char], start: usize) -> Result<(Token, usize), ParseError> {
    let mut index = start + 1;
    while index < chars.len() && (chars[index].is_ascii_digit() || chars[index] == '.') {
        index += 1;
    }
    let text: String = chars[start..index].iter().collect();
    let value: f64 = text.parse().map_err(|_| ParseError::UnexpectedToken {
        found: format!("malformed number '{text}'"),
    })?;
    Ok((Token::Number(value), index))
}

/// Scans a bare identifier starting at `start`. Returns the token and the
/// index just past the last consumed character.
fn scan_ident(chars: &[char], start: usize) -> (Token, usize) {
    let mut index = start + 1;
    while index < chars.len() && (chars[index].is_alphanumeric() || chars[index] == '_' || chars[index] == '.') {
        index += 1;
    }
    let text: String = chars[start..index].iter().collect();
    (Token::Ident(text), index)
}
