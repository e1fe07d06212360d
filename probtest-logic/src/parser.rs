// probtest-logic/src/parser.rs
// ============================================================================
// Module: Success Criteria Parser
// Description: Recursive-descent parser producing an `Expr` tree.
// Purpose: Parse comparisons and `&&`/`||`/`!` combinators with standard
// precedence (`!` > `&&` > `||`), with parentheses for grouping.
// Dependencies: crate::{ast, error, lexer}
// ============================================================================

//! ## Overview
//! Grammar (informal, lowest to highest precedence):
//!
//! ```text
//! or_expr    := and_expr ( "||" and_expr )*
//! and_expr   := unary ( "&&" unary )*
//! unary      := "!" unary | primary
//! primary    := "(" or_expr ")" | comparison | bool_literal
//! comparison := IDENT op literal
//! literal    := bool | number | string
//! ```

use smallvec::SmallVec;

use crate::ast::CompareOp;
use crate::ast::Expr;
use crate::ast::Literal;
use crate::error::ParseError;
use crate::lexer::Token;
use crate::lexer::tokenize;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// Parses a success-criteria expression into an [`Expr`] tree.
///
/// # Errors
///
/// Returns [`ParseError`] when `source` is empty or not well-formed.
pub fn parse(source: &str) -> Result<Expr, ParseError> {
    if source.trim().is_empty() {
        return Err(ParseError::EmptyExpression);
    }
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens,
        position: 0,
    };
    let expr = parser.parse_or()?;
    if parser.position != parser.tokens.len() {
        return Err(ParseError::UnexpectedToken {
            found: parser.tokens[parser.position].describe(),
        });
    }
    Ok(expr)
}

// ============================================================================
// SECTION: Parser State
// ============================================================================

/// Holds the token stream and cursor position for a single parse.
struct Parser {
    /// The full token stream produced by the lexer.
    tokens: Vec<Token>,
    /// Index of the next token to consume.
    position: usize,
}

impl Parser {
    /// Returns the next unconsumed token without advancing.
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    /// Consumes and returns the next token, if any.
    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    /// Parses `or_expr := and_expr ("||" and_expr)*`.
    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let first = self.parse_and()?;
        let mut rest: SmallVec<[Box<Expr>; 4]> = SmallVec::new();

        while matches!(self.peek(), Some(Token::OrOr)) {
            self.advance();
            rest.push(Box::new(self.parse_and()?));
        }

        if rest.is_empty() {
            Ok(first)
        } else {
            let mut terms: SmallVec<[Box<Expr>; 4]> = SmallVec::new();
            terms.push(Box::new(first));
            terms.extend(rest);
            Ok(Expr::Or(terms))
        }
    }

    /// Parses `and_expr := unary ("&&" unary)*`.
    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let first = self.parse_unary()?;
        let mut rest: SmallVec<[Box<Expr>; 4]> = SmallVec::new();

        while matches!(self.peek(), Some(Token::AndAnd)) {
            self.advance();
            rest.push(Box::new(self.parse_unary()?));
        }

        if rest.is_empty() {
            Ok(first)
        } else {
            let mut terms: SmallVec<[Box<Expr>; 4]> = SmallVec::new();
            terms.push(Box::new(first));
            terms.extend(rest);
            Ok(Expr::And(terms))
        }
    }

    /// Parses `unary := "!" unary | primary`.
    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if matches!(self.peek(), Some(Token::Bang)) {
            self.advance();
            let inner = self.parse_unary()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    /// Parses `primary := "(" or_expr ")" | comparison | bool_literal`.
    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        match self.advance().ok_or(ParseError::UnexpectedEndOfInput)? {
            Token::LParen => {
                let inner = self.parse_or()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(inner),
                    Some(other) => Err(ParseError::UnexpectedToken {
                        found: other.describe(),
                    }),
                    None => Err(ParseError::UnexpectedEndOfInput),
                }
            }
            Token::Ident(name) => {
                if name == "true" {
                    return Ok(Expr::Literal(true));
                }
                if name == "false" {
                    return Ok(Expr::Literal(false));
                }
                self.parse_comparison(name)
            }
            other => Err(ParseError::UnexpectedToken {
                found: other.describe(),
            }),
        }
    }

    /// Parses `comparison := op literal` given the already-consumed `key` identifier.
    fn parse_comparison(&mut self, key: String) -> Result<Expr, ParseError> {
        let op = match self.advance().ok_or(ParseError::UnexpectedEndOfInput)? {
            Token::EqEq => CompareOp::Eq,
            Token::NotEq => CompareOp::NotEq,
            Token::LessEq => CompareOp::LessOrEqual,
            Token::GreaterEq => CompareOp::GreaterOrEqual,
            Token::Less => CompareOp::LessThan,
            Token::Greater => CompareOp::GreaterThan,
            other => {
                return Err(ParseError::UnexpectedToken {
                    found: other.describe(),
                });
            }
        };

        let literal = match self.advance().ok_or(ParseError::UnexpectedEndOfInput)? {
            Token::Ident(name) if name == "true" => Literal::Bool(true),
            Token::Ident(name) if name == "false" => Literal::Bool(false),
            Token::Number(value) => Literal::Number(value),
            Token::StringLit(value) => Literal::String(value),
            other => {
                return Err(ParseError::UnexpectedToken {
                    found: other.describe(),
                });
            }
        };

        Ok(Expr::Compare {
            key,
            op,
            literal,
        })
    }
}
