// probtest-logic/src/ast.rs
// ============================================================================
// Module: Success Criteria AST
// Description: Boolean algebra over typed comparisons.
// Purpose: Define `Expr`, `CompareOp`, and `Literal` for the success-criteria
// expression language.
// Dependencies: smallvec, serde
// ============================================================================

//! ## Overview
//! `Expr` is a small, domain-specific Boolean algebra: comparisons are the
//! leaves, and `And` / `Or` / `Not` are the universal connectives. Unlike a
//! general-purpose predicate algebra, comparisons here carry their own
//! literal operand rather than deferring to an external evaluator, because
//! the right-hand side of a success criterion is always a literal.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use smallvec::SmallVec;

// ============================================================================
// SECTION: Comparators
// ============================================================================

/// Comparison operator supported by a success-criteria expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    /// `==`
    Eq,
    /// `!=`
    NotEq,
    /// `<=`
    LessOrEqual,
    /// `>=`
    GreaterOrEqual,
    /// `<`
    LessThan,
    /// `>`
    GreaterThan,
}

// ============================================================================
// SECTION: Literals
// ============================================================================

/// A literal operand appearing on the right-hand side of a comparison, or
/// standalone as a literal expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    /// Literal boolean (`true` / `false`).
    Bool(bool),
    /// Literal number.
    Number(f64),
    /// Literal single-quoted string.
    String(String),
}

// ============================================================================
// SECTION: Expression Tree
// ============================================================================

/// Success-criteria expression tree.
///
/// # Invariants
/// - `And` / `Or` are never constructed with zero children by the parser
///   (an empty expression is a parse error, not an empty group).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// A standalone literal boolean.
    Literal(bool),
    /// A comparison between an observation key and a literal operand.
    Compare {
        /// Observation map key being compared.
        key: String,
        /// Comparison operator.
        op: CompareOp,
        /// Literal right-hand side.
        literal: Literal,
    },
    /// Logical AND: all sub-expressions must hold.
    And(SmallVec<[Box<Self>; 4]>),
    /// Logical OR: at least one sub-expression must hold.
    Or(SmallVec<[Box<Self>; 4]>),
    /// Logical NOT: inverts the sub-expression.
    Not(Box<Self>),
}
