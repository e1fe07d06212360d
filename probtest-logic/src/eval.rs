// probtest-logic/src/eval.rs
// ============================================================================
// Module: Success Criteria Evaluation
// Description: Pure evaluation of an `Expr` tree against an observation map.
// Purpose: Provide the single place the framework interprets outcome meaning.
// Dependencies: crate::{ast, value}, std::collections::BTreeMap
// ============================================================================

//! ## Overview
//! Evaluation is pure, total, and side-effect-free. A key absent from the
//! observation map is treated as [`Value::Null`]; any comparison against
//! `Null` (whether the left or the literal operand side) evaluates to
//! `false`. This is the only place in the framework that interprets an
//! outcome's meaning.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use crate::ast::CompareOp;
use crate::ast::Expr;
use crate::ast::Literal;
use crate::value::Value;

// ============================================================================
// SECTION: Observation
// ============================================================================

/// A single outcome's observation map: the typed keys a success criterion
/// may reference.
pub type Observation = BTreeMap<String, Value>;

// ============================================================================
// SECTION: Evaluation
// ============================================================================

/// Evaluates an expression against an observation map.
///
/// Unknown keys resolve to [`Value::Null`]; any comparison against `Null`
/// yields `false`.
#[must_use]
pub fn evaluate(expr: &Expr, observation: &Observation) -> bool {
    match expr {
        Expr::Literal(value) => *value,
        Expr::Compare {
            key,
            op,
            literal,
        } => {
            let observed = observation.get(key).unwrap_or(&Value::Null);
            evaluate_compare(observed, *op, literal)
        }
        Expr::And(terms) => terms.iter().all(|term| evaluate(term, observation)),
        Expr::Or(terms) => terms.iter().any(|term| evaluate(term, observation)),
        Expr::Not(inner) => !evaluate(inner, observation),
    }
}

/// Evaluates a single comparison. `Null` on either side always yields `false`.
fn evaluate_compare(observed: &Value, op: CompareOp, literal: &Literal) -> bool {
    if observed.is_null() {
        return false;
    }

    match (observed, literal) {
        (Value::Bool(lhs), Literal::Bool(rhs)) => compare_eq_only(lhs, rhs, op),
        (Value::Number(lhs), Literal::Number(rhs)) => compare_ordered(lhs, rhs, op),
        (Value::String(lhs), Literal::String(rhs)) => compare_ordered(&lhs.as_str(), &rhs.as_str(), op),
        // Type mismatch between the observed value and the literal: `==`/`!=`
        // are well-defined (never equal), ordering comparisons are not.
        _ => matches!(op, CompareOp::NotEq),
    }
}

/// Applies an operator that only admits equality semantics (booleans have no
/// natural ordering).
fn compare_eq_only<T: PartialEq>(lhs: &T, rhs: &T, op: CompareOp) -> bool {
    match op {
        CompareOp::Eq => lhs == rhs,
        CompareOp::NotEq => lhs != rhs,
        CompareOp::LessOrEqual
        | CompareOp::GreaterOrEqual
        | CompareOp::LessThan
        | CompareOp::GreaterThan => false,
    }
}

/// Applies a fully-ordered comparison operator.
fn compare_ordered<T: PartialOrd>(lhs: &T, rhs: &T, op: CompareOp) -> bool {
    match op {
        CompareOp::Eq => lhs == rhs,
        CompareOp::NotEq => lhs != rhs,
        CompareOp::LessOrEqual => lhs <= rhs,
        CompareOp::GreaterOrEqual => lhs >= rhs,
        CompareOp::LessThan => lhs < rhs,
        CompareOp::GreaterThan => lhs > rhs,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic, reason = "test assertions use unwrap/panic for clarity on deterministic fixtures")]
    use super::*;
    use crate::parser::parse;

    fn obs(pairs: &[(&str, Value)]) -> Observation {
        pairs.iter().map(|(k, v)| ((*k).to_string(), v.clone())).collect()
    }

    #[test]
    fn numeric_threshold_passes() {
        let expr = parse("score >= 0.8").unwrap();
        let observation = obs(&[("score", Value::Number(0.95))]);
        assert!(evaluate(&expr, &observation));
    }

    #[test]
    fn numeric_threshold_fails() {
        let expr = parse("score >= 0.8").unwrap();
        let observation = obs(&[("score", Value::Number(0.5))]);
        assert!(!evaluate(&expr, &observation));
    }

    #[test]
    fn null_comparison_is_false_not_error() {
        let expr = parse("score >= 0.8").unwrap();
        let observation = Observation::new();
        assert!(!evaluate(&expr, &observation));
    }

    #[test]
    fn null_not_equal_literal_is_still_false() {
        // Even `!=` against a missing key is false: absence never satisfies
        // a criterion, it only ever fails it.
        let expr = parse("score != 0.8").unwrap();
        let observation = Observation::new();
        assert!(!evaluate(&expr, &observation));
    }

    #[test]
    fn disjunction_short_circuits_to_true() {
        let expr = parse("a == 1 || b == 2").unwrap();
        let observation = obs(&[("b", Value::Number(2.0))]);
        assert!(evaluate(&expr, &observation));
    }

    #[test]
    fn string_equality_and_ordering() {
        let expr = parse("category == 'billing'").unwrap();
        let observation = obs(&[("category", Value::String("billing".to_string()))]);
        assert!(evaluate(&expr, &observation));

        let expr = parse("category == 'billing'").unwrap();
        let observation = obs(&[("category", Value::String("support".to_string()))]);
        assert!(!evaluate(&expr, &observation));
    }

    #[test]
    fn type_mismatch_is_unequal() {
        let expr = parse("score == 'high'").unwrap();
        let observation = obs(&[("score", Value::Number(1.0))]);
        assert!(!evaluate(&expr, &observation));
    }

    #[test]
    fn negation_inverts_result() {
        let expr = parse("!(score >= 0.8)").unwrap();
        let observation = obs(&[("score", Value::Number(0.9))]);
        assert!(!evaluate(&expr, &observation));
    }
}
