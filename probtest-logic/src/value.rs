// probtest-logic/src/value.rs
// ============================================================================
// Module: Observation Values
// Description: Typed values carried by a single sample's observation map.
// Purpose: Provide the runtime value representation compared against literals.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Observation values are the typed keys a success-criteria expression reads.
//! They are deliberately small: booleans, numbers, and strings cover the
//! domain-specific keys use cases attach to an outcome (`isValid`, `score`,
//! `category`, ...).

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Value
// ============================================================================

/// A single typed value in an outcome's observation map.
///
/// # Invariants
/// - `Null` is never produced by a use case directly; it is the evaluator's
///   stand-in for a key absent from the observation map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    /// Boolean value.
    Bool(bool),
    /// Numeric value (integers are represented as whole-number floats).
    Number(f64),
    /// String value.
    String(String),
    /// Absence of a value. Never stored by callers; synthesized on lookup miss.
    Null,
}

impl Value {
    /// Returns true if this value is [`Value::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}
