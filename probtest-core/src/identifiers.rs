// probtest-core/src/identifiers.rs
// ============================================================================
// Module: Identifiers
// Description: Canonical opaque identifiers for use cases, experiment
// methods, and specification versions.
// Purpose: Provide strongly typed, serializable IDs with stable string forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Identifiers are opaque and serialize as strings. Validation is handled at
//! the configuration-resolver or orchestrator boundary rather than within
//! these simple wrappers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

/// Identifier for a use case under test, the unit a baseline/spec is keyed by.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UseCaseId(String);

impl UseCaseId {
    /// Creates a new use-case identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UseCaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for UseCaseId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for UseCaseId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Identifier for the experiment method invoked against a use case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MethodName(String);

impl MethodName {
    /// Creates a new method name.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MethodName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for MethodName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for MethodName {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Version tag for an approved execution specification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpecVersion(String);

impl SpecVersion {
    /// Creates a new specification version.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SpecVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for SpecVersion {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SpecVersion {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic, reason = "test assertions use unwrap/panic for clarity on deterministic fixtures")]
    use super::*;

    #[test]
    fn identifiers_round_trip_through_display() {
        let use_case = UseCaseId::from("checkout-flow");
        assert_eq!(use_case.as_str(), "checkout-flow");
        assert_eq!(use_case.to_string(), "checkout-flow");
    }

    #[test]
    fn identifiers_compare_by_value() {
        assert_eq!(MethodName::new("classify"), MethodName::new("classify"));
        assert_ne!(MethodName::new("classify"), MethodName::new("summarize"));
    }

    #[test]
    fn identifiers_serialize_as_bare_strings() {
        let version = SpecVersion::new("v3");
        let json = serde_json::to_string(&version).unwrap();
        assert_eq!(json, "\"v3\"");
    }
}
