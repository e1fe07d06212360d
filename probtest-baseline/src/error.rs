// probtest-baseline/src/error.rs
// ============================================================================
// Module: Baseline Store Errors
// Description: Leaf error types for baseline/spec I/O, parsing, and
// selection, kept distinct from a sample failure or a statistical verdict.
// Purpose: Let the verdict builder map each failure mode onto the right
// hard-fail category (§7: baseline integrity violation vs configuration
// mismatch are never interchangeable).
// Dependencies: probtest-core, thiserror
// ============================================================================

use probtest_core::hashing::HashDigest;
use thiserror::Error;

// ============================================================================
// SECTION: Store Errors
// ============================================================================

/// Errors raised while listing, reading, or parsing baseline/spec files.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The baseline directory could not be listed or a file could not be read.
    #[error("baseline store io error at {path}: {source}")]
    Io {
        /// The path the failing operation targeted.
        path: String,
        /// The underlying I/O error's message.
        source: std::io::Error,
    },
    /// A candidate file's contents did not parse as valid YAML for the
    /// expected shape.
    #[error("failed to parse {path} as a baseline/spec artifact: {source}")]
    Parse {
        /// The path that failed to parse.
        path: String,
        /// The underlying deserialization error's message.
        source: serde_yaml::Error,
    },
}

// ============================================================================
// SECTION: Selection Errors
// ============================================================================

/// One covariate key that disqualified every candidate at the hard-gate
/// phase, carrying both sides of the mismatch for the error message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CovariateMismatch {
    /// The declared covariate key that disagreed.
    pub key: String,
    /// The candidate baseline's resolved value, rendered for display.
    pub baseline_value: String,
    /// The current test's resolved value, rendered for display.
    pub test_value: String,
}

/// Errors raised by [`crate::selector::select`], distinguishing a framework-
/// side baseline problem from a normal sample outcome (§7 categories 2-3).
#[derive(Debug, Error)]
pub enum SelectionError {
    /// Every candidate was eliminated during phase 1 (hard gates): either no
    /// file shares the footprint hash, or every footprint-matching file
    /// disagreed on at least one `configuration`-category covariate.
    #[error(
        "configuration_mismatch: no baseline for {use_case_id}.{method} passes the hard gate; \
         mismatched covariates: {}; run EXPLORE to compare configurations or MEASURE to establish a new baseline",
        render_mismatches(mismatches)
    )]
    ConfigurationMismatch {
        /// The use case the selector was searching for.
        use_case_id: String,
        /// The experiment method the selector was searching for.
        method: String,
        /// The disqualifying covariates, empty when no candidate shared the
        /// footprint hash at all.
        mismatches: Vec<CovariateMismatch>,
    },
    /// The selected candidate's recomputed content fingerprint did not match
    /// its stored one: the file was tampered with or hand-edited after
    /// being written.
    #[error(
        "baseline_integrity_violation: {path} fingerprint mismatch (expected {}, got {}); \
         restore from trusted source or regenerate via experiment tooling",
        expected.value, actual.value
    )]
    IntegrityViolation {
        /// The file whose fingerprint did not recompute to the stored value.
        path: String,
        /// The fingerprint recorded in the file.
        expected: HashDigest,
        /// The fingerprint recomputed from its other fields.
        actual: HashDigest,
    },
    /// A store-level I/O or parse error occurred while scanning candidates.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Canonical-hash recomputation failed while scoring a candidate.
    #[error("failed to hash covariate value while scoring a candidate: {0}")]
    Hash(#[from] probtest_core::hashing::HashError),
}

/// Renders mismatches for the [`SelectionError::ConfigurationMismatch`]
/// display string, or a fallback when the list is empty (no file shared the
/// footprint hash at all).
fn render_mismatches(mismatches: &[CovariateMismatch]) -> String {
    if mismatches.is_empty() {
        return "none share the footprint hash".to_string();
    }
    mismatches.iter().map(|mismatch| format!("{} (baseline={}, test={})", mismatch.key, mismatch.baseline_value, mismatch.test_value)).collect::<Vec<_>>().join(", ")
}
