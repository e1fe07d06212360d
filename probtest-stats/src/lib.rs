// probtest-stats/src/lib.rs
// ============================================================================
// Crate: probtest-stats
// Description: Statistics engine for probabilistic test verdicts.
// Purpose: Isolated, dependency-free (besides thiserror) statistics primitives
// shared by the feasibility gate, threshold derivation, and final verdicts.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! This crate has no dependency on any other component of the probabilistic
//! test framework. It accepts raw counts (`successes`, `trials`) and
//! configuration scalars (`target`, `confidence`, `power`) and returns raw
//! numbers and verdicts — it knows nothing about baselines, budgets, or
//! orchestration modes.
//!
//! - [`normal`] — the standard normal quantile function underlying every
//!   other computation in this crate.
//! - [`wilson`] — the Wilson score interval, one-sided and two-sided.
//! - [`feasibility`] — the pre-execution credibility gate.
//! - [`threshold`] — the three threshold/sample-size derivation modes.
//! - [`verdict`] — the final pass/fail judgement and its explanation.

/// Domain errors for invalid statistical inputs.
pub mod error;
pub mod feasibility;
pub mod normal;
pub mod threshold;
/// Pass/fail verdicts combining an observation with a target/confidence posture.
pub mod verdict;
pub mod wilson;

pub use error::StatsError;
pub use feasibility::{feasibility_gate, FeasibilityReport, FEASIBILITY_CRITERION};
pub use normal::inverse_cdf;
pub use threshold::{
    derive_confidence_first, derive_sample_size_first, derive_threshold_first, ConfidenceFirstResult, SampleSizeFirstResult, ThresholdFirstResult,
    SOUNDNESS_FLOOR,
};
pub use verdict::{evaluate_verdict, Verdict};
pub use wilson::{wilson_interval, wilson_lower_bound, WilsonInterval};
