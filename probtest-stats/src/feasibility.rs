// probtest-stats/src/feasibility.rs
// ============================================================================
// Module: Feasibility Gate
// Description: Pre-execution credibility check for a configured sample size.
// Purpose: Determine whether a configured sample size can ever distinguish
// the target pass rate from a lower rate at the declared confidence.
// Dependencies: crate::{error, normal}
// ============================================================================

//! ## Overview
//! The feasibility gate is the central credibility function of the
//! statistics engine. Given a configured sample size `n`, target pass rate
//! `p0`, and confidence `c`, it computes the minimum sample size `n_min` such
//! that a *perfect* observation (zero failures) at `n_min` trials would still
//! produce a Wilson score one-sided lower bound reaching `p0`. If the
//! configured `n` is below `n_min`, no outcome of the test — not even a
//! perfect one — could statistically support `p0` at the declared
//! confidence, and the test should hard-fail before any sample runs.

use crate::error::StatsError;
use crate::normal::inverse_cdf;

// ============================================================================
// SECTION: Feasibility Report
// ============================================================================

/// Result of evaluating the feasibility gate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeasibilityReport {
    /// Whether `configured_n >= n_min`.
    pub feasible: bool,
    /// The minimum sample size at which `target` is statistically reachable.
    pub n_min: i64,
    /// The sample size actually configured for the test.
    pub configured_n: i64,
    /// The significance level implied by the declared confidence (`1 - c`).
    pub configured_alpha: f64,
    /// The target pass rate (`p0`) being checked for feasibility.
    pub target: f64,
    /// Human-readable name of the statistical criterion applied.
    pub criterion: &'static str,
}

/// The statistical criterion name surfaced in feasibility reports and verdicts.
pub const FEASIBILITY_CRITERION: &str = "Wilson score one-sided lower bound";

// ============================================================================
// SECTION: Feasibility Gate
// ============================================================================

/// Evaluates the feasibility gate for a configured `(n, p0, c)` triple.
///
/// # Errors
///
/// Returns [`StatsError`] when `samples <= 0`, `target` is not in `(0, 1)`,
/// or `confidence` is not in `(0, 1)`.
pub fn feasibility_gate(samples: i64, target: f64, confidence: f64) -> Result<FeasibilityReport, StatsError> {
    if samples <= 0 {
        return Err(StatsError::InvalidSampleSize {
            samples,
        });
    }
    if !(target > 0.0 && target < 1.0) {
        return Err(StatsError::InvalidTarget {
            target,
        });
    }
    let z = inverse_cdf(confidence).ok_or(StatsError::InvalidConfidence {
        confidence,
    })?;

    let n_min = minimum_feasible_samples(target, z);

    Ok(FeasibilityReport {
        feasible: samples >= n_min,
        n_min,
        configured_n: samples,
        configured_alpha: 1.0 - confidence,
        target,
        criterion: FEASIBILITY_CRITERION,
    })
}

/// Computes `n_min = ceil(p0 * z^2 / (1 - p0))`.
#[must_use]
fn minimum_feasible_samples(target: f64, z: f64) -> i64 {
    let raw = target * z * z / (1.0 - target);
    #[allow(clippy::cast_possible_truncation, reason = "n_min is always a small positive count in practice")]
    let rounded = raw.ceil() as i64;
    rounded.max(1)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic, reason = "test assertions use unwrap/panic for clarity on deterministic fixtures")]
    use super::*;

    #[test]
    fn undersized_verification_sample_is_infeasible() {
        // Scenario 1 from the test-suite contract: samples=50, target=0.99,
        // confidence=0.95 should report n_min around 258 and be infeasible.
        let report = feasibility_gate(50, 0.99, 0.95).unwrap();
        assert!(!report.feasible);
        assert!(report.n_min > 250 && report.n_min < 270, "n_min={}", report.n_min);
    }

    #[test]
    fn adequately_sized_sample_is_feasible() {
        // Scenario 2: samples=300, target=0.95, confidence=0.95.
        let report = feasibility_gate(300, 0.95, 0.95).unwrap();
        assert!(report.feasible);
    }

    #[test]
    fn feasibility_is_equivalent_to_n_meeting_n_min() {
        for samples in [1_i64, 10, 50, 100, 258, 259, 300, 1000] {
            let report = feasibility_gate(samples, 0.99, 0.95).unwrap();
            assert_eq!(report.feasible, samples >= report.n_min);
        }
    }

    #[test]
    fn rejects_invalid_domain_inputs() {
        assert!(feasibility_gate(0, 0.95, 0.95).is_err());
        assert!(feasibility_gate(-5, 0.95, 0.95).is_err());
        assert!(feasibility_gate(10, 0.0, 0.95).is_err());
        assert!(feasibility_gate(10, 1.0, 0.95).is_err());
        assert!(feasibility_gate(10, 0.95, 0.0).is_err());
        assert!(feasibility_gate(10, 0.95, 1.0).is_err());
    }

    #[test]
    fn smoke_intent_with_same_parameters_is_still_infeasible_but_non_fatal_for_the_caller() {
        // The gate itself doesn't know about intent; callers decide whether
        // infeasibility is fatal (verification) or a caveat (smoke).
        let report = feasibility_gate(1, 0.95, 0.95).unwrap();
        assert!(!report.feasible);
        assert!(report.n_min > 1);
    }
}
