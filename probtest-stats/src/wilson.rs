// probtest-stats/src/wilson.rs
// ============================================================================
// Module: Wilson Score Interval
// Description: One-sided lower bound and two-sided interval for a binomial
// proportion.
// Purpose: Provide the credibility criterion used by threshold derivation and
// the feasibility gate.
// Dependencies: crate::{error, normal}
// ============================================================================

//! ## Overview
//! For `k` successes in `n` trials at confidence `c = 1 - alpha`, let
//! `z = Phi^-1(c)`. The Wilson score one-sided lower bound is:
//!
//! ```text
//! p_lower = (p_hat + z^2/2n - z * sqrt(p_hat(1-p_hat)/n + z^2/4n^2)) / (1 + z^2/n)
//! ```
//!
//! where `p_hat = k/n`. The two-sided interval uses the same formula with
//! `z = Phi^-1(1 - alpha/2)` to produce both bounds, for display and
//! provenance only — it is never used to gate a verdict. The zero-failure
//! case (`p_hat = 1`) is valid and does not collapse to a degenerate bound.

use crate::error::StatsError;
use crate::normal::inverse_cdf;

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Checks that `trials` is positive and `successes` lies in `[0, trials]`.
const fn validate_trial(successes: i64, trials: i64) -> Result<(), StatsError> {
    if trials <= 0 {
        return Err(StatsError::InvalidSampleSize {
            samples: trials,
        });
    }
    if successes < 0 || successes > trials {
        return Err(StatsError::SuccessesExceedTrials {
            successes,
            trials,
        });
    }
    Ok(())
}

/// Resolves `confidence` to its one-sided `z` quantile, rejecting values
/// outside `(0, 1)`.
fn validate_confidence(confidence: f64) -> Result<f64, StatsError> {
    inverse_cdf(confidence).ok_or(StatsError::InvalidConfidence {
        confidence,
    })
}

// ============================================================================
// SECTION: One-Sided Lower Bound
// ============================================================================

/// Computes the Wilson score one-sided lower bound for a binomial proportion.
///
/// # Errors
///
/// Returns [`StatsError`] when `trials <= 0`, `successes` is out of
/// `[0, trials]`, or `confidence` is not in `(0, 1)`.
pub fn wilson_lower_bound(successes: i64, trials: i64, confidence: f64) -> Result<f64, StatsError> {
    validate_trial(successes, trials)?;
    let z = validate_confidence(confidence)?;
    Ok(lower_bound_with_z(successes, trials, z))
}

/// Core computation shared by the one-sided and power-derived call sites,
/// taking an already-resolved `z` value.
#[must_use]
pub(crate) fn lower_bound_with_z(successes: i64, trials: i64, z: f64) -> f64 {
    #[allow(clippy::cast_precision_loss, reason = "sample counts are small enough to round-trip exactly through f64")]
    let n = trials as f64;
    #[allow(clippy::cast_precision_loss, reason = "sample counts are small enough to round-trip exactly through f64")]
    let k = successes as f64;
    let p_hat = k / n;
    let z2 = z * z;

    let centre = p_hat + z2 / (2.0 * n);
    let spread = z * ((p_hat * (1.0 - p_hat) / n) + (z2 / (4.0 * n * n))).sqrt();
    let denom = 1.0 + z2 / n;

    ((centre - spread) / denom).clamp(0.0, 1.0)
}

// ============================================================================
// SECTION: Two-Sided Interval
// ============================================================================

/// A two-sided Wilson score confidence interval, for display/provenance only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WilsonInterval {
    /// Lower bound of the interval.
    pub lower: f64,
    /// Upper bound of the interval.
    pub upper: f64,
}

/// Computes the two-sided Wilson score interval for a binomial proportion.
///
/// # Errors
///
/// Returns [`StatsError`] when `trials <= 0`, `successes` is out of
/// `[0, trials]`, or `confidence` is not in `(0, 1)`.
pub fn wilson_interval(successes: i64, trials: i64, confidence: f64) -> Result<WilsonInterval, StatsError> {
    validate_trial(successes, trials)?;
    let alpha = 1.0 - confidence;
    let two_sided_quantile = 1.0 - alpha / 2.0;
    let z = inverse_cdf(two_sided_quantile).ok_or(StatsError::InvalidConfidence {
        confidence,
    })?;

    #[allow(clippy::cast_precision_loss, reason = "sample counts are small enough to round-trip exactly through f64")]
    let n = trials as f64;
    #[allow(clippy::cast_precision_loss, reason = "sample counts are small enough to round-trip exactly through f64")]
    let k = successes as f64;
    let p_hat = k / n;
    let z2 = z * z;

    let centre = p_hat + z2 / (2.0 * n);
    let spread = z * ((p_hat * (1.0 - p_hat) / n) + (z2 / (4.0 * n * n))).sqrt();
    let denom = 1.0 + z2 / n;

    Ok(WilsonInterval {
        lower: ((centre - spread) / denom).clamp(0.0, 1.0),
        upper: ((centre + spread) / denom).clamp(0.0, 1.0),
    })
}
