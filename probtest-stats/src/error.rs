// probtest-stats/src/error.rs
// ============================================================================
// Module: Statistics Engine Errors
// Description: Domain errors for invalid statistical inputs.
// Purpose: Reject nonsensical inputs (n <= 0, p not in (0,1), confidence not
// in (0,1)) with actionable messages instead of producing NaN/Inf silently.
// Dependencies: thiserror
// ============================================================================

use thiserror::Error;

/// Errors raised when statistics engine inputs fall outside their valid domain.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum StatsError {
    /// Sample size must be strictly positive.
    #[error("sample size must be > 0, got {samples}")]
    InvalidSampleSize {
        /// The offending sample size.
        samples: i64,
    },
    /// Target pass rate must lie in the open interval (0, 1).
    #[error("target pass rate must be in (0, 1), got {target}")]
    InvalidTarget {
        /// The offending target.
        target: f64,
    },
    /// Confidence must lie in the open interval (0, 1); 0 or 1 makes
    /// finite-sample inference vacuous.
    #[error("confidence must be in (0, 1) (got {confidence}): alpha = 0 or 1 makes finite-sample inference vacuous")]
    InvalidConfidence {
        /// The offending confidence level.
        confidence: f64,
    },
    /// Minimum detectable effect must lie strictly between 0 and the baseline rate.
    #[error("minimum detectable effect must be in (0, {baseline_rate}), got {effect}")]
    InvalidMinDetectableEffect {
        /// The offending effect size.
        effect: f64,
        /// The baseline rate it was checked against.
        baseline_rate: f64,
    },
    /// Statistical power must lie in the open interval (0, 1).
    #[error("power must be in (0, 1), got {power}")]
    InvalidPower {
        /// The offending power value.
        power: f64,
    },
    /// Successes cannot exceed trials.
    #[error("successes ({successes}) cannot exceed trials ({trials})")]
    SuccessesExceedTrials {
        /// Reported successes.
        successes: i64,
        /// Reported trials.
        trials: i64,
    },
}
