// probtest-stats/src/verdict.rs
// ============================================================================
// Module: Statistical Verdict
// Description: Combines an observation with a target/confidence pair into a
// pass/fail verdict and a human-readable explanation.
// Purpose: Give callers a single call that turns raw counts into the final
// statistical judgement, without re-deriving the Wilson bound themselves.
// Dependencies: crate::{error, wilson}
// ============================================================================

use crate::error::StatsError;
use crate::wilson::wilson_lower_bound;

// ============================================================================
// SECTION: Verdict
// ============================================================================

/// The statistical verdict for an observed `(successes, trials)` outcome
/// against a `(target, confidence)` posture.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    /// Whether the Wilson score lower bound reached `target`.
    pub passed: bool,
    /// The raw observed pass rate, `successes / trials`.
    pub observed_rate: f64,
    /// The Wilson score one-sided lower bound at `confidence`.
    pub lower_bound: f64,
    /// The target pass rate the verdict was evaluated against.
    pub target: f64,
    /// The confidence level the verdict was evaluated at.
    pub confidence: f64,
    /// The probability of this verdict being a false positive (`1 - confidence`),
    /// meaningful only when `passed` is `true`.
    pub false_positive_probability: f64,
    /// A human-readable rendering of the verdict, suitable for console output.
    pub explanation: String,
}

/// Evaluates the statistical verdict for an observed outcome.
///
/// # Errors
///
/// Returns [`StatsError`] when `trials <= 0`, `successes` is out of
/// `[0, trials]`, `target` is not in `(0, 1)`, or `confidence` is not in `(0, 1)`.
pub fn evaluate_verdict(successes: i64, trials: i64, target: f64, confidence: f64) -> Result<Verdict, StatsError> {
    if !(target > 0.0 && target < 1.0) {
        return Err(StatsError::InvalidTarget {
            target,
        });
    }
    let lower_bound = wilson_lower_bound(successes, trials, confidence)?;

    #[allow(clippy::cast_precision_loss, reason = "sample counts are small enough to round-trip exactly through f64")]
    let observed_rate = successes as f64 / trials as f64;
    let passed = lower_bound >= target;
    let false_positive_probability = 1.0 - confidence;

    let explanation = render_explanation(passed, successes, trials, observed_rate, lower_bound, target, confidence, false_positive_probability);

    Ok(Verdict {
        passed,
        observed_rate,
        lower_bound,
        target,
        confidence,
        false_positive_probability,
        explanation,
    })
}

/// Renders the human-readable explanation string for a verdict.
#[allow(clippy::too_many_arguments, reason = "explanation rendering needs every verdict field; bundling them in a struct first would just move the list")]
fn render_explanation(passed: bool, successes: i64, trials: i64, observed_rate: f64, lower_bound: f64, target: f64, confidence: f64, false_positive_probability: f64) -> String {
    if passed {
        format!(
            "PASS: observed {successes}/{trials} ({:.1}% raw) gives a {:.0}% Wilson lower bound of {:.1}%, \
             meeting the {:.1}% target. Probability this pass is a false positive: {:.1}%.",
            observed_rate * 100.0,
            confidence * 100.0,
            lower_bound * 100.0,
            target * 100.0,
            false_positive_probability * 100.0,
        )
    } else {
        format!(
            "FAIL: observed {successes}/{trials} ({:.1}% raw) gives a {:.0}% Wilson lower bound of {:.1}%, \
             short of the {:.1}% target.",
            observed_rate * 100.0,
            confidence * 100.0,
            lower_bound * 100.0,
            target * 100.0,
        )
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic, reason = "test assertions use unwrap/panic for clarity on deterministic fixtures")]
    use super::*;

    #[test]
    fn strong_observation_passes_with_low_false_positive_probability() {
        let verdict = evaluate_verdict(298, 300, 0.95, 0.95).unwrap();
        assert!(verdict.passed);
        assert!((verdict.false_positive_probability - 0.05).abs() < 1e-9);
        assert!(verdict.explanation.starts_with("PASS"));
    }

    #[test]
    fn weak_observation_fails() {
        let verdict = evaluate_verdict(250, 300, 0.95, 0.95).unwrap();
        assert!(!verdict.passed);
        assert!(verdict.explanation.starts_with("FAIL"));
    }

    #[test]
    fn observed_rate_is_the_raw_ratio() {
        let verdict = evaluate_verdict(9, 10, 0.5, 0.95).unwrap();
        assert!((verdict.observed_rate - 0.9).abs() < 1e-9);
    }

    #[test]
    fn rejects_invalid_target() {
        assert!(evaluate_verdict(9, 10, 0.0, 0.95).is_err());
        assert!(evaluate_verdict(9, 10, 1.0, 0.95).is_err());
    }
}
