// probtest-core/src/error.rs
// ============================================================================
// Module: Core Errors
// Description: Leaf error enums for configuration resolution and scheduling.
// Purpose: Give callers typed, matchable errors distinct from a sample
// failure or a statistical verdict.
// Dependencies: thiserror
// ============================================================================

use thiserror::Error;

// ============================================================================
// SECTION: Configuration Errors
// ============================================================================

/// Errors raised while resolving or validating a test's configuration.
///
/// These correspond to error-taxonomy category 1 (misconfiguration):
/// rejected before any sample executes.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// `samples` must be a positive integer.
    #[error("samples must be > 0, got {samples}")]
    InvalidSamples {
        /// The rejected value.
        samples: i64,
    },
    /// `minPassRate` must lie in the open interval `(0, 1)`.
    #[error("minPassRate must be in (0, 1), got {min_pass_rate}")]
    InvalidMinPassRate {
        /// The rejected value.
        min_pass_rate: f64,
    },
    /// `thresholdConfidence` must lie in the open interval `(0, 1)`; `0` or
    /// `1` make finite-sample inference vacuous.
    #[error("thresholdConfidence must be in (0, 1) (alpha = 0 or 1 makes finite-sample inference vacuous), got {confidence}")]
    InvalidConfidence {
        /// The rejected value.
        confidence: f64,
    },
    /// `minDetectableEffect` must lie in `(0, min_pass_rate)`.
    #[error("minDetectableEffect must be in (0, minPassRate={min_pass_rate}), got {effect}")]
    InvalidMinDetectableEffect {
        /// The rejected value.
        effect: f64,
        /// The configured `minPassRate` the effect is measured against.
        min_pass_rate: f64,
    },
    /// Both `confidence` and `samples` were declared under confidence-first
    /// mode, which derives one from the other.
    #[error("confidence-first mode derives samples from confidence; declaring both is contradictory")]
    ConflictingConfidenceFirstInputs,
}

// ============================================================================
// SECTION: Scheduling Errors
// ============================================================================

/// Errors surfaced by the sample scheduler that abort the test outright,
/// distinct from a normal pass/fail verdict.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScheduleError {
    /// An unexpected exception was raised by a sample invocation under
    /// `exception_policy = abort_test`.
    #[error("sample {sample_index} raised an unexpected exception and exception_policy=abort_test: {reason}")]
    AbortedByException {
        /// Index of the sample that raised the exception.
        sample_index: usize,
        /// The exception's short reason string.
        reason: String,
    },
}
