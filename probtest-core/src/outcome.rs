// probtest-core/src/outcome.rs
// ============================================================================
// Module: Outcome & Sample Aggregate
// Description: The per-sample result type and the running tally the
// scheduler folds it into.
// Purpose: Replace exception-driven outcome classification with an explicit
// sum type; there is no panic propagation in the sampling hot path.
// Dependencies: std::time
// ============================================================================

use std::time::Duration;

// ============================================================================
// SECTION: Outcome
// ============================================================================

/// The result of a single sample invocation. Immutable once produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The invocation succeeded, having consumed `tokens` over `elapsed`.
    Success {
        /// Tokens consumed by this sample, as reported by the token recorder.
        tokens: i64,
        /// Wall-clock time the invocation took.
        elapsed: Duration,
    },
    /// The invocation ran but its assertion failed.
    AssertionFailure {
        /// First line only of the failure reason.
        reason: String,
        /// Tokens consumed before the assertion failed.
        tokens: i64,
        /// Wall-clock time the invocation took.
        elapsed: Duration,
    },
    /// The invocation raised an exception the caller did not expect.
    UnexpectedException {
        /// First line only of the exception's description.
        reason: String,
        /// Tokens consumed before the exception was raised.
        tokens: i64,
        /// Wall-clock time the invocation took.
        elapsed: Duration,
    },
}

impl Outcome {
    /// Tokens consumed by this sample, regardless of its classification.
    #[must_use]
    pub const fn tokens(&self) -> i64 {
        match self {
            Self::Success { tokens, .. } | Self::AssertionFailure { tokens, .. } | Self::UnexpectedException { tokens, .. } => *tokens,
        }
    }

    /// Elapsed wall-clock time for this sample.
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        match self {
            Self::Success { elapsed, .. } | Self::AssertionFailure { elapsed, .. } | Self::UnexpectedException { elapsed, .. } => *elapsed,
        }
    }

    /// Truncates a multi-line failure reason down to its first line, per the
    /// data model's "first line only" contract.
    #[must_use]
    pub fn first_line(reason: &str) -> String {
        reason.lines().next().unwrap_or_default().to_string()
    }
}

// ============================================================================
// SECTION: Sample Aggregate
// ============================================================================

/// The reason a sample loop terminated before exhausting `planned`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminationReason {
    /// No early termination; the loop ran to completion (or was never cut
    /// short).
    Completed,
    /// `failures` already exceeds what `min_pass_rate` can tolerate; the
    /// test cannot pass regardless of remaining samples.
    Impossible,
    /// `successes` already meets `min_pass_rate`; the test cannot fail
    /// regardless of remaining samples.
    Guaranteed,
    /// A budget monitor was exhausted; names the monitor and scope, e.g.
    /// `suite_time_exhausted`.
    BudgetExhausted(String),
    /// An unexpected exception aborted the test under `abort_test` policy.
    Aborted(String),
}

/// Running tally for a test, mutable only by the scheduler and read-only
/// thereafter.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleAggregate {
    /// Number of samples the configuration planned to run.
    pub planned: i64,
    /// Number of samples actually executed.
    pub executed: i64,
    /// Number of samples classified as success.
    pub successes: i64,
    /// Number of samples classified as assertion failure or (under
    /// `fail_sample` policy) unexpected exception.
    pub failures: i64,
    /// Number of samples classified as an aborting unexpected exception.
    pub unexpected_exceptions: i64,
    /// Ordered list of failure reasons, bounded by `max_example_failures`.
    pub example_failures: Vec<String>,
    /// Total tokens consumed across all executed samples.
    pub tokens_total: i64,
    /// Total wall-clock time across all executed samples.
    pub total_elapsed: Duration,
    /// Why the sample loop stopped.
    pub termination_reason: TerminationReason,
}

impl SampleAggregate {
    /// Creates a fresh, empty aggregate for a run planning `planned` samples.
    #[must_use]
    pub const fn new(planned: i64) -> Self {
        Self {
            planned,
            executed: 0,
            successes: 0,
            failures: 0,
            unexpected_exceptions: 0,
            example_failures: Vec::new(),
            tokens_total: 0,
            total_elapsed: Duration::ZERO,
            termination_reason: TerminationReason::Completed,
        }
    }

    /// The invariant every aggregate must hold:
    /// `executed = successes + failures + unexpected_exceptions` and
    /// `executed <= planned`.
    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        self.executed == self.successes + self.failures + self.unexpected_exceptions && self.executed <= self.planned
    }

    /// The observed pass rate, `successes / executed`. Returns `0.0` when no
    /// samples have executed.
    #[must_use]
    #[allow(clippy::cast_precision_loss, reason = "sample counts are small enough to round-trip exactly through f64")]
    pub fn observed_rate(&self) -> f64 {
        if self.executed == 0 {
            0.0
        } else {
            self.successes as f64 / self.executed as f64
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic, reason = "test assertions use unwrap/panic for clarity on deterministic fixtures")]
    use super::*;

    #[test]
    fn fresh_aggregate_is_consistent_and_empty() {
        let aggregate = SampleAggregate::new(10);
        assert!(aggregate.is_consistent());
        assert_eq!(aggregate.observed_rate(), 0.0);
    }

    #[test]
    fn observed_rate_divides_successes_by_executed() {
        let mut aggregate = SampleAggregate::new(10);
        aggregate.executed = 4;
        aggregate.successes = 3;
        aggregate.failures = 1;
        assert!(aggregate.is_consistent());
        assert!((aggregate.observed_rate() - 0.75).abs() < 1e-9);
    }

    #[test]
    fn inconsistent_aggregate_is_detected() {
        let mut aggregate = SampleAggregate::new(10);
        aggregate.executed = 5;
        aggregate.successes = 1;
        assert!(!aggregate.is_consistent());
    }

    #[test]
    fn first_line_truncates_multiline_reasons() {
        assert_eq!(Outcome::first_line("boom\nstack trace here"), "boom");
        assert_eq!(Outcome::first_line(""), "");
    }

    #[test]
    fn outcome_accessors_read_every_variant() {
        let success = Outcome::Success {
            tokens: 5,
            elapsed: Duration::from_millis(1),
        };
        let failure = Outcome::AssertionFailure {
            reason: "nope".to_string(),
            tokens: 3,
            elapsed: Duration::from_millis(2),
        };
        let exception = Outcome::UnexpectedException {
            reason: "boom".to_string(),
            tokens: 1,
            elapsed: Duration::from_millis(3),
        };
        assert_eq!(success.tokens(), 5);
        assert_eq!(failure.tokens(), 3);
        assert_eq!(exception.tokens(), 1);
    }
}
