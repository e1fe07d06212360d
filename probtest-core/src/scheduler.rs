// probtest-core/src/scheduler.rs
// ============================================================================
// Module: Sample Scheduler & Aggregator
// Description: Executes `planned_samples` invocations sequentially against a
// host-supplied invoker, routing each outcome into a `SampleAggregate` and
// coordinating pre-/post-sample budget checks and early termination.
// Purpose: The framework's only blocking point; everything downstream
// (feasibility gate, statistics engine, verdict builder) is a pure function.
// Dependencies: crate::{budget, config, outcome}
// ============================================================================

//! ## Overview
//! Per-sample lifecycle, in strict order:
//! 1. Reset the per-sample token recorder to zero.
//! 2. Apply the pacing delay if this isn't the first sample.
//! 3. Check budgets in suite -> class -> method precedence *before*
//!    execution; either behavior under exhaustion stops the sample loop.
//! 4. Invoke, measuring elapsed time monotonically.
//! 5. Classify the outcome.
//! 6. Credit tokens consumed this sample to every active budget monitor in
//!    one logical step.
//! 7. Check for impossibility/guarantee early termination.
//! 8. Re-check budgets *after* execution.

use std::cell::Cell;
use std::time::Duration;
use std::time::Instant;

use crate::budget::BudgetStack;
use crate::config::ExceptionPolicy;
use crate::config::ResolvedConfiguration;
use crate::outcome::Outcome;
use crate::outcome::SampleAggregate;
use crate::outcome::TerminationReason;

// ============================================================================
// SECTION: Invocation
// ============================================================================

/// What a single sample invocation reported, before the scheduler attaches
/// measured tokens and elapsed time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationResult {
    /// The invocation's assertions all held.
    Success,
    /// The invocation ran but an assertion failed.
    AssertionFailure(String),
    /// The invocation raised an exception the caller did not expect.
    UnexpectedException(String),
}

/// A per-sample token counter the invoker records into as it runs, reset to
/// zero by the scheduler before each sample.
#[derive(Debug, Default)]
pub struct TokenRecorder {
    /// Running total recorded so far this sample.
    tokens: Cell<i64>,
}

impl TokenRecorder {
    /// Creates a recorder starting at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `n` tokens to this sample's running total.
    pub fn record(&self, n: i64) {
        self.tokens.set(self.tokens.get() + n);
    }

    /// Resets the counter to zero, ahead of the next sample.
    fn reset(&self) {
        self.tokens.set(0);
    }

    /// The tokens recorded so far this sample.
    fn total(&self) -> i64 {
        self.tokens.get()
    }
}

/// A host-supplied sample invoker: the one blocking point in the scheduler.
pub trait SampleInvoker {
    /// Runs one sample, recording tokens into `recorder` as it goes.
    fn invoke(&mut self, sample_index: usize, recorder: &TokenRecorder) -> InvocationResult;
}

impl<F: FnMut(usize, &TokenRecorder) -> InvocationResult> SampleInvoker for F {
    fn invoke(&mut self, sample_index: usize, recorder: &TokenRecorder) -> InvocationResult {
        self(sample_index, recorder)
    }
}

// ============================================================================
// SECTION: Run
// ============================================================================

/// Executes `config.planned_samples` invocations sequentially, returning the
/// resulting aggregate.
pub fn run_samples(config: &ResolvedConfiguration, budgets: &BudgetStack, invoker: &mut dyn SampleInvoker) -> SampleAggregate {
    let mut aggregate = SampleAggregate::new(config.planned_samples);
    let recorder = TokenRecorder::new();
    let pacing_delay = Duration::from_millis(config.pacing_delay_ms);

    #[allow(clippy::cast_sign_loss, reason = "planned_samples is validated positive by the configuration resolver before scheduling begins")]
    let planned = config.planned_samples as u64;
    #[allow(clippy::cast_possible_truncation, reason = "sample counts stay within usize range for any realistic test configuration")]
    let planned_usize = planned as usize;

    for sample_index in 0..planned {
        #[allow(clippy::cast_possible_truncation, reason = "sample indices stay within usize range for any realistic test configuration")]
        let sample_index = sample_index as usize;

        recorder.reset();

        if sample_index > 0 && config.pacing_delay_ms > 0 {
            std::thread::sleep(pacing_delay);
        }

        if let Some(reason) = budgets.first_exhausted() {
            aggregate.termination_reason = TerminationReason::BudgetExhausted(reason);
            break;
        }

        let started = Instant::now();
        let result = invoker.invoke(sample_index, &recorder);
        let elapsed = started.elapsed();
        let tokens = recorder.total();
        let outcome = to_outcome(result, tokens, elapsed);

        let should_abort = classify(&mut aggregate, outcome, config.max_example_failures, config.exception_policy);

        budgets.record_tokens_everywhere(tokens);
        aggregate.tokens_total += tokens;
        aggregate.total_elapsed += elapsed;

        if should_abort {
            break;
        }

        let samples_remain = sample_index + 1 < planned_usize;
        if samples_remain && is_impossible(&aggregate, config.min_pass_rate) {
            aggregate.termination_reason = TerminationReason::Impossible;
            break;
        }
        if samples_remain && is_guaranteed(&aggregate, config.min_pass_rate) {
            aggregate.termination_reason = TerminationReason::Guaranteed;
            break;
        }

        if let Some(reason) = budgets.first_exhausted() {
            aggregate.termination_reason = TerminationReason::BudgetExhausted(reason);
            break;
        }
    }

    aggregate
}

/// Attaches measured tokens and elapsed time to a host's raw invocation
/// result, producing the immutable [`Outcome`] the aggregator consumes.
fn to_outcome(result: InvocationResult, tokens: i64, elapsed: Duration) -> Outcome {
    match result {
        InvocationResult::Success => Outcome::Success {
            tokens,
            elapsed,
        },
        InvocationResult::AssertionFailure(reason) => Outcome::AssertionFailure {
            reason: Outcome::first_line(&reason),
            tokens,
            elapsed,
        },
        InvocationResult::UnexpectedException(reason) => Outcome::UnexpectedException {
            reason: Outcome::first_line(&reason),
            tokens,
            elapsed,
        },
    }
}

/// Folds one [`Outcome`] into `aggregate`, returning whether the scheduler
/// should abort the run (an unexpected exception under `abort_test` policy).
fn classify(aggregate: &mut SampleAggregate, outcome: Outcome, cap: usize, exception_policy: ExceptionPolicy) -> bool {
    match outcome {
        Outcome::Success {
            ..
        } => {
            aggregate.successes += 1;
            aggregate.executed += 1;
            false
        }
        Outcome::AssertionFailure {
            reason, ..
        } => {
            aggregate.failures += 1;
            aggregate.executed += 1;
            push_example_failure(aggregate, reason, cap);
            false
        }
        Outcome::UnexpectedException {
            reason, ..
        } => match exception_policy {
            ExceptionPolicy::AbortTest => {
                aggregate.unexpected_exceptions += 1;
                aggregate.executed += 1;
                aggregate.termination_reason = TerminationReason::Aborted(reason.clone());
                push_example_failure(aggregate, reason, cap);
                true
            }
            ExceptionPolicy::FailSample => {
                aggregate.failures += 1;
                aggregate.executed += 1;
                push_example_failure(aggregate, reason, cap);
                false
            }
        },
    }
}

/// Appends `reason` to the aggregate's bounded example-failure list.
fn push_example_failure(aggregate: &mut SampleAggregate, reason: String, cap: usize) {
    if aggregate.example_failures.len() < cap {
        aggregate.example_failures.push(reason);
    }
}

/// Whether enough samples have already failed that the test cannot pass
/// regardless of remaining samples.
#[allow(clippy::cast_precision_loss, reason = "sample counts are small enough to round-trip exactly through f64")]
fn is_impossible(aggregate: &SampleAggregate, min_pass_rate: f64) -> bool {
    let tolerance = aggregate.planned as f64 * (1.0 - min_pass_rate);
    aggregate.failures as f64 > tolerance
}

/// Whether enough samples have already succeeded that the test cannot fail
/// regardless of remaining samples.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss, reason = "sample counts are small enough to round-trip exactly through f64")]
fn is_guaranteed(aggregate: &SampleAggregate, min_pass_rate: f64) -> bool {
    let required = (aggregate.planned as f64 * min_pass_rate).ceil() as i64;
    aggregate.successes >= required
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic, reason = "test assertions use unwrap/panic for clarity on deterministic fixtures")]
    use super::*;
    use crate::config::BudgetExhaustedBehavior;
    use crate::config::Intent;
    use crate::config::ThresholdOrigin;

    fn base_config(planned: i64, min_pass_rate: f64) -> ResolvedConfiguration {
        ResolvedConfiguration {
            planned_samples: planned,
            min_pass_rate,
            threshold_confidence: 0.95,
            intent: Intent::Verification,
            exception_policy: ExceptionPolicy::FailSample,
            max_example_failures: 5,
            budget_exhausted_behavior: BudgetExhaustedBehavior::EvaluatePartial,
            pacing_delay_ms: 0,
            threshold_origin: ThresholdOrigin::Unspecified,
            min_detectable_effect: None,
        }
    }

    #[test]
    fn runs_all_planned_samples_when_nothing_terminates_early() {
        let config = base_config(10, 0.91);
        let budgets = BudgetStack::new(None, None, None);
        let mut invoker = |_index: usize, _recorder: &TokenRecorder| InvocationResult::Success;
        let aggregate = run_samples(&config, &budgets, &mut invoker);
        assert_eq!(aggregate.executed, 10);
        assert_eq!(aggregate.successes, 10);
        assert!(aggregate.is_consistent());
        assert_eq!(aggregate.termination_reason, TerminationReason::Completed);
    }

    #[test]
    fn terminates_early_as_guaranteed_once_min_pass_rate_is_met() {
        let config = base_config(100, 0.5);
        let budgets = BudgetStack::new(None, None, None);
        let mut invoker = |_index: usize, _recorder: &TokenRecorder| InvocationResult::Success;
        let aggregate = run_samples(&config, &budgets, &mut invoker);
        assert!(aggregate.executed < 100);
        assert_eq!(aggregate.termination_reason, TerminationReason::Guaranteed);
    }

    #[test]
    fn terminates_early_as_impossible_once_failures_exceed_tolerance() {
        let config = base_config(100, 0.99);
        let budgets = BudgetStack::new(None, None, None);
        let mut invoker = |_index: usize, _recorder: &TokenRecorder| InvocationResult::AssertionFailure("nope".to_string());
        let aggregate = run_samples(&config, &budgets, &mut invoker);
        assert!(aggregate.executed < 100);
        assert_eq!(aggregate.termination_reason, TerminationReason::Impossible);
    }

    #[test]
    fn abort_test_policy_stops_on_the_first_unexpected_exception() {
        let mut config = base_config(10, 0.5);
        config.exception_policy = ExceptionPolicy::AbortTest;
        let budgets = BudgetStack::new(None, None, None);
        let mut invoker = |index: usize, _recorder: &TokenRecorder| {
            if index == 2 {
                InvocationResult::UnexpectedException("boom".to_string())
            } else {
                InvocationResult::Success
            }
        };
        let aggregate = run_samples(&config, &budgets, &mut invoker);
        assert_eq!(aggregate.executed, 3);
        assert_eq!(aggregate.unexpected_exceptions, 1);
        assert_eq!(aggregate.termination_reason, TerminationReason::Aborted("boom".to_string()));
    }

    #[test]
    fn fail_sample_policy_treats_exceptions_as_ordinary_failures() {
        let config = base_config(5, 0.5);
        let budgets = BudgetStack::new(None, None, None);
        let mut invoker = |index: usize, _recorder: &TokenRecorder| {
            if index == 0 {
                InvocationResult::UnexpectedException("boom".to_string())
            } else {
                InvocationResult::Success
            }
        };
        let aggregate = run_samples(&config, &budgets, &mut invoker);
        assert_eq!(aggregate.failures, 1);
        assert_eq!(aggregate.unexpected_exceptions, 0);
    }

    #[test]
    fn example_failures_are_capped_and_preserve_encounter_order() {
        let mut config = base_config(10, 0.01);
        config.max_example_failures = 2;
        let budgets = BudgetStack::new(None, None, None);
        let mut invoker = |index: usize, _recorder: &TokenRecorder| InvocationResult::AssertionFailure(format!("fail-{index}"));
        let aggregate = run_samples(&config, &budgets, &mut invoker);
        assert_eq!(aggregate.example_failures, vec!["fail-0".to_string(), "fail-1".to_string()]);
    }

    #[test]
    fn budget_exhaustion_stops_the_loop_and_names_the_reason() {
        let config = base_config(100, 0.99);
        let method = std::sync::Arc::new(crate::budget::BudgetMonitor::new(crate::budget::BudgetScope::Method, 0, 3));
        let budgets = BudgetStack::new(None, None, Some(method));
        let mut invoker = |_index: usize, recorder: &TokenRecorder| {
            recorder.record(2);
            InvocationResult::Success
        };
        let aggregate = run_samples(&config, &budgets, &mut invoker);
        assert!(aggregate.executed < 100);
        assert_eq!(aggregate.termination_reason, TerminationReason::BudgetExhausted("method_token_exhausted".to_string()));
    }

    #[test]
    fn tokens_are_credited_to_every_active_monitor() {
        let config = base_config(3, 0.99);
        let suite = std::sync::Arc::new(crate::budget::BudgetMonitor::new(crate::budget::BudgetScope::Suite, 0, 0));
        let budgets = BudgetStack::new(Some(suite.clone()), None, None);
        let mut invoker = |_index: usize, recorder: &TokenRecorder| {
            recorder.record(10);
            InvocationResult::Success
        };
        let aggregate = run_samples(&config, &budgets, &mut invoker);
        assert_eq!(aggregate.tokens_total, 30);
        assert_eq!(suite.tokens_consumed(), 30);
    }
}
