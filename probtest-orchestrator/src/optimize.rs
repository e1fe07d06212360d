// probtest-orchestrator/src/optimize.rs
// ============================================================================
// Module: OPTIMIZE Mode
// Description: Mutates a single treatment factor across iterations, scoring
// each against a caller-supplied objective until a caller-supplied
// termination policy signals a stop.
// Purpose: Search a treatment factor's value space (e.g. a prompt variant,
// a temperature) without the orchestrator itself knowing what "better"
// means — that decision stays with the caller's scorer/mutator/policy.
// Dependencies: probtest-core, probtest-orchestrator::statistics
// ============================================================================

use std::time::Duration;
use std::time::Instant;

use probtest_core::BudgetStack;
use probtest_core::FactorSuit;
use probtest_core::baseline::FactorValue;
use probtest_core::ResolvedConfiguration;
use probtest_core::SampleAggregate;
use probtest_core::SampleInvoker;
use probtest_core::TokenRecorder;
use probtest_core::baseline::IterationAggregate;
use probtest_core::baseline::IterationStatus;
use probtest_core::baseline::OptimizationHistory;
use probtest_core::baseline::Statistics;
use probtest_core::run_samples;
use time::OffsetDateTime;

use crate::statistics::compute_statistics;

/// Whether higher or lower scores are better, the direction `best_iteration`
/// is chosen by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Objective {
    /// Higher scores are better.
    Maximize,
    /// Lower scores are better.
    Minimize,
}

/// A pure function from one iteration's result to a scalar score.
///
/// Returning `Err` marks the iteration `scoring_failed` and ends the run.
pub trait Scorer {
    /// Scores one completed iteration.
    ///
    /// # Errors
    ///
    /// Returns an error message describing why this iteration's result
    /// could not be scored.
    fn score(&mut self, statistics: &Statistics, aggregate: &SampleAggregate) -> Result<f64, String>;
}

impl<F: FnMut(&Statistics, &SampleAggregate) -> Result<f64, String>> Scorer for F {
    fn score(&mut self, statistics: &Statistics, aggregate: &SampleAggregate) -> Result<f64, String> {
        self(statistics, aggregate)
    }
}

/// Proposes the next treatment value from the current one and the history
/// accumulated so far.
///
/// Returning `Err` marks the run `mutation_failed` and ends it without
/// running the next iteration.
pub trait Mutator {
    /// Proposes the next treatment value.
    ///
    /// # Errors
    ///
    /// Returns an error message describing why no further value could be
    /// proposed.
    fn mutate(&mut self, current: &FactorValue, history: &[IterationAggregate]) -> Result<FactorValue, String>;
}

impl<F: FnMut(&FactorValue, &[IterationAggregate]) -> Result<FactorValue, String>> Mutator for F {
    fn mutate(&mut self, current: &FactorValue, history: &[IterationAggregate]) -> Result<FactorValue, String> {
        self(current, history)
    }
}

/// Decides whether an optimization run should stop, inspecting the history
/// accumulated so far and the wall-clock time elapsed since it started.
pub trait TerminationPolicy {
    /// Returns `Some(reason)` once the run should stop.
    fn should_terminate(&mut self, history: &[IterationAggregate], elapsed: Duration) -> Option<String>;
}

impl<F: FnMut(&[IterationAggregate], Duration) -> Option<String>> TerminationPolicy for F {
    fn should_terminate(&mut self, history: &[IterationAggregate], elapsed: Duration) -> Option<String> {
        self(history, elapsed)
    }
}

/// Builds a termination policy that stops once `limit` iterations have run.
#[must_use]
pub fn max_iterations(limit: usize) -> impl TerminationPolicy {
    move |history: &[IterationAggregate], _elapsed: Duration| (history.len() >= limit).then(|| "max_iterations".to_string())
}

/// Builds a termination policy that stops once `window` consecutive
/// iterations have passed without the best (per `objective`) improving.
#[must_use]
pub fn no_improvement_window(window: usize, objective: Objective) -> impl TerminationPolicy {
    move |history: &[IterationAggregate], _elapsed: Duration| {
        let best_index = best_completed_index(history, objective)?;
        (history.len() - 1 - best_index >= window).then(|| "no_improvement_window".to_string())
    }
}

/// Builds a termination policy that stops once `budget` wall-clock time has
/// elapsed since the run started.
#[must_use]
pub fn time_budget(budget: Duration) -> impl TerminationPolicy {
    move |_history: &[IterationAggregate], elapsed: Duration| (elapsed >= budget).then(|| "time_budget".to_string())
}

/// The index of the best-scoring `Completed` iteration in `history`, by
/// `objective`, or `None` if none have completed yet. Ties favor the
/// earlier iteration.
fn best_completed_index(history: &[IterationAggregate], objective: Objective) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (index, iteration) in history.iter().enumerate() {
        if iteration.status != IterationStatus::Completed {
            continue;
        }
        let improves = match (best, objective) {
            (None, _) => true,
            (Some((_, best_score)), Objective::Maximize) => iteration.score > best_score,
            (Some((_, best_score)), Objective::Minimize) => iteration.score < best_score,
        };
        if improves {
            best = Some((index, iteration.score));
        }
    }
    best.map(|(index, _)| index)
}

/// Runs OPTIMIZE: mutates `treatment_key`'s value within `fixed_factors`
/// across iterations, scoring each against `scorer` and stopping once
/// `termination` signals, `scorer` errors, or `mutator` errors.
#[allow(clippy::too_many_arguments, reason = "the orchestrator intentionally exposes every caller-supplied seam as its own parameter rather than bundling them into a config struct")]
pub fn optimize(
    treatment_key: &str,
    initial_treatment_value: FactorValue,
    fixed_factors: &FactorSuit,
    config: &ResolvedConfiguration,
    budgets: &BudgetStack,
    invoker: &mut dyn SampleInvoker,
    scorer: &mut dyn Scorer,
    mutator: &mut dyn Mutator,
    termination: &mut dyn TerminationPolicy,
    objective: Objective,
) -> OptimizationHistory {
    let started_at = OffsetDateTime::now_utc();
    let clock = Instant::now();
    let mut history: Vec<IterationAggregate> = Vec::new();
    let mut current_value = initial_treatment_value;
    let termination_cause;
    let mut iteration_index = 0usize;

    loop {
        let factor_suit = fixed_factors.with(treatment_key, current_value.clone());
        let mut latencies_ms = Vec::new();
        let mut timed_invoker = |sample_index: usize, recorder: &TokenRecorder| {
            let started = Instant::now();
            let result = invoker.invoke(sample_index, recorder);
            latencies_ms.push(started.elapsed().as_secs_f64() * 1000.0);
            result
        };
        let aggregate = run_samples(config, budgets, &mut timed_invoker);
        let statistics = compute_statistics(&latencies_ms);

        match scorer.score(&statistics, &aggregate) {
            Ok(score) => {
                history.push(IterationAggregate {
                    iteration_index,
                    factor_suit,
                    treatment_value: current_value.clone(),
                    statistics,
                    score,
                    status: IterationStatus::Completed,
                    failure_reason: None,
                });
            }
            Err(reason) => {
                history.push(IterationAggregate {
                    iteration_index,
                    factor_suit,
                    treatment_value: current_value.clone(),
                    statistics,
                    score: 0.0,
                    status: IterationStatus::ScoringFailed,
                    failure_reason: Some(reason),
                });
                termination_cause = "scoring_failed".to_string();
                break;
            }
        }

        if let Some(reason) = termination.should_terminate(&history, clock.elapsed()) {
            termination_cause = reason;
            break;
        }

        match mutator.mutate(&current_value, &history) {
            Ok(next_value) => current_value = next_value,
            Err(_reason) => {
                termination_cause = "mutation_failed".to_string();
                break;
            }
        }

        iteration_index += 1;
    }

    let best_iteration = best_completed_index(&history, objective);

    OptimizationHistory {
        iterations: history,
        started_at,
        ended_at: OffsetDateTime::now_utc(),
        termination_cause,
        best_iteration,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, reason = "test assertions use unwrap/expect/panic for clarity on deterministic fixtures")]
    use probtest_core::BudgetMonitor;
    use probtest_core::BudgetScope;
    use probtest_core::config::BudgetExhaustedBehavior;
    use probtest_core::config::ExceptionPolicy;
    use probtest_core::config::Intent;
    use probtest_core::config::ThresholdOrigin;
    use probtest_core::scheduler::InvocationResult;
    use std::sync::Arc;

    use super::*;

    fn config() -> ResolvedConfiguration {
        ResolvedConfiguration {
            planned_samples: 5,
            min_pass_rate: 0.8,
            threshold_confidence: 0.95,
            intent: Intent::Smoke,
            exception_policy: ExceptionPolicy::FailSample,
            max_example_failures: 5,
            budget_exhausted_behavior: BudgetExhaustedBehavior::EvaluatePartial,
            pacing_delay_ms: 0,
            threshold_origin: ThresholdOrigin::Explicit,
            min_detectable_effect: None,
        }
    }

    fn budgets() -> BudgetStack {
        BudgetStack::new(None, None, Some(Arc::new(BudgetMonitor::new(BudgetScope::Method, 0, 0))))
    }

    #[test]
    fn optimize_stops_at_max_iterations_and_tracks_the_best_score() {
        let fixed = FactorSuit::empty();
        let mut invoker = |_index: usize, _recorder: &TokenRecorder| InvocationResult::Success;
        let mut scorer = |_statistics: &Statistics, _aggregate: &SampleAggregate| Ok(1.0);
        let mut mutator = |current: &FactorValue, _history: &[IterationAggregate]| match current {
            FactorValue::Number(value) => Ok(FactorValue::Number(value + 1.0)),
            other => Ok(other.clone()),
        };
        let mut termination = max_iterations(3);

        let history = optimize("temperature", FactorValue::Number(0.0), &fixed, &config(), &budgets(), &mut invoker, &mut scorer, &mut mutator, &mut termination, Objective::Maximize);

        assert_eq!(history.iterations.len(), 3);
        assert_eq!(history.termination_cause, "max_iterations");
        assert_eq!(history.best_iteration, Some(0));
    }

    #[test]
    fn scoring_failure_ends_the_run_immediately() {
        let fixed = FactorSuit::empty();
        let mut invoker = |_index: usize, _recorder: &TokenRecorder| InvocationResult::Success;
        let mut scorer = |_statistics: &Statistics, _aggregate: &SampleAggregate| Err("scorer exploded".to_string());
        let mut mutator = |current: &FactorValue, _history: &[IterationAggregate]| Ok(current.clone());
        let mut termination = max_iterations(10);

        let history = optimize("temperature", FactorValue::Number(0.0), &fixed, &config(), &budgets(), &mut invoker, &mut scorer, &mut mutator, &mut termination, Objective::Maximize);

        assert_eq!(history.iterations.len(), 1);
        assert_eq!(history.termination_cause, "scoring_failed");
        assert_eq!(history.iterations[0].status, IterationStatus::ScoringFailed);
        assert_eq!(history.best_iteration, None);
    }

    #[test]
    fn mutation_failure_ends_the_run_after_the_last_completed_iteration() {
        let fixed = FactorSuit::empty();
        let mut invoker = |_index: usize, _recorder: &TokenRecorder| InvocationResult::Success;
        let mut scorer = |_statistics: &Statistics, _aggregate: &SampleAggregate| Ok(1.0);
        let mut mutator = |_current: &FactorValue, _history: &[IterationAggregate]| Err("no further value".to_string());
        let mut termination = max_iterations(10);

        let history = optimize("temperature", FactorValue::Number(0.0), &fixed, &config(), &budgets(), &mut invoker, &mut scorer, &mut mutator, &mut termination, Objective::Maximize);

        assert_eq!(history.iterations.len(), 1);
        assert_eq!(history.termination_cause, "mutation_failed");
        assert_eq!(history.iterations[0].status, IterationStatus::Completed);
    }

    #[test]
    fn no_improvement_window_stops_once_the_best_score_goes_stale() {
        let fixed = FactorSuit::empty();
        let mut invoker = |_index: usize, _recorder: &TokenRecorder| InvocationResult::Success;
        let mut remaining_scores = vec![5.0, 3.0, 1.0].into_iter();
        let mut scorer = move |_statistics: &Statistics, _aggregate: &SampleAggregate| Ok(remaining_scores.next().unwrap_or(0.0));
        let mut mutator = |current: &FactorValue, _history: &[IterationAggregate]| Ok(current.clone());
        let mut termination = no_improvement_window(2, Objective::Maximize);

        let history = optimize("temperature", FactorValue::Number(0.0), &fixed, &config(), &budgets(), &mut invoker, &mut scorer, &mut mutator, &mut termination, Objective::Maximize);

        assert_eq!(history.termination_cause, "no_improvement_window");
        assert_eq!(history.best_iteration, Some(0));
    }
}
