// probtest-orchestrator/src/explore.rs
// ============================================================================
// Module: EXPLORE Mode
// Description: Runs one factor suit's samples and renders a diff-friendly
// YAML artifact of each sample's projected input/postconditions/content,
// anchored with deterministic per-sample markers.
// Purpose: Let two configurations (or two versions of the same use case) be
// compared sample-by-sample without baseline-style pass/fail judgement.
// Dependencies: probtest-core, serde_yaml, probtest-orchestrator::anchor
// ============================================================================

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::time::Instant;

use probtest_core::BudgetStack;
use probtest_core::FactorSuit;
use probtest_core::Outcome;
use probtest_core::ResolvedConfiguration;
use probtest_core::TokenRecorder;
use probtest_core::UseCaseId;
use probtest_core::run_samples;
use probtest_core::scheduler::InvocationResult;
use serde::Serialize;

use crate::anchor::anchor_for;
use crate::error::OrchestratorError;

/// Schema version stamped onto every rendered EXPLORE artifact.
const EXPLORE_SCHEMA_VERSION: u32 = 1;

/// What one EXPLORE sample invocation reports, beyond the bare
/// success/failure/exception the scheduler needs to keep running.
#[derive(Debug, Clone)]
pub struct ExploreSample {
    /// The outcome the scheduler classifies this invocation by.
    pub result: InvocationResult,
    /// The rendered input this sample ran against.
    pub input: String,
    /// Postcondition name to rendered-result mapping, in declaration order
    /// via a [`BTreeMap`] for stable diff output.
    pub postconditions: BTreeMap<String, String>,
    /// Optional raw content block (e.g. a model's full response) retained
    /// for inspection.
    pub content: Option<String>,
}

/// An EXPLORE-mode sample source: richer than [`probtest_core::SampleInvoker`]
/// since EXPLORE's output projects more than pass/fail.
pub trait ExploreInvoker {
    /// Runs one sample, recording tokens into `recorder` as it goes.
    fn invoke(&mut self, sample_index: usize, recorder: &TokenRecorder) -> ExploreSample;
}

impl<F: FnMut(usize, &TokenRecorder) -> ExploreSample> ExploreInvoker for F {
    fn invoke(&mut self, sample_index: usize, recorder: &TokenRecorder) -> ExploreSample {
        self(sample_index, recorder)
    }
}

/// One rendered sample's projection, serialized under `resultProjection`.
#[derive(Serialize)]
struct SampleProjectionRecord {
    /// The rendered input this sample ran against.
    input: String,
    /// Postcondition name to rendered-result mapping.
    postconditions: BTreeMap<String, String>,
    /// Milliseconds this sample took to execute.
    #[serde(rename = "executionTimeMs")]
    execution_time_ms: f64,
    /// Optional raw content block.
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    /// Present only when the sample was an assertion failure or unexpected
    /// exception.
    #[serde(rename = "failureDetail", skip_serializing_if = "Option::is_none")]
    failure_detail: Option<String>,
}

/// The artifact's non-repeating header fields.
#[derive(Serialize)]
struct ExploreHeader<'a> {
    /// Schema version, bumped on incompatible artifact-shape changes.
    #[serde(rename = "schemaVersion")]
    schema_version: u32,
    /// The use case these samples were run against.
    #[serde(rename = "useCaseId")]
    use_case_id: &'a UseCaseId,
    /// The factor suit this run held constant across all its samples.
    #[serde(rename = "factorSuit")]
    factor_suit: &'a FactorSuit,
}

/// Runs EXPLORE for one factor suit and renders the resulting artifact.
///
/// Each sample is preceded by a deterministic anchor comment line so two
/// runs over the same `config.planned_samples` diff cleanly even when the
/// underlying invocation content differs.
///
/// # Errors
///
/// Returns [`OrchestratorError::Render`] if the artifact fails to serialize.
pub fn explore(use_case_id: &UseCaseId, factor_suit: &FactorSuit, config: &ResolvedConfiguration, budgets: &BudgetStack, invoker: &mut dyn ExploreInvoker) -> Result<String, OrchestratorError> {
    let mut projections: Vec<SampleProjectionRecord> = Vec::new();
    let mut wrapped = |sample_index: usize, recorder: &TokenRecorder| {
        let started = Instant::now();
        let sample = invoker.invoke(sample_index, recorder);
        let execution_time_ms = started.elapsed().as_secs_f64() * 1000.0;
        let failure_detail = match &sample.result {
            InvocationResult::Success => None,
            InvocationResult::AssertionFailure(reason) | InvocationResult::UnexpectedException(reason) => Some(Outcome::first_line(reason)),
        };
        let result = sample.result.clone();
        projections.push(SampleProjectionRecord {
            input: sample.input,
            postconditions: sample.postconditions,
            execution_time_ms,
            content: sample.content,
            failure_detail,
        });
        result
    };

    let _aggregate = run_samples(config, budgets, &mut wrapped);

    render_artifact(
        &ExploreHeader {
            schema_version: EXPLORE_SCHEMA_VERSION,
            use_case_id,
            factor_suit,
        },
        &projections,
    )
}

/// Renders the header followed by each sample's anchored block, in sample
/// order.
fn render_artifact(header: &ExploreHeader<'_>, samples: &[SampleProjectionRecord]) -> Result<String, OrchestratorError> {
    let mut rendered = serde_yaml::to_string(header)?;
    rendered.push_str("resultProjection:\n");
    for (index, sample) in samples.iter().enumerate() {
        let anchor = anchor_for(index);
        let _ = writeln!(rendered, "# ──── sample[{index}] ──── anchor:{anchor} ────");
        rendered.push_str(&serde_yaml::to_string(std::slice::from_ref(sample))?);
    }
    Ok(rendered)
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
    use std::sync::Arc;

    use super::*;

    fn config(planned_samples: i64) -> ResolvedConfiguration {
        ResolvedConfiguration {
            planned_samples,
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
    fn explore_renders_one_anchored_block_per_sample() {
        let use_case_id = UseCaseId::new("checkout");
        let factor_suit = FactorSuit::empty();
        let mut invoker = |index: usize, _recorder: &TokenRecorder| {
            let mut postconditions = BTreeMap::new();
            postconditions.insert("isValid".to_string(), "true".to_string());
            ExploreSample {
                result: InvocationResult::Success,
                input: format!("input-{index}"),
                postconditions,
                content: Some("raw response".to_string()),
            }
        };

        let rendered = explore(&use_case_id, &factor_suit, &config(3), &budgets(), &mut invoker).expect("renders");
        assert_eq!(rendered.matches("anchor:").count(), 3);
        assert!(rendered.contains("useCaseId: checkout"));
        assert!(rendered.contains("input-0"));
    }

    #[test]
    fn anchors_are_identical_across_two_runs_with_the_same_sample_count() {
        let use_case_id = UseCaseId::new("checkout");
        let factor_suit = FactorSuit::empty();
        let make_invoker = || {
            move |index: usize, _recorder: &TokenRecorder| ExploreSample {
                result: InvocationResult::Success,
                input: format!("input-{index}"),
                postconditions: BTreeMap::new(),
                content: None,
            }
        };

        let mut first_invoker = make_invoker();
        let first = explore(&use_case_id, &factor_suit, &config(2), &budgets(), &mut first_invoker).expect("renders");
        let mut second_invoker = make_invoker();
        let second = explore(&use_case_id, &factor_suit, &config(2), &budgets(), &mut second_invoker).expect("renders");

        let anchor_lines = |rendered: &str| rendered.lines().filter(|line| line.contains("anchor:")).map(ToString::to_string).collect::<Vec<_>>();
        assert_eq!(anchor_lines(&first), anchor_lines(&second));
    }

    #[test]
    fn failure_detail_is_populated_only_on_non_success() {
        let use_case_id = UseCaseId::new("checkout");
        let factor_suit = FactorSuit::empty();
        let mut invoker = |index: usize, _recorder: &TokenRecorder| ExploreSample {
            result: if index == 0 {
                InvocationResult::AssertionFailure("expected true\ngot false".to_string())
            } else {
                InvocationResult::Success
            },
            input: format!("input-{index}"),
            postconditions: BTreeMap::new(),
            content: None,
        };

        let rendered = explore(&use_case_id, &factor_suit, &config(2), &budgets(), &mut invoker).expect("renders");
        assert!(rendered.contains("failureDetail"));
    }
}
