// demos/llm-scenario/src/main.rs
// ============================================================================
// Module: LLM Scenario Example
// Description: Runs MEASURE then EXPLORE against a mock LLM-style invoker
// whose pass rate and response content vary sample to sample.
// Purpose: Show a closer-to-real use case than the minimal example: a
// model classifying a support ticket, occasionally throwing, occasionally
// disagreeing with the expected label.
// Dependencies: probtest-core, probtest-orchestrator, rand
// ============================================================================

//! ## Overview
//! Unlike the minimal example's fixed failure cadence, this mock model's
//! pass/fail outcome and token count are drawn fresh each sample, closer to
//! how a real LLM-backed use case behaves under MEASURE and EXPLORE.

use std::collections::BTreeMap;
use std::io::Write as _;
use std::sync::Arc;

use probtest_core::BudgetMonitor;
use probtest_core::BudgetScope;
use probtest_core::BudgetStack;
use probtest_core::CovariateCategory;
use probtest_core::CovariateDeclaration;
use probtest_core::CovariateProfile;
use probtest_core::CovariateValue;
use probtest_core::DeclaredConfig;
use probtest_core::FactorSuit;
use probtest_core::Intent;
use probtest_core::MethodName;
use probtest_core::TokenRecorder;
use probtest_core::UseCaseId;
use probtest_core::baseline::FactorValue;
use probtest_core::config::resolve;
use probtest_core::scheduler::InvocationResult;
use probtest_orchestrator::ExploreSample;
use probtest_orchestrator::explore;
use probtest_orchestrator::measure;
use rand::Rng;

/// The fraction of tickets the mock model classifies correctly.
const MOCK_ACCURACY: f64 = 0.88;

/// Simulates one call to a support-ticket escalation classifier: most
/// samples agree with the expected label, a handful disagree, and rare
/// samples raise an unexpected exception (a malformed model response).
fn mock_invoke(recorder: &TokenRecorder) -> (InvocationResult, String, bool) {
    let mut rng = rand::thread_rng();
    recorder.record(rng.gen_range(200..800));

    let roll: f64 = rng.r#gen();
    if roll < 0.02 {
        return (InvocationResult::UnexpectedException("model returned non-JSON output".to_string()), "<malformed>".to_string(), false);
    }
    let escalation_needed = rng.r#gen::<bool>();
    if roll < MOCK_ACCURACY {
        (InvocationResult::Success, format!("{{\"escalationNeeded\": {escalation_needed}}}"), escalation_needed)
    } else {
        (InvocationResult::AssertionFailure(format!("expected escalationNeeded={escalation_needed}, model disagreed")), format!("{{\"escalationNeeded\": {}}}", !escalation_needed), escalation_needed)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let use_case_id = UseCaseId::new("support-ticket-classifier");
    let method = MethodName::new("classifiesEscalationNeed");
    let factor_suit = FactorSuit::empty().with("promptVersion", FactorValue::String("v3".to_string()));

    let mut declaration = CovariateDeclaration::new();
    declaration.declare("provider", CovariateCategory::Configuration);
    let mut covariate_profile = CovariateProfile::new();
    covariate_profile.set("provider", CovariateValue::String("mock".to_string()));

    let declared = DeclaredConfig {
        samples: Some(60),
        min_pass_rate: Some(0.75),
        intent: Some(Intent::Smoke),
        ..Default::default()
    };
    let resolved = resolve(&declared, "probtest", &std::collections::HashMap::new(), &|_| None)?;
    let budgets = BudgetStack::new(None, None, Some(Arc::new(BudgetMonitor::new(BudgetScope::Method, 0, 0))));

    let mut invoker = |_sample_index: usize, recorder: &TokenRecorder| mock_invoke(recorder).0;
    let baseline = measure(use_case_id.clone(), method, &factor_suit, &declaration, covariate_profile, &resolved, &budgets, &mut invoker)?;

    write_line("baseline.samples_executed", &baseline.samples_executed.to_string())?;
    write_line("baseline.observed_rate", &format!("{:.4}", baseline.observed_rate))?;
    write_line("baseline.p90_ms", &format!("{:.2}", baseline.statistics.p90_ms))?;

    let mut explore_invoker = |sample_index: usize, recorder: &TokenRecorder| {
        let (result, content, escalation_needed) = mock_invoke(recorder);
        let mut postconditions = BTreeMap::new();
        postconditions.insert("escalationNeeded".to_string(), escalation_needed.to_string());
        ExploreSample {
            result,
            input: format!("ticket-{sample_index}"),
            postconditions,
            content: Some(content),
        }
    };
    let explore_budgets = BudgetStack::new(None, None, Some(Arc::new(BudgetMonitor::new(BudgetScope::Method, 0, 0))));
    let rendered = explore(&use_case_id, &factor_suit, &resolved, &explore_budgets, &mut explore_invoker)?;
    write_line("explore.artifact_bytes", &rendered.len().to_string())?;

    Ok(())
}

/// Writes a labeled line to stdout.
fn write_line(label: &str, value: &str) -> Result<(), std::io::Error> {
    let mut out = std::io::stdout();
    writeln!(out, "{label}: {value}")
}
