// demos/minimal/src/main.rs
// ============================================================================
// Module: Minimal Example
// Description: Runs MEASURE then EXPLORE against a mock invoker that fails
// deterministically on every tenth sample.
// Purpose: Show the smallest end-to-end path from a factor suit to a
// baseline and an EXPLORE artifact, using in-memory adapters throughout.
// Dependencies: probtest-core, probtest-orchestrator
// ============================================================================

//! ## Overview
//! The mock invoker here stands in for a real use case under test: in
//! practice it would call an LLM, a ranking model, or any other
//! non-deterministic service and translate its response into a pass/fail
//! judgement.

use std::collections::BTreeMap;
use std::io::Write as _;
use std::sync::Arc;

use probtest_core::BudgetMonitor;
use probtest_core::BudgetScope;
use probtest_core::BudgetStack;
use probtest_core::CovariateCategory;
use probtest_core::CovariateDeclaration;
use probtest_core::CovariateProfile;
use probtest_core::DeclaredConfig;
use probtest_core::FactorSuit;
use probtest_core::MethodName;
use probtest_core::TokenRecorder;
use probtest_core::UseCaseId;
use probtest_core::CovariateValue;
use probtest_core::baseline::FactorValue;
use probtest_core::config::resolve;
use probtest_core::scheduler::InvocationResult;
use probtest_orchestrator::ExploreSample;
use probtest_orchestrator::explore;
use probtest_orchestrator::measure;

/// Every tenth sample (by index) fails; everything else succeeds.
fn mock_invoke(sample_index: usize, recorder: &TokenRecorder) -> InvocationResult {
    recorder.record(128);
    if sample_index % 10 == 9 {
        InvocationResult::AssertionFailure("expected isValid=true, got isValid=false".to_string())
    } else {
        InvocationResult::Success
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let use_case_id = UseCaseId::new("checkout-classifier");
    let method = MethodName::new("classifiesCheckoutIntent");
    let factor_suit = FactorSuit::empty().with("model", FactorValue::String("stub-v1".to_string()));

    let mut declaration = CovariateDeclaration::new();
    declaration.declare("environment", CovariateCategory::Configuration);
    let mut covariate_profile = CovariateProfile::new();
    covariate_profile.set("environment", CovariateValue::String("ci".to_string()));

    let declared = DeclaredConfig {
        samples: Some(40),
        min_pass_rate: Some(0.8),
        ..Default::default()
    };
    let resolved = resolve(&declared, "probtest", &std::collections::HashMap::new(), &|_| None)?;
    let budgets = BudgetStack::new(None, None, Some(Arc::new(BudgetMonitor::new(BudgetScope::Method, 0, 0))));

    let mut invoker = mock_invoke;
    let baseline = measure(use_case_id.clone(), method, &factor_suit, &declaration, covariate_profile, &resolved, &budgets, &mut invoker)?;

    write_line("baseline.samples_executed", &baseline.samples_executed.to_string())?;
    write_line("baseline.observed_rate", &format!("{:.4}", baseline.observed_rate))?;
    write_line("baseline.fingerprint_valid", &baseline.fingerprint_is_valid()?.to_string())?;

    let mut explore_invoker = |sample_index: usize, _recorder: &TokenRecorder| {
        let mut postconditions = BTreeMap::new();
        postconditions.insert("isValid".to_string(), (sample_index % 10 != 9).to_string());
        ExploreSample {
            result: mock_invoke(sample_index, &TokenRecorder::new()),
            input: format!("checkout-session-{sample_index}"),
            postconditions,
            content: None,
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
