// probtest-orchestrator/src/measure.rs
// ============================================================================
// Module: MEASURE Mode
// Description: Runs a use case's planned sample count against one factor
// suit and covariate profile, and assembles the resulting baseline.
// Purpose: Establish (or re-establish) the baseline a later test's selector
// matches against.
// Dependencies: probtest-core, probtest-orchestrator::statistics
// ============================================================================

use std::time::Instant;

use probtest_core::Baseline;
use probtest_core::BudgetStack;
use probtest_core::CovariateDeclaration;
use probtest_core::CovariateProfile;
use probtest_core::FactorSuit;
use probtest_core::MethodName;
use probtest_core::ResolvedConfiguration;
use probtest_core::SampleInvoker;
use probtest_core::TokenRecorder;
use probtest_core::UseCaseId;
use probtest_core::compute_footprint_hash;
use probtest_core::hashing::DEFAULT_HASH_ALGORITHM;
use probtest_core::hashing::HashDigest;
use probtest_core::run_samples;
use time::OffsetDateTime;

use crate::error::OrchestratorError;
use crate::statistics::compute_statistics;

/// Runs MEASURE: executes `config.planned_samples` samples and assembles the
/// resulting baseline.
///
/// Returns a [`Baseline`] with its footprint hash, covariate-value hashes,
/// and content fingerprint already populated.
///
/// # Errors
///
/// Returns [`OrchestratorError::Hash`] if the footprint, a covariate value,
/// or the content fingerprint cannot be hashed.
#[allow(clippy::too_many_arguments, reason = "the orchestrator intentionally exposes every caller-supplied seam as its own parameter rather than bundling them into a config struct")]
pub fn measure(
    use_case_id: UseCaseId,
    experiment_method: MethodName,
    factor_suit: &FactorSuit,
    declaration: &CovariateDeclaration,
    covariate_profile: CovariateProfile,
    config: &ResolvedConfiguration,
    budgets: &BudgetStack,
    invoker: &mut dyn SampleInvoker,
) -> Result<Baseline, OrchestratorError> {
    let mut latencies_ms = Vec::new();
    let mut timed_invoker = |sample_index: usize, recorder: &TokenRecorder| {
        let started = Instant::now();
        let result = invoker.invoke(sample_index, recorder);
        latencies_ms.push(started.elapsed().as_secs_f64() * 1000.0);
        result
    };

    let aggregate = run_samples(config, budgets, &mut timed_invoker);

    let footprint_hash = compute_footprint_hash(factor_suit, declaration)?;
    let covariate_value_hashes = covariate_profile.ordered_hashes(declaration)?;
    let statistics = compute_statistics(&latencies_ms);

    #[allow(clippy::cast_precision_loss, reason = "sample counts stay small enough to round-trip exactly through f64")]
    let observed_rate = if aggregate.executed == 0 { 0.0 } else { aggregate.successes as f64 / aggregate.executed as f64 };

    let mut baseline = Baseline {
        use_case_id,
        experiment_method,
        generated_at: OffsetDateTime::now_utc(),
        samples_executed: aggregate.executed,
        successes: aggregate.successes,
        failures: aggregate.failures,
        observed_rate,
        covariate_profile,
        footprint_hash,
        covariate_value_hashes,
        statistics,
        content_fingerprint: HashDigest::new(DEFAULT_HASH_ALGORITHM, b"placeholder"),
    };
    baseline.content_fingerprint = baseline.compute_fingerprint()?;
    Ok(baseline)
}
