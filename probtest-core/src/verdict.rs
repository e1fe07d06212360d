// probtest-core/src/verdict.rs
// ============================================================================
// Module: Result Publisher & Verdict Builder
// Description: Intent-aware verdict composition over a completed (or
// never-started) sample run, plus the structured/console publishing
// channels.
// Purpose: Guarantee the framework's failure messages unambiguously
// distinguish framework-side problems from problems with the system under
// test.
// Dependencies: crate::{budget, config, outcome}, probtest_stats
// ============================================================================

//! ## Overview
//! | Intent       | Condition                             | Action |
//! |--------------|---------------------------------------|--------|
//! | verification | `n` below feasibility `n_min`         | Hard-fail before any sample runs. |
//! | verification | `n >= n_min`                          | Normal pass/fail with full statistical context. |
//! | smoke        | any                                   | Pass/fail with a "(SMOKE)" qualifier, non-compliance language. |
//! | smoke        | `n >= n_min` and threshold is normative | Hint to consider `intent=verification`. |
//! | smoke        | `n < n_min` and threshold is normative   | Caveat that the sample isn't sized for verification. |

use std::fmt::Write as _;

use probtest_stats::StatsError;
use probtest_stats::evaluate_verdict;
use probtest_stats::feasibility_gate;

use crate::budget::BudgetSummaryEntry;
use crate::config::Intent;
use crate::config::ResolvedConfiguration;
use crate::outcome::SampleAggregate;
use crate::outcome::TerminationReason;

// ============================================================================
// SECTION: Hard-Fail Categories
// ============================================================================

/// A framework-side hard-fail category, never interchangeable with a
/// sample-level pass/fail outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardFailCategory {
    /// `n` is below the feasibility floor under verification intent.
    InfeasibleVerification,
    /// The selected baseline/spec's content fingerprint did not match.
    BaselineIntegrityViolation,
    /// No baseline passed the hard-gate filter.
    ConfigurationMismatch,
    /// A parameter or combination was rejected by the configuration resolver.
    Misconfigured,
}

impl HardFailCategory {
    /// The structured report's `hardFailCategory` value for this category.
    #[must_use]
    pub const fn report_key(self) -> &'static str {
        match self {
            Self::InfeasibleVerification => "infeasibleVerification",
            Self::BaselineIntegrityViolation => "baselineIntegrityViolation",
            Self::ConfigurationMismatch => "configurationMismatch",
            Self::Misconfigured => "misconfigured",
        }
    }
}

// ============================================================================
// SECTION: Verdict Outcome
// ============================================================================

/// The final disposition of a verdict.
#[derive(Debug, Clone, PartialEq)]
pub enum VerdictOutcome {
    /// The observed rate's Wilson lower bound met the target.
    Pass,
    /// It did not.
    Fail,
    /// A framework-side problem aborted the test before or instead of a
    /// normal pass/fail.
    HardFail(HardFailCategory),
}

impl VerdictOutcome {
    /// The structured report's `verdict` value.
    #[must_use]
    pub const fn report_key(&self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
            Self::HardFail(_) => "HARD_FAIL",
        }
    }
}

// ============================================================================
// SECTION: Verdict
// ============================================================================

/// A complete, intent-aware verdict for one test run.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    /// The test's name, for report identification.
    pub test_name: String,
    /// Verification or smoke.
    pub intent: Intent,
    /// The final disposition.
    pub outcome: VerdictOutcome,
    /// Samples planned.
    pub samples_planned: i64,
    /// Samples executed.
    pub samples_executed: i64,
    /// Samples classified as success.
    pub successes: i64,
    /// Samples classified as failure.
    pub failures: i64,
    /// The configured minimum pass rate.
    pub min_pass_rate: f64,
    /// The observed pass rate, `successes / executed`.
    pub observed_rate: f64,
    /// Confidence level the verdict was evaluated at.
    pub confidence: f64,
    /// Probability a `Pass` outcome is a false positive, `1 - confidence`.
    pub false_positive_probability: Option<f64>,
    /// The two-sided Wilson interval, for verbose display.
    pub wilson_interval: Option<(f64, f64)>,
    /// Why the sample loop terminated early, if it did.
    pub termination_reason: Option<String>,
    /// Per-scope budget consumption at the time the verdict was built.
    pub budget_summary: Vec<BudgetSummaryEntry>,
    /// Non-fatal advisory messages (smoke hints/caveats).
    pub hints: Vec<String>,
    /// A human-readable one-paragraph explanation.
    pub explanation: String,
}

impl Verdict {
    /// The structured, machine-consumable report entries (§6 "two
    /// channels"), with keys matching the documented minimum set.
    #[must_use]
    pub fn structured_report(&self) -> Vec<(String, String)> {
        let mut report = vec![
            ("samplesPlanned".to_string(), self.samples_planned.to_string()),
            ("samplesExecuted".to_string(), self.samples_executed.to_string()),
            ("successes".to_string(), self.successes.to_string()),
            ("failures".to_string(), self.failures.to_string()),
            ("minPassRate".to_string(), self.min_pass_rate.to_string()),
            ("observedRate".to_string(), self.observed_rate.to_string()),
            ("intent".to_string(), intent_label(self.intent).to_string()),
            ("verdict".to_string(), self.outcome.report_key().to_string()),
        ];
        if let Some(reason) = &self.termination_reason {
            report.push(("terminationReason".to_string(), reason.clone()));
        }
        if let VerdictOutcome::HardFail(category) = self.outcome {
            report.push(("hardFailCategory".to_string(), category.report_key().to_string()));
        }
        report
    }

    /// Renders the console channel's formatted block.
    ///
    /// In verbose mode, appends the false-positive probability and Wilson CI
    /// bounds when available.
    #[must_use]
    pub fn render_console(&self, verbose: bool) -> String {
        let mut lines = vec![self.explanation.clone()];
        for hint in &self.hints {
            lines.push(format!("note: {hint}"));
        }
        if !self.budget_summary.is_empty() {
            lines.push(format!("budgets: {}", render_budget_summary(&self.budget_summary)));
        }
        if verbose {
            if let Some(fpr) = self.false_positive_probability {
                lines.push(format!("false-positive probability: {:.2}%", fpr * 100.0));
            }
            if let Some((lower, upper)) = self.wilson_interval {
                lines.push(format!("Wilson {:.0}% CI: [{:.4}, {:.4}]", self.confidence * 100.0, lower, upper));
            }
        }
        lines.join("\n")
    }
}

/// The configuration's intent as a report label.
const fn intent_label(intent: Intent) -> &'static str {
    match intent {
        Intent::Verification => "verification",
        Intent::Smoke => "smoke",
    }
}

/// Renders a one-line summary of per-scope budget consumption.
fn render_budget_summary(summary: &[BudgetSummaryEntry]) -> String {
    summary
        .iter()
        .map(|entry| {
            let scope = match entry.scope {
                crate::budget::BudgetScope::Suite => "suite",
                crate::budget::BudgetScope::Class => "class",
                crate::budget::BudgetScope::Method => "method",
            };
            format!("{scope}={}ms/{}tok", entry.elapsed_ms, entry.tokens_consumed)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

// ============================================================================
// SECTION: Pre-Sampling Feasibility Check
// ============================================================================

/// Runs the feasibility gate against `effective_n` (the configured sample
/// count, or the computed sample count under confidence-first mode) before
/// any sample executes.
///
/// Returns `Ok(())` when sampling should proceed (smoke intent always
/// proceeds; verification intent proceeds only when feasible), or `Err`
/// carrying the hard-fail verdict to publish instead of sampling.
///
/// # Errors
///
/// Returns a [`HardFailCategory::Misconfigured`] verdict if the statistics
/// engine rejects the inputs (should not happen for a resolver-validated
/// configuration, but is not silently swallowed).
pub fn feasibility_precheck(test_name: &str, config: &ResolvedConfiguration, effective_n: i64) -> Result<Vec<String>, Box<Verdict>> {
    let report = match feasibility_gate(effective_n, config.min_pass_rate, config.threshold_confidence) {
        Ok(report) => report,
        Err(err) => return Err(Box::new(misconfigured_verdict(test_name, config, err))),
    };

    match config.intent {
        Intent::Verification => {
            if report.feasible {
                Ok(Vec::new())
            } else {
                Err(Box::new(infeasible_verdict(test_name, config, effective_n, report.n_min)))
            }
        }
        Intent::Smoke => {
            let mut hints = Vec::new();
            if config.threshold_origin.is_normative() {
                if report.feasible {
                    hints.push("sample is sized for verification; consider intent=verification".to_string());
                } else {
                    hints.push("sample not sized for verification (normative origin)".to_string());
                }
            }
            Ok(hints)
        }
    }
}

/// Builds the `infeasible_verification` hard-fail verdict.
fn infeasible_verdict(test_name: &str, config: &ResolvedConfiguration, configured_n: i64, n_min: i64) -> Verdict {
    let explanation = format!(
        "HARD_FAIL (infeasible_verification): {test_name} configured with n={configured_n} samples, but the Wilson score \
         one-sided lower bound cannot reach the {:.1}% target at {:.0}% confidence until n >= {n_min}. \
         Increase samples, lower the target, or run MEASURE/EXPLORE to re-baseline.",
        config.min_pass_rate * 100.0,
        config.threshold_confidence * 100.0,
    );
    Verdict {
        test_name: test_name.to_string(),
        intent: config.intent,
        outcome: VerdictOutcome::HardFail(HardFailCategory::InfeasibleVerification),
        samples_planned: configured_n,
        samples_executed: 0,
        successes: 0,
        failures: 0,
        min_pass_rate: config.min_pass_rate,
        observed_rate: 0.0,
        confidence: config.threshold_confidence,
        false_positive_probability: None,
        wilson_interval: None,
        termination_reason: None,
        budget_summary: Vec::new(),
        hints: Vec::new(),
        explanation,
    }
}

/// Builds a `misconfigured` hard-fail verdict wrapping a statistics-engine
/// domain error.
fn misconfigured_verdict(test_name: &str, config: &ResolvedConfiguration, err: StatsError) -> Verdict {
    Verdict {
        test_name: test_name.to_string(),
        intent: config.intent,
        outcome: VerdictOutcome::HardFail(HardFailCategory::Misconfigured),
        samples_planned: config.planned_samples,
        samples_executed: 0,
        successes: 0,
        failures: 0,
        min_pass_rate: config.min_pass_rate,
        observed_rate: 0.0,
        confidence: config.threshold_confidence,
        false_positive_probability: None,
        wilson_interval: None,
        termination_reason: None,
        budget_summary: Vec::new(),
        hints: Vec::new(),
        explanation: format!("HARD_FAIL (misconfigured): {test_name} rejected by the statistics engine: {err}"),
    }
}

// ============================================================================
// SECTION: Post-Sampling Verdict
// ============================================================================

/// Builds the final verdict from a completed (or early-terminated) sample
/// aggregate.
///
/// # Errors
///
/// Returns a [`HardFailCategory::Misconfigured`] verdict if the statistics
/// engine rejects the observed counts (e.g. zero samples executed under a
/// termination reason that should have prevented that).
#[must_use]
pub fn build_verdict(test_name: &str, config: &ResolvedConfiguration, aggregate: &SampleAggregate, budget_summary: Vec<BudgetSummaryEntry>, hints: Vec<String>) -> Verdict {
    if aggregate.executed == 0 {
        return misconfigured_verdict(test_name, config, StatsError::InvalidSampleSize {
            samples: 0,
        });
    }

    let stats_verdict = match evaluate_verdict(aggregate.successes, aggregate.executed, config.min_pass_rate, config.threshold_confidence) {
        Ok(verdict) => verdict,
        Err(err) => return misconfigured_verdict(test_name, config, err),
    };

    let forced_fail = matches!(config.budget_exhausted_behavior, crate::config::BudgetExhaustedBehavior::FailImmediately) && matches!(aggregate.termination_reason, TerminationReason::BudgetExhausted(_));

    let outcome = if forced_fail {
        VerdictOutcome::Fail
    } else if stats_verdict.passed {
        VerdictOutcome::Pass
    } else {
        VerdictOutcome::Fail
    };

    let wilson_interval = probtest_stats::wilson_interval(aggregate.successes, aggregate.executed, config.threshold_confidence).ok().map(|interval| (interval.lower, interval.upper));

    let termination_reason = termination_reason_label(&aggregate.termination_reason);
    let explanation = render_explanation(test_name, config.intent, &outcome, &stats_verdict.explanation, termination_reason.as_deref(), forced_fail);

    Verdict {
        test_name: test_name.to_string(),
        intent: config.intent,
        outcome,
        samples_planned: aggregate.planned,
        samples_executed: aggregate.executed,
        successes: aggregate.successes,
        failures: aggregate.failures,
        min_pass_rate: config.min_pass_rate,
        observed_rate: stats_verdict.observed_rate,
        confidence: config.threshold_confidence,
        false_positive_probability: Some(stats_verdict.false_positive_probability),
        wilson_interval,
        termination_reason,
        budget_summary,
        hints,
        explanation,
    }
}

/// Renders a termination reason into its report label, or `None` for a
/// completed run.
fn termination_reason_label(reason: &TerminationReason) -> Option<String> {
    match reason {
        TerminationReason::Completed => None,
        TerminationReason::Impossible => Some("impossible".to_string()),
        TerminationReason::Guaranteed => Some("guaranteed".to_string()),
        TerminationReason::BudgetExhausted(label) => Some(label.clone()),
        TerminationReason::Aborted(reason) => Some(format!("aborted: {reason}")),
    }
}

/// Renders the final explanation string, applying the smoke-intent
/// language substitution ("not meeting SLA obligation" -> "inconsistent
/// with target") and the `(SMOKE)` qualifier.
fn render_explanation(test_name: &str, intent: Intent, outcome: &VerdictOutcome, stats_explanation: &str, termination_reason: Option<&str>, forced_fail: bool) -> String {
    let qualifier = match intent {
        Intent::Verification => String::new(),
        Intent::Smoke => " (SMOKE)".to_string(),
    };
    let verdict_word = match outcome {
        VerdictOutcome::Pass => "PASS",
        VerdictOutcome::Fail => "FAIL",
        VerdictOutcome::HardFail(_) => "HARD_FAIL",
    };
    let body = match intent {
        Intent::Verification => stats_explanation.to_string(),
        Intent::Smoke => stats_explanation.replace("meeting the", "consistent with the").replace("short of the", "inconsistent with the"),
    };
    let mut message = format!("{verdict_word}{qualifier}: {test_name} - {body}");
    if let Some(reason) = termination_reason {
        let _ = write!(message, " (terminated early: {reason})");
    }
    if forced_fail {
        message.push_str(" [forced FAIL: budget exhausted under fail_immediately]");
    }
    message
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic, reason = "test assertions use unwrap/panic for clarity on deterministic fixtures")]
    use super::*;
    use crate::config::BudgetExhaustedBehavior;
    use crate::config::ExceptionPolicy;
    use crate::config::ThresholdOrigin;

    fn verification_config(planned: i64) -> ResolvedConfiguration {
        ResolvedConfiguration {
            planned_samples: planned,
            min_pass_rate: 0.99,
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
    fn undersized_verification_hard_fails_before_sampling() {
        let config = verification_config(50);
        let result = feasibility_precheck("checkout_flow", &config, 50);
        let Err(verdict) = result else {
            panic!("expected a hard-fail verdict");
        };
        assert_eq!(verdict.outcome, VerdictOutcome::HardFail(HardFailCategory::InfeasibleVerification));
        assert!(verdict.explanation.contains("infeasible_verification"));
    }

    #[test]
    fn adequately_sized_verification_proceeds() {
        let config = verification_config(300);
        let mut config = config;
        config.min_pass_rate = 0.95;
        let result = feasibility_precheck("checkout_flow", &config, 300);
        assert!(result.is_ok());
    }

    #[test]
    fn smoke_with_normative_undersized_threshold_gets_a_caveat() {
        let mut config = verification_config(30);
        config.intent = Intent::Smoke;
        config.min_pass_rate = 0.95;
        config.threshold_origin = ThresholdOrigin::Sla;
        let hints = feasibility_precheck("checkout_flow", &config, 30).unwrap();
        assert!(hints.iter().any(|hint| hint.contains("not sized for verification")));
    }

    #[test]
    fn post_sampling_pass_verdict_reports_correctly() {
        let mut config = verification_config(300);
        config.min_pass_rate = 0.85;
        let mut aggregate = SampleAggregate::new(300);
        aggregate.executed = 300;
        aggregate.successes = 285;
        aggregate.failures = 15;
        let verdict = build_verdict("checkout_flow", &config, &aggregate, Vec::new(), Vec::new());
        assert_eq!(verdict.outcome, VerdictOutcome::Pass);
        let report = verdict.structured_report();
        assert!(report.contains(&("verdict".to_string(), "PASS".to_string())));
    }

    #[test]
    fn budget_exhausted_under_fail_immediately_forces_a_fail() {
        let mut config = verification_config(300);
        config.min_pass_rate = 0.5;
        config.budget_exhausted_behavior = BudgetExhaustedBehavior::FailImmediately;
        let mut aggregate = SampleAggregate::new(300);
        aggregate.executed = 100;
        aggregate.successes = 95;
        aggregate.failures = 5;
        aggregate.termination_reason = TerminationReason::BudgetExhausted("suite_time_exhausted".to_string());
        let verdict = build_verdict("checkout_flow", &config, &aggregate, Vec::new(), Vec::new());
        assert_eq!(verdict.outcome, VerdictOutcome::Fail);
    }

    #[test]
    fn smoke_language_avoids_compliance_phrasing() {
        let mut config = verification_config(30);
        config.intent = Intent::Smoke;
        config.min_pass_rate = 0.95;
        let mut aggregate = SampleAggregate::new(30);
        aggregate.executed = 30;
        aggregate.successes = 20;
        aggregate.failures = 10;
        let verdict = build_verdict("checkout_flow", &config, &aggregate, Vec::new(), Vec::new());
        assert!(!verdict.explanation.contains("not meeting SLA obligation"));
        assert!(verdict.explanation.contains("(SMOKE)"));
    }
}
