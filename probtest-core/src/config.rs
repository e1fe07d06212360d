// probtest-core/src/config.rs
// ============================================================================
// Module: Configuration Resolver
// Description: The fully-resolved per-test configuration and the
// precedence-driven resolver that assembles it.
// Purpose: Replace annotation-driven configuration with a resolver that
// fills a plain struct from declared values, process-wide overrides, then
// defaults.
// Dependencies: crate::error
// ============================================================================

//! ## Overview
//! Resolution precedence (highest first):
//! 1. Values declared directly on the test.
//! 2. Process-wide overrides via properties or environment variables, keyed
//!    `<prefix>.samples`, `<prefix>.minPassRate`, `<prefix>.samplesMultiplier`,
//!    `<prefix>.suite.timeBudgetMs`, `<prefix>.suite.tokenBudget`,
//!    `<prefix>.llm.mode`, `<prefix>.llm.<provider>.key`, `<prefix>.llm.timeout`,
//!    `<prefix>.covariate.<key>`, `<prefix>.period.profile`.
//! 3. Built-in defaults.

use std::collections::HashMap;

use crate::error::ConfigError;

// ============================================================================
// SECTION: Enums
// ============================================================================

/// Whether a test is run for verification (must be adequately sampled) or as
/// a smoke check (runs regardless, with qualifying language).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// The default: feasibility is enforced before any sample runs.
    Verification,
    /// Always runs; results are reported with a "(SMOKE)" qualifier.
    Smoke,
}

/// How an unexpected (non-assertion) exception from a sample is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExceptionPolicy {
    /// Record the exception as an ordinary sample failure and continue.
    FailSample,
    /// Abort the entire test immediately.
    AbortTest,
}

/// What happens when a budget monitor reports exhaustion mid-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetExhaustedBehavior {
    /// Stop sampling, compute a verdict from whatever was collected.
    EvaluatePartial,
    /// Stop sampling and report a fail regardless of pass rate.
    FailImmediately,
}

/// Where a pass-rate threshold's normative weight comes from, for the
/// verdict builder's language choices (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdOrigin {
    /// A contractual service-level agreement.
    Sla,
    /// An internal service-level objective.
    Slo,
    /// An internal policy document.
    Policy,
    /// Derived empirically from a baseline, not mandated by any policy.
    Empirical,
    /// Stated explicitly by the test author with no further provenance.
    Explicit,
    /// No provenance declared.
    Unspecified,
}

impl ThresholdOrigin {
    /// Whether this origin is normative (carries compliance weight), which
    /// changes the verdict builder's wording for smoke-intent tests.
    #[must_use]
    pub const fn is_normative(self) -> bool {
        matches!(self, Self::Sla | Self::Slo | Self::Policy)
    }
}

// ============================================================================
// SECTION: Resolved Configuration
// ============================================================================

/// The fully-resolved per-test configuration, assembled by [`resolve`].
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfiguration {
    /// Number of samples to plan for this test.
    pub planned_samples: i64,
    /// Minimum fraction of samples that must succeed to pass.
    pub min_pass_rate: f64,
    /// Confidence used for the feasibility gate; defaults to `0.95`.
    pub threshold_confidence: f64,
    /// Verification or smoke.
    pub intent: Intent,
    /// How unexpected exceptions are handled.
    pub exception_policy: ExceptionPolicy,
    /// Cap on the number of example failures retained in the aggregate.
    pub max_example_failures: usize,
    /// What happens when a budget is exhausted mid-run.
    pub budget_exhausted_behavior: BudgetExhaustedBehavior,
    /// Milliseconds to pace between samples after the first.
    pub pacing_delay_ms: u64,
    /// Provenance of the pass-rate threshold.
    pub threshold_origin: ThresholdOrigin,
    /// Minimum detectable effect for confidence-first sample-size derivation,
    /// if that mode is in use.
    pub min_detectable_effect: Option<f64>,
}

// ============================================================================
// SECTION: Declared Values
// ============================================================================

/// Values declared directly on the test, the highest-precedence resolution
/// source. Any field left `None` falls through to process-wide overrides
/// and then defaults.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeclaredConfig {
    /// Declared sample count.
    pub samples: Option<i64>,
    /// Declared minimum pass rate.
    pub min_pass_rate: Option<f64>,
    /// Declared feasibility/threshold confidence.
    pub threshold_confidence: Option<f64>,
    /// Declared intent.
    pub intent: Option<Intent>,
    /// Declared exception policy.
    pub exception_policy: Option<ExceptionPolicy>,
    /// Declared example-failure cap.
    pub max_example_failures: Option<usize>,
    /// Declared budget-exhausted behavior.
    pub budget_exhausted_behavior: Option<BudgetExhaustedBehavior>,
    /// Declared pacing delay, in milliseconds.
    pub pacing_delay_ms: Option<u64>,
    /// Declared threshold provenance.
    pub threshold_origin: Option<ThresholdOrigin>,
    /// Declared minimum detectable effect, for confidence-first mode.
    pub min_detectable_effect: Option<f64>,
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default feasibility/threshold confidence when nothing overrides it.
const DEFAULT_THRESHOLD_CONFIDENCE: f64 = 0.95;
/// Default example-failure cap.
const DEFAULT_MAX_EXAMPLE_FAILURES: usize = 5;
/// Default pacing delay: none.
const DEFAULT_PACING_DELAY_MS: u64 = 0;

// ============================================================================
// SECTION: Resolution
// ============================================================================

/// Resolves a test's configuration from declared values, process-wide
/// properties/environment, and defaults, in that precedence.
///
/// `properties` models process-wide property overrides (e.g. from a config
/// file); `env_lookup` models environment-variable overrides, keyed
/// `<PREFIX>_SAMPLES`-style (upper-cased, dots become underscores).
///
/// # Errors
///
/// Returns [`ConfigError`] when the resolved configuration fails validation:
/// `samples <= 0`, `min_pass_rate` or `threshold_confidence` outside
/// `(0, 1)`, `min_detectable_effect` outside `(0, min_pass_rate)`, or both
/// `threshold_confidence` and `samples` declared under a mode where one
/// should be derived from the other.
pub fn resolve(declared: &DeclaredConfig, prefix: &str, properties: &HashMap<String, String>, env_lookup: &dyn Fn(&str) -> Option<String>) -> Result<ResolvedConfiguration, ConfigError> {
    let samples_multiplier = override_f64(prefix, "samplesMultiplier", properties, env_lookup).unwrap_or(1.0);
    let base_samples = declared.samples.or_else(|| override_i64(prefix, "samples", properties, env_lookup)).unwrap_or(1);
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, reason = "sample counts and multipliers stay small enough to round-trip through f64")]
    let planned_samples = (base_samples as f64 * samples_multiplier).round() as i64;

    let min_pass_rate = declared.min_pass_rate.or_else(|| override_f64(prefix, "minPassRate", properties, env_lookup)).unwrap_or(0.95);

    let threshold_confidence = declared.threshold_confidence.unwrap_or(DEFAULT_THRESHOLD_CONFIDENCE);

    if declared.min_detectable_effect.is_some() && declared.threshold_confidence.is_some() && declared.samples.is_some() {
        return Err(ConfigError::ConflictingConfidenceFirstInputs);
    }

    let resolved = ResolvedConfiguration {
        planned_samples,
        min_pass_rate,
        threshold_confidence,
        intent: declared.intent.unwrap_or(Intent::Verification),
        exception_policy: declared.exception_policy.unwrap_or(ExceptionPolicy::FailSample),
        max_example_failures: declared.max_example_failures.unwrap_or(DEFAULT_MAX_EXAMPLE_FAILURES),
        budget_exhausted_behavior: declared.budget_exhausted_behavior.unwrap_or(BudgetExhaustedBehavior::EvaluatePartial),
        pacing_delay_ms: declared.pacing_delay_ms.unwrap_or(DEFAULT_PACING_DELAY_MS),
        threshold_origin: declared.threshold_origin.unwrap_or(ThresholdOrigin::Unspecified),
        min_detectable_effect: declared.min_detectable_effect,
    };

    validate(&resolved)?;
    Ok(resolved)
}

/// Validates a resolved configuration's ranges, the strict rules from §6.
fn validate(config: &ResolvedConfiguration) -> Result<(), ConfigError> {
    if config.planned_samples <= 0 {
        return Err(ConfigError::InvalidSamples {
            samples: config.planned_samples,
        });
    }
    if !(config.min_pass_rate > 0.0 && config.min_pass_rate < 1.0) {
        return Err(ConfigError::InvalidMinPassRate {
            min_pass_rate: config.min_pass_rate,
        });
    }
    if !(config.threshold_confidence > 0.0 && config.threshold_confidence < 1.0) {
        return Err(ConfigError::InvalidConfidence {
            confidence: config.threshold_confidence,
        });
    }
    if let Some(effect) = config.min_detectable_effect
        && !(effect > 0.0 && effect < config.min_pass_rate)
    {
        return Err(ConfigError::InvalidMinDetectableEffect {
            effect,
            min_pass_rate: config.min_pass_rate,
        });
    }
    Ok(())
}

/// Looks up a `f64`-valued override under `<prefix>.<key>`, trying the
/// property map first, then the uppercased-with-underscores environment key.
fn override_f64(prefix: &str, key: &str, properties: &HashMap<String, String>, env_lookup: &dyn Fn(&str) -> Option<String>) -> Option<f64> {
    override_raw(prefix, key, properties, env_lookup).and_then(|raw| raw.parse().ok())
}

/// Looks up an `i64`-valued override the same way as [`override_f64`].
fn override_i64(prefix: &str, key: &str, properties: &HashMap<String, String>, env_lookup: &dyn Fn(&str) -> Option<String>) -> Option<i64> {
    override_raw(prefix, key, properties, env_lookup).and_then(|raw| raw.parse().ok())
}

/// Looks up a raw string override under `<prefix>.<key>` (properties) or the
/// corresponding `<PREFIX>_<KEY>` environment variable.
fn override_raw(prefix: &str, key: &str, properties: &HashMap<String, String>, env_lookup: &dyn Fn(&str) -> Option<String>) -> Option<String> {
    if let Some(value) = properties.get(&format!("{prefix}.{key}")) {
        return Some(value.clone());
    }
    let env_key = format!("{}_{}", prefix.to_uppercase(), to_env_case(key));
    env_lookup(&env_key)
}

/// Converts a camelCase property-style key segment to `SCREAMING_SNAKE_CASE`
/// for environment-variable lookups.
fn to_env_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len() * 2);
    for ch in key.chars() {
        if ch.is_uppercase() {
            out.push('_');
        }
        out.extend(ch.to_uppercase());
    }
    out
}
