// probtest-core/src/baseline.rs
// ============================================================================
// Module: Baseline, Execution Specification, Optimization History, Factor
// Suit
// Description: The immutable, content-fingerprinted records produced by
// MEASURE/EXPLORE/OPTIMIZE, plus the factor-suit value type they're built
// from.
// Purpose: Give the orchestrator and the baseline store a shared,
// serializable vocabulary, content-addressed rather than back-pointered.
// Dependencies: crate::{covariate, hashing, identifiers}, time
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;

use crate::config::ThresholdOrigin;
use crate::covariate::CovariateProfile;
use crate::hashing::DEFAULT_HASH_ALGORITHM;
use crate::hashing::HashDigest;
use crate::hashing::HashError;
use crate::hashing::hash_canonical_json;
use crate::identifiers::MethodName;
use crate::identifiers::UseCaseId;

// ============================================================================
// SECTION: Factor Suit
// ============================================================================

/// A value a factor can take, the unit `FactorSuit` maps names to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FactorValue {
    /// A string-valued factor, e.g. a model name.
    String(String),
    /// A numeric factor, e.g. a temperature or threshold.
    Number(f64),
    /// A boolean factor, e.g. a feature flag.
    Bool(bool),
}

/// An immutable mapping from factor name to value, with structural sharing:
/// `.with(key, value)` returns a new suit without mutating the original.
/// Used by EXPLORE (one suit per configuration) and OPTIMIZE (one mutating
/// treatment factor plus a fixed remainder).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorSuit {
    /// The underlying name-to-value mapping, shared via `Arc` so `.with()`
    /// is a cheap clone-on-write rather than a deep copy of untouched keys.
    #[serde(with = "arc_map")]
    values: Arc<BTreeMap<String, FactorValue>>,
}

/// (De)serializes an `Arc<BTreeMap<_, _>>` as the plain map it wraps, since
/// `Arc` itself carries no `Serialize`/`Deserialize` impl.
mod arc_map {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use serde::Deserialize;
    use serde::Deserializer;
    use serde::Serialize;
    use serde::Serializer;

    use super::FactorValue;

    /// Serializes the map `Arc` points at, ignoring the `Arc` wrapper.
    pub(super) fn serialize<S: Serializer>(map: &Arc<BTreeMap<String, FactorValue>>, serializer: S) -> Result<S::Ok, S::Error> {
        map.as_ref().serialize(serializer)
    }

    /// Deserializes a plain map and wraps it in a fresh `Arc`.
    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Arc<BTreeMap<String, FactorValue>>, D::Error> {
        BTreeMap::deserialize(deserializer).map(Arc::new)
    }
}

impl FactorSuit {
    /// The empty suit.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            values: Arc::new(BTreeMap::new()),
        }
    }

    /// Returns a new suit with `key` set to `value`, leaving `self` unchanged.
    #[must_use]
    pub fn with(&self, key: impl Into<String>, value: FactorValue) -> Self {
        let mut next = (*self.values).clone();
        next.insert(key.into(), value);
        Self {
            values: Arc::new(next),
        }
    }

    /// Looks up a factor's value by name.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&FactorValue> {
        self.values.get(key)
    }

    /// Iterates `(name, value)` pairs in stable (lexicographic) order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &FactorValue)> {
        self.values.iter()
    }
}

impl Default for FactorSuit {
    fn default() -> Self {
        Self::empty()
    }
}

/// The declaration-only shape hashed into a baseline's footprint: the
/// factor suit's keys (not values) and the covariate declaration's
/// `(key, category)` pairs, in declaration order.
#[derive(Serialize)]
struct FootprintInput<'a> {
    /// Factor names present in the suit, in stable lexicographic order.
    factor_keys: Vec<&'a str>,
    /// Declared `(key, category)` pairs, in declaration order.
    covariate_declaration: Vec<(&'a str, crate::covariate::CovariateCategory)>,
}

/// Computes a baseline's footprint hash over declared shape, not values.
///
/// Two runs that declare the same factor keys and covariate declaration
/// share a footprint even when their resolved values differ, which is what
/// lets the selector's hard gate distinguish "wrong configuration value"
/// from "incomparable experiment shape".
///
/// # Errors
///
/// Returns [`HashError`] if canonicalization fails.
pub fn compute_footprint_hash(factor_suit: &FactorSuit, declaration: &crate::covariate::CovariateDeclaration) -> Result<HashDigest, HashError> {
    let input = FootprintInput {
        factor_keys: factor_suit.iter().map(|(key, _)| key.as_str()).collect(),
        covariate_declaration: declaration.iter().map(|(key, category)| (key.as_str(), *category)).collect(),
    };
    hash_canonical_json(DEFAULT_HASH_ALGORITHM, &input)
}

// ============================================================================
// SECTION: Statistics
// ============================================================================

/// Summary statistics attached to a baseline or iteration aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    /// 50th percentile latency, in milliseconds.
    pub p50_ms: f64,
    /// 90th percentile latency, in milliseconds.
    pub p90_ms: f64,
    /// 95th percentile latency, in milliseconds.
    pub p95_ms: f64,
    /// 99th percentile latency, in milliseconds.
    pub p99_ms: f64,
    /// 99.9th percentile latency, only populated when `n >= 1000`.
    pub p99_9_ms: Option<f64>,
    /// Mean latency, in milliseconds.
    pub mean_ms: f64,
    /// Latency standard deviation, in milliseconds.
    pub stdev_ms: f64,
    /// Opaque streaming-percentile-sketch bytes for latency, serialized form
    /// of a simple sketch rather than a full t-digest implementation.
    pub digest_bytes: Option<Vec<u8>>,
}

// ============================================================================
// SECTION: Baseline
// ============================================================================

/// An immutable record produced by MEASURE.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    /// The use case this baseline was measured against.
    pub use_case_id: UseCaseId,
    /// The experiment method invoked.
    pub experiment_method: MethodName,
    /// When this baseline was generated.
    #[serde(with = "time::serde::rfc3339")]
    pub generated_at: OffsetDateTime,
    /// Samples executed while measuring.
    pub samples_executed: i64,
    /// Samples classified as success.
    pub successes: i64,
    /// Samples classified as failure.
    pub failures: i64,
    /// `successes / samples_executed`.
    pub observed_rate: f64,
    /// The resolved covariate profile at measurement time.
    pub covariate_profile: CovariateProfile,
    /// Content hash over the ordered factor declaration plus covariate
    /// declaration.
    pub footprint_hash: HashDigest,
    /// Per-declaration-order content hashes of the non-informational
    /// covariate values.
    pub covariate_value_hashes: Vec<HashDigest>,
    /// Latency and throughput statistics.
    pub statistics: Statistics,
    /// Cryptographic hash of every persisted field above, excluding this one.
    pub content_fingerprint: HashDigest,
}

/// The subset of [`Baseline`]'s fields that feed `content_fingerprint`,
/// serialized identically to how the real fields serialize so the hash is
/// stable and reproducible.
#[derive(Serialize)]
struct BaselineFingerprintInput<'a> {
    /// Mirrors [`Baseline::use_case_id`].
    use_case_id: &'a UseCaseId,
    /// Mirrors [`Baseline::experiment_method`].
    experiment_method: &'a MethodName,
    /// Mirrors [`Baseline::generated_at`].
    #[serde(with = "time::serde::rfc3339")]
    generated_at: OffsetDateTime,
    /// Mirrors [`Baseline::samples_executed`].
    samples_executed: i64,
    /// Mirrors [`Baseline::successes`].
    successes: i64,
    /// Mirrors [`Baseline::failures`].
    failures: i64,
    /// Mirrors [`Baseline::observed_rate`].
    observed_rate: f64,
    /// Mirrors [`Baseline::covariate_profile`].
    covariate_profile: &'a CovariateProfile,
    /// Mirrors [`Baseline::footprint_hash`].
    footprint_hash: &'a HashDigest,
    /// Mirrors [`Baseline::covariate_value_hashes`].
    covariate_value_hashes: &'a [HashDigest],
    /// Mirrors [`Baseline::statistics`].
    statistics: &'a Statistics,
}

impl Baseline {
    /// Recomputes the content fingerprint over every persisted field except
    /// `content_fingerprint` itself.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if canonicalization fails.
    pub fn compute_fingerprint(&self) -> Result<HashDigest, HashError> {
        let input = BaselineFingerprintInput {
            use_case_id: &self.use_case_id,
            experiment_method: &self.experiment_method,
            generated_at: self.generated_at,
            samples_executed: self.samples_executed,
            successes: self.successes,
            failures: self.failures,
            observed_rate: self.observed_rate,
            covariate_profile: &self.covariate_profile,
            footprint_hash: &self.footprint_hash,
            covariate_value_hashes: &self.covariate_value_hashes,
            statistics: &self.statistics,
        };
        hash_canonical_json(DEFAULT_HASH_ALGORITHM, &input)
    }

    /// Whether the stored `content_fingerprint` matches a freshly-recomputed
    /// one, the integrity check the baseline selector runs after parsing.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if recomputation fails (not if it merely
    /// mismatches — that case returns `Ok(false)`).
    pub fn fingerprint_is_valid(&self) -> Result<bool, HashError> {
        Ok(self.compute_fingerprint()? == self.content_fingerprint)
    }

    /// The canonical on-disk filename:
    /// `<useCaseId>.<methodName>-<YYYYMMDD-HHMM>-<footprintHash>-<covValHash1>-….yaml`.
    #[must_use]
    pub fn canonical_filename(&self) -> String {
        let timestamp = format_timestamp(self.generated_at);
        let mut name = format!("{}.{}-{}-{}", self.use_case_id, self.experiment_method, timestamp, self.footprint_hash.value);
        for hash in &self.covariate_value_hashes {
            name.push('-');
            name.push_str(&hash.value);
        }
        name.push_str(".yaml");
        name
    }
}

/// Renders a timestamp as `YYYYMMDD-HHMM`, the filename's date segment.
fn format_timestamp(at: OffsetDateTime) -> String {
    format!("{:04}{:02}{:02}-{:02}{:02}", at.year(), u8::from(at.month()), at.day(), at.hour(), at.minute())
}

// ============================================================================
// SECTION: Execution Specification
// ============================================================================

/// How an execution specification references the baseline it was approved
/// from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BaselineReference {
    /// References a baseline elsewhere by its content hash.
    ByContentHash(HashDigest),
    /// Inlines the baseline's raw statistics directly.
    Inline(Box<Baseline>),
}

/// A human-approved promotion of a baseline. Immutable after approval;
/// carries its own `content_fingerprint`, computed the same way as
/// [`Baseline::compute_fingerprint`] but over this type's fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSpecification {
    /// The baseline this specification was approved from.
    pub baseline: BaselineReference,
    /// When the specification was approved.
    #[serde(with = "time::serde::rfc3339")]
    pub approved_at: OffsetDateTime,
    /// Who approved it.
    pub approved_by: String,
    /// Free-text approval notes.
    pub approval_notes: String,
    /// The specification's version tag.
    pub version: crate::identifiers::SpecVersion,
    /// The success-criteria expression, in the language `probtest-logic`
    /// parses and evaluates.
    pub success_criteria: String,
    /// Provenance of the pass-rate threshold, if declared.
    pub threshold_origin: Option<ThresholdOrigin>,
    /// Cryptographic hash of every persisted field above, excluding this one.
    pub content_fingerprint: HashDigest,
}

/// Mirrors [`ExecutionSpecification`]'s fingerprinted fields.
#[derive(Serialize)]
struct SpecFingerprintInput<'a> {
    /// Mirrors [`ExecutionSpecification::baseline`].
    baseline: &'a BaselineReference,
    /// Mirrors [`ExecutionSpecification::approved_at`].
    #[serde(with = "time::serde::rfc3339")]
    approved_at: OffsetDateTime,
    /// Mirrors [`ExecutionSpecification::approved_by`].
    approved_by: &'a str,
    /// Mirrors [`ExecutionSpecification::approval_notes`].
    approval_notes: &'a str,
    /// Mirrors [`ExecutionSpecification::version`].
    version: &'a crate::identifiers::SpecVersion,
    /// Mirrors [`ExecutionSpecification::success_criteria`].
    success_criteria: &'a str,
}

impl ExecutionSpecification {
    /// Recomputes the content fingerprint over every persisted field except
    /// `content_fingerprint` itself and `threshold_origin` (provenance
    /// metadata, not integrity-bearing content).
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if canonicalization fails.
    pub fn compute_fingerprint(&self) -> Result<HashDigest, HashError> {
        let input = SpecFingerprintInput {
            baseline: &self.baseline,
            approved_at: self.approved_at,
            approved_by: &self.approved_by,
            approval_notes: &self.approval_notes,
            version: &self.version,
            success_criteria: &self.success_criteria,
        };
        hash_canonical_json(DEFAULT_HASH_ALGORITHM, &input)
    }

    /// Whether the stored fingerprint matches a freshly-recomputed one.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if recomputation fails.
    pub fn fingerprint_is_valid(&self) -> Result<bool, HashError> {
        Ok(self.compute_fingerprint()? == self.content_fingerprint)
    }
}

// ============================================================================
// SECTION: Optimization History
// ============================================================================

/// How one OPTIMIZE iteration concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IterationStatus {
    /// Ran and scored successfully.
    Completed,
    /// The caller-supplied scorer raised an error.
    ScoringFailed,
    /// The caller-supplied mutator produced an invalid next value.
    MutationFailed,
}

/// One OPTIMIZE iteration's full record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationAggregate {
    /// Zero-based position in the optimization run.
    pub iteration_index: usize,
    /// The complete factor suit used for this iteration (fixed ∪ treatment).
    pub factor_suit: FactorSuit,
    /// The treatment factor's value for this iteration.
    pub treatment_value: FactorValue,
    /// Statistics gathered from this iteration's samples.
    pub statistics: Statistics,
    /// The scorer's output for this iteration.
    pub score: f64,
    /// How the iteration concluded.
    pub status: IterationStatus,
    /// Present when `status != Completed`.
    pub failure_reason: Option<String>,
}

/// Ordered history of an OPTIMIZE run, persisted as YAML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationHistory {
    /// Iterations in execution order.
    pub iterations: Vec<IterationAggregate>,
    /// When the optimization run started.
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    /// When the optimization run ended.
    #[serde(with = "time::serde::rfc3339")]
    pub ended_at: OffsetDateTime,
    /// Why the run terminated, e.g. `"max_iterations"` or
    /// `"no_improvement_window"`.
    pub termination_cause: String,
    /// Index into `iterations` of the best-scoring completed iteration.
    pub best_iteration: Option<usize>,
}

impl OptimizationHistory {
    /// The best-scoring completed iteration's record, if any exist.
    #[must_use]
    pub fn best(&self) -> Option<&IterationAggregate> {
        self.best_iteration.and_then(|index| self.iterations.get(index))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic, reason = "test assertions use unwrap/panic for clarity on deterministic fixtures")]
    use super::*;
    use crate::covariate::CovariateCategory;
    use crate::covariate::CovariateDeclaration;

    fn sample_statistics() -> Statistics {
        Statistics {
            p50_ms: 10.0,
            p90_ms: 20.0,
            p95_ms: 25.0,
            p99_ms: 30.0,
            p99_9_ms: None,
            mean_ms: 12.0,
            stdev_ms: 4.0,
            digest_bytes: None,
        }
    }

    fn sample_baseline() -> Baseline {
        let footprint_hash = HashDigest::new(DEFAULT_HASH_ALGORITHM, b"footprint");
        Baseline {
            use_case_id: UseCaseId::new("checkout"),
            experiment_method: MethodName::new("classify"),
            generated_at: OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap(),
            samples_executed: 300,
            successes: 285,
            failures: 15,
            observed_rate: 0.95,
            covariate_profile: CovariateProfile::new(),
            footprint_hash,
            covariate_value_hashes: vec![],
            statistics: sample_statistics(),
            content_fingerprint: HashDigest::new(DEFAULT_HASH_ALGORITHM, b"placeholder"),
        }
    }

    #[test]
    fn footprint_hash_ignores_factor_values_but_not_keys() {
        let mut declaration = CovariateDeclaration::new();
        declaration.declare("llm_model", CovariateCategory::Configuration);

        let suit_a = FactorSuit::empty().with("model", FactorValue::String("gpt-4".to_string()));
        let suit_b = FactorSuit::empty().with("model", FactorValue::String("claude-3".to_string()));
        assert_eq!(compute_footprint_hash(&suit_a, &declaration).unwrap(), compute_footprint_hash(&suit_b, &declaration).unwrap());

        let suit_c = FactorSuit::empty().with("temperature", FactorValue::Number(0.2));
        assert_ne!(compute_footprint_hash(&suit_a, &declaration).unwrap(), compute_footprint_hash(&suit_c, &declaration).unwrap());
    }

    #[test]
    fn factor_suit_with_does_not_mutate_the_original() {
        let base = FactorSuit::empty();
        let next = base.with("model", FactorValue::String("gpt-4".to_string()));
        assert_eq!(base.get("model"), None);
        assert_eq!(next.get("model"), Some(&FactorValue::String("gpt-4".to_string())));
    }

    #[test]
    fn fingerprint_recomputation_is_deterministic() {
        let baseline = sample_baseline();
        let first = baseline.compute_fingerprint().unwrap();
        let second = baseline.compute_fingerprint().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn tampering_a_field_invalidates_the_stored_fingerprint() {
        let mut baseline = sample_baseline();
        baseline.content_fingerprint = baseline.compute_fingerprint().unwrap();
        assert!(baseline.fingerprint_is_valid().unwrap());

        baseline.successes = 1;
        assert!(!baseline.fingerprint_is_valid().unwrap());
    }

    #[test]
    fn written_then_read_back_fingerprint_round_trips() {
        let mut baseline = sample_baseline();
        baseline.content_fingerprint = baseline.compute_fingerprint().unwrap();

        let yaml = serde_yaml_roundtrip(&baseline);
        assert_eq!(yaml.content_fingerprint, baseline.content_fingerprint);
        assert!(yaml.fingerprint_is_valid().unwrap());
    }

    fn serde_yaml_roundtrip(baseline: &Baseline) -> Baseline {
        let json = serde_json::to_string(baseline).unwrap();
        serde_json::from_str(&json).unwrap()
    }

    #[test]
    fn canonical_filename_matches_the_documented_shape() {
        let baseline = sample_baseline();
        let filename = baseline.canonical_filename();
        assert!(filename.starts_with("checkout.classify-"));
        assert!(filename.ends_with(".yaml"));
    }

    #[test]
    fn optimization_history_reports_the_best_iteration() {
        let history = OptimizationHistory {
            iterations: vec![
                IterationAggregate {
                    iteration_index: 0,
                    factor_suit: FactorSuit::empty(),
                    treatment_value: FactorValue::Number(0.1),
                    statistics: sample_statistics(),
                    score: 0.5,
                    status: IterationStatus::Completed,
                    failure_reason: None,
                },
                IterationAggregate {
                    iteration_index: 1,
                    factor_suit: FactorSuit::empty(),
                    treatment_value: FactorValue::Number(0.2),
                    statistics: sample_statistics(),
                    score: 0.9,
                    status: IterationStatus::Completed,
                    failure_reason: None,
                },
            ],
            started_at: OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap(),
            ended_at: OffsetDateTime::from_unix_timestamp(1_700_000_100).unwrap(),
            termination_cause: "max_iterations".to_string(),
            best_iteration: Some(1),
        };
        assert_eq!(history.best().unwrap().score, 0.9);
    }
}
