// probtest-core/src/covariate.rs
// ============================================================================
// Module: Covariate Model
// Description: Typed covariate values, their categories, a use case's
// declared covariates, and the resolved profile for one test run.
// Purpose: Let baseline selection distinguish hard-gated configuration
// covariates from soft-scored temporal/environmental ones.
// Dependencies: crate::hashing, time
// ============================================================================

//! ## Overview
//! A use case declares, in order, which covariates matter and how each
//! should be weighed ([`CovariateCategory`]). At test time each declared key
//! resolves to a [`CovariateValue`] through a fixed precedence, producing a
//! [`CovariateProfile`]. Declaration order is stable and determines both
//! filename-hash order and tie-break priority during baseline selection.

use std::collections::HashMap;
use std::env;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;

use crate::hashing::DEFAULT_HASH_ALGORITHM;
use crate::hashing::HashDigest;
use crate::hashing::hash_canonical_json;

/// The ±30-minute tolerance for `time_of_day` partial matches (§9 open
/// question). Fixed as a named constant rather than silently widened;
/// changing it is a compatibility break.
pub const TEMPORAL_PARTIAL_MATCH_TOLERANCE: Duration = Duration::from_secs(30 * 60);

// ============================================================================
// SECTION: Covariate Value
// ============================================================================

/// Whether a day falls on a weekday or a weekend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayKind {
    /// Monday through Friday.
    Weekday,
    /// Saturday or Sunday.
    Weekend,
}

/// A tagged union of the covariate value shapes the framework understands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CovariateValue {
    /// An opaque labeled string, e.g. a model identifier or region name.
    String(String),
    /// A time-of-day window, e.g. "business hours", with a named zone.
    TimeWindow {
        /// Window start, in local time-of-day.
        start: time::Time,
        /// Window end, in local time-of-day.
        end: time::Time,
        /// The named zone the window is interpreted in, e.g. `"UTC"`.
        zone: String,
    },
    /// Weekday-versus-weekend classification.
    Day(DayKind),
    /// Raw bytes for covariates with no richer structure, still content-hashable.
    Opaque(Vec<u8>),
}

impl CovariateValue {
    /// Computes this value's stable content hash, used both for the
    /// filename's `covValHash` segments and for hard-gate equality checks.
    ///
    /// # Errors
    ///
    /// Returns [`crate::hashing::HashError`] if canonicalization fails, which
    /// cannot happen for any value this enum can construct but is still
    /// surfaced rather than hidden.
    pub fn content_hash(&self) -> Result<HashDigest, crate::hashing::HashError> {
        hash_canonical_json(DEFAULT_HASH_ALGORITHM, self)
    }

    /// Whether `self` is an exact value match for `other`, used by
    /// configuration-category hard gates.
    #[must_use]
    pub fn exact_match(&self, other: &Self) -> bool {
        self == other
    }

    /// Whether `self` partially matches `other` under the soft-scoring
    /// rules: a `TimeWindow` matches within
    /// [`TEMPORAL_PARTIAL_MATCH_TOLERANCE`] of either bound, and a `Day`
    /// matches on identical [`DayKind`].
    #[must_use]
    pub fn partial_match(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Self::TimeWindow {
                    start: a_start,
                    end: a_end,
                    zone: a_zone,
                },
                Self::TimeWindow {
                    start: b_start,
                    end: b_end,
                    zone: b_zone,
                },
            ) => a_zone == b_zone && (time_within_tolerance(*a_start, *b_start) || time_within_tolerance(*a_end, *b_end)),
            (Self::Day(a), Self::Day(b)) => a == b,
            _ => false,
        }
    }
}

/// Whether two times-of-day fall within [`TEMPORAL_PARTIAL_MATCH_TOLERANCE`]
/// of each other, handling midnight wraparound.
fn time_within_tolerance(a: time::Time, b: time::Time) -> bool {
    let seconds_a = i64::from(a.hour()) * 3600 + i64::from(a.minute()) * 60 + i64::from(a.second());
    let seconds_b = i64::from(b.hour()) * 3600 + i64::from(b.minute()) * 60 + i64::from(b.second());
    let raw_diff = (seconds_a - seconds_b).abs();
    let wrapped_diff = 86_400 - raw_diff;
    let diff = raw_diff.min(wrapped_diff);
    diff <= i64::try_from(TEMPORAL_PARTIAL_MATCH_TOLERANCE.as_secs()).unwrap_or(i64::MAX)
}

// ============================================================================
// SECTION: Covariate Category
// ============================================================================

/// How a covariate participates in baseline selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CovariateCategory {
    /// Hard gate: candidates with a mismatched value are excluded outright.
    Configuration,
    /// Soft score: time-of-day or day-of-week context.
    Temporal,
    /// Soft score: hosting environment, region, hardware class.
    Infrastructure,
    /// Soft score: state of an external dependency (provider, model version).
    ExternalDependency,
    /// Soft score: state of application data at test time.
    DataState,
    /// Soft score: operational context (load level, deployment phase).
    Operational,
    /// Ignored in matching and excluded from the filename hash entirely.
    Informational,
}

impl CovariateCategory {
    /// Tie-break priority among soft-scored categories, higher wins:
    /// temporal > infrastructure ~ operational > external_dependency >
    /// data_state. Hard-gated and informational categories never reach a
    /// tie-break, but are given a priority for completeness.
    #[must_use]
    pub const fn tie_break_priority(self) -> u8 {
        match self {
            Self::Temporal => 4,
            Self::Infrastructure | Self::Operational => 3,
            Self::ExternalDependency => 2,
            Self::DataState => 1,
            Self::Configuration | Self::Informational => 0,
        }
    }
}

// ============================================================================
// SECTION: Covariate Declaration
// ============================================================================

/// A use case's ordered declaration of which covariates matter and how each
/// should be weighed. Declaration order is stable and determines hash order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CovariateDeclaration {
    /// Declared `(key, category)` pairs, in declaration order.
    entries: Vec<(String, CovariateCategory)>,
}

impl CovariateDeclaration {
    /// Creates an empty declaration.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Appends a declared covariate key in its declaration-order position.
    pub fn declare(&mut self, key: impl Into<String>, category: CovariateCategory) {
        self.entries.push((key.into(), category));
    }

    /// Iterates declared `(key, category)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &(String, CovariateCategory)> {
        self.entries.iter()
    }

    /// Declared keys belonging to the hard-gated `configuration` category.
    pub fn configuration_keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter(|(_, category)| matches!(category, CovariateCategory::Configuration)).map(|(key, _)| key.as_str())
    }

    /// Declared keys excluding `informational`, in declaration order — the
    /// set that contributes to the filename hash.
    pub fn hashed_keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter(|(_, category)| !matches!(category, CovariateCategory::Informational)).map(|(key, _)| key.as_str())
    }
}

// ============================================================================
// SECTION: Covariate Profile
// ============================================================================

/// A resolved `key -> value` mapping for one test run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CovariateProfile {
    /// The resolved mapping from covariate key to value.
    values: HashMap<String, CovariateValue>,
}

impl CovariateProfile {
    /// Creates an empty profile.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites a resolved value for `key`.
    pub fn set(&mut self, key: impl Into<String>, value: CovariateValue) {
        self.values.insert(key.into(), value);
    }

    /// Looks up the resolved value for `key`, if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&CovariateValue> {
        self.values.get(key)
    }

    /// Computes content hashes for `declaration`'s hashed keys, in
    /// declaration order, for use in the baseline filename and footprint.
    /// A missing key contributes no hash (it was never resolved).
    ///
    /// # Errors
    ///
    /// Returns [`crate::hashing::HashError`] if a value fails to canonicalize.
    pub fn ordered_hashes(&self, declaration: &CovariateDeclaration) -> Result<Vec<HashDigest>, crate::hashing::HashError> {
        declaration.hashed_keys().filter_map(|key| self.values.get(key)).map(CovariateValue::content_hash).collect()
    }
}

// ============================================================================
// SECTION: Resolution Precedence
// ============================================================================

/// A use-case-instance-provided covariate resolver, the first and highest
/// precedence source in the resolution chain.
pub trait InstanceCovariateResolver {
    /// Resolves `key` from the use-case instance, if it provides one.
    fn resolve(&self, key: &str) -> Option<CovariateValue>;
}

/// Resolves one declared covariate through the fixed precedence: instance
/// resolver, then process-wide property, then environment variable, then
/// (for built-in keys only) a default resolver.
#[must_use]
pub fn resolve_covariate(
    key: &str,
    instance_resolver: Option<&dyn InstanceCovariateResolver>,
    prefix: &str,
    properties: &HashMap<String, String>,
    env_lookup: &dyn Fn(&str) -> Option<String>,
) -> Option<CovariateValue> {
    if let Some(resolver) = instance_resolver
        && let Some(value) = resolver.resolve(key)
    {
        return Some(value);
    }
    if let Some(raw) = properties.get(&format!("{prefix}.covariate.{key}")) {
        return Some(CovariateValue::String(raw.clone()));
    }
    let env_key = format!("{}_COVARIATE_{}", prefix.to_uppercase(), key.to_uppercase());
    if let Some(raw) = env_lookup(&env_key) {
        return Some(CovariateValue::String(raw));
    }
    default_resolver(key)
}

/// Resolves an entire declaration against the fixed precedence chain,
/// producing a complete profile for the keys that resolved.
#[must_use]
pub fn resolve_profile(declaration: &CovariateDeclaration, instance_resolver: Option<&dyn InstanceCovariateResolver>, prefix: &str, properties: &HashMap<String, String>) -> CovariateProfile {
    let mut profile = CovariateProfile::new();
    for (key, _category) in declaration.iter() {
        if let Some(value) = resolve_covariate(key, instance_resolver, prefix, properties, &|k| env::var(k).ok()) {
            profile.set(key.clone(), value);
        }
    }
    profile
}

/// The default resolver for built-in temporal and infrastructure covariates,
/// the last stop in the precedence chain. Unknown keys resolve to `None`,
/// since defaults are only defined for the framework's own built-ins.
fn default_resolver(key: &str) -> Option<CovariateValue> {
    match key {
        "time_of_day" => Some(default_time_of_day()),
        "day_kind" => Some(default_day_kind()),
        "hostname" => Some(default_hostname()),
        _ => None,
    }
}

/// The current time-of-day as a zero-width `TimeWindow` anchored at "now",
/// in UTC.
fn default_time_of_day() -> CovariateValue {
    let now = OffsetDateTime::now_utc();
    CovariateValue::TimeWindow {
        start: now.time(),
        end: now.time(),
        zone: "UTC".to_string(),
    }
}

/// Today's weekday/weekend classification, in UTC.
fn default_day_kind() -> CovariateValue {
    use time::Weekday;
    let now = OffsetDateTime::now_utc();
    let kind = match now.weekday() {
        Weekday::Saturday | Weekday::Sunday => DayKind::Weekend,
        _ => DayKind::Weekday,
    };
    CovariateValue::Day(kind)
}

/// This host's name, from the `HOSTNAME` environment variable, falling back
/// to `"unknown"` when unset.
fn default_hostname() -> CovariateValue {
    CovariateValue::String(env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string()))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic, reason = "test assertions use unwrap/panic for clarity on deterministic fixtures")]
    use super::*;

    #[test]
    fn identical_values_hash_identically() {
        let a = CovariateValue::String("gpt-4".to_string());
        let b = CovariateValue::String("gpt-4".to_string());
        assert_eq!(a.content_hash().unwrap(), b.content_hash().unwrap());
    }

    #[test]
    fn different_values_hash_differently() {
        let a = CovariateValue::String("gpt-4".to_string());
        let b = CovariateValue::String("claude-3".to_string());
        assert_ne!(a.content_hash().unwrap(), b.content_hash().unwrap());
    }

    #[test]
    fn time_windows_within_tolerance_partially_match() {
        let a = CovariateValue::TimeWindow {
            start: time::Time::from_hms(9, 0, 0).unwrap(),
            end: time::Time::from_hms(17, 0, 0).unwrap(),
            zone: "UTC".to_string(),
        };
        let b = CovariateValue::TimeWindow {
            start: time::Time::from_hms(9, 20, 0).unwrap(),
            end: time::Time::from_hms(17, 40, 0).unwrap(),
            zone: "UTC".to_string(),
        };
        assert!(a.partial_match(&b));
        assert!(!a.exact_match(&b));
    }

    #[test]
    fn time_windows_beyond_tolerance_do_not_partially_match() {
        let a = CovariateValue::TimeWindow {
            start: time::Time::from_hms(9, 0, 0).unwrap(),
            end: time::Time::from_hms(17, 0, 0).unwrap(),
            zone: "UTC".to_string(),
        };
        let b = CovariateValue::TimeWindow {
            start: time::Time::from_hms(10, 0, 0).unwrap(),
            end: time::Time::from_hms(18, 0, 0).unwrap(),
            zone: "UTC".to_string(),
        };
        assert!(!a.partial_match(&b));
    }

    #[test]
    fn day_kind_matches_only_on_identical_kind() {
        assert!(CovariateValue::Day(DayKind::Weekday).partial_match(&CovariateValue::Day(DayKind::Weekday)));
        assert!(!CovariateValue::Day(DayKind::Weekday).partial_match(&CovariateValue::Day(DayKind::Weekend)));
    }

    #[test]
    fn declaration_preserves_order_and_filters_informational_from_hashing() {
        let mut declaration = CovariateDeclaration::new();
        declaration.declare("llm_model", CovariateCategory::Configuration);
        declaration.declare("time_of_day", CovariateCategory::Temporal);
        declaration.declare("build_id", CovariateCategory::Informational);

        let hashed: Vec<&str> = declaration.hashed_keys().collect();
        assert_eq!(hashed, vec!["llm_model", "time_of_day"]);
    }

    #[test]
    fn resolution_precedence_prefers_instance_over_property_over_env() {
        struct FixedResolver;
        impl InstanceCovariateResolver for FixedResolver {
            fn resolve(&self, key: &str) -> Option<CovariateValue> {
                (key == "region").then(|| CovariateValue::String("instance-value".to_string()))
            }
        }
        let mut properties = HashMap::new();
        properties.insert("probtest.covariate.region".to_string(), "property-value".to_string());

        let resolved = resolve_covariate("region", Some(&FixedResolver), "probtest", &properties, &|_| None);
        assert_eq!(resolved, Some(CovariateValue::String("instance-value".to_string())));

        let resolved_without_instance = resolve_covariate("region", None, "probtest", &properties, &|_| None);
        assert_eq!(resolved_without_instance, Some(CovariateValue::String("property-value".to_string())));
    }

    #[test]
    fn unknown_key_with_no_source_resolves_to_none() {
        let properties = HashMap::new();
        assert_eq!(resolve_covariate("nonexistent", None, "probtest", &properties, &|_| None), None);
    }

    #[test]
    fn tie_break_priority_orders_temporal_above_data_state() {
        assert!(CovariateCategory::Temporal.tie_break_priority() > CovariateCategory::DataState.tie_break_priority());
        assert_eq!(CovariateCategory::Infrastructure.tie_break_priority(), CovariateCategory::Operational.tie_break_priority());
    }
}
