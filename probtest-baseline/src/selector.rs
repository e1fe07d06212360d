// probtest-baseline/src/selector.rs
// ============================================================================
// Module: Baseline Selector
// Description: Two-phase baseline selection: phase 1 hard-gates on
// `configuration`-category covariates and the footprint hash, phase 2
// soft-scores survivors on the remaining declared covariates with a
// deterministic tie-break, then verifies the winner's content fingerprint.
// Purpose: Implement the baseline selection & integrity subsystem (§4.4).
// Dependencies: probtest-core
// ============================================================================

use probtest_core::Baseline;
use probtest_core::covariate::CovariateCategory;
use probtest_core::covariate::CovariateDeclaration;
use probtest_core::covariate::CovariateProfile;
use probtest_core::hashing::HashDigest;

use crate::error::CovariateMismatch;
use crate::error::SelectionError;
use crate::store::BaselineStore;

// ============================================================================
// SECTION: Selection
// ============================================================================

/// Selects the baseline matching `footprint_hash` best, among those for
/// `use_case_id`/`method`, under `declaration` and the current run's
/// `test_profile`.
///
/// Phase 1 (hard gate): candidates whose filename-parsed footprint hash
/// doesn't match `footprint_hash` are skipped without being opened; the
/// survivors are opened and any that disagree with `test_profile` on a
/// `configuration`-category covariate are excluded.
///
/// Phase 2 (soft score): each remaining candidate is scored with a flat,
/// priority-independent point per soft-scored covariate, with ties broken
/// first by a per-category vector ordered by
/// [`CovariateCategory::tie_break_priority`] and finally by `generated_at`
/// recency.
///
/// The winner's content fingerprint is verified before it is returned.
///
/// # Errors
///
/// Returns [`SelectionError::ConfigurationMismatch`] if no candidate passes
/// phase 1, [`SelectionError::IntegrityViolation`] if the winner's
/// fingerprint doesn't recompute, or a store/hash error on I/O failure.
pub fn select(store: &BaselineStore, use_case_id: &str, method: &str, footprint_hash: &HashDigest, declaration: &CovariateDeclaration, test_profile: &CovariateProfile) -> Result<Baseline, SelectionError> {
    let covariate_count = declaration.hashed_keys().count();
    let parsed_candidates = store.candidates(use_case_id, method, covariate_count)?;

    let mut mismatches = Vec::new();
    let mut survivors = Vec::new();
    for parsed in parsed_candidates {
        if parsed.footprint_hash != footprint_hash.value {
            continue;
        }
        let baseline = store.load(&filename_for(use_case_id, method, &parsed))?;
        match hard_gate(declaration, test_profile, &baseline.covariate_profile) {
            Ok(()) => survivors.push(baseline),
            Err(mismatch) => mismatches.push(mismatch),
        }
    }

    let Some(winner) = pick_best(declaration, test_profile, survivors) else {
        return Err(SelectionError::ConfigurationMismatch {
            use_case_id: use_case_id.to_string(),
            method: method.to_string(),
            mismatches,
        });
    };

    verify_fingerprint(winner)
}

/// Rebuilds the canonical filename for a parsed candidate so it can be
/// reloaded through the store; the store indexes by filename, not by the
/// parsed struct.
fn filename_for(use_case_id: &str, method: &str, parsed: &crate::filename::ParsedFilename) -> String {
    let mut name = format!("{use_case_id}.{method}-{}-{}", parsed.timestamp, parsed.footprint_hash);
    for hash in &parsed.covariate_hashes {
        name.push('-');
        name.push_str(hash);
    }
    name.push_str(".yaml");
    name
}

/// Checks `candidate_profile` against `test_profile` on every
/// `configuration`-category key in `declaration`. Returns the first
/// mismatch found, since a single disqualifying covariate is enough to
/// exclude the candidate.
fn hard_gate(declaration: &CovariateDeclaration, test_profile: &CovariateProfile, candidate_profile: &CovariateProfile) -> Result<(), CovariateMismatch> {
    for key in declaration.configuration_keys() {
        let test_value = test_profile.get(key);
        let candidate_value = candidate_profile.get(key);
        let matches = match (test_value, candidate_value) {
            (Some(test_value), Some(candidate_value)) => test_value.exact_match(candidate_value),
            (None, None) => true,
            _ => false,
        };
        if !matches {
            return Err(CovariateMismatch {
                key: key.to_string(),
                baseline_value: candidate_value.map_or_else(|| "unset".to_string(), |value| format!("{value:?}")),
                test_value: test_value.map_or_else(|| "unset".to_string(), |value| format!("{value:?}")),
            });
        }
    }
    Ok(())
}

/// Match quality for one soft-scored covariate, used both as the flat
/// contribution to the total score and as an element of the tie-break
/// vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum MatchQuality {
    /// Neither an exact nor a partial match (or the key was unresolved on
    /// one side).
    None,
    /// A partial (soft-scoring) match, e.g. within the temporal tolerance.
    Partial,
    /// An exact value match.
    Exact,
}

impl MatchQuality {
    /// The flat point value this quality contributes to a candidate's total
    /// score, independent of the covariate's category priority: full match
    /// on value scores 3, partial match scores 1, no match scores 0.
    const fn points(self) -> i64 {
        match self {
            Self::None => 0,
            Self::Partial => 1,
            Self::Exact => 3,
        }
    }
}

/// Computes the soft-score total and per-covariate tie-break vector for one
/// candidate, iterating declared covariates in declaration order, skipping
/// `configuration` and `informational` categories.
///
/// The total is a flat sum of each covariate's match quality, unweighted by
/// category; category priority only orders the tie-break vector, applied as
/// a lower-precedence tie-break once flat scores are equal, never folded
/// into the total itself.
fn score(declaration: &CovariateDeclaration, test_profile: &CovariateProfile, candidate_profile: &CovariateProfile) -> (i64, Vec<(u8, MatchQuality)>) {
    let mut total = 0_i64;
    let mut vector = Vec::new();
    for (key, category) in declaration.iter() {
        if matches!(category, CovariateCategory::Configuration | CovariateCategory::Informational) {
            continue;
        }
        let quality = match (test_profile.get(key), candidate_profile.get(key)) {
            (Some(test_value), Some(candidate_value)) if test_value.exact_match(candidate_value) => MatchQuality::Exact,
            (Some(test_value), Some(candidate_value)) if test_value.partial_match(candidate_value) => MatchQuality::Partial,
            _ => MatchQuality::None,
        };
        total += quality.points();
        vector.push((category.tie_break_priority(), quality));
    }
    // Highest-priority covariates compare first when the vector is used for
    // a lexicographic tie-break.
    vector.sort_by_key(|entry| std::cmp::Reverse(entry.0));
    (total, vector)
}

/// Picks the best-scoring survivor: highest total score, ties broken by the
/// per-covariate score vector, then by `generated_at` recency.
fn pick_best(declaration: &CovariateDeclaration, test_profile: &CovariateProfile, survivors: Vec<Baseline>) -> Option<Baseline> {
    survivors.into_iter().map(|baseline| {
        let (total, vector) = score(declaration, test_profile, &baseline.covariate_profile);
        (total, vector, baseline)
    }).max_by(|left, right| left.0.cmp(&right.0).then_with(|| left.1.cmp(&right.1)).then_with(|| left.2.generated_at.cmp(&right.2.generated_at))).map(|(_, _, baseline)| baseline)
}

/// Verifies a selected baseline's content fingerprint recomputes to the
/// stored value, the final integrity check before a baseline is trusted.
fn verify_fingerprint(baseline: Baseline) -> Result<Baseline, SelectionError> {
    let expected = baseline.content_fingerprint.clone();
    let actual = baseline.compute_fingerprint()?;
    if actual != expected {
        return Err(SelectionError::IntegrityViolation {
            path: baseline.canonical_filename(),
            expected,
            actual,
        });
    }
    Ok(baseline)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, reason = "test assertions use unwrap/expect/panic for clarity on deterministic fixtures")]
    use probtest_core::MethodName;
    use probtest_core::UseCaseId;
    use probtest_core::baseline::Statistics;
    use probtest_core::covariate::CovariateValue;
    use probtest_core::covariate::DayKind;
    use probtest_core::hashing::DEFAULT_HASH_ALGORITHM;
    use probtest_core::hashing::hash_bytes;
    use time::Duration as TimeDuration;
    use time::OffsetDateTime;

    use super::*;

    fn declaration() -> CovariateDeclaration {
        let mut declaration = CovariateDeclaration::new();
        declaration.declare("model_version", CovariateCategory::Configuration);
        declaration.declare("day_kind", CovariateCategory::Temporal);
        declaration
    }

    fn baseline_with(footprint_hash: HashDigest, generated_at: OffsetDateTime, model_version: &str, day_kind: DayKind) -> Baseline {
        let mut covariate_profile = CovariateProfile::new();
        covariate_profile.set("model_version", CovariateValue::String(model_version.to_string()));
        covariate_profile.set("day_kind", CovariateValue::Day(day_kind));
        let covariate_value_hashes = covariate_profile.ordered_hashes(&declaration()).expect("hashes compute");
        let mut baseline = Baseline {
            use_case_id: UseCaseId::new("checkout"),
            experiment_method: MethodName::new("classify"),
            generated_at,
            samples_executed: 100,
            successes: 95,
            failures: 5,
            observed_rate: 0.95,
            covariate_profile,
            footprint_hash,
            covariate_value_hashes,
            statistics: Statistics {
                p50_ms: 10.0,
                p90_ms: 20.0,
                p95_ms: 25.0,
                p99_ms: 30.0,
                p99_9_ms: None,
                mean_ms: 12.0,
                stdev_ms: 4.0,
                digest_bytes: None,
            },
            content_fingerprint: HashDigest::new(DEFAULT_HASH_ALGORITHM, b"placeholder"),
        };
        baseline.content_fingerprint = baseline.compute_fingerprint().expect("fingerprint computes");
        baseline
    }

    #[test]
    fn selects_the_only_footprint_matching_candidate() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = BaselineStore::new(dir.path());
        let footprint = hash_bytes(DEFAULT_HASH_ALGORITHM, b"footprint");
        let baseline = baseline_with(footprint.clone(), OffsetDateTime::from_unix_timestamp(1_700_000_000).expect("valid"), "v1", DayKind::Weekday);
        store.write(&baseline).expect("write succeeds");

        let declaration = declaration();
        let mut test_profile = CovariateProfile::new();
        test_profile.set("model_version", CovariateValue::String("v1".to_string()));
        test_profile.set("day_kind", CovariateValue::Day(DayKind::Weekday));

        let selected = select(&store, "checkout", "classify", &footprint, &declaration, &test_profile).expect("selects");
        assert_eq!(selected, baseline);
    }

    #[test]
    fn excludes_candidates_disagreeing_on_configuration_covariates() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = BaselineStore::new(dir.path());
        let footprint = hash_bytes(DEFAULT_HASH_ALGORITHM, b"footprint");
        let baseline = baseline_with(footprint.clone(), OffsetDateTime::from_unix_timestamp(1_700_000_000).expect("valid"), "v1", DayKind::Weekday);
        store.write(&baseline).expect("write succeeds");

        let declaration = declaration();
        let mut test_profile = CovariateProfile::new();
        test_profile.set("model_version", CovariateValue::String("v2".to_string()));
        test_profile.set("day_kind", CovariateValue::Day(DayKind::Weekday));

        let result = select(&store, "checkout", "classify", &footprint, &declaration, &test_profile);
        match result {
            Err(SelectionError::ConfigurationMismatch { mismatches, .. }) => {
                assert_eq!(mismatches.len(), 1);
                assert_eq!(mismatches[0].key, "model_version");
            }
            other => panic!("expected configuration mismatch, got {other:?}"),
        }
    }

    #[test]
    fn prefers_the_candidate_scoring_higher_on_soft_covariates() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = BaselineStore::new(dir.path());
        let footprint = hash_bytes(DEFAULT_HASH_ALGORITHM, b"footprint");
        let base_time = OffsetDateTime::from_unix_timestamp(1_700_000_000).expect("valid");
        let weekday_match = baseline_with(footprint.clone(), base_time, "v1", DayKind::Weekday);
        let weekend_mismatch = baseline_with(footprint.clone(), base_time + TimeDuration::hours(1), "v1", DayKind::Weekend);
        store.write(&weekday_match).expect("write succeeds");
        store.write(&weekend_mismatch).expect("write succeeds");

        let declaration = declaration();
        let mut test_profile = CovariateProfile::new();
        test_profile.set("model_version", CovariateValue::String("v1".to_string()));
        test_profile.set("day_kind", CovariateValue::Day(DayKind::Weekday));

        let selected = select(&store, "checkout", "classify", &footprint, &declaration, &test_profile).expect("selects");
        assert_eq!(selected, weekday_match);
    }

    #[test]
    fn an_exact_match_on_a_low_priority_covariate_outscores_a_partial_match_on_a_high_priority_one() {
        // Declares a temporal covariate (tie-break priority 4) alongside a
        // data-state covariate (tie-break priority 1), to confirm the total
        // score is a flat sum of match quality and not weighted by
        // category priority.
        let mut declaration = CovariateDeclaration::new();
        declaration.declare("business_hours", CovariateCategory::Temporal);
        declaration.declare("cart_state", CovariateCategory::DataState);

        let business_hours = CovariateValue::TimeWindow {
            start: time::Time::from_hms(9, 0, 0).expect("valid"),
            end: time::Time::from_hms(17, 0, 0).expect("valid"),
            zone: "UTC".to_string(),
        };
        let nearby_business_hours = CovariateValue::TimeWindow {
            start: time::Time::from_hms(9, 15, 0).expect("valid"),
            end: time::Time::from_hms(17, 15, 0).expect("valid"),
            zone: "UTC".to_string(),
        };

        let mut test_profile = CovariateProfile::new();
        test_profile.set("business_hours", business_hours);
        test_profile.set("cart_state", CovariateValue::String("populated".to_string()));

        let mut exact_low_priority = CovariateProfile::new();
        exact_low_priority.set("business_hours", CovariateValue::String("no-window-declared".to_string()));
        exact_low_priority.set("cart_state", CovariateValue::String("populated".to_string()));

        let mut partial_high_priority = CovariateProfile::new();
        partial_high_priority.set("business_hours", nearby_business_hours);
        partial_high_priority.set("cart_state", CovariateValue::String("empty".to_string()));

        let (exact_low_total, _) = score(&declaration, &test_profile, &exact_low_priority);
        let (partial_high_total, _) = score(&declaration, &test_profile, &partial_high_priority);

        assert_eq!(exact_low_total, 3, "an exact match alone should score 3 regardless of category priority");
        assert_eq!(partial_high_total, 1, "a partial match alone should score 1 regardless of category priority");
        assert!(exact_low_total > partial_high_total, "exact match on a low-priority covariate must outscore a partial match on a high-priority one");
    }

    #[test]
    fn breaks_ties_by_recency() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = BaselineStore::new(dir.path());
        let footprint = hash_bytes(DEFAULT_HASH_ALGORITHM, b"footprint");
        let base_time = OffsetDateTime::from_unix_timestamp(1_700_000_000).expect("valid");
        let older = baseline_with(footprint.clone(), base_time, "v1", DayKind::Weekday);
        let newer = baseline_with(footprint.clone(), base_time + TimeDuration::hours(1), "v1", DayKind::Weekday);
        store.write(&older).expect("write succeeds");
        store.write(&newer).expect("write succeeds");

        let declaration = declaration();
        let mut test_profile = CovariateProfile::new();
        test_profile.set("model_version", CovariateValue::String("v1".to_string()));
        test_profile.set("day_kind", CovariateValue::Day(DayKind::Weekday));

        let selected = select(&store, "checkout", "classify", &footprint, &declaration, &test_profile).expect("selects");
        assert_eq!(selected, newer);
    }
}
