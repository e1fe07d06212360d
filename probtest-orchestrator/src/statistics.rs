// probtest-orchestrator/src/statistics.rs
// ============================================================================
// Module: Measurement Statistics
// Description: Percentile, mean, and standard-deviation computation over a
// run's per-sample latencies, plus a bounded placeholder sketch for the
// baseline's optional digest bytes.
// Purpose: Give MEASURE and OPTIMIZE a single latency-summarization routine
// so percentile derivation only lives in one place.
// Dependencies: probtest-core
// ============================================================================

use probtest_core::baseline::Statistics;

/// Below this sample count, `p99_9_ms` stays unpopulated: a 99.9th
/// percentile estimate from fewer than 1000 points is not meaningful.
const P999_MIN_SAMPLES: usize = 1000;

/// Caps how many evenly-spaced quantile markers the digest sketch retains.
const DIGEST_MARKERS: usize = 64;

/// Summarizes `latencies_ms` (one entry per executed sample, in any order)
/// into the percentile/mean/stdev/digest shape a [`Statistics`] record
/// carries. An empty slice yields an all-zero record.
#[must_use]
pub fn compute_statistics(latencies_ms: &[f64]) -> Statistics {
    if latencies_ms.is_empty() {
        return Statistics {
            p50_ms: 0.0,
            p90_ms: 0.0,
            p95_ms: 0.0,
            p99_ms: 0.0,
            p99_9_ms: None,
            mean_ms: 0.0,
            stdev_ms: 0.0,
            digest_bytes: None,
        };
    }

    let mut sorted = latencies_ms.to_vec();
    sorted.sort_by(f64::total_cmp);

    let p99_9_ms = (sorted.len() >= P999_MIN_SAMPLES).then(|| percentile(&sorted, 99.9));

    Statistics {
        p50_ms: percentile(&sorted, 50.0),
        p90_ms: percentile(&sorted, 90.0),
        p95_ms: percentile(&sorted, 95.0),
        p99_ms: percentile(&sorted, 99.0),
        p99_9_ms,
        mean_ms: mean(&sorted),
        stdev_ms: stdev(&sorted),
        digest_bytes: Some(digest_sketch(&sorted)),
    }
}

/// Nearest-rank percentile over an already-sorted ascending slice.
fn percentile(sorted: &[f64], pct: f64) -> f64 {
    #[allow(clippy::cast_precision_loss, reason = "sample counts stay small enough to round-trip exactly through f64")]
    let len = sorted.len() as f64;
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation, reason = "rank is always within [1, sorted.len()] by construction")]
    let rank = ((pct / 100.0 * len).ceil().max(1.0) as usize).min(sorted.len());
    sorted[rank - 1]
}

/// Arithmetic mean of a non-empty slice.
fn mean(sorted: &[f64]) -> f64 {
    #[allow(clippy::cast_precision_loss, reason = "sample counts stay small enough to round-trip exactly through f64")]
    let len = sorted.len() as f64;
    sorted.iter().sum::<f64>() / len
}

/// Sample standard deviation (Bessel-corrected); zero for fewer than two
/// points.
fn stdev(sorted: &[f64]) -> f64 {
    if sorted.len() < 2 {
        return 0.0;
    }
    let average = mean(sorted);
    #[allow(clippy::cast_precision_loss, reason = "sample counts stay small enough to round-trip exactly through f64")]
    let len_minus_one = (sorted.len() - 1) as f64;
    let variance = sorted.iter().map(|value| (value - average).powi(2)).sum::<f64>() / len_minus_one;
    variance.sqrt()
}

/// Builds a bounded sketch: up to [`DIGEST_MARKERS`] evenly-spaced quantile
/// markers from the sorted latencies, each encoded as 8 little-endian bytes.
/// A placeholder for a true streaming digest, sized to stay well below
/// baseline-file bloat regardless of sample count.
fn digest_sketch(sorted: &[f64]) -> Vec<u8> {
    let marker_count = sorted.len().clamp(1, DIGEST_MARKERS);
    let mut bytes = Vec::with_capacity(marker_count * 8);
    for i in 0..marker_count {
        #[allow(clippy::cast_precision_loss, reason = "marker_count is bounded by DIGEST_MARKERS")]
        let position = (i as f64 / marker_count as f64) * (sorted.len() - 1) as f64;
        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation, reason = "position stays within [0, sorted.len()) by construction")]
        let index = (position.round() as usize).min(sorted.len() - 1);
        bytes.extend_from_slice(&sorted[index].to_le_bytes());
    }
    bytes
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, reason = "test assertions use unwrap/expect/panic for clarity on deterministic fixtures")]
    use super::*;

    #[test]
    fn empty_input_yields_zeroed_statistics() {
        let statistics = compute_statistics(&[]);
        assert_eq!(statistics.p50_ms, 0.0);
        assert_eq!(statistics.p99_ms, 0.0);
        assert!(statistics.p99_9_ms.is_none());
        assert!(statistics.digest_bytes.is_none());
    }

    #[test]
    fn percentiles_match_hand_computation_on_ten_points() {
        let latencies: Vec<f64> = (1..=10).map(f64::from).collect();
        let statistics = compute_statistics(&latencies);
        assert_eq!(statistics.p50_ms, 5.0);
        assert_eq!(statistics.p90_ms, 9.0);
        assert_eq!(statistics.p99_ms, 10.0);
        assert_eq!(statistics.mean_ms, 5.5);
    }

    #[test]
    fn p99_9_only_populates_above_the_sample_floor() {
        let small = compute_statistics(&vec![1.0; 999]);
        assert!(small.p99_9_ms.is_none());

        let large = compute_statistics(&vec![1.0; 1000]);
        assert_eq!(large.p99_9_ms, Some(1.0));
    }

    #[test]
    fn digest_sketch_is_present_and_bounded_for_large_input() {
        let latencies: Vec<f64> = (0..5000).map(f64::from).collect();
        let statistics = compute_statistics(&latencies);
        let digest = statistics.digest_bytes.expect("digest present");
        assert!(digest.len() <= DIGEST_MARKERS * 8);
    }
}
