// probtest-baseline/src/filename.rs
// ============================================================================
// Module: Canonical Filename Parsing
// Description: Parses the `<useCaseId>.<method>-<timestamp>-<footprint>-
// <covHash1>-...yaml` filename shape back into its segments without opening
// the file, the "file-based scan optimisation" from §2's component table.
// Purpose: Let the store narrow candidates by use case, method, and
// footprint hash before paying the cost of a YAML parse.
// Dependencies: none (pure string parsing)
// ============================================================================

//! ## Overview
//! [`Baseline::canonical_filename`](probtest_core::Baseline::canonical_filename)
//! builds the name; [`parse`] inverts it. Because a method name may itself
//! contain hyphens, the parser works from both ends: the use-case id is
//! everything before the first `.`, and the trailing `timestamp` (2
//! dash-segments) + `footprint hash` (1 segment) + one segment per declared,
//! non-informational covariate are fixed-width, so the method name is
//! whatever dash-joined remainder sits between them. Callers must know how
//! many covariate hashes a declaration contributes; that count isn't
//! recoverable from the filename alone.

/// A filename's parsed segments.
///
/// Hashes are kept as their hex strings rather than re-wrapped
/// [`probtest_core::hashing::HashDigest`] values, since the algorithm used
/// to produce a given file isn't recoverable from the filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFilename {
    /// The use case id segment, before the first `.`.
    pub use_case_id: String,
    /// The experiment method segment, which may itself contain hyphens.
    pub method: String,
    /// The `YYYYMMDD-HHMM` timestamp segment.
    pub timestamp: String,
    /// The footprint hash's hex value.
    pub footprint_hash: String,
    /// Covariate value hashes' hex values, in declaration order.
    pub covariate_hashes: Vec<String>,
}

/// A hex digest segment's fixed width under SHA-256, the only hash algorithm
/// this workspace's `HashDigest` currently produces.
const HEX_DIGEST_LEN: usize = 64;

/// Parses `filename` assuming it declares exactly `covariate_count` hashed
/// (non-informational) covariates. Returns `None` if the filename doesn't
/// match the canonical shape for that count.
#[must_use]
pub fn parse(filename: &str, covariate_count: usize) -> Option<ParsedFilename> {
    let stem = filename.strip_suffix(".yaml")?;
    let (use_case_id, rest) = stem.split_once('.')?;
    if use_case_id.is_empty() {
        return None;
    }

    let segments: Vec<&str> = rest.split('-').collect();
    // Trailing fixed-width segments: 2 for the timestamp, 1 for the
    // footprint hash, `covariate_count` for the covariate hashes.
    let trailing = covariate_count.checked_add(3)?;
    if segments.len() <= trailing {
        return None;
    }

    let split_at = segments.len() - trailing;
    let method = segments[..split_at].join("-");
    if method.is_empty() {
        return None;
    }

    let date = segments[split_at];
    let time = segments[split_at + 1];
    if date.len() != 8 || time.len() != 4 || !date.bytes().all(|b| b.is_ascii_digit()) || !time.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let footprint_hash = segments[split_at + 2];
    if !is_hex_digest(footprint_hash) {
        return None;
    }

    let covariate_hashes: Vec<String> = segments[split_at + 3..].iter().map(ToString::to_string).collect();
    if !covariate_hashes.iter().all(|hash| is_hex_digest(hash)) {
        return None;
    }

    Some(ParsedFilename {
        use_case_id: use_case_id.to_string(),
        method,
        timestamp: format!("{date}-{time}"),
        footprint_hash: footprint_hash.to_string(),
        covariate_hashes,
    })
}

/// Whether `segment` is a lowercase, fixed-width hex digest.
fn is_hex_digest(segment: &str) -> bool {
    segment.len() == HEX_DIGEST_LEN && segment.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}
