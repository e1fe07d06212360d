// probtest-orchestrator/src/lib.rs
// ============================================================================
// Crate: probtest-orchestrator
// Description: The three experiment modes built atop the core scheduler,
// budget engine, and baseline store: MEASURE, EXPLORE, and OPTIMIZE.
// ============================================================================

//! ## Overview
//! Each mode wraps [`probtest_core::run_samples`] with the bookkeeping its
//! output needs, then hands the result to the right downstream artifact:
//!
//! - [`measure`] — runs a baseline measurement and assembles a
//!   [`probtest_core::Baseline`].
//! - [`explore`] — runs one factor suit's samples and renders a diff-
//!   friendly, anchor-stamped YAML artifact.
//! - [`optimize`] — mutates a treatment factor across iterations against a
//!   caller-supplied scorer, mutator, and termination policy.
//! - [`anchor`] — the deterministic anchor generator EXPLORE stamps each
//!   sample block with.
//! - [`statistics`] — percentile/mean/stdev computation shared by MEASURE
//!   and OPTIMIZE.
//! - [`error`] — [`error::OrchestratorError`].

/// Deterministic, fixed-seed anchors for EXPLORE artifacts.
pub mod anchor;
/// Leaf error type for the three experiment modes.
pub mod error;
/// EXPLORE mode.
pub mod explore;
/// MEASURE mode.
pub mod measure;
/// OPTIMIZE mode.
pub mod optimize;
/// Latency percentile/mean/stdev computation.
pub mod statistics;

pub use error::OrchestratorError;
pub use explore::ExploreInvoker;
pub use explore::ExploreSample;
pub use explore::explore;
pub use measure::measure;
pub use optimize::Mutator;
pub use optimize::Objective;
pub use optimize::Scorer;
pub use optimize::TerminationPolicy;
pub use optimize::max_iterations;
pub use optimize::no_improvement_window;
pub use optimize::optimize;
pub use optimize::time_budget;
pub use statistics::compute_statistics;
