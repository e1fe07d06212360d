// probtest-orchestrator/src/error.rs
// ============================================================================
// Module: Orchestrator Errors
// Description: Leaf error type for the three experiment modes, distinct from
// a sample failure or a statistical verdict.
// Purpose: Surface hashing, storage, and rendering failures without hiding
// them behind a sample's own pass/fail outcome.
// Dependencies: probtest-core, probtest-baseline, thiserror
// ============================================================================

use thiserror::Error;

/// Errors raised while running MEASURE, EXPLORE, or OPTIMIZE.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Computing a footprint, covariate, or content fingerprint hash failed.
    #[error("failed to compute a content hash: {0}")]
    Hash(#[from] probtest_core::hashing::HashError),
    /// Writing the resulting baseline to its store failed.
    #[error("failed to write baseline: {0}")]
    Store(#[from] probtest_baseline::StoreError),
    /// Rendering an EXPLORE artifact to YAML failed.
    #[error("failed to render an explore artifact: {0}")]
    Render(#[from] serde_yaml::Error),
}
