// probtest-baseline/src/lib.rs
// ============================================================================
// Crate: probtest-baseline
// Description: The filesystem-backed baseline and execution-specification
// stores, the canonical-filename codec, and the two-phase baseline selector.
// ============================================================================

//! ## Overview
//! - [`filename`] — parses the canonical baseline filename back into its
//!   segments without opening the file.
//! - [`store`] — [`store::BaselineStore`], a lazy directory-backed cache of
//!   baseline YAML files.
//! - [`spec_store`] — [`spec_store::SpecStore`], the equivalent for approved
//!   execution specifications.
//! - [`selector`] — [`selector::select`], the two-phase hard-gate/soft-score
//!   baseline selection algorithm.
//! - [`error`] — [`error::StoreError`] and [`error::SelectionError`].

/// Leaf error types for store I/O and selection failures.
pub mod error;
/// Canonical baseline filename parsing.
pub mod filename;
/// The two-phase baseline selection algorithm.
pub mod selector;
/// The execution specification store.
pub mod spec_store;
/// The baseline store.
pub mod store;

pub use error::CovariateMismatch;
pub use error::SelectionError;
pub use error::StoreError;
pub use selector::select;
pub use spec_store::SpecStore;
pub use store::BaselineStore;
