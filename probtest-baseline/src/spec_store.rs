// probtest-baseline/src/spec_store.rs
// ============================================================================
// Module: Execution Specification Store
// Description: Directory-backed store for approved `ExecutionSpecification`
// artifacts, mirroring `store::BaselineStore`'s load/verify shape but keyed
// by spec version rather than a covariate-encoded filename.
// Purpose: Let MEASURE-time and verdict-time code load an approved spec and
// verify it hasn't been hand-edited since approval.
// Dependencies: probtest-core, serde_yaml, std::fs
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::OnceLock;

use probtest_core::ExecutionSpecification;

use crate::error::SelectionError;
use crate::error::StoreError;

/// A read-mostly cache over a directory of approved execution specification
/// YAML files, one per spec version.
pub struct SpecStore {
    /// Root directory holding specification files.
    root: PathBuf,
    /// Cached filenames, populated lazily and idempotently.
    filenames: Mutex<OnceLock<Vec<String>>>,
}

impl SpecStore {
    /// Opens a store rooted at `root`. Performs no I/O until the first
    /// lookup.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            filenames: Mutex::new(OnceLock::new()),
        }
    }

    /// The root directory this store scans.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Forces the next lookup to re-list the directory.
    pub fn invalidate(&self) {
        *self.filenames.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = OnceLock::new();
    }

    /// Returns every `.yaml` filename in the root directory, scanning once
    /// and caching the result.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory cannot be listed.
    pub fn filenames(&self) -> Result<Vec<String>, StoreError> {
        let guard = self.filenames.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(cached) = guard.get() {
            return Ok(cached.clone());
        }
        let listed = list_yaml_filenames(&self.root)?;
        Ok(guard.get_or_init(|| listed).clone())
    }

    /// The canonical filename for a spec of the given version: `<version>.yaml`.
    #[must_use]
    pub fn canonical_filename(version: &probtest_core::identifiers::SpecVersion) -> String {
        format!("{version}.yaml")
    }

    /// Loads and parses a specification by filename, without verifying its
    /// fingerprint.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] or [`StoreError::Parse`] on failure.
    pub fn load(&self, filename: &str) -> Result<ExecutionSpecification, StoreError> {
        let path = self.root.join(filename);
        load_spec(&path)
    }

    /// Loads a specification and verifies its content fingerprint, the
    /// integrity check applied before a spec's threshold or success
    /// criteria is trusted.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::IntegrityViolation`] on a fingerprint
    /// mismatch, or the underlying store error otherwise.
    pub fn load_verified(&self, filename: &str) -> Result<ExecutionSpecification, SelectionError> {
        let path = self.root.join(filename);
        let spec = load_spec(&path)?;
        let expected = spec.content_fingerprint.clone();
        let actual = spec.compute_fingerprint()?;
        if actual != expected {
            return Err(SelectionError::IntegrityViolation {
                path: path.to_string_lossy().into_owned(),
                expected,
                actual,
            });
        }
        Ok(spec)
    }

    /// Writes `spec` to its canonical filename under this store's root,
    /// creating the directory if needed, and invalidates the filename
    /// cache.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory or file cannot be written.
    pub fn write(&self, spec: &ExecutionSpecification) -> Result<PathBuf, StoreError> {
        fs::create_dir_all(&self.root).map_err(|source| StoreError::Io {
            path: self.root.to_string_lossy().into_owned(),
            source,
        })?;
        let path = self.root.join(Self::canonical_filename(&spec.version));
        let yaml = serde_yaml::to_string(spec).map_err(|source| StoreError::Parse {
            path: path.to_string_lossy().into_owned(),
            source,
        })?;
        fs::write(&path, yaml).map_err(|source| StoreError::Io {
            path: path.to_string_lossy().into_owned(),
            source,
        })?;
        self.invalidate();
        Ok(path)
    }
}

/// Lists every `.yaml` filename directly under `root`, treating a missing
/// directory as an empty listing rather than an error.
fn list_yaml_filenames(root: &Path) -> Result<Vec<String>, StoreError> {
    let read_dir = match fs::read_dir(root) {
        Ok(read_dir) => read_dir,
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(StoreError::Io {
                path: root.to_string_lossy().into_owned(),
                source,
            });
        }
    };

    let mut names = Vec::new();
    for entry in read_dir {
        let entry = entry.map_err(|source| StoreError::Io {
            path: root.to_string_lossy().into_owned(),
            source,
        })?;
        let file_name = entry.file_name();
        let name = file_name.to_string_lossy();
        if name.ends_with(".yaml") {
            names.push(name.into_owned());
        }
    }
    names.sort();
    Ok(names)
}

/// Reads and parses one specification YAML file from disk.
fn load_spec(path: &Path) -> Result<ExecutionSpecification, StoreError> {
    let raw = fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_string_lossy().into_owned(),
        source,
    })?;
    serde_yaml::from_str(&raw).map_err(|source| StoreError::Parse {
        path: path.to_string_lossy().into_owned(),
        source,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, reason = "test assertions use unwrap/expect/panic for clarity on deterministic fixtures")]
    use probtest_core::baseline::BaselineReference;
    use probtest_core::hashing::DEFAULT_HASH_ALGORITHM;
    use probtest_core::hashing::HashDigest;
    use probtest_core::identifiers::SpecVersion;
    use time::OffsetDateTime;

    use super::*;

    fn sample_spec() -> ExecutionSpecification {
        let mut spec = ExecutionSpecification {
            baseline: BaselineReference::ByContentHash(HashDigest::new(DEFAULT_HASH_ALGORITHM, b"baseline")),
            approved_at: OffsetDateTime::from_unix_timestamp(1_700_000_000).expect("valid timestamp"),
            approved_by: "reviewer@example.com".to_string(),
            approval_notes: "looks good".to_string(),
            version: SpecVersion::new("v1"),
            success_criteria: "success == true".to_string(),
            threshold_origin: None,
            content_fingerprint: HashDigest::new(DEFAULT_HASH_ALGORITHM, b"placeholder"),
        };
        spec.content_fingerprint = spec.compute_fingerprint().expect("fingerprint computes");
        spec
    }

    #[test]
    fn write_then_load_verified_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SpecStore::new(dir.path());
        let spec = sample_spec();
        store.write(&spec).expect("write succeeds");

        let loaded = store.load_verified(&SpecStore::canonical_filename(&spec.version)).expect("verifies");
        assert_eq!(loaded, spec);
    }

    #[test]
    fn tampered_spec_fails_integrity_verification() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SpecStore::new(dir.path());
        let spec = sample_spec();
        let path = store.write(&spec).expect("write succeeds");

        let mut tampered = spec.clone();
        tampered.success_criteria = "success == false".to_string();
        let yaml = serde_yaml::to_string(&tampered).expect("serializes");
        fs::write(&path, yaml).expect("overwrite succeeds");

        let result = store.load_verified(&SpecStore::canonical_filename(&spec.version));
        assert!(matches!(result, Err(SelectionError::IntegrityViolation { .. })));
    }
}
