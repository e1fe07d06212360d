// probtest-baseline/src/store.rs
// ============================================================================
// Module: Baseline Store
// Description: Directory-backed, read-mostly baseline cache: a lazy,
// idempotent index of candidate filenames plus on-demand YAML loading and
// fingerprint verification.
// Purpose: Back the selector (§4.4) without re-listing the directory on
// every selection, matching §5's "population is lazy and idempotent"
// contract for the baseline store.
// Dependencies: probtest-core, serde_yaml, std::fs
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::OnceLock;

use probtest_core::Baseline;

use crate::error::SelectionError;
use crate::error::StoreError;
use crate::filename;

// ============================================================================
// SECTION: Baseline Store
// ============================================================================

/// A read-mostly cache over a directory of baseline YAML files.
///
/// Directory listing happens at most once per store instance (lazily, on
/// first use); callers that want a fresh view after writing a new baseline
/// should either construct a new store or call [`BaselineStore::invalidate`].
pub struct BaselineStore {
    /// Root directory holding baseline files.
    root: PathBuf,
    /// Cached filenames, populated lazily and idempotently.
    filenames: Mutex<OnceLock<Vec<String>>>,
}

impl BaselineStore {
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

    /// Forces the next lookup to re-list the directory, for callers that
    /// just wrote a new baseline into it.
    pub fn invalidate(&self) {
        *self.filenames.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = OnceLock::new();
    }

    /// Returns every `.yaml` filename in the root directory, scanning once
    /// and caching the result for subsequent calls.
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

    /// Parses filenames against `covariate_count`, narrowing to those whose
    /// parsed `use_case_id` and `method` match, without opening any file.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory cannot be listed.
    pub fn candidates(&self, use_case_id: &str, method: &str, covariate_count: usize) -> Result<Vec<filename::ParsedFilename>, StoreError> {
        Ok(self
            .filenames()?
            .into_iter()
            .filter_map(|name| filename::parse(&name, covariate_count))
            .filter(|parsed| parsed.use_case_id == use_case_id && parsed.method == method)
            .collect())
    }

    /// Loads and parses one baseline file by filename, without verifying its
    /// fingerprint (callers that need integrity verification should call
    /// [`Self::load_verified`]).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] or [`StoreError::Parse`] on failure.
    pub fn load(&self, filename: &str) -> Result<Baseline, StoreError> {
        let path = self.root.join(filename);
        load_baseline(&path)
    }

    /// Loads a baseline and verifies its content fingerprint, the integrity
    /// check every selector run applies to the final candidate (§4.4).
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::IntegrityViolation`] on a fingerprint
    /// mismatch, or the underlying store error otherwise.
    pub fn load_verified(&self, filename: &str) -> Result<Baseline, SelectionError> {
        let path = self.root.join(filename);
        let baseline = load_baseline(&path)?;
        let expected = baseline.content_fingerprint.clone();
        let actual = baseline.compute_fingerprint()?;
        if actual != expected {
            return Err(SelectionError::IntegrityViolation {
                path: path.to_string_lossy().into_owned(),
                expected,
                actual,
            });
        }
        Ok(baseline)
    }

    /// Writes `baseline` to its canonical filename under this store's root,
    /// creating the directory if needed, and invalidates the filename cache.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory or file cannot be written.
    pub fn write(&self, baseline: &Baseline) -> Result<PathBuf, StoreError> {
        fs::create_dir_all(&self.root).map_err(|source| StoreError::Io {
            path: self.root.to_string_lossy().into_owned(),
            source,
        })?;
        let path = self.root.join(baseline.canonical_filename());
        let yaml = serde_yaml::to_string(baseline).map_err(|source| StoreError::Parse {
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

/// Lists every `.yaml` filename directly under `root`, returning an empty
/// vector (rather than an error) if `root` doesn't exist yet — a fresh
/// baseline store with nothing measured is a normal state, not an I/O
/// failure.
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

/// Reads and parses one baseline YAML file from disk.
fn load_baseline(path: &Path) -> Result<Baseline, StoreError> {
    let raw = fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_string_lossy().into_owned(),
        source,
    })?;
    serde_yaml::from_str(&raw).map_err(|source| StoreError::Parse {
        path: path.to_string_lossy().into_owned(),
        source,
    })
}
