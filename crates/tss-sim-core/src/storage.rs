//! Result store
//!
//! Completion payloads are written as pretty JSON files named by operation
//! kind and the participant's sort key:
//!
//! - `keygen-<sortkey>.json`: one [`KeyShare`] per key generation participant
//! - `sig-<sortkey>.json`: one [`SignatureData`] per signer
//!
//! Key shares are loaded into a map keyed by sort key, so callers never rely
//! on directory enumeration order.

use crate::keygen::KeyShare;
use crate::sign::SignatureData;
use crate::{Error, KEYGEN_PREFIX, Result, SIGNATURE_PREFIX, SortKey};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Operation whose results are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// Distributed key generation
    Keygen,
    /// Distributed signing
    Sign,
}

impl OperationKind {
    /// File name prefix for this kind
    pub fn prefix(&self) -> &'static str {
        match self {
            OperationKind::Keygen => KEYGEN_PREFIX,
            OperationKind::Sign => SIGNATURE_PREFIX,
        }
    }

    /// File name for one participant's result
    pub fn file_name(&self, key: SortKey) -> String {
        format!("{}{}.json", self.prefix(), key)
    }

    /// Parse the sort key back out of a file name of this kind
    fn parse_file_name(&self, name: &str) -> Option<Result<SortKey>> {
        let stem = name.strip_prefix(self.prefix())?.strip_suffix(".json")?;
        Some(stem.parse())
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Keygen => write!(f, "keygen"),
            OperationKind::Sign => write!(f, "sign"),
        }
    }
}

/// File-backed store for key shares and signatures
#[derive(Debug, Clone)]
pub struct ResultStore {
    base_path: PathBuf,
}

impl ResultStore {
    /// Create a store rooted at `base_path`, creating the directory if needed
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();

        if !base_path.exists() {
            std::fs::create_dir_all(&base_path)?;
        }

        Ok(Self { base_path })
    }

    /// Directory holding the result files
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Path of one participant's result file
    pub fn path_for(&self, kind: OperationKind, key: SortKey) -> PathBuf {
        self.base_path.join(kind.file_name(key))
    }

    /// Serialize `value` and write it as the result of participant `key`
    pub async fn persist<T: Serialize + ?Sized>(
        &self,
        kind: OperationKind,
        key: SortKey,
        value: &T,
    ) -> Result<PathBuf> {
        let path = self.path_for(kind, key);
        let data = serde_json::to_vec_pretty(value)?;

        tokio::fs::write(&path, data).await?;

        // Key shares hold secret material
        #[cfg(unix)]
        {
            if kind == OperationKind::Keygen {
                use std::os::unix::fs::PermissionsExt;
                let perms = std::fs::Permissions::from_mode(0o600);
                tokio::fs::set_permissions(&path, perms).await?;
            }
        }

        debug!(path = %path.display(), %kind, "result persisted");
        Ok(path)
    }

    /// All stored result files of a kind, in sort-key order
    ///
    /// Files whose name carries the prefix but no valid sort key are skipped.
    pub async fn list(&self, kind: OperationKind) -> Result<Vec<(SortKey, PathBuf)>> {
        let mut found = BTreeMap::new();
        let mut entries = tokio::fs::read_dir(&self.base_path).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|s| s.to_str()) else {
                continue;
            };
            match kind.parse_file_name(name) {
                Some(Ok(key)) => {
                    found.insert(key, path);
                }
                Some(Err(e)) => warn!(file = name, error = %e, "ignoring unrecognised result file"),
                None => {}
            }
        }

        Ok(found.into_iter().collect())
    }

    /// Load every stored key share, keyed by the sort key in its file name
    pub async fn load_key_shares(&self) -> Result<BTreeMap<SortKey, KeyShare>> {
        let mut shares = BTreeMap::new();

        for (key, path) in self.list(OperationKind::Keygen).await? {
            let data = tokio::fs::read(&path).await?;
            let share: KeyShare = serde_json::from_slice(&data).map_err(|e| {
                Error::Deserialization(format!("{}: {}", path.display(), e))
            })?;
            if share.key != key {
                return Err(Error::Storage(format!(
                    "{} holds the share of party {}",
                    path.display(),
                    share.key
                )));
            }
            shares.insert(key, share);
        }

        Ok(shares)
    }

    /// Load the signature of a completed signing round of `expected` signers
    ///
    /// Fails unless exactly `expected` signature files exist and all of them
    /// are byte-identical.
    pub async fn load_signatures(&self, expected: usize) -> Result<SignatureData> {
        let files = self.list(OperationKind::Sign).await?;
        if files.len() != expected {
            return Err(Error::SignatureCountMismatch {
                expected,
                found: files.len(),
            });
        }
        self.load_converged(files).await
    }

    /// Load whatever signature files exist, requiring at least one and that
    /// all of them are byte-identical
    pub async fn load_any_signatures(&self) -> Result<SignatureData> {
        let files = self.list(OperationKind::Sign).await?;
        self.load_converged(files).await
    }

    async fn load_converged(&self, files: Vec<(SortKey, PathBuf)>) -> Result<SignatureData> {
        let mut files = files.into_iter();
        let (_, first_path) = files.next().ok_or(Error::NoSignatures)?;
        let first = tokio::fs::read(&first_path).await?;

        for (_, path) in files {
            let data = tokio::fs::read(&path).await?;
            if data != first {
                return Err(Error::SignatureMismatch(format!(
                    "{} differs from {}",
                    path.display(),
                    first_path.display()
                )));
            }
        }

        serde_json::from_slice(&first)
            .map_err(|e| Error::Deserialization(format!("{}: {}", first_path.display(), e)))
    }

    /// Remove all stored results of a kind; returns how many were removed
    pub async fn clear(&self, kind: OperationKind) -> Result<usize> {
        let files = self.list(kind).await?;
        for (_, path) in &files {
            tokio::fs::remove_file(path).await?;
        }
        if !files.is_empty() {
            debug!(%kind, removed = files.len(), "cleared stale results");
        }
        Ok(files.len())
    }
}
