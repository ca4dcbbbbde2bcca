//! The audited working copy.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A local checkout and the remote it is expected to mirror.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRecord {
    /// Repository name (the checkout directory name).
    #[serde(rename = "repo")]
    pub name: String,

    /// Root of the working copy on disk.
    #[serde(rename = "path")]
    pub local_path: PathBuf,

    /// Name of the remote used as the trust anchor (e.g. `origin`).
    #[serde(rename = "remote")]
    pub remote_name: String,
}

impl RepositoryRecord {
    pub fn new(
        name: impl Into<String>,
        local_path: impl Into<PathBuf>,
        remote_name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            local_path: local_path.into(),
            remote_name: remote_name.into(),
        }
    }

    /// Build a record from a checkout path, naming it after its final component.
    pub fn from_path(local_path: &Path, remote_name: &str) -> Self {
        let name = local_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| local_path.to_string_lossy().to_string());
        Self::new(name, local_path, remote_name)
    }

    /// Absolute location of a tracked path inside this working copy.
    pub fn resolve(&self, tracked_path: impl AsRef<Path>) -> PathBuf {
        self.local_path.join(tracked_path)
    }
}
