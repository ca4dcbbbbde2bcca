//! Version-control capability consumed by the verification levels.
//!
//! [`VersionControlClient`] is the only I/O seam of the engine besides reading
//! working-copy files. [`git::GitClient`] drives the real `git` binary;
//! [`fake::FakeVcsClient`] is an in-memory stand-in for tests.

pub mod error;
pub mod fake;
pub mod git;

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::domain::RepositoryRecord;

pub use error::{ToolError, ToolResult};
pub use fake::{FakeRepo, FakeVcsClient, VcsOp};
pub use git::GitClient;

/// Index mode of a gitlink (submodule) entry.
pub const MODE_GITLINK: &str = "160000";
/// Index mode of a symbolic link entry.
pub const MODE_SYMLINK: &str = "120000";

/// A path tracked by the version-control index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedFile {
    /// Repository-relative path, byte-exact as the index stores it.
    pub path: PathBuf,
    /// Octal index mode, e.g. `100644`.
    pub mode: String,
    /// Object id the index recorded for this path, when the tool reports one.
    pub recorded_id: Option<String>,
}

impl TrackedFile {
    pub fn regular(path: impl Into<PathBuf>, recorded_id: Option<String>) -> Self {
        Self {
            path: path.into(),
            mode: "100644".to_string(),
            recorded_id,
        }
    }

    /// Gitlinks and symlinks have no file content of their own to hash.
    pub fn has_content(&self) -> bool {
        self.mode != MODE_GITLINK && self.mode != MODE_SYMLINK
    }

    /// The path as shown in reports; bytes that are not UTF-8 are replaced.
    pub fn display_path(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }
}

/// Raw outcome of the object-store consistency check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuralReport {
    /// Everything the tool printed, stdout followed by stderr.
    pub diagnostics: String,
    pub exit_code: Option<i32>,
    /// The tool's own verdict (exit status zero).
    pub clean: bool,
}

/// Read-only view of a working copy's version-control state.
///
/// Every call may fail with a [`ToolError`]; callers must never read a failure
/// as success.
#[async_trait]
pub trait VersionControlClient: Send + Sync {
    /// Commit id of the local `HEAD`.
    async fn head_commit_id(&self, repo: &RepositoryRecord) -> ToolResult<String>;

    /// Tree id covering the current content of every tracked file.
    async fn head_tree_id(&self, repo: &RepositoryRecord) -> ToolResult<String>;

    /// Commit id the remote advertises for its `HEAD` (network).
    async fn remote_head_commit_id(&self, repo: &RepositoryRecord, remote: &str)
        -> ToolResult<String>;

    /// Tree id of the locally known remote `HEAD`.
    async fn remote_head_tree_id(&self, repo: &RepositoryRecord, remote: &str)
        -> ToolResult<String>;

    /// Deep object-store consistency check. Never touches the network.
    async fn structural_check(&self, repo: &RepositoryRecord) -> ToolResult<StructuralReport>;

    /// Every path in the index, in index order.
    async fn list_tracked_files(&self, repo: &RepositoryRecord) -> ToolResult<Vec<TrackedFile>>;

    /// Object id the tool would assign to the file's current bytes.
    async fn content_object_id(&self, repo: &RepositoryRecord, path: &Path) -> ToolResult<String>;

    /// Refresh remote-tracking refs (network).
    async fn fetch(&self, repo: &RepositoryRecord, remote: &str) -> ToolResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracked_file_content_classification() {
        assert!(TrackedFile::regular("a.txt", None).has_content());
        let link = TrackedFile {
            path: PathBuf::from("vendor/lib"),
            mode: MODE_GITLINK.to_string(),
            recorded_id: None,
        };
        assert!(!link.has_content());
    }
}
