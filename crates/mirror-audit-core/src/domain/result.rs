//! Per-level results and their evidence.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::level::{LevelId, LevelStatus};
use crate::vcs::ToolError;

/// The outcome of running one level against one repository.
///
/// Produced exactly once per (repository, level) pair. The level id is the
/// map key in serialized reports, so it is not repeated inside the object;
/// reading a report restores it from that key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LevelResult {
    #[serde(skip)]
    pub level: LevelId,

    pub status: LevelStatus,

    #[serde(flatten)]
    pub evidence: Evidence,
}

impl LevelResult {
    /// PASS when `holds`, FAIL otherwise.
    pub fn checked(level: LevelId, holds: bool, evidence: Evidence) -> Self {
        let status = if holds {
            LevelStatus::Pass
        } else {
            LevelStatus::Fail
        };
        Self {
            level,
            status,
            evidence,
        }
    }

    /// ERROR: the check could not be completed.
    pub fn error(level: LevelId, err: &ToolError) -> Self {
        Self {
            level,
            status: LevelStatus::Error,
            evidence: Evidence::Error(ErrorEvidence::from(err)),
        }
    }

    pub fn passed(&self) -> bool {
        self.status.is_pass()
    }

    /// One-line explanation used in console summaries.
    pub fn message(&self) -> Option<String> {
        if self.passed() {
            return None;
        }
        Some(self.evidence.describe())
    }
}

/// Level-specific evidence, flattened into the level's JSON object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Evidence {
    Identity {
        local_commit: String,
        remote_commit: String,
        local_tree: String,
        commit_match: bool,
    },
    Tree {
        local_tree: String,
        remote_tree: String,
        tree_match: bool,
    },
    Structural {
        exit_code: Option<i32>,
        tool_clean: bool,
        issues_found: Vec<String>,
    },
    Content(ContentEvidence),
    Error(ErrorEvidence),
}

impl Evidence {
    pub fn describe(&self) -> String {
        match self {
            Evidence::Identity {
                local_commit,
                remote_commit,
                ..
            } => format!(
                "commit mismatch: local {} vs remote {}",
                short(local_commit),
                short(remote_commit)
            ),
            Evidence::Tree {
                local_tree,
                remote_tree,
                ..
            } => format!(
                "tree mismatch: local {} vs remote {}",
                short(local_tree),
                short(remote_tree)
            ),
            Evidence::Structural { issues_found, .. } => match issues_found.first() {
                Some(first) => format!("{} issue line(s), first: {}", issues_found.len(), first),
                None => "structural check reported problems".to_string(),
            },
            Evidence::Content(content) => format!(
                "{} corrupted file(s) among {} checked ({} tracked)",
                content.corrupted_files.len(),
                content.total_files_checked,
                content.total_files_in_repo
            ),
            Evidence::Error(err) => err.message.clone(),
        }
    }
}

/// How much of the tracked-file list Level 3 examined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageMode {
    Full,
    Prefix,
}

/// Evidence of the per-file content level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentEvidence {
    /// Every entry the tool reports as tracked.
    pub total_files_in_repo: usize,
    /// Regular files actually examined (verified + corrupted).
    pub total_files_checked: usize,
    /// Gitlinks and symlinks, which carry no file content to hash.
    pub skipped_entries: usize,
    pub coverage: CoverageMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coverage_limit: Option<usize>,
    /// `true` only when every regular tracked file was examined.
    pub complete_coverage: bool,
    pub corrupted_files: Vec<CorruptedFile>,
    /// SHA-256 of the first few verified files, keyed by path.
    pub sample_hashes: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorruptedFile {
    pub path: String,
    pub reason: String,
}

/// Evidence attached to an `ERROR` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEvidence {
    pub message: String,
    /// `tool`, `timeout`, `spawn`, or `malformed`.
    pub error_kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
}

impl From<&ToolError> for ErrorEvidence {
    fn from(err: &ToolError) -> Self {
        let (exit_code, stderr) = match err {
            ToolError::Tool {
                exit_code, stderr, ..
            } => (*exit_code, Some(stderr.clone()).filter(|s| !s.is_empty())),
            _ => (None, None),
        };
        Self {
            message: err.to_string(),
            error_kind: err.kind().to_string(),
            command: Some(err.command().to_string()),
            exit_code,
            stderr,
        }
    }
}

/// First twelve characters of an id, for one-line messages.
fn short(id: &str) -> &str {
    id.char_indices().nth(12).map_or(id, |(end, _)| &id[..end])
}
