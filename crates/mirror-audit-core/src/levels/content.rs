//! Level 3: every examined tracked file hashes to what the index recorded.
//!
//! Bytes are read straight from the working copy and hashed with SHA-256
//! independently of the version-control tool. The tool's own object id for
//! the same path must be computable and, when the index recorded one, equal
//! to it. A fault on one file marks that file corrupted and never aborts the
//! level.

use std::collections::BTreeMap;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::domain::{
    ContentEvidence, CorruptedFile, Evidence, LevelId, LevelResult, RepositoryRecord,
};
use crate::levels::{LevelContext, VerificationLevel};
use crate::vcs::TrackedFile;

/// Verified files whose SHA-256 is kept as a sample in the evidence.
const SAMPLE_HASHES: usize = 3;

pub struct ContentLevel;

/// What happened to one examined file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Verified {
        path: String,
        sha256: String,
        object_id: String,
    },
    Corrupted {
        path: String,
        reason: String,
    },
}

impl FileOutcome {
    fn corrupted(path: &str, reason: String) -> Self {
        FileOutcome::Corrupted {
            path: path.to_string(),
            reason,
        }
    }
}

/// Examine a single tracked file.
pub async fn verify_file(
    repo: &RepositoryRecord,
    file: &TrackedFile,
    ctx: &LevelContext,
) -> FileOutcome {
    let shown = file.display_path();
    let bytes = match tokio::fs::read(repo.resolve(&file.path)).await {
        Ok(bytes) => bytes,
        Err(err) => return FileOutcome::corrupted(&shown, format!("unreadable: {err}")),
    };
    let sha256 = hex::encode(Sha256::digest(&bytes));

    let command = format!("content_object_id {shown}");
    let object_id = match ctx
        .call(&command, ctx.client().content_object_id(repo, &file.path))
        .await
    {
        Ok(id) => id,
        Err(err) => {
            return FileOutcome::corrupted(&shown, format!("object id unavailable: {err}"))
        }
    };

    if let Some(recorded) = &file.recorded_id {
        if *recorded != object_id {
            return FileOutcome::corrupted(
                &shown,
                format!("content id {object_id} differs from recorded {recorded}"),
            );
        }
    }

    FileOutcome::Verified {
        path: shown,
        sha256,
        object_id,
    }
}

#[async_trait]
impl VerificationLevel for ContentLevel {
    fn id(&self) -> LevelId {
        LevelId::Content
    }

    async fn run(&self, repo: &RepositoryRecord, ctx: &LevelContext) -> LevelResult {
        let tracked = match ctx
            .call("list_tracked_files", ctx.client().list_tracked_files(repo))
            .await
        {
            Ok(tracked) => tracked,
            Err(err) => return LevelResult::error(LevelId::Content, &err),
        };

        let coverage = ctx.config().coverage;
        let total_files_in_repo = tracked.len();
        let (regular, skipped): (Vec<&TrackedFile>, Vec<&TrackedFile>) =
            tracked.iter().partition(|f| f.has_content());
        let examined = coverage.take(regular.len());

        let mut outcomes = Vec::with_capacity(examined);
        for file in regular.iter().take(examined) {
            outcomes.push(verify_file(repo, file, ctx).await);
        }

        let mut corrupted_files = Vec::new();
        let mut sample_hashes = BTreeMap::new();
        for outcome in &outcomes {
            match outcome {
                FileOutcome::Verified { path, sha256, .. } => {
                    if sample_hashes.len() < SAMPLE_HASHES {
                        sample_hashes.insert(path.clone(), sha256.clone());
                    }
                }
                FileOutcome::Corrupted { path, reason } => corrupted_files.push(CorruptedFile {
                    path: path.clone(),
                    reason: reason.clone(),
                }),
            }
        }

        tracing::debug!(
            repo = %repo.name,
            examined = outcomes.len(),
            corrupted = corrupted_files.len(),
            "content level finished"
        );

        let holds = corrupted_files.is_empty();
        LevelResult::checked(
            LevelId::Content,
            holds,
            Evidence::Content(ContentEvidence {
                total_files_in_repo,
                total_files_checked: outcomes.len(),
                skipped_entries: skipped.len(),
                coverage: coverage.mode(),
                coverage_limit: coverage.limit(),
                complete_coverage: examined == regular.len(),
                corrupted_files,
                sample_hashes,
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::config::{AuditConfig, CoveragePolicy};
    use crate::domain::{CoverageMode, LevelStatus};
    use crate::vcs::{FakeRepo, FakeVcsClient, MODE_GITLINK};

    fn setup(files: &[&str]) -> (tempfile::TempDir, RepositoryRecord, Arc<FakeVcsClient>) {
        let dir = tempfile::tempdir().unwrap();
        for name in files {
            std::fs::write(dir.path().join(name), format!("contents of {name}\n")).unwrap();
        }
        let record = RepositoryRecord::new("alpha", dir.path(), "origin");
        let client = Arc::new(FakeVcsClient::new());
        client.insert("alpha", FakeRepo::mirrored(&record, files).unwrap());
        (dir, record, client)
    }

    fn evidence(result: &LevelResult) -> &ContentEvidence {
        match &result.evidence {
            Evidence::Content(content) => content,
            other => panic!("unexpected evidence: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_untouched_files_pass_with_samples() {
        let (_dir, record, client) = setup(&["a.txt", "b.txt", "c.txt", "d.txt"]);
        let ctx = LevelContext::new(client, AuditConfig::default());
        let result = ContentLevel.run(&record, &ctx).await;
        assert_eq!(result.status, LevelStatus::Pass);
        let content = evidence(&result);
        assert_eq!(content.total_files_checked, 4);
        assert!(content.complete_coverage);
        assert_eq!(content.sample_hashes.len(), SAMPLE_HASHES);
        assert_eq!(
            content.sample_hashes["a.txt"],
            hex::encode(Sha256::digest(b"contents of a.txt\n"))
        );
    }

    #[tokio::test]
    async fn test_deleted_file_is_corrupted_not_error() {
        let (dir, record, client) = setup(&["a.txt", "b.txt"]);
        std::fs::remove_file(dir.path().join("b.txt")).unwrap();
        let ctx = LevelContext::new(client, AuditConfig::default());
        let result = ContentLevel.run(&record, &ctx).await;
        assert_eq!(result.status, LevelStatus::Fail);
        let content = evidence(&result);
        assert_eq!(content.corrupted_files.len(), 1);
        assert_eq!(content.corrupted_files[0].path, "b.txt");
        assert!(content.corrupted_files[0].reason.starts_with("unreadable"));
    }

    #[tokio::test]
    async fn test_tool_fault_on_one_path_is_corrupted() {
        let (_dir, record, client) = setup(&["a.txt", "b.txt"]);
        client.fail_path("alpha", "a.txt");
        let ctx = LevelContext::new(client, AuditConfig::default());
        let result = ContentLevel.run(&record, &ctx).await;
        let content = evidence(&result);
        assert_eq!(result.status, LevelStatus::Fail);
        assert_eq!(content.total_files_checked, 2);
        assert_eq!(content.corrupted_files[0].path, "a.txt");
    }

    #[tokio::test]
    async fn test_gitlinks_are_skipped() {
        let (_dir, record, client) = setup(&["a.txt"]);
        client.update("alpha", |repo| {
            repo.tracked.push(TrackedFile {
                path: "vendor/dep".into(),
                mode: MODE_GITLINK.to_string(),
                recorded_id: Some("0123".to_string()),
            })
        });
        let ctx = LevelContext::new(client, AuditConfig::default());
        let result = ContentLevel.run(&record, &ctx).await;
        assert_eq!(result.status, LevelStatus::Pass);
        let content = evidence(&result);
        assert_eq!(content.total_files_in_repo, 2);
        assert_eq!(content.total_files_checked, 1);
        assert_eq!(content.skipped_entries, 1);
    }

    #[tokio::test]
    async fn test_prefix_coverage_reports_partial() {
        let (_dir, record, client) = setup(&["a.txt", "b.txt", "c.txt"]);
        let config = AuditConfig {
            coverage: CoveragePolicy::Prefix { limit: 2 },
            ..AuditConfig::default()
        };
        let ctx = LevelContext::new(client, config);
        let result = ContentLevel.run(&record, &ctx).await;
        let content = evidence(&result);
        assert_eq!(content.total_files_in_repo, 3);
        assert_eq!(content.total_files_checked, 2);
        assert_eq!(content.coverage, CoverageMode::Prefix);
        assert_eq!(content.coverage_limit, Some(2));
        assert!(!content.complete_coverage);
    }
}
