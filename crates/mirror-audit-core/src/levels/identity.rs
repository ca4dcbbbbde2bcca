//! Level 1: the local HEAD commit is the commit the remote advertises.

use async_trait::async_trait;

use crate::domain::{Evidence, LevelId, LevelResult, RepositoryRecord};
use crate::levels::{LevelContext, VerificationLevel};
use crate::vcs::ToolResult;

pub struct IdentityLevel;

impl IdentityLevel {
    async fn check(&self, repo: &RepositoryRecord, ctx: &LevelContext) -> ToolResult<LevelResult> {
        let client = ctx.client();
        let remote = repo.remote_name.as_str();

        let local_commit = ctx
            .call("head_commit_id", client.head_commit_id(repo))
            .await?;
        let remote_commit = ctx
            .call_network("remote_head_commit_id", move || {
                client.remote_head_commit_id(repo, remote)
            })
            .await?;
        let local_tree = ctx.call("head_tree_id", client.head_tree_id(repo)).await?;

        let commit_match = local_commit == remote_commit;
        Ok(LevelResult::checked(
            LevelId::Identity,
            commit_match,
            Evidence::Identity {
                local_commit,
                remote_commit,
                local_tree,
                commit_match,
            },
        ))
    }
}

#[async_trait]
impl VerificationLevel for IdentityLevel {
    fn id(&self) -> LevelId {
        LevelId::Identity
    }

    async fn run(&self, repo: &RepositoryRecord, ctx: &LevelContext) -> LevelResult {
        self.check(repo, ctx)
            .await
            .unwrap_or_else(|err| LevelResult::error(LevelId::Identity, &err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::config::AuditConfig;
    use crate::domain::LevelStatus;
    use crate::execution::RetryPolicy;
    use crate::vcs::{FakeRepo, FakeVcsClient, VcsOp};

    fn setup() -> (tempfile::TempDir, RepositoryRecord, Arc<FakeVcsClient>) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("README.md"), "# alpha\n").unwrap();
        let record = RepositoryRecord::new("alpha", dir.path(), "origin");
        let client = Arc::new(FakeVcsClient::new());
        client.insert("alpha", FakeRepo::mirrored(&record, &["README.md"]).unwrap());
        (dir, record, client)
    }

    fn context(client: Arc<FakeVcsClient>) -> LevelContext {
        let config = AuditConfig {
            retry: RetryPolicy {
                max_retries: 2,
                backoff_base_ms: 1,
            },
            ..AuditConfig::default()
        };
        LevelContext::new(client, config)
    }

    #[tokio::test]
    async fn test_matching_commits_pass() {
        let (_dir, record, client) = setup();
        let result = IdentityLevel.run(&record, &context(client)).await;
        assert_eq!(result.status, LevelStatus::Pass);
    }

    #[tokio::test]
    async fn test_remote_ahead_fails_with_both_ids() {
        let (_dir, record, client) = setup();
        client.advance_remote("alpha", "commit-remote", "tree-remote");
        let result = IdentityLevel.run(&record, &context(client)).await;
        assert_eq!(result.status, LevelStatus::Fail);
        match result.evidence {
            Evidence::Identity {
                remote_commit,
                commit_match,
                ..
            } => {
                assert_eq!(remote_commit, "commit-remote");
                assert!(!commit_match);
            }
            other => panic!("unexpected evidence: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unreachable_remote_is_error() {
        let (_dir, record, client) = setup();
        client.fail("alpha", VcsOp::RemoteHeadCommit);
        let result = IdentityLevel.run(&record, &context(client.clone())).await;
        assert_eq!(result.status, LevelStatus::Error);
        assert_eq!(client.calls("alpha", VcsOp::RemoteHeadCommit), 3);
    }

    #[tokio::test]
    async fn test_transient_remote_fault_is_retried() {
        let (_dir, record, client) = setup();
        client.fail_times("alpha", VcsOp::RemoteHeadCommit, 1);
        let result = IdentityLevel.run(&record, &context(client.clone())).await;
        assert_eq!(result.status, LevelStatus::Pass);
        assert_eq!(client.calls("alpha", VcsOp::RemoteHeadCommit), 2);
    }
}
