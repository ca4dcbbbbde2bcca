//! Level 4: after a fetch, the working tree equals the remote HEAD tree.

use async_trait::async_trait;

use crate::domain::{Evidence, LevelId, LevelResult, RepositoryRecord};
use crate::levels::{LevelContext, VerificationLevel};
use crate::vcs::ToolResult;

pub struct TreeLevel;

impl TreeLevel {
    async fn check(&self, repo: &RepositoryRecord, ctx: &LevelContext) -> ToolResult<LevelResult> {
        let client = ctx.client();
        let remote = repo.remote_name.as_str();

        ctx.call_network("fetch", move || client.fetch(repo, remote))
            .await?;
        let local_tree = ctx.call("head_tree_id", client.head_tree_id(repo)).await?;
        let remote_tree = ctx
            .call("remote_head_tree_id", client.remote_head_tree_id(repo, remote))
            .await?;

        let tree_match = local_tree == remote_tree;
        Ok(LevelResult::checked(
            LevelId::Tree,
            tree_match,
            Evidence::Tree {
                local_tree,
                remote_tree,
                tree_match,
            },
        ))
    }
}

#[async_trait]
impl VerificationLevel for TreeLevel {
    fn id(&self) -> LevelId {
        LevelId::Tree
    }

    async fn run(&self, repo: &RepositoryRecord, ctx: &LevelContext) -> LevelResult {
        self.check(repo, ctx)
            .await
            .unwrap_or_else(|err| LevelResult::error(LevelId::Tree, &err))
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

    fn setup() -> (tempfile::TempDir, RepositoryRecord, Arc<FakeVcsClient>, LevelContext) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("lib.rs"), "pub fn f() {}\n").unwrap();
        let record = RepositoryRecord::new("alpha", dir.path(), "origin");
        let client = Arc::new(FakeVcsClient::new());
        client.insert("alpha", FakeRepo::mirrored(&record, &["lib.rs"]).unwrap());
        let config = AuditConfig {
            retry: RetryPolicy::none(),
            ..AuditConfig::default()
        };
        let ctx = LevelContext::new(client.clone(), config);
        (dir, record, client, ctx)
    }

    #[tokio::test]
    async fn test_fetch_reveals_new_remote_tree() {
        let (_dir, record, client, ctx) = setup();
        client.advance_remote("alpha", "commit-next", "tree-next");
        let result = TreeLevel.run(&record, &ctx).await;
        assert_eq!(result.status, LevelStatus::Fail);
        assert_eq!(client.calls("alpha", VcsOp::Fetch), 1);
        match result.evidence {
            Evidence::Tree { remote_tree, .. } => assert_eq!(remote_tree, "tree-next"),
            other => panic!("unexpected evidence: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_failed_fetch_is_error_not_fail() {
        let (_dir, record, client, ctx) = setup();
        client.fail("alpha", VcsOp::Fetch);
        let result = TreeLevel.run(&record, &ctx).await;
        assert_eq!(result.status, LevelStatus::Error);
        assert_eq!(client.calls("alpha", VcsOp::HeadTree), 0);
    }
}
