//! The four verification levels.
//!
//! Each level is an independent check of one repository. Levels never read
//! each other's results, and a fault inside a level is reported as `ERROR`
//! for that level only.

pub mod content;
pub mod identity;
pub mod structural;
pub mod tree;

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::AuditConfig;
use crate::domain::{LevelId, LevelResult, RepositoryRecord};
use crate::execution::{with_deadline, with_retry};
use crate::vcs::{ToolResult, VersionControlClient};

pub use content::{ContentLevel, FileOutcome};
pub use identity::IdentityLevel;
pub use structural::StructuralLevel;
pub use tree::TreeLevel;

/// A single integrity check.
#[async_trait]
pub trait VerificationLevel: Send + Sync {
    fn id(&self) -> LevelId;

    /// Run the check. Always yields a result; faults become `ERROR`.
    async fn run(&self, repo: &RepositoryRecord, ctx: &LevelContext) -> LevelResult;
}

/// The implementation of a level.
pub fn level_for(id: LevelId) -> Box<dyn VerificationLevel> {
    match id {
        LevelId::Identity => Box::new(IdentityLevel),
        LevelId::Structural => Box::new(StructuralLevel),
        LevelId::Content => Box::new(ContentLevel),
        LevelId::Tree => Box::new(TreeLevel),
    }
}

/// Client and configuration shared by every level of a run.
///
/// All client calls go through [`LevelContext::call`] or
/// [`LevelContext::call_network`] so the per-call deadline always applies.
#[derive(Clone)]
pub struct LevelContext {
    client: Arc<dyn VersionControlClient>,
    config: AuditConfig,
}

impl LevelContext {
    pub fn new(client: Arc<dyn VersionControlClient>, config: AuditConfig) -> Self {
        Self { client, config }
    }

    pub fn client(&self) -> &dyn VersionControlClient {
        self.client.as_ref()
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    /// Local call under the deadline, never retried.
    pub async fn call<T, Fut>(&self, command: &str, call: Fut) -> ToolResult<T>
    where
        Fut: Future<Output = ToolResult<T>>,
    {
        with_deadline(self.config.call_timeout(), command, call).await
    }

    /// Network call under the deadline, retried on transient failures.
    pub async fn call_network<T, F, Fut>(&self, command: &str, call: F) -> ToolResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = ToolResult<T>>,
    {
        with_retry(&self.config.retry, self.config.call_timeout(), command, call).await
    }
}
