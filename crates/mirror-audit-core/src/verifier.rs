//! Runs the selected levels against one repository.

use std::sync::Arc;
use std::time::Instant;

use tracing::Instrument;

use crate::config::AuditConfig;
use crate::domain::{LevelSelection, RepositoryRecord, RepositoryReport};
use crate::levels::{level_for, LevelContext};
use crate::obs::{
    emit_level_finished, emit_repo_finished, emit_repo_started, level_span, repo_span,
};
use crate::vcs::VersionControlClient;

/// Verifies one repository at a time. Cheap to clone into worker tasks.
#[derive(Clone)]
pub struct RepositoryVerifier {
    ctx: LevelContext,
}

impl RepositoryVerifier {
    pub fn new(client: Arc<dyn VersionControlClient>, config: AuditConfig) -> Self {
        Self {
            ctx: LevelContext::new(client, config),
        }
    }

    /// Run every selected level in ascending order.
    ///
    /// Later levels always run, whatever earlier levels returned.
    pub async fn verify(
        &self,
        repo: &RepositoryRecord,
        levels: &LevelSelection,
    ) -> RepositoryReport {
        async {
            let started = Instant::now();
            emit_repo_started(&repo.name);

            let mut results = Vec::with_capacity(levels.len());
            for id in levels.iter() {
                let level = level_for(id);
                let level_started = Instant::now();
                let result = level
                    .run(repo, &self.ctx)
                    .instrument(level_span(&repo.name, id))
                    .await;
                emit_level_finished(
                    &repo.name,
                    id,
                    result.status,
                    level_started.elapsed().as_millis() as u64,
                );
                results.push(result);
            }

            let report = RepositoryReport::new(repo.clone(), levels, results);
            emit_repo_finished(
                &repo.name,
                report.overall_status,
                started.elapsed().as_millis() as u64,
            );
            report
        }
        .instrument(repo_span(&repo.name))
        .await
    }
}
