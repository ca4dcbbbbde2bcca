//! Runs a verifier over many repositories with a bounded worker pool.
//!
//! [`Aggregator`] dispatches repositories in input order, bounds concurrency
//! with a semaphore, and moves each finished report into the slot of its
//! input index, so the summary order never depends on completion order.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::AuditConfig;
use crate::domain::{LevelSelection, RepositoryRecord, RepositoryReport, RunSummary};
use crate::execution::{cancelled, CancelSignal};
use crate::obs::{emit_audit_cancelled, emit_audit_finished, emit_audit_started};
use crate::vcs::VersionControlClient;
use crate::verifier::RepositoryVerifier;

pub struct Aggregator {
    verifier: RepositoryVerifier,
    max_workers: usize,
}

impl Aggregator {
    pub fn new(client: Arc<dyn VersionControlClient>, config: AuditConfig) -> Self {
        let max_workers = config.max_workers.max(1);
        Self {
            verifier: RepositoryVerifier::new(client, config),
            max_workers,
        }
    }

    /// Verify every repository and summarize the run.
    ///
    /// Raising `cancel` skips repositories not yet started and drops the ones
    /// in flight. Reports completed before that are kept; everything else is
    /// listed in `unverified_repositories`.
    pub async fn run(
        &self,
        repos: Vec<RepositoryRecord>,
        levels: &LevelSelection,
        cancel: &CancelSignal,
    ) -> RunSummary {
        let started_at = Utc::now();
        let clock = Instant::now();
        emit_audit_started(repos.len(), levels, self.max_workers);

        // Slots are taken here, before spawning, so repositories start in
        // input order.
        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let mut dispatch_rx = cancel.subscribe();
        let mut join_set = JoinSet::new();
        for (idx, repo) in repos.iter().cloned().enumerate() {
            let permit = tokio::select! {
                biased;
                _ = cancelled(&mut dispatch_rx) => break,
                permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };
            let verifier = self.verifier.clone();
            let levels = levels.clone();
            let mut cancel_rx = cancel.subscribe();
            join_set.spawn(async move {
                let _permit = permit;
                let report = tokio::select! {
                    biased;
                    _ = cancelled(&mut cancel_rx) => None,
                    report = verifier.verify(&repo, &levels) => Some(report),
                };
                (idx, report)
            });
        }

        let mut slots: Vec<Option<RepositoryReport>> = vec![None; repos.len()];
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((idx, report)) => slots[idx] = report,
                Err(e) => tracing::error!(error = %e, "verification task crashed"),
            }
        }

        let mut reports = Vec::with_capacity(repos.len());
        let mut unverified = Vec::new();
        for (repo, slot) in repos.iter().zip(slots) {
            match slot {
                Some(report) => reports.push(report),
                None => unverified.push(repo.name.clone()),
            }
        }

        let was_cancelled = cancel.is_cancelled();
        if was_cancelled {
            emit_audit_cancelled(&unverified);
        }
        let duration = clock.elapsed();
        let summary = RunSummary::build(
            started_at,
            duration.as_secs_f64(),
            levels.clone(),
            reports,
            was_cancelled,
            unverified,
        );
        emit_audit_finished(&summary.totals, duration);
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vcs::{FakeRepo, FakeVcsClient};

    #[tokio::test]
    async fn test_empty_run_passes() {
        let aggregator = Aggregator::new(Arc::new(FakeVcsClient::new()), AuditConfig::default());
        let summary = aggregator
            .run(vec![], &LevelSelection::all(), &CancelSignal::new())
            .await;
        assert_eq!(summary.totals.count, 0);
        assert!(summary.all_passed());
    }

    #[tokio::test]
    async fn test_cancel_before_start_verifies_nothing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "a").unwrap();
        let record = RepositoryRecord::new("alpha", dir.path(), "origin");
        let client = Arc::new(FakeVcsClient::new());
        client.insert("alpha", FakeRepo::mirrored(&record, &["a.txt"]).unwrap());

        let cancel = CancelSignal::new();
        cancel.cancel();
        let aggregator = Aggregator::new(client, AuditConfig::default());
        let summary = aggregator
            .run(vec![record], &LevelSelection::all(), &cancel)
            .await;

        assert!(summary.cancelled);
        assert!(summary.reports.is_empty());
        assert_eq!(summary.unverified_repositories, vec!["alpha".to_string()]);
        assert!(!summary.all_passed());
    }
}
