//! Structured observability hooks for the audit lifecycle.
//!
//! Every event carries an `event` field so log pipelines can filter on it:
//! `audit.started`, `repo.started`, `level.finished`, `repo.finished`,
//! `audit.finished`, `audit.cancelled`, and `call.retry` (warning).

use std::time::Duration;

use tracing::{info, warn, Span};

use crate::domain::{LevelId, LevelSelection, LevelStatus, OverallStatus, RunTotals};
use crate::vcs::ToolError;

/// Span covering one repository's verification.
///
/// Attach it to the verification future with [`tracing::Instrument`]; an
/// entered guard cannot be held across awaits inside spawned tasks.
pub fn repo_span(repo: &str) -> Span {
    tracing::info_span!("mirror_audit.repo", repo = %repo)
}

/// Span covering one level of one repository.
pub fn level_span(repo: &str, level: LevelId) -> Span {
    tracing::info_span!("mirror_audit.level", repo = %repo, level = level.number())
}

pub fn emit_audit_started(repo_count: usize, levels: &LevelSelection, workers: usize) {
    let levels: Vec<u8> = levels.iter().map(LevelId::number).collect();
    info!(
        event = "audit.started",
        repo_count = repo_count,
        levels = ?levels,
        workers = workers,
    );
}

pub fn emit_repo_started(repo: &str) {
    info!(event = "repo.started", repo = %repo);
}

pub fn emit_level_finished(repo: &str, level: LevelId, status: LevelStatus, duration_ms: u64) {
    info!(
        event = "level.finished",
        repo = %repo,
        level = level.number(),
        status = %status,
        duration_ms = duration_ms,
    );
}

pub fn emit_repo_finished(repo: &str, status: OverallStatus, duration_ms: u64) {
    info!(
        event = "repo.finished",
        repo = %repo,
        status = %status,
        duration_ms = duration_ms,
    );
}

pub fn emit_audit_finished(totals: &RunTotals, duration: Duration) {
    info!(
        event = "audit.finished",
        total = totals.count,
        passed = totals.passed,
        failed = totals.failed,
        duration_ms = duration.as_millis() as u64,
    );
}

pub fn emit_audit_cancelled(unverified: &[String]) {
    warn!(
        event = "audit.cancelled",
        unverified = unverified.len(),
        repos = ?unverified,
    );
}

/// A transient failure is about to be retried.
pub fn emit_call_retry(command: &str, attempt: u32, delay: Duration, err: &ToolError) {
    warn!(
        event = "call.retry",
        command = %command,
        attempt = attempt,
        delay_ms = delay.as_millis() as u64,
        error_kind = err.kind(),
        error = %err,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spans_create() {
        let _repo = repo_span("alpha").entered();
        let _level = level_span("alpha", LevelId::Tree).entered();
    }

    #[test]
    fn test_emitters_do_not_panic_without_subscriber() {
        emit_audit_started(2, &LevelSelection::all(), 4);
        emit_level_finished("alpha", LevelId::Content, LevelStatus::Fail, 12);
        emit_call_retry(
            "git fetch origin",
            1,
            Duration::from_millis(500),
            &ToolError::Timeout {
                command: "git fetch origin".to_string(),
                limit_ms: 10,
            },
        );
        emit_audit_cancelled(&["beta".to_string()]);
    }
}
