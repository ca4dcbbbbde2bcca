//! Level 2: the object store is internally consistent.

use async_trait::async_trait;

use crate::config::StructuralPolicy;
use crate::domain::{Evidence, LevelId, LevelResult, RepositoryRecord};
use crate::levels::{LevelContext, VerificationLevel};
use crate::vcs::StructuralReport;

/// Diagnostic lines kept in the evidence.
const MAX_ISSUE_LINES: usize = 5;

pub struct StructuralLevel;

/// Classify a structural report: PASS iff the tool is clean and no line
/// carries a corruption marker.
pub fn assess(report: &StructuralReport, policy: &StructuralPolicy) -> LevelResult {
    let lines: Vec<&str> = report
        .diagnostics
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    let flagged = lines
        .iter()
        .any(|line| policy.matching_marker(line).is_some());
    let holds = report.clean && !flagged;

    let issues_found = if holds {
        Vec::new()
    } else if lines.is_empty() {
        let code = report
            .exit_code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "none (terminated by signal)".to_string());
        vec![format!(
            "structural check failed without diagnostics (exit code {code})"
        )]
    } else {
        lines
            .iter()
            .take(MAX_ISSUE_LINES)
            .map(|line| line.to_string())
            .collect()
    };

    LevelResult::checked(
        LevelId::Structural,
        holds,
        Evidence::Structural {
            exit_code: report.exit_code,
            tool_clean: report.clean,
            issues_found,
        },
    )
}

#[async_trait]
impl VerificationLevel for StructuralLevel {
    fn id(&self) -> LevelId {
        LevelId::Structural
    }

    async fn run(&self, repo: &RepositoryRecord, ctx: &LevelContext) -> LevelResult {
        match ctx
            .call("structural_check", ctx.client().structural_check(repo))
            .await
        {
            Ok(report) => assess(&report, &ctx.config().structural),
            Err(err) => LevelResult::error(LevelId::Structural, &err),
        }
    }
}
