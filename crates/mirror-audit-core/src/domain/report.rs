//! Repository reports and run summaries.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::level::{LevelId, LevelSelection, LevelStatus};
use crate::domain::record::RepositoryRecord;
use crate::domain::result::LevelResult;

/// Overall classification of a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OverallStatus {
    Pass,
    Fail,
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverallStatus::Pass => f.write_str("PASS"),
            OverallStatus::Fail => f.write_str("FAIL"),
        }
    }
}

/// All level results for one repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryReport {
    #[serde(flatten)]
    pub repo: RepositoryRecord,

    pub timestamp: DateTime<Utc>,

    pub overall_status: OverallStatus,

    #[serde(with = "level_map")]
    pub levels: BTreeMap<LevelId, LevelResult>,
}

impl RepositoryReport {
    /// Assemble a report, keeping only requested levels and deriving the
    /// overall status from them.
    pub fn new(
        repo: RepositoryRecord,
        requested: &LevelSelection,
        results: impl IntoIterator<Item = LevelResult>,
    ) -> Self {
        let levels: BTreeMap<LevelId, LevelResult> = results
            .into_iter()
            .filter(|r| requested.contains(r.level))
            .map(|r| (r.level, r))
            .collect();
        let overall_status = Self::derive_overall(requested, &levels);
        Self {
            repo,
            timestamp: Utc::now(),
            overall_status,
            levels,
        }
    }

    /// PASS iff every requested level is present and PASS. A missing level
    /// counts as a failure.
    pub fn derive_overall(
        requested: &LevelSelection,
        levels: &BTreeMap<LevelId, LevelResult>,
    ) -> OverallStatus {
        let all_pass = requested
            .iter()
            .all(|id| levels.get(&id).is_some_and(LevelResult::passed));
        if all_pass {
            OverallStatus::Pass
        } else {
            OverallStatus::Fail
        }
    }

    pub fn passed(&self) -> bool {
        self.overall_status == OverallStatus::Pass
    }

    pub fn level(&self, id: LevelId) -> Option<&LevelResult> {
        self.levels.get(&id)
    }

    /// Levels whose status is not PASS, in level order.
    pub fn non_passing(&self) -> impl Iterator<Item = &LevelResult> {
        self.levels.values().filter(|r| !r.passed())
    }
}

/// Repository counts for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunTotals {
    #[serde(rename = "total")]
    pub count: usize,
    pub passed: usize,
    pub failed: usize,
}

impl RunTotals {
    pub fn from_reports(reports: &[RepositoryReport]) -> Self {
        let passed = reports.iter().filter(|r| r.passed()).count();
        Self {
            count: reports.len(),
            passed,
            failed: reports.len() - passed,
        }
    }
}

/// Per-level pass counts across every repository in a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelStat {
    pub level: LevelId,
    pub passed: usize,
    pub failed: usize,
    pub errored: usize,
    /// Reports that carry a result for this level.
    pub total: usize,
    pub pass_ratio: f64,
}

impl LevelStat {
    pub fn collect(level: LevelId, reports: &[RepositoryReport]) -> Self {
        let mut stat = Self {
            level,
            passed: 0,
            failed: 0,
            errored: 0,
            total: 0,
            pass_ratio: 0.0,
        };
        for result in reports.iter().filter_map(|r| r.level(level)) {
            stat.total += 1;
            match result.status {
                LevelStatus::Pass => stat.passed += 1,
                LevelStatus::Fail => stat.failed += 1,
                LevelStatus::Error => stat.errored += 1,
            }
        }
        if stat.total > 0 {
            stat.pass_ratio = stat.passed as f64 / stat.total as f64;
        }
        stat
    }
}

/// The complete, read-only result of one audit run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    #[serde(rename = "verification_date")]
    pub started_at: DateTime<Utc>,

    pub duration_seconds: f64,

    #[serde(rename = "levels_checked")]
    pub levels_requested: LevelSelection,

    #[serde(rename = "summary")]
    pub totals: RunTotals,

    pub level_summary: Vec<LevelStat>,

    #[serde(rename = "repositories")]
    pub reports: Vec<RepositoryReport>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub cancelled: bool,

    /// Repositories that never produced a report (cancelled or crashed).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unverified_repositories: Vec<String>,
}

impl RunSummary {
    /// Finalize a run: compute totals and per-level statistics.
    pub fn build(
        started_at: DateTime<Utc>,
        duration_seconds: f64,
        levels_requested: LevelSelection,
        reports: Vec<RepositoryReport>,
        cancelled: bool,
        unverified_repositories: Vec<String>,
    ) -> Self {
        let totals = RunTotals::from_reports(&reports);
        let level_summary = levels_requested
            .iter()
            .map(|level| LevelStat::collect(level, &reports))
            .collect();
        Self {
            started_at,
            duration_seconds,
            levels_requested,
            totals,
            level_summary,
            reports,
            cancelled,
            unverified_repositories,
        }
    }

    /// The process-level verdict: every repository verified and PASS.
    pub fn all_passed(&self) -> bool {
        !self.cancelled && self.unverified_repositories.is_empty() && self.totals.failed == 0
    }

    pub fn failed_reports(&self) -> impl Iterator<Item = &RepositoryReport> {
        self.reports.iter().filter(|r| !r.passed())
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Serializes level maps with `level_<n>` keys.
mod level_map {
    use std::collections::BTreeMap;

    use serde::de::Error as _;
    use serde::ser::SerializeMap;
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::domain::level::{LevelId, LevelStatus};
    use crate::domain::result::{Evidence, LevelResult};

    /// A level object as stored under its `level_<n>` key.
    #[derive(Deserialize)]
    struct LevelBody {
        status: LevelStatus,
        #[serde(flatten)]
        evidence: Evidence,
    }

    pub fn serialize<S: Serializer>(
        levels: &BTreeMap<LevelId, LevelResult>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(levels.len()))?;
        for (id, result) in levels {
            map.serialize_entry(&id.key(), result)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<LevelId, LevelResult>, D::Error> {
        let raw = BTreeMap::<String, LevelBody>::deserialize(deserializer)?;
        raw.into_iter()
            .map(|(key, body)| {
                let level: LevelId = key.parse().map_err(D::Error::custom)?;
                let result = LevelResult {
                    level,
                    status: body.status,
                    evidence: body.evidence,
                };
                Ok((level, result))
            })
            .collect()
    }
}
