//! Domain model for integrity audits.
//!
//! - [`record::RepositoryRecord`]: one audited working copy
//! - [`level::LevelId`] / [`level::LevelSelection`] / [`level::LevelStatus`]: level taxonomy
//! - [`result::LevelResult`] / [`result::Evidence`]: the outcome of one level
//! - [`report::RepositoryReport`] / [`report::RunSummary`]: per-repo and per-run reports

pub mod level;
pub mod record;
pub mod report;
pub mod result;

pub use level::{LevelId, LevelSelection, LevelStatus};
pub use record::RepositoryRecord;
pub use report::{LevelStat, OverallStatus, RepositoryReport, RunSummary, RunTotals};
pub use result::{
    ContentEvidence, CorruptedFile, CoverageMode, ErrorEvidence, Evidence, LevelResult,
};
