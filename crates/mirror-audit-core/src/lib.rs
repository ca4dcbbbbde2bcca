//! mirror-audit core library
//!
//! Multi-level integrity verification of local git working copies against
//! the remotes they mirror. Re-exports the engine for programmatic use.

pub mod aggregator;
pub mod config;
pub mod discovery;
pub mod domain;
pub mod error;
pub mod execution;
pub mod levels;
pub mod obs;
pub mod reporting;
pub mod telemetry;
pub mod vcs;
pub mod verifier;

pub use aggregator::Aggregator;

pub use config::{AuditConfig, CoveragePolicy, StructuralPolicy};

pub use discovery::discover_repositories;

pub use domain::{
    ContentEvidence, CorruptedFile, CoverageMode, ErrorEvidence, Evidence, LevelId, LevelResult,
    LevelSelection, LevelStat, LevelStatus, OverallStatus, RepositoryRecord, RepositoryReport,
    RunSummary, RunTotals,
};

pub use error::{AuditError, Result};

pub use execution::{CancelSignal, RetryPolicy};

pub use levels::{level_for, FileOutcome, LevelContext, VerificationLevel};

pub use reporting::{read_report_json, render_console_summary, write_report_json};

pub use telemetry::init_tracing;

pub use vcs::{
    FakeRepo, FakeVcsClient, GitClient, StructuralReport, ToolError, ToolResult, TrackedFile,
    VcsOp, VersionControlClient,
};

pub use verifier::RepositoryVerifier;

/// mirror-audit version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
