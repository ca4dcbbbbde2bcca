//! mirror-audit: integrity verification for mirrored git working copies
//!
//! ## Commands
//!
//! - `verify`: audit working copies against their remotes and write a report
//! - `summarize`: re-render a saved report and apply the exit contract to it
//!
//! The process exits non-zero unless every repository was verified and
//! passed every requested level.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn, Level};

use mirror_audit_core::{
    discover_repositories, read_report_json, render_console_summary, write_report_json,
    Aggregator, AuditConfig, CancelSignal, CoveragePolicy, GitClient, LevelSelection,
    RepositoryRecord, RetryPolicy, RunSummary, StructuralPolicy,
};

#[derive(Parser)]
#[command(name = "mirror-audit")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Multi-level integrity verification of mirrored git working copies")]
#[command(long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify working copies against their remotes
    Verify(VerifyArgs),

    /// Print the summary of a saved integrity report
    Summarize {
        /// Report written by `verify`
        report: PathBuf,
    },
}

#[derive(Args, Debug)]
struct VerifyArgs {
    /// Directory whose non-hidden subdirectories are the working copies
    #[arg(long, env = "MIRROR_AUDIT_REPOS_DIR", default_value = "repositories")]
    repos_dir: PathBuf,

    /// Audit only this working copy (repeatable); disables discovery
    #[arg(long = "repo")]
    repos: Vec<PathBuf>,

    /// Remote each working copy must mirror
    #[arg(long, env = "MIRROR_AUDIT_REMOTE", default_value = "origin")]
    remote: String,

    /// Comma-separated levels to run (1-4)
    #[arg(long, env = "MIRROR_AUDIT_LEVELS", default_value = "1,2,3,4")]
    levels: String,

    /// Repositories verified concurrently
    #[arg(long, env = "MIRROR_AUDIT_WORKERS", default_value_t = 4)]
    workers: usize,

    /// Deadline for each git invocation, in seconds
    #[arg(long, env = "MIRROR_AUDIT_CALL_TIMEOUT_SECS", default_value_t = 120)]
    call_timeout_secs: u64,

    /// Retries for network calls (fetch, ls-remote)
    #[arg(long, env = "MIRROR_AUDIT_RETRIES", default_value_t = 2)]
    retries: u32,

    /// Base delay of the exponential backoff between retries
    #[arg(long, env = "MIRROR_AUDIT_BACKOFF_MS", default_value_t = 500)]
    backoff_ms: u64,

    /// Tracked files examined per repository by level 3
    #[arg(long, env = "MIRROR_AUDIT_MAX_FILES", default_value_t = 100)]
    max_files: usize,

    /// Examine every tracked file in level 3 (overrides --max-files)
    #[arg(long, env = "MIRROR_AUDIT_FULL_COVERAGE")]
    full_coverage: bool,

    /// Do not treat dangling objects as structural problems
    #[arg(long, env = "MIRROR_AUDIT_ALLOW_DANGLING")]
    allow_dangling: bool,

    /// Where to write the JSON report
    #[arg(short, long, env = "MIRROR_AUDIT_OUTPUT", default_value = "integrity_report.json")]
    output: PathBuf,
}

impl VerifyArgs {
    fn config(&self) -> AuditConfig {
        AuditConfig {
            max_workers: self.workers,
            call_timeout_ms: self.call_timeout_secs.saturating_mul(1000),
            retry: RetryPolicy {
                max_retries: self.retries,
                backoff_base_ms: self.backoff_ms,
            },
            coverage: if self.full_coverage {
                CoveragePolicy::Full
            } else {
                CoveragePolicy::Prefix {
                    limit: self.max_files,
                }
            },
            structural: if self.allow_dangling {
                StructuralPolicy::allow_dangling()
            } else {
                StructuralPolicy::default()
            },
        }
    }

    fn repositories(&self) -> Result<Vec<RepositoryRecord>> {
        if !self.repos.is_empty() {
            return Ok(self
                .repos
                .iter()
                .map(|path| RepositoryRecord::from_path(path, &self.remote))
                .collect());
        }
        discover_repositories(&self.repos_dir, &self.remote)
            .with_context(|| format!("discover repositories in {:?}", self.repos_dir))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    mirror_audit_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Verify(args) => cmd_verify(&args).await,
        Commands::Summarize { report } => cmd_summarize(&report),
    }
}

async fn cmd_verify(args: &VerifyArgs) -> Result<()> {
    let config = args.config();
    config.validate().context("invalid audit configuration")?;
    let levels = LevelSelection::parse(&args.levels).context("invalid --levels")?;
    let repos = args.repositories()?;
    if repos.is_empty() {
        warn!("no repositories to verify");
    }
    info!(
        repositories = repos.len(),
        levels = %args.levels,
        output = %args.output.display(),
        "starting integrity verification"
    );

    let cancel = CancelSignal::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, cancelling outstanding verifications");
                cancel.cancel();
            }
        })
    };

    let aggregator = Aggregator::new(Arc::new(GitClient::new()), config);
    let summary = aggregator.run(repos, &levels, &cancel).await;
    interrupt.abort();

    write_report_json(&args.output, &summary)?;
    print!("{}", render_console_summary(&summary));
    println!("Report written to {}", args.output.display());

    ensure_passed(&summary)
}

fn cmd_summarize(report: &Path) -> Result<()> {
    let summary = read_report_json(report)?;
    print!("{}", render_console_summary(&summary));
    ensure_passed(&summary)
}

/// Success iff every repository was verified and passed.
fn ensure_passed(summary: &RunSummary) -> Result<()> {
    if summary.all_passed() {
        return Ok(());
    }
    if summary.cancelled || !summary.unverified_repositories.is_empty() {
        bail!(
            "verification incomplete: {} unverified, {} of {} verified repositories failed",
            summary.unverified_repositories.len(),
            summary.totals.failed,
            summary.totals.count
        );
    }
    bail!(
        "integrity verification failed: {} of {} repositories failed",
        summary.totals.failed,
        summary.totals.count
    );
}
