//! Tracing initialisation for the mirror-audit binaries.
//!
//! Call [`init_tracing`] once at program start. Later calls are ignored
//! because the global subscriber can only be set once per process.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Crates whose events pass the default filter at the requested level.
/// Everything else (tokio, subprocess plumbing) stays at `warn`.
const AUDIT_TARGETS: &[&str] = &["mirror_audit_core", "mirror_audit"];

/// Filter directives used when `RUST_LOG` is not set.
///
/// `git` command lines are logged at debug inside `mirror_audit_core`, so
/// they only show up when `level` is `DEBUG` or finer.
pub fn default_directives(level: Level) -> String {
    let level = level.as_str().to_ascii_lowercase();
    let mut directives = vec!["warn".to_string()];
    directives.extend(AUDIT_TARGETS.iter().map(|target| format!("{target}={level}")));
    directives.join(",")
}

/// Initialise the global subscriber.
///
/// * `json`: emit newline-delimited JSON instead of human-readable lines.
/// * `level`: verbosity of the audit crates when `RUST_LOG` is not set.
///
/// Logs go to stderr so that stdout stays free for the console summary.
/// JSON lines keep their target so log processors can split engine events
/// from git plumbing; human-readable lines drop it.
pub fn init_tracing(json: bool, level: Level) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));
    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if json {
        registry
            .with(fmt::layer().with_writer(std::io::stderr).json())
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
    };
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
