//! [`VersionControlClient`] backed by the `git` command-line tool.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::domain::RepositoryRecord;
use crate::vcs::{StructuralReport, ToolError, ToolResult, TrackedFile, VersionControlClient};

/// Runs `git` subprocesses inside each working copy.
///
/// Children are killed when their future is dropped, so a caller-side
/// deadline or cancellation never leaves a stalled `git` behind. Interactive
/// credential prompts are disabled.
#[derive(Debug, Clone)]
pub struct GitClient {
    program: PathBuf,
}

impl Default for GitClient {
    fn default() -> Self {
        Self::new()
    }
}

impl GitClient {
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("git"),
        }
    }

    /// Use a specific `git` executable.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn run<A: AsRef<OsStr>>(
        &self,
        repo: &RepositoryRecord,
        args: &[A],
        env: &[(&str, &OsStr)],
    ) -> ToolResult<(String, Output)> {
        let shown: Vec<_> = args.iter().map(|a| a.as_ref().to_string_lossy()).collect();
        let command = format!("git {}", shown.join(" "));
        debug!(repo = %repo.name, command = %command, "running git");

        let mut cmd = Command::new(&self.program);
        cmd.args(args)
            .current_dir(&repo.local_path)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (key, value) in env {
            cmd.env(key, value);
        }

        let output = cmd
            .output()
            .await
            .map_err(|source| ToolError::Spawn {
                command: command.clone(),
                source,
            })?;
        Ok((command, output))
    }

    /// Run and require a zero exit status; returns trimmed stdout.
    /// Run and require a zero exit status; returns the command line and raw stdout.
    async fn run_checked<A: AsRef<OsStr>>(
        &self,
        repo: &RepositoryRecord,
        args: &[A],
        env: &[(&str, &OsStr)],
    ) -> ToolResult<(String, Vec<u8>)> {
        let (command, output) = self.run(repo, args, env).await?;
        if !output.status.success() {
            return Err(ToolError::Tool {
                command,
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok((command, output.stdout))
    }

    /// Run and require a zero exit status; returns trimmed stdout.
    async fn run_ok<A: AsRef<OsStr>>(
        &self,
        repo: &RepositoryRecord,
        args: &[A],
        env: &[(&str, &OsStr)],
    ) -> ToolResult<String> {
        let (_, stdout) = self.run_checked(repo, args, env).await?;
        Ok(String::from_utf8_lossy(&stdout).trim().to_string())
    }

    /// Run and require a single non-empty line of output (an object id).
    async fn run_id<A: AsRef<OsStr>>(
        &self,
        repo: &RepositoryRecord,
        args: &[A],
        env: &[(&str, &OsStr)],
    ) -> ToolResult<String> {
        let (command, stdout) = self.run_checked(repo, args, env).await?;
        let out = String::from_utf8_lossy(&stdout).trim().to_string();
        if out.is_empty() {
            return Err(ToolError::Malformed {
                command,
                detail: "empty output".to_string(),
            });
        }
        Ok(out)
    }
}

#[async_trait]
impl VersionControlClient for GitClient {
    async fn head_commit_id(&self, repo: &RepositoryRecord) -> ToolResult<String> {
        self.run_id(repo, &["rev-parse", "--verify", "HEAD"], &[]).await
    }

    /// Snapshot the tracked working tree into a scratch index and write its
    /// tree. New objects land in a scratch object directory (the repository's
    /// own store is only read through alternates), so the audit never adds
    /// objects to the checkout it is inspecting.
    async fn head_tree_id(&self, repo: &RepositoryRecord) -> ToolResult<String> {
        let objects = self
            .run_id(repo, &["rev-parse", "--git-path", "objects"], &[])
            .await?;
        let objects = absolutize(&repo.local_path, &objects);

        let scratch = tempfile::tempdir().map_err(|source| ToolError::Spawn {
            command: "create scratch index directory".to_string(),
            source,
        })?;
        let index = scratch.path().join("index");
        let scratch_objects = scratch.path().join("objects");
        tokio::fs::create_dir(&scratch_objects)
            .await
            .map_err(|source| ToolError::Spawn {
                command: "create scratch object directory".to_string(),
                source,
            })?;

        let env = [
            ("GIT_INDEX_FILE", index.as_os_str()),
            ("GIT_OBJECT_DIRECTORY", scratch_objects.as_os_str()),
            ("GIT_ALTERNATE_OBJECT_DIRECTORIES", objects.as_os_str()),
        ];
        self.run_ok(repo, &["read-tree", "HEAD"], &env).await?;
        self.run_ok(repo, &["add", "--update", "--", "."], &env).await?;
        self.run_id(repo, &["write-tree"], &env).await
    }

    async fn remote_head_commit_id(
        &self,
        repo: &RepositoryRecord,
        remote: &str,
    ) -> ToolResult<String> {
        let args = ["ls-remote", remote, "HEAD"];
        let out = self.run_ok(repo, &args, &[]).await?;
        out.split_whitespace()
            .next()
            .map(str::to_string)
            .ok_or_else(|| ToolError::Malformed {
                command: format!("git {}", args.join(" ")),
                detail: format!("remote '{remote}' advertised no HEAD"),
            })
    }

    async fn remote_head_tree_id(
        &self,
        repo: &RepositoryRecord,
        remote: &str,
    ) -> ToolResult<String> {
        let rev = format!("{remote}/HEAD^{{tree}}");
        self.run_id(repo, &["rev-parse", "--verify", rev.as_str()], &[]).await
    }

    async fn structural_check(&self, repo: &RepositoryRecord) -> ToolResult<StructuralReport> {
        let (_, output) = self.run(repo, &["fsck", "--full"], &[]).await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let diagnostics = [stdout.trim(), stderr.trim()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        Ok(StructuralReport {
            diagnostics,
            exit_code: output.status.code(),
            clean: output.status.success(),
        })
    }

    async fn list_tracked_files(&self, repo: &RepositoryRecord) -> ToolResult<Vec<TrackedFile>> {
        let (_, stdout) = self
            .run_checked(repo, &["ls-files", "-s", "-z"], &[])
            .await?;
        Ok(parse_ls_files(&stdout))
    }

    async fn content_object_id(&self, repo: &RepositoryRecord, path: &Path) -> ToolResult<String> {
        let args = [OsStr::new("hash-object"), OsStr::new("--"), path.as_os_str()];
        self.run_id(repo, &args, &[]).await
    }

    async fn fetch(&self, repo: &RepositoryRecord, remote: &str) -> ToolResult<()> {
        self.run_ok(repo, &["fetch", "--quiet", remote], &[])
            .await
            .map(|_| ())
    }
}

/// Parse `git ls-files -s -z` output.
///
/// Records look like `<mode> <object> <stage>\t<path>\0`. Paths are kept
/// byte-exact. Conflicted paths appear once per stage; they are kept once,
/// without a recorded id.
pub fn parse_ls_files(raw: &[u8]) -> Vec<TrackedFile> {
    let mut files: Vec<TrackedFile> = Vec::new();
    for record in raw.split(|b| *b == 0).filter(|r| !r.is_empty()) {
        let Some(tab) = record.iter().position(|b| *b == b'\t') else {
            continue;
        };
        let (meta, path) = (&record[..tab], path_from_bytes(&record[tab + 1..]));
        let meta = String::from_utf8_lossy(meta);
        let mut fields = meta.split_whitespace();
        let (Some(mode), Some(object), Some(stage)) = (fields.next(), fields.next(), fields.next())
        else {
            continue;
        };

        if let Some(existing) = files.last_mut().filter(|f| f.path == path) {
            existing.recorded_id = None;
            continue;
        }
        files.push(TrackedFile {
            path,
            mode: mode.to_string(),
            recorded_id: (stage == "0").then(|| object.to_string()),
        });
    }
    files
}

#[cfg(unix)]
fn path_from_bytes(bytes: &[u8]) -> PathBuf {
    use std::os::unix::ffi::OsStrExt;
    PathBuf::from(OsStr::from_bytes(bytes))
}

#[cfg(not(unix))]
fn path_from_bytes(bytes: &[u8]) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(bytes).into_owned())
}

fn absolutize(base: &Path, path: &str) -> PathBuf {
    let p = Path::new(path);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base.join(p)
    }
}
