//! In-memory fake of [`VersionControlClient`] (testing only)
//!
//! Commit ids, fsck output, and the remote are scripted per repository.
//! File content is read from the working copy on disk, so content ids and
//! the working-tree id react to real byte changes the way git's do.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::domain::RepositoryRecord;
use crate::vcs::{StructuralReport, ToolError, ToolResult, TrackedFile, VersionControlClient};

/// The client operations, for failure injection and call counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VcsOp {
    HeadCommit,
    HeadTree,
    RemoteHeadCommit,
    RemoteHeadTree,
    StructuralCheck,
    ListTrackedFiles,
    ContentObjectId,
    Fetch,
}

/// Scripted state of one fake repository.
#[derive(Debug, Clone)]
pub struct FakeRepo {
    pub head_commit: String,
    /// What the remote advertises (seen by `remote_head_commit_id`).
    pub remote_commit: String,
    /// The tree the remote actually holds; becomes visible on `fetch`.
    pub upstream_tree: String,
    /// Locally known remote tree (as of the last fetch).
    pub remote_tree: String,
    pub fsck: StructuralReport,
    pub tracked: Vec<TrackedFile>,
}

impl FakeRepo {
    /// A repository whose working copy, index, and remote all agree.
    ///
    /// `files` must already exist under `repo.local_path`.
    pub fn mirrored(repo: &RepositoryRecord, files: &[&str]) -> std::io::Result<Self> {
        let mut tracked = Vec::with_capacity(files.len());
        for path in files {
            let bytes = std::fs::read(repo.resolve(path))?;
            tracked.push(TrackedFile::regular(*path, Some(blob_id(&bytes))));
        }
        let tree = working_tree_id(repo, &tracked);
        let commit = format!("commit-{}", &tree[..16]);
        Ok(Self {
            head_commit: commit.clone(),
            remote_commit: commit,
            upstream_tree: tree.clone(),
            remote_tree: tree,
            fsck: StructuralReport {
                diagnostics: String::new(),
                exit_code: Some(0),
                clean: true,
            },
            tracked,
        })
    }
}

#[derive(Default)]
struct FakeState {
    repos: HashMap<String, FakeRepo>,
    /// Remaining injected failures; `u32::MAX` means forever.
    failures: HashMap<(String, VcsOp), u32>,
    stalls: HashSet<(String, VcsOp)>,
    failing_paths: HashSet<(String, String)>,
    calls: HashMap<(String, VcsOp), u32>,
    /// Repository names in the order their first call arrived.
    started: Vec<String>,
}

/// Fake client keyed by repository name.
#[derive(Default)]
pub struct FakeVcsClient {
    state: Mutex<FakeState>,
}

impl FakeVcsClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, name: &str, repo: FakeRepo) {
        self.state.lock().unwrap().repos.insert(name.to_string(), repo);
    }

    /// Edit a repository's scripted state in place.
    pub fn update(&self, name: &str, edit: impl FnOnce(&mut FakeRepo)) {
        if let Some(repo) = self.state.lock().unwrap().repos.get_mut(name) {
            edit(repo);
        }
    }

    /// Push a new commit to the remote without updating the local copy.
    pub fn advance_remote(&self, name: &str, commit: &str, tree: &str) {
        self.update(name, |repo| {
            repo.remote_commit = commit.to_string();
            repo.upstream_tree = tree.to_string();
        });
    }

    /// Make `op` fail on every call for `name`.
    pub fn fail(&self, name: &str, op: VcsOp) {
        self.fail_times(name, op, u32::MAX);
    }

    /// Make `op` fail for the next `times` calls, then succeed.
    pub fn fail_times(&self, name: &str, op: VcsOp, times: u32) {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert((name.to_string(), op), times);
    }

    /// Make `op` never complete for `name`.
    pub fn stall(&self, name: &str, op: VcsOp) {
        self.state
            .lock()
            .unwrap()
            .stalls
            .insert((name.to_string(), op));
    }

    /// Make `content_object_id` fail for one path.
    pub fn fail_path(&self, name: &str, path: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_paths
            .insert((name.to_string(), path.to_string()));
    }

    pub fn calls(&self, name: &str, op: VcsOp) -> u32 {
        self.state
            .lock()
            .unwrap()
            .calls
            .get(&(name.to_string(), op))
            .copied()
            .unwrap_or(0)
    }

    /// Repository names in the order the client first saw each one.
    pub fn started_order(&self) -> Vec<String> {
        self.state.lock().unwrap().started.clone()
    }

    /// Record the call, apply injected faults, and return a snapshot.
    async fn enter(&self, repo: &RepositoryRecord, op: VcsOp) -> ToolResult<FakeRepo> {
        let stalled = {
            let mut state = self.state.lock().unwrap();
            let key = (repo.name.clone(), op);
            *state.calls.entry(key.clone()).or_default() += 1;
            if !state.started.contains(&repo.name) {
                state.started.push(repo.name.clone());
            }

            if let Some(remaining) = state.failures.get_mut(&key) {
                if *remaining > 0 {
                    if *remaining != u32::MAX {
                        *remaining -= 1;
                    }
                    return Err(injected(op));
                }
            }
            state.stalls.contains(&key)
        };
        if stalled {
            std::future::pending::<()>().await;
        }

        self.state
            .lock()
            .unwrap()
            .repos
            .get(&repo.name)
            .cloned()
            .ok_or_else(|| ToolError::Tool {
                command: format!("fake {op:?}"),
                exit_code: Some(128),
                stderr: format!("fatal: '{}' is not a repository", repo.name),
            })
    }
}

#[async_trait]
impl VersionControlClient for FakeVcsClient {
    async fn head_commit_id(&self, repo: &RepositoryRecord) -> ToolResult<String> {
        Ok(self.enter(repo, VcsOp::HeadCommit).await?.head_commit)
    }

    async fn head_tree_id(&self, repo: &RepositoryRecord) -> ToolResult<String> {
        let state = self.enter(repo, VcsOp::HeadTree).await?;
        Ok(working_tree_id(repo, &state.tracked))
    }

    async fn remote_head_commit_id(
        &self,
        repo: &RepositoryRecord,
        _remote: &str,
    ) -> ToolResult<String> {
        Ok(self.enter(repo, VcsOp::RemoteHeadCommit).await?.remote_commit)
    }

    async fn remote_head_tree_id(
        &self,
        repo: &RepositoryRecord,
        _remote: &str,
    ) -> ToolResult<String> {
        Ok(self.enter(repo, VcsOp::RemoteHeadTree).await?.remote_tree)
    }

    async fn structural_check(&self, repo: &RepositoryRecord) -> ToolResult<StructuralReport> {
        Ok(self.enter(repo, VcsOp::StructuralCheck).await?.fsck)
    }

    async fn list_tracked_files(&self, repo: &RepositoryRecord) -> ToolResult<Vec<TrackedFile>> {
        Ok(self.enter(repo, VcsOp::ListTrackedFiles).await?.tracked)
    }

    async fn content_object_id(&self, repo: &RepositoryRecord, path: &Path) -> ToolResult<String> {
        self.enter(repo, VcsOp::ContentObjectId).await?;
        let shown = path.to_string_lossy();
        let failing = self
            .state
            .lock()
            .unwrap()
            .failing_paths
            .contains(&(repo.name.clone(), shown.to_string()));
        if failing {
            return Err(ToolError::Tool {
                command: format!("fake hash-object {shown}"),
                exit_code: Some(128),
                stderr: "fatal: unable to hash object".to_string(),
            });
        }
        let bytes = std::fs::read(repo.resolve(path)).map_err(|e| ToolError::Tool {
            command: format!("fake hash-object {shown}"),
            exit_code: Some(128),
            stderr: e.to_string(),
        })?;
        Ok(blob_id(&bytes))
    }

    async fn fetch(&self, repo: &RepositoryRecord, _remote: &str) -> ToolResult<()> {
        self.enter(repo, VcsOp::Fetch).await?;
        self.update(&repo.name, |r| r.remote_tree = r.upstream_tree.clone());
        Ok(())
    }
}

fn injected(op: VcsOp) -> ToolError {
    ToolError::Tool {
        command: format!("fake {op:?}"),
        exit_code: Some(1),
        stderr: "injected failure".to_string(),
    }
}

/// Content id of a blob: SHA-256 over a type header and the bytes.
pub fn blob_id(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("blob {}\0", bytes.len()).as_bytes());
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Tree id over the current bytes of every tracked regular file.
fn working_tree_id(repo: &RepositoryRecord, tracked: &[TrackedFile]) -> String {
    let mut hasher = Sha256::new();
    for file in tracked.iter().filter(|f| f.has_content()) {
        let id = std::fs::read(repo.resolve(&file.path))
            .map(|bytes| blob_id(&bytes))
            .unwrap_or_else(|_| "missing".to_string());
        hasher.update(file.display_path().as_bytes());
        hasher.update(b"\0");
        hasher.update(id.as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}
