//! Level behavior against the in-memory client: the mirrored baseline, a
//! local byte change, a remote that moved ahead, object-store corruption,
//! partial content coverage, and how faults are classified.

use std::path::Path;
use std::sync::Arc;

use mirror_audit_core::{
    AuditConfig, CoverageMode, CoveragePolicy, Evidence, FakeRepo, FakeVcsClient, LevelId,
    LevelSelection, LevelStatus, OverallStatus, RepositoryRecord, RepositoryReport,
    RepositoryVerifier, RetryPolicy, StructuralReport, VcsOp,
};

const FILES: &[&str] = &["README.md", "lib.rs", "data.csv", "notes.txt", "LICENSE"];

fn working_copy(root: &Path, name: &str) -> RepositoryRecord {
    let dir = root.join(name);
    std::fs::create_dir_all(&dir).unwrap();
    for file in FILES {
        std::fs::write(dir.join(file), format!("{name}/{file}\n")).unwrap();
    }
    RepositoryRecord::new(name, dir, "origin")
}

fn fast_config() -> AuditConfig {
    AuditConfig {
        retry: RetryPolicy {
            max_retries: 2,
            backoff_base_ms: 1,
        },
        ..AuditConfig::default()
    }
}

struct Harness {
    _root: tempfile::TempDir,
    record: RepositoryRecord,
    client: Arc<FakeVcsClient>,
}

impl Harness {
    fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let record = working_copy(root.path(), "alpha");
        let client = Arc::new(FakeVcsClient::new());
        client.insert("alpha", FakeRepo::mirrored(&record, FILES).unwrap());
        Self {
            _root: root,
            record,
            client,
        }
    }

    async fn verify(&self, config: AuditConfig) -> RepositoryReport {
        RepositoryVerifier::new(self.client.clone(), config)
            .verify(&self.record, &LevelSelection::all())
            .await
    }
}

fn status(report: &RepositoryReport, level: LevelId) -> LevelStatus {
    report.level(level).unwrap().status
}

#[tokio::test]
async fn mirrored_uncorrupted_repo_passes_every_level() {
    let harness = Harness::new();
    let report = harness.verify(fast_config()).await;

    assert_eq!(report.overall_status, OverallStatus::Pass);
    for level in LevelId::ALL {
        assert_eq!(status(&report, level), LevelStatus::Pass, "{level}");
    }
}

#[tokio::test]
async fn uncommitted_byte_change_is_caught_by_content_and_tree() {
    let harness = Harness::new();
    let path = harness.record.resolve("data.csv");
    let mut bytes = std::fs::read(&path).unwrap();
    bytes[0] ^= 0x01;
    std::fs::write(&path, bytes).unwrap();

    let report = harness.verify(fast_config()).await;

    assert_eq!(status(&report, LevelId::Identity), LevelStatus::Pass);
    assert_eq!(status(&report, LevelId::Content), LevelStatus::Fail);
    assert_eq!(status(&report, LevelId::Tree), LevelStatus::Fail);
    assert_eq!(report.overall_status, OverallStatus::Fail);

    match &report.level(LevelId::Content).unwrap().evidence {
        Evidence::Content(content) => {
            assert_eq!(content.corrupted_files.len(), 1);
            assert_eq!(content.corrupted_files[0].path, "data.csv");
        }
        other => panic!("unexpected evidence: {other:?}"),
    }
}

#[tokio::test]
async fn remote_ahead_fails_identity_and_tree_only() {
    let harness = Harness::new();
    harness
        .client
        .advance_remote("alpha", "commit-upstream", "tree-upstream");

    let report = harness.verify(fast_config()).await;

    assert_eq!(status(&report, LevelId::Identity), LevelStatus::Fail);
    assert_eq!(status(&report, LevelId::Structural), LevelStatus::Pass);
    assert_eq!(status(&report, LevelId::Tree), LevelStatus::Fail);

    match &report.level(LevelId::Identity).unwrap().evidence {
        Evidence::Identity {
            local_commit,
            remote_commit,
            ..
        } => assert_ne!(local_commit, remote_commit),
        other => panic!("unexpected evidence: {other:?}"),
    }
    match &report.level(LevelId::Tree).unwrap().evidence {
        Evidence::Tree {
            local_tree,
            remote_tree,
            ..
        } => {
            assert_ne!(local_tree, remote_tree);
            assert_eq!(remote_tree, "tree-upstream");
        }
        other => panic!("unexpected evidence: {other:?}"),
    }
}

#[tokio::test]
async fn object_store_corruption_fails_structural_with_diagnostics() {
    let harness = Harness::new();
    harness.client.update("alpha", |repo| {
        repo.fsck = StructuralReport {
            diagnostics: "error: inflate: data stream error (incorrect header check)\n\
                          error: unable to unpack 4b825dc642cb6eb9a060e54bf8d69288fbee4904 header"
                .to_string(),
            exit_code: Some(1),
            clean: false,
        };
    });

    let report = harness.verify(fast_config()).await;

    assert_eq!(status(&report, LevelId::Structural), LevelStatus::Fail);
    match &report.level(LevelId::Structural).unwrap().evidence {
        Evidence::Structural { issues_found, .. } => {
            assert!(!issues_found.is_empty());
            assert!(issues_found[0].contains("inflate"));
        }
        other => panic!("unexpected evidence: {other:?}"),
    }
}

#[tokio::test]
async fn partial_coverage_states_both_counts() {
    let harness = Harness::new();
    let config = AuditConfig {
        coverage: CoveragePolicy::Prefix { limit: 2 },
        ..fast_config()
    };

    let report = harness.verify(config).await;

    match &report.level(LevelId::Content).unwrap().evidence {
        Evidence::Content(content) => {
            assert_eq!(content.total_files_in_repo, FILES.len());
            assert_eq!(content.total_files_checked, 2);
            assert_eq!(content.coverage, CoverageMode::Prefix);
            assert!(!content.complete_coverage);
        }
        other => panic!("unexpected evidence: {other:?}"),
    }
    let json = serde_json::to_value(&report).unwrap();
    let level_3 = &json["levels"]["level_3"];
    assert_eq!(level_3["total_files_in_repo"], 5);
    assert_eq!(level_3["total_files_checked"], 2);
    assert_eq!(level_3["complete_coverage"], false);
}

#[tokio::test]
async fn full_coverage_checks_everything() {
    let harness = Harness::new();
    let config = AuditConfig {
        coverage: CoveragePolicy::Full,
        ..fast_config()
    };

    let report = harness.verify(config).await;

    match &report.level(LevelId::Content).unwrap().evidence {
        Evidence::Content(content) => {
            assert_eq!(content.total_files_checked, FILES.len());
            assert_eq!(content.coverage, CoverageMode::Full);
            assert_eq!(content.coverage_limit, None);
            assert!(content.complete_coverage);
        }
        other => panic!("unexpected evidence: {other:?}"),
    }
}

#[tokio::test]
async fn tool_fault_is_error_not_fail() {
    let harness = Harness::new();
    harness.client.fail("alpha", VcsOp::HeadCommit);
    harness.client.fail("alpha", VcsOp::StructuralCheck);

    let report = harness.verify(fast_config()).await;

    assert_eq!(status(&report, LevelId::Identity), LevelStatus::Error);
    assert_eq!(status(&report, LevelId::Structural), LevelStatus::Error);
    assert_eq!(status(&report, LevelId::Content), LevelStatus::Pass);
    assert_eq!(report.overall_status, OverallStatus::Fail);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["levels"]["level_1"]["status"], "ERROR");
    assert_eq!(json["levels"]["level_1"]["error_kind"], "tool");
}

#[tokio::test]
async fn stalled_call_hits_deadline_as_error() {
    let harness = Harness::new();
    harness.client.stall("alpha", VcsOp::HeadTree);
    let config = AuditConfig {
        call_timeout_ms: 50,
        retry: RetryPolicy::none(),
        ..AuditConfig::default()
    };

    let report = harness.verify(config).await;

    assert_eq!(status(&report, LevelId::Identity), LevelStatus::Error);
    assert_eq!(status(&report, LevelId::Tree), LevelStatus::Error);
    assert_eq!(status(&report, LevelId::Structural), LevelStatus::Pass);
    match &report.level(LevelId::Tree).unwrap().evidence {
        Evidence::Error(err) => assert_eq!(err.error_kind, "timeout"),
        other => panic!("unexpected evidence: {other:?}"),
    }
}

#[tokio::test]
async fn stalled_content_ids_mark_files_corrupted() {
    let harness = Harness::new();
    harness.client.stall("alpha", VcsOp::ContentObjectId);
    let config = AuditConfig {
        call_timeout_ms: 20,
        ..fast_config()
    };

    let report = harness.verify(config).await;

    assert_eq!(status(&report, LevelId::Content), LevelStatus::Fail);
    match &report.level(LevelId::Content).unwrap().evidence {
        Evidence::Content(content) => {
            assert_eq!(content.corrupted_files.len(), FILES.len());
            assert!(content.sample_hashes.is_empty());
        }
        other => panic!("unexpected evidence: {other:?}"),
    }
}

#[tokio::test]
async fn transient_fetch_faults_are_retried() {
    let harness = Harness::new();
    harness.client.fail_times("alpha", VcsOp::Fetch, 2);

    let report = harness.verify(fast_config()).await;

    assert_eq!(status(&report, LevelId::Tree), LevelStatus::Pass);
    assert_eq!(harness.client.calls("alpha", VcsOp::Fetch), 3);
}

#[tokio::test]
async fn local_checks_are_never_retried() {
    let harness = Harness::new();
    harness.client.fail_times("alpha", VcsOp::StructuralCheck, 1);

    let report = harness.verify(fast_config()).await;

    assert_eq!(status(&report, LevelId::Structural), LevelStatus::Error);
    assert_eq!(harness.client.calls("alpha", VcsOp::StructuralCheck), 1);
}
