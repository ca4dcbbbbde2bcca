//! Audit configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::CoverageMode;
use crate::error::{AuditError, Result};
use crate::execution::RetryPolicy;

/// How many tracked regular files Level 3 examines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CoveragePolicy {
    /// Every regular tracked file.
    Full,
    /// The first `limit` regular tracked files, in index order.
    Prefix { limit: usize },
}

impl Default for CoveragePolicy {
    fn default() -> Self {
        CoveragePolicy::Prefix { limit: 100 }
    }
}

impl CoveragePolicy {
    pub fn mode(&self) -> CoverageMode {
        match self {
            CoveragePolicy::Full => CoverageMode::Full,
            CoveragePolicy::Prefix { .. } => CoverageMode::Prefix,
        }
    }

    pub fn limit(&self) -> Option<usize> {
        match self {
            CoveragePolicy::Full => None,
            CoveragePolicy::Prefix { limit } => Some(*limit),
        }
    }

    /// Number of entries to examine out of `available`.
    pub fn take(&self, available: usize) -> usize {
        match self {
            CoveragePolicy::Full => available,
            CoveragePolicy::Prefix { limit } => available.min(*limit),
        }
    }
}

/// Diagnostic markers that make Level 2 fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralPolicy {
    /// Lowercase substrings matched case-insensitively against each line.
    pub markers: Vec<String>,
}

impl Default for StructuralPolicy {
    fn default() -> Self {
        Self {
            markers: ["error", "missing", "corrupt", "broken", "dangling"]
                .iter()
                .map(|m| m.to_string())
                .collect(),
        }
    }
}

impl StructuralPolicy {
    /// Default markers, minus `dangling`: unreachable objects are tolerated.
    pub fn allow_dangling() -> Self {
        let mut policy = Self::default();
        policy.markers.retain(|m| m != "dangling");
        policy
    }

    /// First marker found in `line`, if any.
    pub fn matching_marker(&self, line: &str) -> Option<&str> {
        let lowered = line.to_lowercase();
        self.markers
            .iter()
            .find(|m| lowered.contains(m.as_str()))
            .map(String::as_str)
    }
}

/// Knobs of one audit run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Repositories verified concurrently (`1` is strictly sequential).
    pub max_workers: usize,
    /// Deadline applied to every single version-control call.
    pub call_timeout_ms: u64,
    pub retry: RetryPolicy,
    pub coverage: CoveragePolicy,
    pub structural: StructuralPolicy,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            call_timeout_ms: 120_000,
            retry: RetryPolicy::default(),
            coverage: CoveragePolicy::default(),
            structural: StructuralPolicy::default(),
        }
    }
}

impl AuditConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_workers == 0 {
            return Err(AuditError::InvalidConfig(
                "max_workers must be at least 1".to_string(),
            ));
        }
        if self.call_timeout_ms == 0 {
            return Err(AuditError::InvalidConfig(
                "call_timeout_ms must be positive".to_string(),
            ));
        }
        if matches!(self.coverage, CoveragePolicy::Prefix { limit: 0 }) {
            return Err(AuditError::InvalidConfig(
                "coverage limit must be at least 1".to_string(),
            ));
        }
        if self.structural.markers.iter().any(|m| m.trim().is_empty()) {
            return Err(AuditError::InvalidConfig(
                "structural markers must not be blank".to_string(),
            ));
        }
        Ok(())
    }
}
