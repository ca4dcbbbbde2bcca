//! Verification level identifiers, selections, and statuses.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AuditError, Result};

/// One of the four independent verification levels.
///
/// Ordering follows the numeric level, which is also the execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum LevelId {
    /// Local HEAD commit vs remote HEAD commit.
    Identity,
    /// Object-store soundness (`git fsck`).
    Structural,
    /// Per-file content hashing.
    Content,
    /// Whole-tree id equality after a fetch.
    Tree,
}

impl LevelId {
    pub const ALL: [LevelId; 4] = [
        LevelId::Identity,
        LevelId::Structural,
        LevelId::Content,
        LevelId::Tree,
    ];

    pub fn number(self) -> u8 {
        match self {
            LevelId::Identity => 1,
            LevelId::Structural => 2,
            LevelId::Content => 3,
            LevelId::Tree => 4,
        }
    }

    /// Key used for this level in report documents (`level_<n>`).
    pub fn key(self) -> String {
        format!("level_{}", self.number())
    }

    pub fn title(self) -> &'static str {
        match self {
            LevelId::Identity => "Commit identity",
            LevelId::Structural => "Structural integrity",
            LevelId::Content => "Per-file content",
            LevelId::Tree => "Recursive tree equality",
        }
    }
}

impl TryFrom<u8> for LevelId {
    type Error = AuditError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(LevelId::Identity),
            2 => Ok(LevelId::Structural),
            3 => Ok(LevelId::Content),
            4 => Ok(LevelId::Tree),
            other => Err(AuditError::InvalidLevel(other.to_string())),
        }
    }
}

impl From<LevelId> for u8 {
    fn from(level: LevelId) -> Self {
        level.number()
    }
}

impl fmt::Display for LevelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl FromStr for LevelId {
    type Err = AuditError;

    /// Accepts `3` as well as `level_3`.
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let digits = trimmed.strip_prefix("level_").unwrap_or(trimmed);
        let n: u8 = digits
            .parse()
            .map_err(|_| AuditError::InvalidLevel(trimmed.to_string()))?;
        LevelId::try_from(n)
    }
}

/// The levels requested for a run: non-empty, ascending, no duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<LevelId>", into = "Vec<LevelId>")]
pub struct LevelSelection {
    levels: BTreeSet<LevelId>,
}

impl LevelSelection {
    /// All four levels.
    pub fn all() -> Self {
        Self {
            levels: LevelId::ALL.into_iter().collect(),
        }
    }

    pub fn new(levels: impl IntoIterator<Item = LevelId>) -> Result<Self> {
        let levels: BTreeSet<LevelId> = levels.into_iter().collect();
        if levels.is_empty() {
            return Err(AuditError::EmptyLevelSelection);
        }
        Ok(Self { levels })
    }

    /// Parse a comma-separated list such as `1,2,4`.
    pub fn parse(list: &str) -> Result<Self> {
        let levels = list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(LevelId::from_str)
            .collect::<Result<Vec<_>>>()?;
        Self::new(levels)
    }

    pub fn contains(&self, level: LevelId) -> bool {
        self.levels.contains(&level)
    }

    /// Levels in ascending (execution) order.
    pub fn iter(&self) -> impl Iterator<Item = LevelId> + '_ {
        self.levels.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn to_vec(&self) -> Vec<LevelId> {
        self.iter().collect()
    }
}

impl Default for LevelSelection {
    fn default() -> Self {
        Self::all()
    }
}

impl TryFrom<Vec<LevelId>> for LevelSelection {
    type Error = AuditError;

    fn try_from(levels: Vec<LevelId>) -> Result<Self> {
        Self::new(levels)
    }
}

impl From<LevelSelection> for Vec<LevelId> {
    fn from(selection: LevelSelection) -> Self {
        selection.to_vec()
    }
}

/// Outcome classification of a single level.
///
/// `Fail` means the property was checked and found false; `Error` means the
/// check could not be completed and the property's truth is unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LevelStatus {
    Pass,
    Fail,
    Error,
}

impl LevelStatus {
    pub fn is_pass(self) -> bool {
        self == LevelStatus::Pass
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LevelStatus::Pass => "PASS",
            LevelStatus::Fail => "FAIL",
            LevelStatus::Error => "ERROR",
        }
    }
}

impl fmt::Display for LevelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
