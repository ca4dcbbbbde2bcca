//! Finding the working copies to audit.

use std::path::Path;

use crate::domain::RepositoryRecord;
use crate::error::{AuditError, Result};

/// Every non-hidden directory directly under `root`, sorted by name.
pub fn discover_repositories(root: &Path, remote: &str) -> Result<Vec<RepositoryRecord>> {
    let discovery_error = |source| AuditError::Discovery {
        path: root.to_path_buf(),
        source,
    };

    let mut records = Vec::new();
    for entry in std::fs::read_dir(root).map_err(discovery_error)? {
        let entry = entry.map_err(discovery_error)?;
        let path = entry.path();
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if hidden || !path.is_dir() {
            continue;
        }
        records.push(RepositoryRecord::from_path(&path, remote));
    }
    records.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(records)
}
