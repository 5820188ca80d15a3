//! Filesystem snapshot of an organization, for offline planning
//!
//! The snapshot is a JSON document:
//!
//! ```json
//! {
//!   "roots": ["r-abcd"],
//!   "units": { "r-abcd": ["ou-1"], "ou-1": ["ou-2"] },
//!   "accounts": [
//!     { "id": "111111111111", "tags": [{ "Key": "CostCenter", "Value": "Eng" }] }
//!   ]
//! }
//! ```

use async_trait::async_trait;
use costcat_sync_domain::{HierarchyError, HierarchySource, TagAssignment};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
struct SnapshotFile {
    roots: Vec<String>,
    #[serde(default)]
    units: HashMap<String, Vec<String>>,
    #[serde(default)]
    accounts: Vec<SnapshotAccount>,
    #[serde(default)]
    unit_tags: HashMap<String, Vec<TagAssignment>>,
}

#[derive(Debug, Clone, Deserialize)]
struct SnapshotAccount {
    id: String,
    #[serde(default)]
    tags: Vec<TagAssignment>,
}

/// Hierarchy source backed by a JSON snapshot file
#[derive(Debug, Clone)]
pub struct FsHierarchySource {
    snapshot: SnapshotFile,
}

impl FsHierarchySource {
    /// Load a snapshot from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, HierarchyError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            HierarchyError::Snapshot(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
            .map_err(|e| HierarchyError::Snapshot(format!("{}: {}", path.display(), e)))
    }

    /// Parse a snapshot from a JSON string
    pub fn from_json(content: &str) -> Result<Self, HierarchyError> {
        let snapshot: SnapshotFile = serde_json::from_str(content)
            .map_err(|e| HierarchyError::Snapshot(e.to_string()))?;
        Ok(Self { snapshot })
    }
}

#[async_trait]
impl HierarchySource for FsHierarchySource {
    async fn list_roots(&self) -> Result<Vec<String>, HierarchyError> {
        Ok(self.snapshot.roots.clone())
    }

    async fn list_child_units(&self, parent_id: &str) -> Result<Vec<String>, HierarchyError> {
        Ok(self
            .snapshot
            .units
            .get(parent_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_accounts(&self) -> Result<Vec<String>, HierarchyError> {
        Ok(self
            .snapshot
            .accounts
            .iter()
            .map(|account| account.id.clone())
            .collect())
    }

    async fn tags_for(&self, resource_id: &str) -> Result<Vec<TagAssignment>, HierarchyError> {
        if let Some(account) = self.snapshot.accounts.iter().find(|a| a.id == resource_id) {
            return Ok(account.tags.clone());
        }
        Ok(self
            .snapshot
            .unit_tags
            .get(resource_id)
            .cloned()
            .unwrap_or_default())
    }
}
