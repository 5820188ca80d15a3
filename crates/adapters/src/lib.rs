//! costcat-sync adapters crate
//!
//! This crate contains infrastructure adapters implementing the domain ports:
//! - `aws`: Organizations, Cost Explorer and SSM Parameter Store adapters
//! - `hierarchy`: Filesystem snapshot of an organization
//! - `state`: SQLite and in-memory digest stores
//! - `lifecycle`: CloudFormation custom resource responses

pub mod aws;
mod cloudformation;
mod hierarchy_fs;
mod state_memory;
mod state_sqlite;

/// Re-exports for hierarchy adapters
pub mod hierarchy {
    pub use crate::aws::OrganizationsHierarchySource;
    pub use crate::hierarchy_fs::FsHierarchySource;
}

/// Re-exports for digest store adapters
pub mod state {
    pub use crate::aws::SsmDigestStore;
    pub use crate::state_memory::InMemoryDigestStore;
    pub use crate::state_sqlite::SqliteDigestStore;
}

/// Re-exports for lifecycle adapters
pub mod lifecycle {
    pub use crate::cloudformation::CloudFormationNotifier;
}
