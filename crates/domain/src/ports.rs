//! Port definitions (traits) for external dependencies
//!
//! These traits define the boundaries between the domain and external systems.
//! Adapters implement these traits to connect to real infrastructure.

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{
    CostCategoryDefinition, EffectiveStart, LifecycleEvent, OwnershipMarker,
    RemoteDefinitionIndex, TagAssignment,
};

/// Error type for organization hierarchy reads
#[derive(Debug, Error)]
pub enum HierarchyError {
    #[error("API error: {0}")]
    Api(String),
    #[error("Organization has no root")]
    NoRoot,
    #[error("Invalid snapshot: {0}")]
    Snapshot(String),
}

/// Port for enumerating the organization tree.
///
/// Implementations return complete results; pagination is their concern.
#[async_trait]
pub trait HierarchySource: Send + Sync {
    /// Root ids of the organization
    async fn list_roots(&self) -> Result<Vec<String>, HierarchyError>;

    /// Direct child units of a root or unit
    async fn list_child_units(&self, parent_id: &str) -> Result<Vec<String>, HierarchyError>;

    /// Every account id in the organization
    async fn list_accounts(&self) -> Result<Vec<String>, HierarchyError>;

    /// Tags attached to an account or unit
    async fn tags_for(&self, resource_id: &str) -> Result<Vec<TagAssignment>, HierarchyError>;
}

/// Error type for digest storage
#[derive(Debug, Error)]
pub enum DigestStoreError {
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Database error: {0}")]
    Database(String),
}

/// Port for the two persisted digests
#[async_trait]
pub trait DigestStore: Send + Sync {
    /// Read a digest, returning [`crate::DIGEST_SENTINEL`] when the key is absent
    async fn get_digest(&self, key: &str) -> Result<String, DigestStoreError>;

    /// Overwrite a digest
    async fn put_digest(&self, key: &str, value: &str) -> Result<(), DigestStoreError>;
}

/// Error type for the remote categorization API
#[derive(Debug, Error)]
pub enum CostCategoryError {
    #[error("API error: {0}")]
    Api(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Port for the remote cost category API
#[async_trait]
pub trait CostCategoryApi: Send + Sync {
    /// Definitions carrying the ownership marker, by name
    async fn list_owned_definitions(
        &self,
        marker: &OwnershipMarker,
    ) -> Result<RemoteDefinitionIndex, CostCategoryError>;

    /// Create a new definition tagged with the ownership marker
    async fn create_definition(
        &self,
        definition: &CostCategoryDefinition,
        effective_start: EffectiveStart,
        marker: &OwnershipMarker,
    ) -> Result<(), CostCategoryError>;

    /// Replace every rule of an existing definition
    async fn update_definition(
        &self,
        remote_id: &str,
        definition: &CostCategoryDefinition,
        effective_start: EffectiveStart,
    ) -> Result<(), CostCategoryError>;
}

/// Error type for lifecycle notifications
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Missing event field: {0}")]
    MissingField(&'static str),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Non-success response: {0}")]
    Rejected(String),
}

/// Port for acknowledging provisioning lifecycle events
#[async_trait]
pub trait LifecycleNotifier: Send + Sync {
    /// Report the event as successfully handled
    async fn send_success(&self, event: &LifecycleEvent) -> Result<(), NotifyError>;
}
