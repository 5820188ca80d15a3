//! In-memory digest store for testing and dry local runs

use async_trait::async_trait;
use costcat_sync_domain::{DIGEST_SENTINEL, DigestStore, DigestStoreError};
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory digest store implementation
pub struct InMemoryDigestStore {
    digests: RwLock<HashMap<String, String>>,
}

impl InMemoryDigestStore {
    pub fn new() -> Self {
        Self {
            digests: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryDigestStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DigestStore for InMemoryDigestStore {
    async fn get_digest(&self, key: &str) -> Result<String, DigestStoreError> {
        let digests = self
            .digests
            .read()
            .map_err(|e| DigestStoreError::Storage(e.to_string()))?;
        Ok(digests
            .get(key)
            .cloned()
            .unwrap_or_else(|| DIGEST_SENTINEL.to_string()))
    }

    async fn put_digest(&self, key: &str, value: &str) -> Result<(), DigestStoreError> {
        let mut digests = self
            .digests
            .write()
            .map_err(|e| DigestStoreError::Storage(e.to_string()))?;
        digests.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
