//! In-memory identity store.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::AuthResult;
use crate::storage::IdentityStore;
use crate::types::IdentityRecord;

/// Identity store held entirely in process memory.
///
/// Records are lost when the process exits.
#[derive(Debug, Default)]
pub struct InMemoryIdentityStore {
    records: RwLock<BTreeMap<String, IdentityRecord>>,
}

impl InMemoryIdentityStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `records`.
    #[must_use]
    pub fn with_records(records: impl IntoIterator<Item = IdentityRecord>) -> Self {
        let records = records
            .into_iter()
            .map(|r| (r.email.clone(), r))
            .collect();
        Self {
            records: RwLock::new(records),
        }
    }
}

#[async_trait]
impl IdentityStore for InMemoryIdentityStore {
    async fn get(&self, email: &str) -> AuthResult<Option<IdentityRecord>> {
        Ok(self.records.read().await.get(email).cloned())
    }

    async fn put(&self, record: &IdentityRecord) -> AuthResult<()> {
        self.records
            .write()
            .await
            .insert(record.email.clone(), record.clone());
        Ok(())
    }

    async fn list(&self) -> AuthResult<Vec<IdentityRecord>> {
        Ok(self.records.read().await.values().cloned().collect())
    }
}
