//! JSON file storage backend for TokenWarden Auth
//!
//! Persists identity records as a single pretty-printed JSON object mapping
//! email to record. The file is read once when the store is opened; the
//! process owns it from then on and rewrites it in full after every change.
//!
//! # Exclusive ownership
//!
//! Only one store in one process may use a given file. There is no file
//! locking and no re-read before a write, so edits made to the file by hand
//! or by another process while the store is open are silently overwritten by
//! the next `put`. Stop the server before editing the file.
//!
//! Writes go to a sibling `.tmp` file which is then renamed over the target,
//! so an interrupted write leaves the previous contents intact.
//!
//! # Example
//!
//! ```ignore
//! use tokenwarden_auth_file::JsonFileIdentityStore;
//!
//! let store = JsonFileIdentityStore::open("data/users.json").await?;
//! let record = store.get("a@x.com").await?;
//! ```

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;

use tokenwarden_auth::{AuthError, AuthResult, IdentityRecord, IdentityStore};

type RecordMap = BTreeMap<String, IdentityRecord>;

/// Identity store backed by a JSON file.
#[derive(Debug)]
pub struct JsonFileIdentityStore {
    path: PathBuf,
    records: RwLock<RecordMap>,
}

impl JsonFileIdentityStore {
    /// Opens the store at `path`, loading any existing records.
    ///
    /// A missing or empty file yields an empty store; the parent directory
    /// is created if needed.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the file cannot be read or does not
    /// contain a JSON object of identity records.
    pub async fn open(path: impl AsRef<Path>) -> AuthResult<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                AuthError::storage(format!("Failed to create {}: {e}", parent.display()))
            })?;
        }

        let records = match tokio::fs::read_to_string(&path).await {
            Ok(contents) if contents.trim().is_empty() => RecordMap::new(),
            Ok(contents) => serde_json::from_str::<RecordMap>(&contents).map_err(|e| {
                AuthError::storage(format!("Failed to parse {}: {e}", path.display()))
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => RecordMap::new(),
            Err(e) => {
                return Err(AuthError::storage(format!(
                    "Failed to read {}: {e}",
                    path.display()
                )));
            }
        };

        tracing::info!(path = %path.display(), identities = records.len(), "Opened identity file store");

        Ok(Self {
            path,
            records: RwLock::new(records),
        })
    }

    /// Returns the path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes `records` to disk via a temporary file and rename.
    async fn persist(&self, records: &RecordMap) -> AuthResult<()> {
        let json = serde_json::to_string_pretty(records)
            .map_err(|e| AuthError::storage(format!("Failed to serialize identities: {e}")))?;

        let tmp_path = self.path.with_extension("tmp");
        tokio::fs::write(&tmp_path, json).await.map_err(|e| {
            AuthError::storage(format!("Failed to write {}: {e}", tmp_path.display()))
        })?;
        tokio::fs::rename(&tmp_path, &self.path).await.map_err(|e| {
            AuthError::storage(format!("Failed to replace {}: {e}", self.path.display()))
        })?;
        Ok(())
    }
}

#[async_trait]
impl IdentityStore for JsonFileIdentityStore {
    async fn get(&self, email: &str) -> AuthResult<Option<IdentityRecord>> {
        Ok(self.records.read().await.get(email).cloned())
    }

    async fn put(&self, record: &IdentityRecord) -> AuthResult<()> {
        let mut records = self.records.write().await;

        // Only commit to memory once the file write succeeded.
        let mut updated = records.clone();
        updated.insert(record.email.clone(), record.clone());
        self.persist(&updated).await?;
        *records = updated;

        tracing::debug!(email = %record.email, "Persisted identity record");
        Ok(())
    }

    async fn list(&self) -> AuthResult<Vec<IdentityRecord>> {
        Ok(self.records.read().await.values().cloned().collect())
    }
}
