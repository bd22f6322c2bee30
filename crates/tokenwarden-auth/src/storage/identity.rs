//! Identity storage trait.
//!
//! Defines the interface for persisting identity records keyed by email.
//!
//! # Implementation Notes
//!
//! Implementations should:
//!
//! - Make a single `put` atomic with respect to other `put` calls, including
//!   calls for different emails (a full-file rewrite must not drop a
//!   concurrent write to another record)
//! - Round-trip `ActiveSession::expires_at` without loss
//! - Never log credentials or tokens
//!
//! Read-modify-write sequences for one identity are serialised by the
//! session service, not by the store.

use async_trait::async_trait;

use crate::AuthResult;
use crate::types::IdentityRecord;

/// Storage trait for identity records.
///
/// # Example Implementation
///
/// ```ignore
/// use tokenwarden_auth::storage::IdentityStore;
/// use tokenwarden_auth::types::IdentityRecord;
/// use tokenwarden_auth::AuthResult;
///
/// struct MyStore { /* ... */ }
///
/// #[async_trait::async_trait]
/// impl IdentityStore for MyStore {
///     async fn get(&self, email: &str) -> AuthResult<Option<IdentityRecord>> {
///         // ...
///     }
///     // ... other methods
/// }
/// ```
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Finds the record for `email`.
    ///
    /// # Returns
    ///
    /// Returns `Some(record)` if found, `None` if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn get(&self, email: &str) -> AuthResult<Option<IdentityRecord>>;

    /// Inserts or replaces the record keyed by `record.email`.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be persisted.
    async fn put(&self, record: &IdentityRecord) -> AuthResult<()>;

    /// Returns every stored record, ordered by email.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn list(&self) -> AuthResult<Vec<IdentityRecord>>;
}
