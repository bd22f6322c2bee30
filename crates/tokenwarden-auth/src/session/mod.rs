//! Session lifecycle.
//!
//! - [`service`] - registration, login, validation, revocation and renewal
//! - [`locks`] - per-identity locks serialising read-modify-write sequences

pub mod locks;
pub mod service;

pub use locks::{KeyedLockGuard, KeyedLocks};
pub use service::{IssuedSession, SessionPolicy, SessionService};
