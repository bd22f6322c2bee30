//! Storage traits for identity records.
//!
//! This module defines the [`IdentityStore`] interface the session service
//! reads and writes through, plus an in-memory implementation.
//!
//! # Implementations
//!
//! - [`InMemoryIdentityStore`] - process-local, for tests and ephemeral runs
//! - `tokenwarden-auth-file` - JSON file backend, durable across restarts

pub mod identity;
pub mod memory;

pub use identity::IdentityStore;
pub use memory::InMemoryIdentityStore;
