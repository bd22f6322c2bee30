//! Core domain types.

pub mod identity;

pub use identity::{ActiveSession, IdentityRecord, IdentityValidationError, is_valid_email};
