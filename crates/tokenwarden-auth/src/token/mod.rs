//! Session token encoding and verification.
//!
//! - [`jwt`] - HS256 JWT codec bound to the process signing secret

pub mod jwt;

pub use jwt::{JwtError, JwtService, SessionClaims};
