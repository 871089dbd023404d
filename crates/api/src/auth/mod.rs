//! Authentication primitives.
//!
//! - [`jwt`] -- HS256 bearer-token validation for client requests.

pub mod jwt;
