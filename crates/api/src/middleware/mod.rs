//! Request extractors.
//!
//! - [`auth::AuthUser`] -- Resolves the calling owner from a JWT Bearer token.

pub mod auth;
