//! Domain logic for the render job dispatch service.
//!
//! Everything here is pure: no database, queue or filesystem access.

pub mod envelope;
pub mod error;
pub mod naming;
pub mod render;
pub mod status;
pub mod types;
