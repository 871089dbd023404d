//! Row structs and insert DTOs.

pub mod job;
pub mod status;
