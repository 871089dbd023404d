//! Reference render worker.
//!
//! Pulls envelopes from the render API, renders them with an external
//! command and reports the outcome back by `(owner_id, stored_name)`.

pub mod client;
pub mod config;
pub mod render;
pub mod runner;
