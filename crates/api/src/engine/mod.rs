//! Job lifecycle engine.
//!
//! [`submission`] turns an upload into a stored artifact, a job row and a
//! dispatch envelope. [`reconciliation`] applies worker reports back onto
//! the job row by its `(owner_id, stored_name)` key.

pub mod reconciliation;
pub mod submission;
