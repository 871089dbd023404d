//! The dispatch envelope and the links derived from it.
//!
//! An envelope carries no job id. The only way back to the job row is the
//! positional layout of `save_path`: its last two segments are the owner id
//! and the stored name. The storage layout used at submission and the link
//! shapes below must agree on that layout.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::OwnerId;

/// A ready-to-render entry as it sits in the dispatch queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchEnvelope {
    pub format: String,
    pub resolution: String,
    pub save_path: String,
}

/// The `(owner_id, stored_name)` natural key of a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobKey {
    pub owner_id: OwnerId,
    pub stored_name: String,
}

impl std::fmt::Display for JobKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner_id, self.stored_name)
    }
}

impl DispatchEnvelope {
    pub fn to_payload(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_payload(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }

    /// The `(owner segment, file name)` pair at the tail of `save_path`.
    fn tail_segments(&self) -> Result<(&str, &str), CoreError> {
        let mut segments = self
            .save_path
            .rsplit(['/', '\\'])
            .filter(|s| !s.is_empty());

        match (segments.next(), segments.next()) {
            (Some(file), Some(owner)) => Ok((owner, file)),
            _ => Err(CoreError::DataLoss(format!(
                "Envelope save path '{}' has fewer than two segments",
                self.save_path
            ))),
        }
    }

    /// Recover the job's natural key from `save_path`.
    pub fn job_key(&self) -> Result<JobKey, CoreError> {
        let (owner, file) = self.tail_segments()?;
        let owner_id = owner.parse().map_err(|_| {
            CoreError::DataLoss(format!(
                "Envelope save path '{}' has a non-numeric owner segment",
                self.save_path
            ))
        })?;
        Ok(JobKey {
            owner_id,
            stored_name: file.to_string(),
        })
    }

    /// The link a worker uses to fetch the input artifact.
    pub fn retrieval_link(&self, public_base_url: &str) -> Result<String, CoreError> {
        let (owner, file) = self.tail_segments()?;
        Ok(format!(
            "{}/{owner}/blend/download/{file}",
            public_base_url.trim_end_matches('/')
        ))
    }
}

/// Path at which the input artifact for `(owner_id, stored_name)` is stored.
///
/// This is what goes into `save_path`; keep the owner and file as the last
/// two components.
pub fn compose_save_path(input_root: &Path, owner_id: OwnerId, stored_name: &str) -> String {
    input_root
        .join(owner_id.to_string())
        .join(stored_name)
        .to_string_lossy()
        .into_owned()
}

/// Public link to a result artifact.
pub fn result_link(public_base_url: &str, owner_id: OwnerId, file_name: &str) -> String {
    format!(
        "{}/{owner_id}/image/download/{file_name}",
        public_base_url.trim_end_matches('/')
    )
}

/// Parse a retrieval link (`…/{owner}/blend/download/{file}`) back into a job key.
pub fn parse_retrieval_link(link: &str) -> Result<JobKey, CoreError> {
    let invalid = || CoreError::Validation(format!("Malformed retrieval link '{link}'"));

    let mut segments = link.trim_end_matches('/').rsplit('/');
    let file = segments.next().filter(|s| !s.is_empty()).ok_or_else(invalid)?;
    let download = segments.next().ok_or_else(invalid)?;
    let blend = segments.next().ok_or_else(invalid)?;
    let owner = segments.next().ok_or_else(invalid)?;

    if download != "download" || blend != "blend" {
        return Err(invalid());
    }

    Ok(JobKey {
        owner_id: owner.parse().map_err(|_| invalid())?,
        stored_name: file.to_string(),
    })
}
