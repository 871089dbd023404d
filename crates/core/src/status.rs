//! Job lifecycle states and the status vocabulary.
//!
//! The database stores statuses as integer codes in `job_statuses`; the wire
//! protocol uses the human-readable names. [`StatusVocabulary`] is built once
//! at startup from the table contents and handed to every component by
//! reference. It has no mutating methods.

use std::collections::HashMap;

use crate::error::CoreError;
use crate::types::StatusId;

pub const STATUS_IN_QUEUE: &str = "in queue";
pub const STATUS_IN_PROGRESS: &str = "in progress";
pub const STATUS_ERROR: &str = "error";
pub const STATUS_SUCCESS: &str = "success";

/// The canonical job states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    InQueue,
    InProgress,
    Error,
    Success,
}

impl JobState {
    pub const ALL: [JobState; 4] = [
        JobState::InQueue,
        JobState::InProgress,
        JobState::Error,
        JobState::Success,
    ];

    /// The wire name of this state.
    pub fn name(self) -> &'static str {
        match self {
            JobState::InQueue => STATUS_IN_QUEUE,
            JobState::InProgress => STATUS_IN_PROGRESS,
            JobState::Error => STATUS_ERROR,
            JobState::Success => STATUS_SUCCESS,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.name() == name)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Error | JobState::Success)
    }

    fn rank(self) -> u8 {
        match self {
            JobState::InQueue => 0,
            JobState::InProgress => 1,
            JobState::Error | JobState::Success => 2,
        }
    }

    /// Whether moving from `self` to `next` follows the forward lifecycle.
    ///
    /// Repeating the current state counts as forward (reports are
    /// idempotent). Nothing leaves a terminal state. The store does not
    /// enforce this; callers use it to flag out-of-order reports.
    pub fn can_transition_to(self, next: JobState) -> bool {
        if self == next {
            return true;
        }
        !self.is_terminal() && next.rank() > self.rank()
    }

    fn index(self) -> usize {
        match self {
            JobState::InQueue => 0,
            JobState::InProgress => 1,
            JobState::Error => 2,
            JobState::Success => 3,
        }
    }
}

/// Read-only bidirectional mapping between status names and codes.
#[derive(Debug, Clone)]
pub struct StatusVocabulary {
    by_name: HashMap<String, StatusId>,
    by_code: HashMap<StatusId, String>,
    canonical: [StatusId; 4],
}

impl StatusVocabulary {
    /// Build the vocabulary from `(code, name)` pairs.
    ///
    /// Fails when a name or code appears twice, or when any of the four
    /// canonical names is missing.
    pub fn from_entries<I, S>(entries: I) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = (StatusId, S)>,
        S: Into<String>,
    {
        let mut by_name = HashMap::new();
        let mut by_code = HashMap::new();

        for (code, name) in entries {
            let name = name.into();
            if by_code.insert(code, name.clone()).is_some() {
                return Err(CoreError::Internal(format!(
                    "Duplicate status code {code} in vocabulary"
                )));
            }
            if by_name.insert(name.clone(), code).is_some() {
                return Err(CoreError::Internal(format!(
                    "Duplicate status name '{name}' in vocabulary"
                )));
            }
        }

        let mut canonical = [0; 4];
        for state in JobState::ALL {
            let code = by_name.get(state.name()).copied().ok_or_else(|| {
                CoreError::Internal(format!(
                    "Status vocabulary is missing '{}'",
                    state.name()
                ))
            })?;
            canonical[state.index()] = code;
        }

        Ok(Self {
            by_name,
            by_code,
            canonical,
        })
    }

    /// Code for a status name, if the name is known.
    pub fn code_of(&self, name: &str) -> Option<StatusId> {
        self.by_name.get(name).copied()
    }

    /// Name for a status code, if the code is known.
    pub fn name_of(&self, code: StatusId) -> Option<&str> {
        self.by_code.get(&code).map(String::as_str)
    }

    /// Code for a canonical state. Always present by construction.
    pub fn code_for(&self, state: JobState) -> StatusId {
        self.canonical[state.index()]
    }

    /// Canonical state for a code, `None` for non-canonical codes.
    pub fn state_of(&self, code: StatusId) -> Option<JobState> {
        self.name_of(code).and_then(JobState::from_name)
    }

    /// Resolve a status name to its code, rejecting unknown names.
    pub fn require_code(&self, name: &str) -> Result<StatusId, CoreError> {
        self.code_of(name)
            .ok_or_else(|| CoreError::Validation(format!("Unknown status '{name}'")))
    }

    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }
}
