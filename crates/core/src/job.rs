//! The job entity and its status lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::JobId;

/// Validation outcome lifecycle for a job.
///
/// A job starts `Validating` and transitions exactly once to `Valid` or
/// `Invalid`. Terminal statuses are immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Validating,
    Valid,
    Invalid,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Valid | JobStatus::Invalid)
    }
}

impl core::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            JobStatus::Validating => "Validating",
            JobStatus::Valid => "Valid",
            JobStatus::Invalid => "Invalid",
        };
        f.write_str(s)
    }
}

/// A not-yet-persisted job. Timestamps are assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewJob {
    pub id: JobId,
    pub input_string: String,
    pub pattern: String,
}

impl NewJob {
    pub fn new(input_string: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            id: JobId::new(),
            input_string: input_string.into(),
            pattern: pattern.into(),
        }
    }
}

/// A validation job record.
///
/// `id`, `input_string` and `pattern` are write-once; only `status` and
/// `updated_at` change after creation, and only through [`Job::transition`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    pub input_string: String,
    pub pattern: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Materialize a record from a [`NewJob`], entering the lifecycle at
    /// `Validating`.
    pub fn from_new(new: NewJob, at: DateTime<Utc>) -> Self {
        Self {
            id: new.id,
            input_string: new.input_string,
            pattern: new.pattern,
            status: JobStatus::Validating,
            created_at: at,
            updated_at: at,
        }
    }

    /// Advance the job to a terminal status.
    ///
    /// Returns `true` if the record changed. A job that is already terminal
    /// is never modified (duplicate deliveries converge to the first
    /// terminal value), and `Validating` is not a legal target.
    pub fn transition(&mut self, to: JobStatus, at: DateTime<Utc>) -> bool {
        if self.status.is_terminal() || !to.is_terminal() {
            return false;
        }
        self.status = to;
        self.updated_at = at;
        true
    }
}
