//! Broker message schema.

use serde::{Deserialize, Serialize};

use veriflow_core::{Job, JobId};

/// The queue message published by intake and consumed by the worker.
///
/// Strict schema: payloads are deserialized at the consumption edge and
/// anything that does not conform is classified as malformed and dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ValidationRequest {
    pub id: JobId,
    pub input_string: String,
    pub pattern: String,
}

impl ValidationRequest {
    pub fn for_job(job: &Job) -> Self {
        Self {
            id: job.id,
            input_string: job.input_string.clone(),
            pattern: job.pattern.clone(),
        }
    }
}
