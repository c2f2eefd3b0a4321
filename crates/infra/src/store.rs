//! Job record storage.
//!
//! The store is the single authoritative copy of job state. It does not
//! publish events; notification delivery policy belongs to the caller.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::Utc;

use veriflow_core::{Job, JobId, JobStatus, NewJob};

/// Job store abstraction.
pub trait JobStore: Send + Sync {
    /// Persist a new record with store-assigned timestamps.
    fn create(&self, new: NewJob) -> Result<Job, JobStoreError>;

    /// Atomically overwrite `status` and `updated_at`, returning the new
    /// record. A record that already reached a terminal status is left
    /// unchanged (duplicate deliveries converge to the first terminal value).
    fn update_status(&self, id: JobId, status: JobStatus) -> Result<Job, JobStoreError>;

    /// Fetch a record by id.
    fn get(&self, id: JobId) -> Result<Job, JobStoreError>;

    /// All records, ordered by creation time, most recent first.
    fn list(&self) -> Result<Vec<Job>, JobStoreError>;
}

impl<S> JobStore for Arc<S>
where
    S: JobStore + ?Sized,
{
    fn create(&self, new: NewJob) -> Result<Job, JobStoreError> {
        (**self).create(new)
    }

    fn update_status(&self, id: JobId, status: JobStatus) -> Result<Job, JobStoreError> {
        (**self).update_status(id, status)
    }

    fn get(&self, id: JobId) -> Result<Job, JobStoreError> {
        (**self).get(id)
    }

    fn list(&self) -> Result<Vec<Job>, JobStoreError> {
        (**self).list()
    }
}

/// Job store error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobStoreError {
    #[error("job already exists: {0}")]
    DuplicateId(JobId),
    #[error("job not found: {0}")]
    NotFound(JobId),
    #[error("storage error: {0}")]
    Storage(String),
}

/// In-memory job store.
///
/// Per-id updates are serialized by the write lock, so concurrent workers
/// observe a consistent last write.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<JobId, Job>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl JobStore for InMemoryJobStore {
    fn create(&self, new: NewJob) -> Result<Job, JobStoreError> {
        let mut jobs = self.jobs.write().unwrap();
        if jobs.contains_key(&new.id) {
            return Err(JobStoreError::DuplicateId(new.id));
        }
        let job = Job::from_new(new, Utc::now());
        jobs.insert(job.id, job.clone());
        Ok(job)
    }

    fn update_status(&self, id: JobId, status: JobStatus) -> Result<Job, JobStoreError> {
        let mut jobs = self.jobs.write().unwrap();
        let job = jobs.get_mut(&id).ok_or(JobStoreError::NotFound(id))?;
        job.transition(status, Utc::now());
        Ok(job.clone())
    }

    fn get(&self, id: JobId) -> Result<Job, JobStoreError> {
        let jobs = self.jobs.read().unwrap();
        jobs.get(&id).cloned().ok_or(JobStoreError::NotFound(id))
    }

    fn list(&self) -> Result<Vec<Job>, JobStoreError> {
        let jobs = self.jobs.read().unwrap();
        let mut result: Vec<_> = jobs.values().cloned().collect();
        // UUIDv7 ids break createdAt ties deterministically.
        result.sort_by_key(|j| Reverse((j.created_at, j.id)));
        Ok(result)
    }
}
