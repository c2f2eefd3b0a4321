//! Job intake: accepts a creation request, records it, and hands the
//! validation work off to the broker without waiting for the result.

use std::sync::Arc;

use tracing::{info, warn};

use veriflow_core::{Job, NewJob};
use veriflow_events::{JobBroadcaster, MessageQueue};

use crate::config::PipelineConfig;
use crate::message::ValidationRequest;
use crate::store::{JobStore, JobStoreError};

#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error(transparent)]
    Store(#[from] JobStoreError),
    #[error("failed to encode queue message: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to enqueue validation request: {0}")]
    Queue(String),
}

/// Producer side of the pipeline.
///
/// Shares the authoritative [`JobStore`] with the validation workers; the
/// broadcaster only ever sees snapshots that the store accepted.
#[derive(Debug)]
pub struct JobIntake<S, Q> {
    store: S,
    queue: Q,
    broadcaster: Arc<JobBroadcaster>,
    config: PipelineConfig,
}

impl<S, Q> JobIntake<S, Q>
where
    S: JobStore,
    Q: MessageQueue,
{
    pub fn new(store: S, queue: Q, broadcaster: Arc<JobBroadcaster>, config: PipelineConfig) -> Self {
        Self {
            store,
            queue,
            broadcaster,
            config,
        }
    }

    /// Create a job and enqueue its validation request.
    ///
    /// Returns as soon as the record is written and the message is queued.
    /// The initial `Validating` snapshot is pushed to observers before the
    /// message is enqueued, so observers see the job appear before any
    /// worker can finish it.
    pub fn create(&self, input_string: String, pattern: Option<String>) -> Result<Job, IntakeError> {
        let pattern = pattern.unwrap_or_else(|| self.config.default_pattern.clone());
        let job = self.store.create(NewJob::new(input_string, pattern))?;

        if let Err(e) = self.broadcaster.publish(job.clone()) {
            warn!(job_id = %job.id, error = %e, "failed to push initial job snapshot");
        }

        let payload = serde_json::to_string(&ValidationRequest::for_job(&job))?;
        self.queue
            .publish(payload)
            .map_err(|e| IntakeError::Queue(format!("{e:?}")))?;

        info!(job_id = %job.id, "job queued for validation");
        Ok(job)
    }

    /// All jobs, most recently created first.
    pub fn list(&self) -> Result<Vec<Job>, IntakeError> {
        Ok(self.store.list()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryJobStore;
    use std::time::Duration;
    use veriflow_core::JobStatus;
    use veriflow_events::InMemoryQueue;

    fn setup() -> (
        Arc<InMemoryJobStore>,
        Arc<InMemoryQueue>,
        Arc<JobBroadcaster>,
        JobIntake<Arc<InMemoryJobStore>, Arc<InMemoryQueue>>,
    ) {
        let store = Arc::new(InMemoryJobStore::new());
        let queue = Arc::new(InMemoryQueue::new());
        let broadcaster = Arc::new(JobBroadcaster::new());
        let intake = JobIntake::new(
            store.clone(),
            queue.clone(),
            broadcaster.clone(),
            PipelineConfig::default(),
        );
        (store, queue, broadcaster, intake)
    }

    #[test]
    fn create_records_enqueues_and_pushes_initial_snapshot() {
        let (store, queue, broadcaster, intake) = setup();
        let observer = broadcaster.subscribe();

        let job = intake.create("hello123".to_string(), None).unwrap();

        assert_eq!(job.status, JobStatus::Validating);
        assert_eq!(job.pattern, PipelineConfig::default().default_pattern);
        assert_eq!(store.get(job.id).unwrap(), job);

        let pushed = observer
            .events()
            .recv_timeout(Duration::from_millis(100))
            .unwrap();
        assert_eq!(pushed.status, JobStatus::Validating);

        let payload = queue
            .consumer()
            .recv_timeout(Duration::from_millis(100))
            .unwrap();
        let request: ValidationRequest = serde_json::from_str(&payload).unwrap();
        assert_eq!(request, ValidationRequest::for_job(&job));
    }

    #[test]
    fn explicit_pattern_overrides_the_default() {
        let (_store, _queue, _broadcaster, intake) = setup();
        let job = intake
            .create("abc".to_string(), Some("^a.*$".to_string()))
            .unwrap();
        assert_eq!(job.pattern, "^a.*$");
    }

    #[test]
    fn list_delegates_to_the_store() {
        let (_store, _queue, _broadcaster, intake) = setup();
        let first = intake.create("one".to_string(), None).unwrap();
        std::thread::sleep(Duration::from_millis(2));
        let second = intake.create("two".to_string(), None).unwrap();

        let ids: Vec<_> = intake.list().unwrap().into_iter().map(|j| j.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }
}
