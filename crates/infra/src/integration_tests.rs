//! Integration tests for the full validation pipeline.
//!
//! Tests: Intake → queue → Worker → Store (write) → Broadcaster (push)
//!
//! Verifies:
//! - Observers see the initial `Validating` snapshot before the terminal one
//! - Terminal statuses are correct, monotonic, and idempotent under redelivery
//! - One bad message never stops the consumption loop

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use veriflow_core::{JobId, JobStatus};
    use veriflow_events::{InMemoryQueue, JobBroadcaster, MessageQueue, ObserverHandle};

    use crate::config::PipelineConfig;
    use crate::intake::JobIntake;
    use crate::message::ValidationRequest;
    use crate::store::{InMemoryJobStore, JobStore, JobStoreError};
    use crate::worker::{ValidationWorker, WorkerConfig, WorkerHandle};

    struct Pipeline {
        store: Arc<InMemoryJobStore>,
        queue: Arc<InMemoryQueue>,
        broadcaster: Arc<JobBroadcaster>,
        intake: JobIntake<Arc<InMemoryJobStore>, Arc<InMemoryQueue>>,
        workers: Vec<WorkerHandle>,
    }

    impl Pipeline {
        fn shutdown(self) {
            for worker in self.workers {
                worker.shutdown();
            }
        }
    }

    fn setup(worker_count: usize) -> Pipeline {
        let store = Arc::new(InMemoryJobStore::new());
        let queue = Arc::new(InMemoryQueue::new());
        let broadcaster = Arc::new(JobBroadcaster::new());

        let worker_config = WorkerConfig {
            poll_interval: Duration::from_millis(20),
            processing_delay: Duration::ZERO,
        };
        let workers = (0..worker_count)
            .map(|i| {
                ValidationWorker::spawn(
                    format!("validation-worker-{i}"),
                    queue.consumer(),
                    store.clone(),
                    broadcaster.clone(),
                    worker_config.clone(),
                )
            })
            .collect();

        let intake = JobIntake::new(
            store.clone(),
            queue.clone(),
            broadcaster.clone(),
            PipelineConfig::default(),
        );

        Pipeline {
            store,
            queue,
            broadcaster,
            intake,
            workers,
        }
    }

    fn next_event_for(
        observer: &ObserverHandle<veriflow_core::Job>,
        id: JobId,
    ) -> veriflow_core::Job {
        // Skip events for other jobs; tests may share the broadcaster.
        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        loop {
            let remaining = deadline
                .checked_duration_since(std::time::Instant::now())
                .expect("timed out waiting for job event");
            let job = observer.events().recv_timeout(remaining).unwrap();
            if job.id == id {
                return job;
            }
        }
    }

    fn wait_for_terminal(store: &Arc<InMemoryJobStore>, id: JobId) -> JobStatus {
        for _ in 0..200 {
            let status = store.get(id).unwrap().status;
            if status.is_terminal() {
                return status;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        panic!("job {id} never reached a terminal status");
    }

    #[test]
    fn valid_input_is_broadcast_as_validating_then_valid() {
        let pipeline = setup(1);
        let observer = pipeline.broadcaster.subscribe();

        let job = pipeline
            .intake
            .create("hello123".to_string(), Some("^[a-zA-Z0-9]+$".to_string()))
            .unwrap();

        let first = next_event_for(&observer, job.id);
        assert_eq!(first.status, JobStatus::Validating);

        let second = next_event_for(&observer, job.id);
        assert_eq!(second.status, JobStatus::Valid);

        assert_eq!(pipeline.store.get(job.id).unwrap().status, JobStatus::Valid);
        pipeline.shutdown();
    }

    #[test]
    fn non_matching_input_ends_invalid() {
        let pipeline = setup(1);
        let job = pipeline
            .intake
            .create("hello world!".to_string(), Some("^[a-zA-Z0-9]+$".to_string()))
            .unwrap();

        assert_eq!(wait_for_terminal(&pipeline.store, job.id), JobStatus::Invalid);
        pipeline.shutdown();
    }

    #[test]
    fn broken_pattern_ends_invalid_and_worker_keeps_running() {
        let pipeline = setup(1);

        let broken = pipeline
            .intake
            .create("anything".to_string(), Some("(unclosed".to_string()))
            .unwrap();
        assert_eq!(
            wait_for_terminal(&pipeline.store, broken.id),
            JobStatus::Invalid
        );

        // The same worker must keep consuming after the pattern error.
        let next = pipeline
            .intake
            .create("hello123".to_string(), None)
            .unwrap();
        assert_eq!(wait_for_terminal(&pipeline.store, next.id), JobStatus::Valid);
        pipeline.shutdown();
    }

    #[test]
    fn duplicate_delivery_converges_without_oscillating() {
        let pipeline = setup(2);
        let observer = pipeline.broadcaster.subscribe();

        let job = pipeline
            .intake
            .create("hello123".to_string(), None)
            .unwrap();
        assert_eq!(wait_for_terminal(&pipeline.store, job.id), JobStatus::Valid);

        // Redeliver the same validation request twice (at-least-once broker).
        let payload =
            serde_json::to_string(&ValidationRequest::for_job(&pipeline.store.get(job.id).unwrap()))
                .unwrap();
        pipeline.queue.publish(payload.clone()).unwrap();
        pipeline.queue.publish(payload).unwrap();

        // Exactly one terminal status in the store, and every broadcast for
        // this job after the initial snapshot carries that same status.
        std::thread::sleep(Duration::from_millis(200));
        assert_eq!(pipeline.store.get(job.id).unwrap().status, JobStatus::Valid);

        let mut statuses = Vec::new();
        while let Ok(event) = observer.events().try_recv() {
            if event.id == job.id {
                statuses.push(event.status);
            }
        }
        assert!(!statuses.is_empty());
        assert_eq!(statuses[0], JobStatus::Validating);
        assert!(statuses[1..].iter().all(|s| *s == JobStatus::Valid));
        pipeline.shutdown();
    }

    #[test]
    fn malformed_message_is_dropped_and_the_loop_continues() {
        let pipeline = setup(1);

        pipeline.queue.publish("{definitely not json".to_string()).unwrap();

        let job = pipeline
            .intake
            .create("hello123".to_string(), None)
            .unwrap();
        assert_eq!(wait_for_terminal(&pipeline.store, job.id), JobStatus::Valid);
        pipeline.shutdown();
    }

    #[test]
    fn unknown_job_is_logged_but_never_broadcast() {
        let pipeline = setup(1);
        let observer = pipeline.broadcaster.subscribe();

        let ghost_id = JobId::new();
        let payload = serde_json::to_string(&ValidationRequest {
            id: ghost_id,
            input_string: "abc".to_string(),
            pattern: "^a".to_string(),
        })
        .unwrap();
        pipeline.queue.publish(payload).unwrap();

        std::thread::sleep(Duration::from_millis(200));
        assert!(observer.events().try_recv().is_err());
        assert_eq!(
            pipeline.store.get(ghost_id),
            Err(JobStoreError::NotFound(ghost_id))
        );
        pipeline.shutdown();
    }

    #[test]
    fn observer_subscribed_after_the_fact_sees_nothing() {
        let pipeline = setup(1);

        let job = pipeline
            .intake
            .create("hello123".to_string(), None)
            .unwrap();
        wait_for_terminal(&pipeline.store, job.id);

        let late = pipeline.broadcaster.subscribe();
        assert!(late.events().recv_timeout(Duration::from_millis(100)).is_err());
        pipeline.shutdown();
    }

    #[test]
    fn listing_is_newest_first() {
        let pipeline = setup(2);

        let mut ids = Vec::new();
        for input in ["one", "two", "three"] {
            ids.push(pipeline.intake.create(input.to_string(), None).unwrap().id);
            std::thread::sleep(Duration::from_millis(2));
        }

        for id in &ids {
            wait_for_terminal(&pipeline.store, *id);
        }

        let listed: Vec<_> = pipeline.intake.list().unwrap().into_iter().map(|j| j.id).collect();
        ids.reverse();
        assert_eq!(listed, ids);
        pipeline.shutdown();
    }

    #[test]
    fn concurrent_workers_drain_a_burst_of_jobs() {
        let pipeline = setup(4);

        let ids: Vec<_> = (0..20)
            .map(|i| {
                pipeline
                    .intake
                    .create(format!("input{i}"), None)
                    .unwrap()
                    .id
            })
            .collect();

        for id in ids {
            assert_eq!(wait_for_terminal(&pipeline.store, id), JobStatus::Valid);
        }
        pipeline.shutdown();
    }
}
