//! The validation worker: consumes queued validation requests, decides the
//! terminal status, records it, and broadcasts the updated record.

use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use veriflow_core::{Job, JobId, JobStatus, evaluate};
use veriflow_events::{BroadcastError, JobBroadcaster, QueueConsumer};

use crate::message::ValidationRequest;
use crate::store::{JobStore, JobStoreError};

/// Per-instance worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// How long to wait for a message before re-checking shutdown.
    pub poll_interval: Duration,
    /// Artificial processing delay applied per message. Sleeps only the
    /// handling worker's thread; other instances keep consuming.
    pub processing_delay: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(250),
            processing_delay: Duration::from_millis(500),
        }
    }
}

/// Handle to control and join a spawned worker.
#[derive(Debug)]
pub struct WorkerHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl WorkerHandle {
    /// Request graceful shutdown and wait for the worker to stop.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }
}

/// Classified per-message failure. Never escapes the consumption loop;
/// each variant maps to one log line and the loop moves on.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    /// Payload could not be parsed; dropped, no job update.
    #[error("malformed message: {0}")]
    MalformedMessage(#[from] serde_json::Error),
    /// No record for the requested id; no update, no broadcast.
    #[error("unknown job: {0}")]
    UnknownJob(JobId),
    /// Store write failed; the job stays `Validating`.
    #[error("store update failed: {0}")]
    Store(JobStoreError),
    /// Fan-out failed after a successful store write.
    #[error("broadcast failed: {0}")]
    Broadcast(#[from] BroadcastError),
}

/// Message-driven validation worker.
#[derive(Debug)]
pub struct ValidationWorker;

impl ValidationWorker {
    /// Spawn one worker instance on its own thread.
    ///
    /// Several instances may share the same queue; each message is handled
    /// by exactly one of them, with no ordering guarantee across jobs.
    pub fn spawn<S>(
        name: String,
        consumer: QueueConsumer,
        store: S,
        broadcaster: Arc<JobBroadcaster>,
        config: WorkerConfig,
    ) -> WorkerHandle
    where
        S: JobStore + 'static,
    {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let thread_name = name.clone();
        let join = thread::Builder::new()
            .name(thread_name)
            .spawn(move || worker_loop(&name, consumer, shutdown_rx, &store, &broadcaster, &config))
            .expect("failed to spawn validation worker thread");

        WorkerHandle {
            shutdown: shutdown_tx,
            join: Some(join),
        }
    }
}

fn worker_loop<S: JobStore>(
    name: &str,
    consumer: QueueConsumer,
    shutdown_rx: mpsc::Receiver<()>,
    store: &S,
    broadcaster: &JobBroadcaster,
    config: &WorkerConfig,
) {
    info!(worker = name, "validation worker started");

    loop {
        // Shutdown check (non-blocking)
        if shutdown_rx.try_recv().is_ok() {
            break;
        }

        let payload = match consumer.recv_timeout(config.poll_interval) {
            Ok(payload) => payload,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };

        if !config.processing_delay.is_zero() {
            thread::sleep(config.processing_delay);
        }

        // One bad message must not stop processing of subsequent messages.
        match process_message(&payload, store, broadcaster) {
            Ok(job) => {
                debug!(worker = name, job_id = %job.id, status = %job.status, "job validated");
            }
            Err(WorkerError::MalformedMessage(e)) => {
                warn!(worker = name, error = %e, "dropping malformed message");
            }
            Err(WorkerError::UnknownJob(id)) => {
                warn!(worker = name, job_id = %id, "no record for validation request");
            }
            Err(e) => {
                error!(worker = name, error = %e, "failed to process message");
            }
        }
    }

    info!(worker = name, "validation worker stopped");
}

/// Handle a single queued message end to end.
///
/// Deterministic over the message's immutable `inputString`/`pattern`, so a
/// redelivered message converges on the same terminal status.
pub(crate) fn process_message<S: JobStore>(
    payload: &str,
    store: &S,
    broadcaster: &JobBroadcaster,
) -> Result<Job, WorkerError> {
    let request: ValidationRequest = serde_json::from_str(payload)?;

    let status = match evaluate(&request.input_string, &request.pattern) {
        Ok(true) => JobStatus::Valid,
        Ok(false) => JobStatus::Invalid,
        Err(e) => {
            // An unusable pattern must never yield a false "Valid".
            warn!(job_id = %request.id, error = %e, "pattern rejected, marking job Invalid");
            JobStatus::Invalid
        }
    };

    let job = store.update_status(request.id, status).map_err(|e| match e {
        JobStoreError::NotFound(id) => WorkerError::UnknownJob(id),
        other => WorkerError::Store(other),
    })?;

    broadcaster.publish(job.clone())?;
    Ok(job)
}
