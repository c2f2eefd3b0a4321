use std::convert::Infallible;
use std::sync::Arc;
use std::sync::mpsc::RecvTimeoutError;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::Extension,
    http::StatusCode,
    response::{
        IntoResponse,
        sse::{Event as SseEvent, KeepAlive, Sse},
    },
    routing::{get, post},
};
use serde::Deserialize;
use tokio_stream::{StreamExt, wrappers::ReceiverStream};
use tower::ServiceBuilder;

use veriflow_core::Job;
use veriflow_events::{InMemoryQueue, JobBroadcaster, MessageQueue};
use veriflow_infra::{
    InMemoryJobStore, IntakeError, JobIntake, PipelineConfig, ValidationWorker, WorkerConfig,
    WorkerHandle,
};

/// Shared handler state: the intake collaborator plus the broadcaster the
/// SSE endpoint subscribes against.
pub struct AppState {
    intake: JobIntake<Arc<InMemoryJobStore>, Arc<InMemoryQueue>>,
    broadcaster: Arc<JobBroadcaster>,
}

/// Wire the in-memory pipeline and build the router.
///
/// Returns the worker handles so the caller controls shutdown; dropping
/// them leaves the workers running for the life of the process.
pub fn build_app(config: PipelineConfig) -> (Router, Vec<WorkerHandle>) {
    let store = Arc::new(InMemoryJobStore::new());
    let queue = Arc::new(InMemoryQueue::new());
    let broadcaster = Arc::new(JobBroadcaster::new());

    let worker_config = WorkerConfig {
        processing_delay: config.processing_delay,
        ..WorkerConfig::default()
    };
    let workers = (0..config.worker_count.max(1))
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

    let intake = JobIntake::new(store, queue, broadcaster.clone(), config);
    let state = Arc::new(AppState { intake, broadcaster });

    let router = Router::new()
        .route("/health", get(health))
        .route("/jobs", post(create_job).get(list_jobs))
        .route("/jobs/stream", get(stream_jobs))
        .layer(Extension(state))
        .layer(ServiceBuilder::new());

    (router, workers)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateJobRequest {
    input_string: String,
    #[serde(default)]
    pattern: Option<String>,
}

#[derive(Debug)]
enum ApiError {
    Validation(String),
    Internal(String),
}

impl From<IntakeError> for ApiError {
    fn from(e: IntakeError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::Validation(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::Internal(m) => {
                tracing::error!(error = %m, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, m)
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn create_job(
    Extension(state): Extension<Arc<AppState>>,
    Json(body): Json<CreateJobRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if body.input_string.trim().is_empty() {
        return Err(ApiError::Validation("inputString must not be blank".to_string()));
    }

    let job = state.intake.create(body.input_string, body.pattern)?;
    Ok((StatusCode::CREATED, Json(job)))
}

async fn list_jobs(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Vec<Job>>, ApiError> {
    Ok(Json(state.intake.list()?))
}

/// Live job updates as server-sent events, one `job.updated` event per
/// store mutation, starting from subscription time (no replay).
async fn stream_jobs(
    Extension(state): Extension<Arc<AppState>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<SseEvent, Infallible>>> {
    let (observer_id, subscription) = state.broadcaster.subscribe().into_parts();
    let broadcaster = state.broadcaster.clone();
    let (tx, rx) = tokio::sync::mpsc::channel::<Job>(64);

    // Bridge the std-mpsc subscription onto the tokio side. The loop exits
    // when the client goes away or the broadcaster is gone, and always
    // unsubscribes so the observer is not fanned out to forever.
    tokio::task::spawn_blocking(move || {
        loop {
            match subscription.recv_timeout(Duration::from_millis(250)) {
                Ok(job) => {
                    if tx.blocking_send(job).is_err() {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    if tx.is_closed() {
                        break;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        broadcaster.unsubscribe(observer_id);
    });

    let stream = ReceiverStream::new(rx).map(|job| {
        let data = serde_json::to_string(&job).unwrap_or_else(|_| "{}".to_string());
        Ok(SseEvent::default().event("job.updated").data(data))
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
