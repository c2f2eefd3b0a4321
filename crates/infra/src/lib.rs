//! Infrastructure layer: job storage, broker messages, the validation
//! worker pool, intake, and pipeline configuration.

pub mod config;
pub mod intake;
pub mod message;
pub mod store;
pub mod worker;

mod integration_tests;

pub use config::PipelineConfig;
pub use intake::{IntakeError, JobIntake};
pub use message::ValidationRequest;
pub use store::{InMemoryJobStore, JobStore, JobStoreError};
pub use worker::{ValidationWorker, WorkerConfig, WorkerError, WorkerHandle};
