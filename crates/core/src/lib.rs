//! `veriflow-core` — domain foundation for the validation pipeline.
//!
//! This crate contains **pure domain** primitives (no infrastructure
//! concerns): the job entity and its status lifecycle, strongly-typed
//! identifiers, and the pattern validator.

pub mod error;
pub mod id;
pub mod job;
pub mod pattern;

pub use error::{DomainError, DomainResult};
pub use id::JobId;
pub use job::{Job, JobStatus, NewJob};
pub use pattern::{PatternError, evaluate};
