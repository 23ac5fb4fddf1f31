// src/jobs/mod.rs
//! Job lifecycle: specs, status records, the store abstraction and the
//! polling worker that drives the pipeline.

pub mod models;
pub mod store;
pub mod worker;

pub use models::{ItemOutcome, JobRecord, JobSpec, JobStatus};
pub use store::{InMemoryJobStore, JobStore, StoreError};
pub use worker::Worker;
