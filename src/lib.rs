//! # Gangsheet
//!
//! DTF gang-sheet composition engine. Takes a resolved picklist — items with
//! known artwork dimensions, DPI and SKU — and produces a sequence of
//! *bases*: fixed-width, bounded-length print canvases with items placed by
//! a skyline packer and rendered to print-ready PDFs at exact millimeter
//! geometry.
//!
//! ## Module Structure
//!
//! - `model`: the input contract (machine, sizing profiles, resolved items)
//! - `sizing`: px→mm projection under machine constraints
//! - `packing`: skyline state and the two packing strategies
//! - `render`: per-base artifact rendering (PDF backend)
//! - `pipeline`: orchestration of the stages plus the manifest
//! - `storage` / `jobs`: the narrow collaborator contracts and the worker
//!
//! ## Usage
//!
//! ```ignore
//! use gangsheet::pipeline::{JobControl, PipelineBuilder};
//! use gangsheet::storage::FilesystemStorage;
//! use std::sync::Arc;
//!
//! let storage = Arc::new(FilesystemStorage::new("./storage".into()).await?);
//! let pipeline = PipelineBuilder::new().with_storage(storage).build()?;
//! let outcome = pipeline.run(job_id, &spec, &JobControl::noop()).await;
//! ```

pub mod config;
pub mod error;
pub mod geom;
pub mod jobs;
pub mod manifest;
pub mod model;
pub mod packing;
pub mod pipeline;
pub mod render;
pub mod sizing;
pub mod storage;

pub use crate::error::PipelineError;
pub use crate::jobs::{InMemoryJobStore, JobSpec, JobStatus, JobStore, Worker};
pub use crate::manifest::Manifest;
pub use crate::model::{Machine, MarginSettings, PackMode, ResolvedItem, SizingProfile};
pub use crate::packing::{PackResult, Packer};
pub use crate::pipeline::{JobControl, JobOutcome, Pipeline, PipelineBuilder};
pub use crate::render::{BaseRenderer, PdfBaseRenderer};
pub use crate::sizing::SizingEngine;
pub use crate::storage::{FilesystemStorage, Storage};
