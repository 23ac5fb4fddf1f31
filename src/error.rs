// src/error.rs
use crate::packing::PackError;
use crate::render::RenderError;
use crate::sizing::SizingError;
use crate::storage::StorageError;
use std::time::Duration;
use thiserror::Error;

/// A comprehensive error type for the whole composition pipeline. Stage
/// errors bubble up here; the driver decides job disposition and never lets
/// an error cross the core boundary unrecorded.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("sizing failed: {0}")]
    Sizing(#[from] SizingError),

    #[error("packing failed: {0}")]
    Pack(#[from] PackError),

    #[error("rendering failed: {0}")]
    Render(#[from] RenderError),

    #[error("storage operation failed: {0}")]
    Storage(#[from] StorageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("job exceeded its soft deadline of {0:?}")]
    Timeout(Duration),

    #[error("job was cancelled")]
    Cancelled,

    #[error("job spec is invalid: {0}")]
    Spec(String),
}

impl PipelineError {
    /// Stable machine-readable code persisted verbatim on the job record.
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::Sizing(e) => e.code(),
            PipelineError::Pack(e) => e.code(),
            PipelineError::Render(e) => e.code(),
            PipelineError::Storage(e) => e.code(),
            PipelineError::Io(_) => "RENDER_FAIL",
            PipelineError::Timeout(_) => "TIMEOUT",
            PipelineError::Cancelled => "CANCELLED",
            PipelineError::Spec(_) => "INVALID_SPEC",
        }
    }
}
