//! Error type shared by the scene, the hit systems and the tracer.

use thiserror::Error;

/// Everything that can abort a render.
///
/// None of these are recoverable mid-render: a failing tile aborts the
/// whole [`render`](crate::render) call.
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("can only operate on batches of <= {max} rays, got {count}", max = crate::MAX_BATCH_SIZE)]
    BatchTooLarge { count: usize },

    #[error("hit buffer holds {hits} entries but the batch has {rays} rays")]
    BatchMismatch { rays: usize, hits: usize },

    #[error("scene has not been prepared for rendering")]
    SceneNotPrepared,

    #[error("invalid trace parameters: {0}")]
    InvalidParams(String),

    #[error("failed to build the worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("failed to parse configuration: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T, E = TraceError> = std::result::Result<T, E>;
