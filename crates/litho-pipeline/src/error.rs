//! Pipeline errors.

use thiserror::Error;

/// Error returned by a single step.
pub type StepError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that end a pipeline run.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A step returned an error; remaining steps were skipped.
    #[error("step '{step}' failed: {source}")]
    StepFailed {
        /// Description of the failing step.
        step: String,
        /// The step's error.
        #[source]
        source: StepError,
    },

    /// The run was cancelled before completing.
    #[error("cancelled")]
    Cancelled,

    /// The worker thread panicked.
    #[error("worker thread panicked during '{0}'")]
    WorkerPanicked(String),

    /// The worker thread could not be started.
    #[error("cannot start worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Marker error a step returns when it stops early because of cancellation.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("step cancelled")]
pub struct Cancelled;
