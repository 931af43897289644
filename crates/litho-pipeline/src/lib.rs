#![warn(missing_docs)]

//! Staged execution for long-running mesh work.
//!
//! A [`Pipeline`] is an ordered list of named steps that pass one value
//! along. [`Pipeline::run`] executes the steps on a worker thread while the
//! calling thread forwards [`ProgressEvent`]s to a [`ProgressSink`] and polls
//! for completion. A shared [`CancellationToken`] stops the run at the next
//! step boundary; the completion hook then never fires.
//!
//! # Example
//!
//! ```ignore
//! use litho_pipeline::{LogProgress, Pipeline};
//!
//! let mesh = Pipeline::new("Box Lithophane")
//!     .step("Image Plane", |_, parts| Ok(add_top(parts)))
//!     .step("Merge Meshes", |_, parts| Ok(merge(parts)))
//!     .run_to_completion(Parts::default(), LogProgress)?;
//! ```

pub mod cancel;
pub mod error;
pub mod pipeline;
pub mod progress;

pub use cancel::CancellationToken;
pub use error::{Cancelled, PipelineError, StepError};
pub use pipeline::{Outcome, Pipeline, StepContext, DEFAULT_POLL_INTERVAL};
pub use progress::{LogProgress, NoProgress, ProgressEvent, ProgressSink, RecordingProgress};
