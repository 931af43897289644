//! Progress reporting.

use std::time::Duration;

use log::{info, warn};

/// Something that happened during a pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// The run started with `total` steps.
    Started {
        /// Pipeline description.
        description: String,
        /// Number of steps.
        total: usize,
    },
    /// A step is about to run. `index` starts at 1.
    StepStarted {
        /// Step description.
        description: String,
        /// Position of the step.
        index: usize,
        /// Number of steps.
        total: usize,
    },
    /// A step finished.
    StepFinished {
        /// Step description.
        description: String,
        /// Position of the step.
        index: usize,
        /// Number of steps.
        total: usize,
        /// Wall time of the step.
        elapsed: Duration,
    },
    /// All steps finished.
    Finished {
        /// Pipeline description.
        description: String,
        /// Sum of the step wall times.
        total: Duration,
    },
    /// The run stopped at a step boundary because it was cancelled.
    Cancelled {
        /// Pipeline description.
        description: String,
    },
    /// A step failed and the run was aborted.
    Failed {
        /// Description of the failing step.
        step: String,
    },
}

/// Receives progress on the thread that runs the pipeline.
pub trait ProgressSink {
    /// Handle one event.
    fn event(&mut self, event: &ProgressEvent);

    /// Called repeatedly while waiting for the worker. Use it to keep an
    /// interactive surface responsive.
    fn idle(&mut self) {}
}

/// Discards all progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn event(&mut self, _event: &ProgressEvent) {}
}

/// Writes progress to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn event(&mut self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Started { description, total } => {
                info!("{description}: {total} steps");
            }
            ProgressEvent::StepStarted {
                description,
                index,
                total,
            } => {
                info!("Start: {description} ({index}/{total})...");
            }
            ProgressEvent::StepFinished {
                description,
                index,
                total,
                elapsed,
            } => {
                info!(
                    "Finished: {description} ({index}/{total}) ({:.3} s)",
                    elapsed.as_secs_f64()
                );
            }
            ProgressEvent::Finished { description, total } => {
                info!("{description} took {:.3} s", total.as_secs_f64());
            }
            ProgressEvent::Cancelled { description } => {
                warn!("{description} cancelled");
            }
            ProgressEvent::Failed { step } => {
                warn!("aborted at step '{step}'");
            }
        }
    }
}

/// Records every event, for inspection after a run.
#[derive(Debug, Default, Clone)]
pub struct RecordingProgress {
    /// Events in arrival order.
    pub events: Vec<ProgressEvent>,
    /// Number of idle calls.
    pub idle_calls: usize,
}

impl ProgressSink for RecordingProgress {
    fn event(&mut self, event: &ProgressEvent) {
        self.events.push(event.clone());
    }

    fn idle(&mut self) {
        self.idle_calls += 1;
    }
}

impl<S: ProgressSink + ?Sized> ProgressSink for &mut S {
    fn event(&mut self, event: &ProgressEvent) {
        (**self).event(event);
    }

    fn idle(&mut self) {
        (**self).idle();
    }
}
