//! Ordered steps on a background thread.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use log::debug;

use crate::cancel::CancellationToken;
use crate::error::{Cancelled, PipelineError, StepError};
use crate::progress::{ProgressEvent, ProgressSink};

/// How often the calling thread wakes up while waiting for the worker.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(20);

type StepFn<T> = Box<dyn FnOnce(&StepContext, T) -> Result<T, StepError> + Send>;

/// What a step sees of the run it belongs to.
#[derive(Debug, Clone)]
pub struct StepContext {
    description: String,
    index: usize,
    total: usize,
    cancel: CancellationToken,
}

impl StepContext {
    /// Description of the running step.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Position of the running step, starting at 1.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of steps in the run.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Whether the run was asked to stop.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// `Err(Cancelled)` once the run was asked to stop. Returning that error
    /// from a step ends the run as cancelled rather than failed.
    pub fn check_cancelled(&self) -> Result<(), Cancelled> {
        self.cancel.check()
    }

    /// The run's cancellation token, for handing to long-running work.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }
}

struct Step<T> {
    description: String,
    run: StepFn<T>,
}

/// Result of a pipeline run.
#[derive(Debug)]
pub enum Outcome<R> {
    /// Every step ran; holds the completion hook's return value.
    Completed(R),
    /// The run stopped at a step boundary. The completion hook did not run.
    Cancelled,
    /// A step failed or the worker died.
    Failed(PipelineError),
}

impl<R> Outcome<R> {
    /// True for [`Outcome::Completed`].
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed(_))
    }

    /// True for [`Outcome::Cancelled`].
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Outcome::Cancelled)
    }

    /// Convert into a `Result`, mapping cancellation to [`PipelineError::Cancelled`].
    pub fn into_result(self) -> Result<R, PipelineError> {
        match self {
            Outcome::Completed(value) => Ok(value),
            Outcome::Cancelled => Err(PipelineError::Cancelled),
            Outcome::Failed(err) => Err(err),
        }
    }
}

enum WorkerResult<T> {
    Completed(T),
    Cancelled,
    Failed(PipelineError),
}

enum WorkerMessage<T> {
    Progress(ProgressEvent),
    Done(WorkerResult<T>),
}

/// An ordered list of steps threading one value from start to finish.
///
/// Every step has the signature `(context, input) -> output`; the first step
/// receives the start value.
pub struct Pipeline<T> {
    description: String,
    steps: Vec<Step<T>>,
    cancel: CancellationToken,
    poll_interval: Duration,
}

impl<T: Send + 'static> Pipeline<T> {
    /// Empty pipeline.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            steps: Vec::new(),
            cancel: CancellationToken::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Append a step.
    pub fn step<F>(mut self, description: impl Into<String>, run: F) -> Self
    where
        F: FnOnce(&StepContext, T) -> Result<T, StepError> + Send + 'static,
    {
        self.steps.push(Step {
            description: description.into(),
            run: Box::new(run),
        });
        self
    }

    /// Use an externally owned cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Change how often the calling thread polls the worker.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Token that cancels this pipeline.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Pipeline description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Step descriptions in run order.
    pub fn step_descriptions(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.description.as_str()).collect()
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// True if there are no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run every step on a worker thread.
    ///
    /// The calling thread forwards progress to `sink` and calls
    /// [`ProgressSink::idle`] while it waits. On success `on_complete`
    /// receives the final value and its return value is the outcome. On
    /// failure `on_fail` sees the error. Neither hook runs on cancellation.
    pub fn run<R, S, C, F>(self, start: T, mut sink: S, on_complete: C, on_fail: F) -> Outcome<R>
    where
        S: ProgressSink,
        C: FnOnce(T) -> R,
        F: FnOnce(&PipelineError),
    {
        let description = self.description.clone();
        let poll_interval = self.poll_interval;
        let (tx, rx) = mpsc::channel();

        let handle = match thread::Builder::new()
            .name(format!("pipeline: {description}"))
            .spawn(move || self.execute(start, tx))
        {
            Ok(handle) => handle,
            Err(e) => {
                let err = PipelineError::Spawn(e);
                on_fail(&err);
                return Outcome::Failed(err);
            }
        };

        let mut current_step = description.clone();
        let received = loop {
            match rx.recv_timeout(poll_interval) {
                Ok(WorkerMessage::Progress(event)) => {
                    if let ProgressEvent::StepStarted { description, .. } = &event {
                        current_step.clone_from(description);
                    }
                    sink.event(&event);
                }
                Ok(WorkerMessage::Done(result)) => break Some(result),
                Err(RecvTimeoutError::Timeout) => sink.idle(),
                Err(RecvTimeoutError::Disconnected) => break None,
            }
        };

        let result = match (received, handle.join()) {
            (Some(result), Ok(())) => result,
            _ => WorkerResult::Failed(PipelineError::WorkerPanicked(current_step)),
        };

        match result {
            WorkerResult::Completed(value) => Outcome::Completed(on_complete(value)),
            WorkerResult::Cancelled => {
                sink.event(&ProgressEvent::Cancelled { description });
                Outcome::Cancelled
            }
            WorkerResult::Failed(err) => {
                let step = match &err {
                    PipelineError::StepFailed { step, .. } => step.clone(),
                    PipelineError::WorkerPanicked(step) => step.clone(),
                    _ => description,
                };
                sink.event(&ProgressEvent::Failed { step });
                on_fail(&err);
                Outcome::Failed(err)
            }
        }
    }

    /// Run without hooks and return the final value.
    pub fn run_to_completion<S: ProgressSink>(self, start: T, sink: S) -> Result<T, PipelineError> {
        self.run(start, sink, |value| value, |_| {}).into_result()
    }

    fn execute(self, start: T, tx: Sender<WorkerMessage<T>>) {
        let result = self.execute_steps(start, &tx);
        // The receiver only goes away if the caller is gone.
        let _ = tx.send(WorkerMessage::Done(result));
    }

    fn execute_steps(self, start: T, tx: &Sender<WorkerMessage<T>>) -> WorkerResult<T> {
        let send = |event| {
            let _ = tx.send(WorkerMessage::Progress(event));
        };
        let total = self.steps.len();
        send(ProgressEvent::Started {
            description: self.description.clone(),
            total,
        });

        let mut value = start;
        let mut overall = Duration::ZERO;

        for (i, step) in self.steps.into_iter().enumerate() {
            if self.cancel.is_cancelled() {
                debug!("{}: cancelled before '{}'", self.description, step.description);
                return WorkerResult::Cancelled;
            }

            let index = i + 1;
            send(ProgressEvent::StepStarted {
                description: step.description.clone(),
                index,
                total,
            });

            let context = StepContext {
                description: step.description.clone(),
                index,
                total,
                cancel: self.cancel.clone(),
            };
            let started = Instant::now();
            value = match (step.run)(&context, value) {
                Ok(next) => next,
                Err(e) if e.is::<Cancelled>() => return WorkerResult::Cancelled,
                Err(source) => {
                    return WorkerResult::Failed(PipelineError::StepFailed {
                        step: step.description,
                        source,
                    })
                }
            };
            let elapsed = started.elapsed();
            overall += elapsed;

            send(ProgressEvent::StepFinished {
                description: step.description,
                index,
                total,
                elapsed,
            });
        }

        if self.cancel.is_cancelled() {
            return WorkerResult::Cancelled;
        }

        send(ProgressEvent::Finished {
            description: self.description,
            total: overall,
        });
        WorkerResult::Completed(value)
    }
}

impl<T> std::fmt::Debug for Pipeline<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("description", &self.description)
            .field(
                "steps",
                &self.steps.iter().map(|s| &s.description).collect::<Vec<_>>(),
            )
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}
