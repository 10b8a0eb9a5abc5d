//! Cross-thread dispatch between the webhook gateway and the reply flows.
//!
//! The gateway never runs a flow inline: it hands the work to a bounded
//! queue and acknowledges the webhook immediately. A single supervisor task
//! drains the queue into a [`JoinSet`], so a flow that errors or panics is
//! observed and counted instead of disappearing with its thread.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use numera_core::errors::FlowError;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tracing::{error, info, warn};

type FlowTask = Pin<Box<dyn Future<Output = Result<(), FlowError>> + Send + 'static>>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("dispatch queue is full")]
    QueueFull,
    #[error("dispatcher has shut down")]
    Closed,
}

/// How one scheduled flow ended, as seen by the supervisor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed,
    Failed(FlowError),
    Panicked(String),
}

#[derive(Default)]
struct DispatchMetrics {
    submitted: AtomicU64,
    rejected: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    panicked: AtomicU64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub submitted: u64,
    pub rejected: u64,
    pub completed: u64,
    pub failed: u64,
    pub panicked: u64,
}

#[derive(Clone)]
pub struct Dispatcher {
    queue: mpsc::Sender<FlowTask>,
    metrics: Arc<DispatchMetrics>,
}

impl Dispatcher {
    /// Start the supervisor and return the submitting half. Dropping every
    /// clone of the dispatcher closes the queue and lets the supervisor
    /// finish its in-flight tasks and exit.
    pub fn start(capacity: usize) -> Self {
        Self::start_with_observer(capacity, None)
    }

    /// As [`start`](Self::start), with an observer channel that receives
    /// every task outcome. Used by tests to await completion.
    pub fn start_with_observer(
        capacity: usize,
        observer: Option<mpsc::UnboundedSender<TaskOutcome>>,
    ) -> Self {
        let (queue, receiver) = mpsc::channel(capacity);
        let metrics = Arc::new(DispatchMetrics::default());
        tokio::spawn(supervise(receiver, metrics.clone(), observer));
        Self { queue, metrics }
    }

    /// Non-blocking submit. A full queue is reported to the caller; the
    /// caller decides whether to drop the work (the gateway does, and still
    /// acknowledges the webhook).
    pub fn submit<F>(&self, task: F) -> Result<(), SubmitError>
    where
        F: Future<Output = Result<(), FlowError>> + Send + 'static,
    {
        match self.queue.try_send(Box::pin(task)) {
            Ok(()) => {
                self.metrics.submitted.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.metrics.rejected.fetch_add(1, Ordering::Relaxed);
                Err(SubmitError::QueueFull)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(SubmitError::Closed),
        }
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            submitted: self.metrics.submitted.load(Ordering::Relaxed),
            rejected: self.metrics.rejected.load(Ordering::Relaxed),
            completed: self.metrics.completed.load(Ordering::Relaxed),
            failed: self.metrics.failed.load(Ordering::Relaxed),
            panicked: self.metrics.panicked.load(Ordering::Relaxed),
        }
    }
}

async fn supervise(
    mut queue: mpsc::Receiver<FlowTask>,
    metrics: Arc<DispatchMetrics>,
    observer: Option<mpsc::UnboundedSender<TaskOutcome>>,
) {
    let mut tasks: JoinSet<Result<(), FlowError>> = JoinSet::new();

    loop {
        tokio::select! {
            next = queue.recv() => match next {
                Some(task) => {
                    tasks.spawn(task);
                }
                None => break,
            },
            Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                record_outcome(joined, &metrics, &observer);
            }
        }
    }

    // Queue closed; drain whatever is still running.
    while let Some(joined) = tasks.join_next().await {
        record_outcome(joined, &metrics, &observer);
    }
    info!("dispatch supervisor stopped");
}

fn record_outcome(
    joined: Result<Result<(), FlowError>, JoinError>,
    metrics: &DispatchMetrics,
    observer: &Option<mpsc::UnboundedSender<TaskOutcome>>,
) {
    let outcome = match joined {
        Ok(Ok(())) => {
            metrics.completed.fetch_add(1, Ordering::Relaxed);
            TaskOutcome::Completed
        }
        Ok(Err(flow_error)) => {
            metrics.failed.fetch_add(1, Ordering::Relaxed);
            warn!(error = %flow_error, "reply flow failed");
            TaskOutcome::Failed(flow_error)
        }
        Err(join_error) => {
            metrics.panicked.fetch_add(1, Ordering::Relaxed);
            error!(error = %join_error, "reply flow panicked");
            TaskOutcome::Panicked(join_error.to_string())
        }
    };

    if let Some(observer) = observer {
        let _ = observer.send(outcome);
    }
}
