//! Worker handles
//!
//! A worker is an independent tokio task. The orchestrator only shares a
//! stop signal and a liveness handle with it, and hears back once the
//! task ends.

use hazard::HazardError;
use indoor_nav::IndoorError;
use outdoor_nav::NavError;
use serde::Serialize;
use speech::PromptError;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use crate::orchestrator::OrchestratorError;

/// Kind of long-running worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum WorkerRole {
    /// Room classification, directions and hazard alerts
    Indoor,
    /// Outdoor walking directions
    Navigation,
    /// Outdoor hazard alerts
    Hazard,
}

impl WorkerRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerRole::Indoor => "indoor",
            WorkerRole::Navigation => "navigation",
            WorkerRole::Hazard => "hazard",
        }
    }
}

impl fmt::Display for WorkerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Worker failure
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("{0} is not configured")]
    Unavailable(&'static str),

    #[error("Frame source failed: {0}")]
    Frames(#[from] HazardError),

    #[error("No answer from user: {0}")]
    Prompt(#[from] PromptError),

    #[error("Indoor navigation failed: {0}")]
    Indoor(#[from] IndoorError),

    #[error("Outdoor navigation failed: {0}")]
    Navigation(#[from] NavError),

    #[error("Worker panicked")]
    Panicked,
}

/// Worker body, ready to be spawned
pub type WorkerFuture = Pin<Box<dyn Future<Output = Result<(), WorkerError>> + Send + 'static>>;

/// Builds worker bodies for the orchestrator
pub trait WorkerFactory: Send + Sync {
    /// Build the worker for `role`. Must not block; the body runs once spawned.
    fn create(&self, role: WorkerRole, stop: StopSignal) -> Result<WorkerFuture, WorkerError>;
}

/// Stop request observed by a worker
#[derive(Debug, Clone)]
pub struct StopSignal {
    rx: watch::Receiver<bool>,
}

impl StopSignal {
    /// Create a signal and the sender that triggers it
    pub fn channel() -> (watch::Sender<bool>, StopSignal) {
        let (tx, rx) = watch::channel(false);
        (tx, StopSignal { rx })
    }

    pub fn is_stopped(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once stop is requested or the orchestrator side is gone
    pub async fn stopped(&mut self) {
        let _ = self.rx.wait_for(|stopped| *stopped).await;
    }
}

/// Report sent when a worker task ends, whatever the reason
#[derive(Debug)]
pub struct WorkerExit {
    pub id: u64,
    pub role: WorkerRole,
    pub result: Result<(), WorkerError>,
}

/// Sends the exit report; on drop without a result the body panicked or
/// was aborted
struct ExitReporter {
    id: u64,
    role: WorkerRole,
    exits: Option<mpsc::UnboundedSender<WorkerExit>>,
}

impl ExitReporter {
    fn report(mut self, result: Result<(), WorkerError>) {
        if let Some(exits) = self.exits.take() {
            let _ = exits.send(WorkerExit {
                id: self.id,
                role: self.role,
                result,
            });
        }
    }
}

impl Drop for ExitReporter {
    fn drop(&mut self) {
        if let Some(exits) = self.exits.take() {
            let _ = exits.send(WorkerExit {
                id: self.id,
                role: self.role,
                result: Err(WorkerError::Panicked),
            });
        }
    }
}

/// Orchestrator-side handle to a running worker
#[derive(Debug)]
pub struct WorkerHandle {
    id: u64,
    role: WorkerRole,
    stop_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    /// Spawn `body`; returns as soon as the task is launched. The outcome
    /// is sent on `exits` when the body ends.
    pub(crate) fn spawn(
        id: u64,
        role: WorkerRole,
        stop_tx: watch::Sender<bool>,
        body: WorkerFuture,
        exits: mpsc::UnboundedSender<WorkerExit>,
    ) -> Self {
        let reporter = ExitReporter {
            id,
            role,
            exits: Some(exits),
        };
        let task = tokio::spawn(async move {
            let result = body.await;
            match &result {
                Ok(()) => info!(worker = %role, id, "Worker finished"),
                Err(e) => error!(worker = %role, id, "Worker failed: {}", e),
            }
            reporter.report(result);
        });
        info!(worker = %role, id, "Worker started");

        Self {
            id,
            role,
            stop_tx,
            task: Some(task),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn role(&self) -> WorkerRole {
        self.role
    }

    pub fn is_alive(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Request stop and wait up to `timeout` for the task to end; abort it
    /// after that. Stopping an already stopped worker is a no-op.
    pub async fn stop(&mut self, timeout: Duration) -> Result<(), OrchestratorError> {
        let Some(mut task) = self.task.take() else {
            return Ok(());
        };

        let _ = self.stop_tx.send(true);

        match tokio::time::timeout(timeout, &mut task).await {
            Ok(Ok(())) => {
                info!(worker = %self.role, id = self.id, "Worker stopped");
                Ok(())
            }
            Ok(Err(e)) if e.is_panic() => {
                error!(worker = %self.role, id = self.id, "Worker panicked");
                Err(OrchestratorError::WorkerPanicked { role: self.role })
            }
            Ok(Err(_)) => Ok(()),
            Err(_) => {
                warn!(worker = %self.role, id = self.id, "Worker ignored stop request, aborting");
                task.abort();
                let _ = task.await;
                Err(OrchestratorError::StopTimeout {
                    role: self.role,
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
        }
    }
}
