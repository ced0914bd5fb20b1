//! Mode orchestration
//!
//! Owns the OFF / INDOOR / OUTDOOR state machine and the set of running
//! workers. Events are handled one at a time; a transition stops the old
//! worker set completely before the new one is started. A worker that ends
//! on its own takes the whole mode down to OFF.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};
use crate::worker::{StopSignal, WorkerError, WorkerExit, WorkerFactory, WorkerHandle, WorkerRole};

/// Operating mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Mode {
    #[default]
    Off,
    Indoor,
    Outdoor,
}

impl Mode {
    /// Worker set that must be running in this mode
    pub fn roles(&self) -> &'static [WorkerRole] {
        match self {
            Mode::Off => &[],
            Mode::Indoor => &[WorkerRole::Indoor],
            Mode::Outdoor => &[WorkerRole::Navigation, WorkerRole::Hazard],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Off => "off",
            Mode::Indoor => "indoor",
            Mode::Outdoor => "outdoor",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User control input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    PowerOn,
    PowerOff,
    TogglePower,
    SelectIndoor,
    SelectOutdoor,
    Shutdown,
}

/// Orchestrator error types
///
/// None of these are fatal to the control loop; the orchestrator is always
/// left in a well-defined mode.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Mode controls are disabled while powered off")]
    ControlsDisabled,

    #[error("Failed to start {role} worker: {source}")]
    StartFailed {
        role: WorkerRole,
        #[source]
        source: WorkerError,
    },

    #[error("{role} worker did not stop within {timeout_ms} ms and was aborted")]
    StopTimeout { role: WorkerRole, timeout_ms: u64 },

    #[error("{role} worker panicked")]
    WorkerPanicked { role: WorkerRole },

    #[error("{role} worker failed: {source}")]
    WorkerFailed {
        role: WorkerRole,
        #[source]
        source: WorkerError,
    },

    #[error("Orchestrator has shut down")]
    ShutDown,
}

/// Orchestrator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Grace period for a worker to honor a stop request before it is
    /// aborted (milliseconds)
    pub stop_timeout_ms: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self { stop_timeout_ms: 3000 }
    }
}

impl OrchestratorConfig {
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }
}

/// Snapshot published after every event and every worker exit
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OrchestratorStatus {
    pub mode: Mode,
    pub powered: bool,
    /// Roles of workers still running
    pub workers: Vec<WorkerRole>,
    /// Most recent failure since the last successful mode entry
    pub last_error: Option<String>,
}

/// Mode state machine
pub struct ModeOrchestrator<F: WorkerFactory> {
    factory: F,
    config: OrchestratorConfig,
    powered: bool,
    mode: Mode,
    workers: Vec<WorkerHandle>,
    next_worker_id: u64,
    shut_down: bool,
    last_error: Option<String>,
    status_tx: watch::Sender<OrchestratorStatus>,
    exit_tx: mpsc::UnboundedSender<WorkerExit>,
    exit_rx: mpsc::UnboundedReceiver<WorkerExit>,
}

impl<F: WorkerFactory> ModeOrchestrator<F> {
    pub fn new(factory: F, config: OrchestratorConfig) -> Self {
        let (status_tx, _) = watch::channel(OrchestratorStatus::default());
        let (exit_tx, exit_rx) = mpsc::unbounded_channel();
        Self {
            factory,
            config,
            powered: false,
            mode: Mode::Off,
            workers: Vec::new(),
            next_worker_id: 1,
            shut_down: false,
            last_error: None,
            status_tx,
            exit_tx,
            exit_rx,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_powered(&self) -> bool {
        self.powered
    }

    pub fn status(&self) -> OrchestratorStatus {
        OrchestratorStatus {
            mode: self.mode,
            powered: self.powered,
            workers: self
                .workers
                .iter()
                .filter(|w| w.is_alive())
                .map(|w| w.role())
                .collect(),
            last_error: self.last_error.clone(),
        }
    }

    /// Receive a status snapshot after every handled event
    pub fn subscribe(&self) -> watch::Receiver<OrchestratorStatus> {
        self.status_tx.subscribe()
    }

    /// Apply one control event
    pub async fn handle(&mut self, event: ControlEvent) -> Result<(), OrchestratorError> {
        if self.shut_down {
            return Err(OrchestratorError::ShutDown);
        }
        debug!("Control event {:?} in mode {}", event, self.mode);

        let result = match event {
            ControlEvent::PowerOn => {
                self.power_on();
                Ok(())
            }
            ControlEvent::PowerOff => self.power_off().await,
            ControlEvent::TogglePower if self.powered => self.power_off().await,
            ControlEvent::TogglePower => {
                self.power_on();
                Ok(())
            }
            ControlEvent::SelectIndoor => self.select_indoor().await,
            ControlEvent::SelectOutdoor => self.select_outdoor().await,
            ControlEvent::Shutdown => self.shutdown().await,
        };

        if let Err(e) = &result {
            self.last_error = Some(e.to_string());
        }
        self.publish();
        result
    }

    /// React to a worker task that ended.
    ///
    /// Exits of workers the orchestrator already stopped are ignored. Any
    /// other exit leaves the mode short of its worker set, so the rest of
    /// the set is stopped and the mode drops to OFF while staying powered.
    pub async fn worker_exited(&mut self, exit: WorkerExit) -> Result<(), OrchestratorError> {
        let Some(index) = self.workers.iter().position(|w| w.id() == exit.id) else {
            debug!(worker = %exit.role, id = exit.id, "Exit of a stopped worker");
            return Ok(());
        };

        let mut handle = self.workers.remove(index);
        let reaped = self.stop(&mut handle).await;
        let _ = self.stop_all().await;
        let left = self.mode;
        self.mode = Mode::Off;

        let result = match exit.result {
            Err(source) => {
                warn!("{} worker ended with an error; leaving {} mode", exit.role, left);
                Err(OrchestratorError::WorkerFailed {
                    role: exit.role,
                    source,
                })
            }
            Ok(()) => {
                info!("{} worker finished; leaving {} mode", exit.role, left);
                reaped
            }
        };

        if let Err(e) = &result {
            self.last_error = Some(e.to_string());
        }
        self.publish();
        result
    }

    /// Enable mode controls. The mode stays OFF until one is selected.
    pub fn power_on(&mut self) {
        if !self.powered {
            self.powered = true;
            info!("Powered on; select a mode");
        }
    }

    /// Stop every worker, then disable mode controls
    pub async fn power_off(&mut self) -> Result<(), OrchestratorError> {
        let result = self.stop_all().await;
        self.mode = Mode::Off;
        if self.powered {
            self.powered = false;
            info!("Powered off");
        }
        result
    }

    pub async fn select_indoor(&mut self) -> Result<(), OrchestratorError> {
        self.switch_to(Mode::Indoor).await
    }

    pub async fn select_outdoor(&mut self) -> Result<(), OrchestratorError> {
        self.switch_to(Mode::Outdoor).await
    }

    /// Power off and refuse further events
    pub async fn shutdown(&mut self) -> Result<(), OrchestratorError> {
        if self.shut_down {
            return Ok(());
        }
        info!("Shutting down");
        let result = self.power_off().await;
        self.shut_down = true;
        result
    }

    async fn switch_to(&mut self, target: Mode) -> Result<(), OrchestratorError> {
        if !self.powered {
            return Err(OrchestratorError::ControlsDisabled);
        }

        let healthy = !self.workers.is_empty() && self.workers.iter().all(|w| w.is_alive());
        if self.mode == target && healthy {
            debug!("Already in {} mode", target);
            return Ok(());
        }

        // Failures are logged by stop_all; the old set is gone either way
        let _ = self.stop_all().await;
        self.mode = Mode::Off;

        for &role in target.roles() {
            match self.start(role) {
                Ok(handle) => self.workers.push(handle),
                Err(e) => {
                    error!("Cannot enter {} mode: {}", target, e);
                    let _ = self.stop_all().await;
                    return Err(e);
                }
            }
        }

        self.mode = target;
        self.last_error = None;
        metrics::counter!("vision_assist_mode_switches_total", "mode" => target.as_str()).increment(1);
        info!("Entered {} mode", target);
        Ok(())
    }

    /// Launch one worker. Returns once the task is spawned, not once it is ready.
    pub fn start(&mut self, role: WorkerRole) -> Result<WorkerHandle, OrchestratorError> {
        let (stop_tx, stop) = StopSignal::channel();
        let body = self
            .factory
            .create(role, stop)
            .map_err(|source| OrchestratorError::StartFailed { role, source })?;

        let id = self.next_worker_id;
        self.next_worker_id += 1;
        metrics::counter!("vision_assist_worker_starts_total", "role" => role.as_str()).increment(1);
        Ok(WorkerHandle::spawn(id, role, stop_tx, body, self.exit_tx.clone()))
    }

    /// Stop one worker; a no-op if it already stopped
    pub async fn stop(&self, handle: &mut WorkerHandle) -> Result<(), OrchestratorError> {
        let result = handle.stop(self.config.stop_timeout()).await;
        metrics::counter!("vision_assist_worker_stops_total", "role" => handle.role().as_str()).increment(1);
        result
    }

    /// Stop every running worker, continuing past failures. Returns the
    /// first failure; calling it again with nothing running is a no-op.
    pub async fn stop_all(&mut self) -> Result<(), OrchestratorError> {
        let mut first_error = None;
        let mut workers = std::mem::take(&mut self.workers);

        for handle in workers.iter_mut() {
            if let Err(e) = self.stop(handle).await {
                warn!("Stopping {} worker: {}", handle.role(), e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Consume control events and worker exits until shutdown or until
    /// every event sender is gone
    pub async fn run(&mut self, mut events: mpsc::Receiver<ControlEvent>) {
        loop {
            tokio::select! {
                event = events.recv() => {
                    let Some(event) = event else { break };
                    if let Err(e) = self.handle(event).await {
                        warn!("{:?} failed: {}", event, e);
                    }
                    if self.shut_down {
                        return;
                    }
                }
                Some(exit) = self.exit_rx.recv() => {
                    if let Err(e) = self.worker_exited(exit).await {
                        warn!("{}", e);
                    }
                }
            }
        }

        info!("Control channel closed");
        if let Err(e) = self.handle(ControlEvent::Shutdown).await {
            warn!("Shutdown failed: {}", e);
        }
    }

    fn publish(&self) {
        let status = self.status();
        metrics::gauge!("vision_assist_workers_running").set(status.workers.len() as f64);
        self.status_tx.send_replace(status);
    }
}
