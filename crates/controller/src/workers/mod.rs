//! Assistance workers
//!
//! - `indoor`: target-room prompt, room tracking, directions, hazard alerts
//! - `navigation`: outdoor walking directions
//! - `hazard`: outdoor hazard alerts

mod indoor;
mod monitor;
mod navigation;

pub use monitor::HazardMonitor;

use hazard::{Frame, FrameSource, FrameSourceOpener, ReplayOpener, RiskClassifier};
use indoor_nav::{LayoutTable, RoomClassifier, RoomProfile};
use outdoor_nav::{Geocoder, Geolocator, IpGeolocator, MapboxClient, NavError, RoutingProvider};
use speech::{CommandSpeechSink, LogSpeechSink, SpeechRecognizer, SpeechSink};
use std::future::Future;
use std::sync::Arc;
use tracing::{info, warn};
use crate::config::{AssistConfig, ConfigError, SpeechBackend};
use crate::worker::{StopSignal, WorkerError, WorkerFactory, WorkerFuture, WorkerRole};

/// External collaborators shared by every worker
#[derive(Clone)]
pub struct Services {
    pub speech: Arc<dyn SpeechSink>,
    pub recognizer: Arc<dyn SpeechRecognizer>,
    /// Detector output; without it no perception worker can start
    pub frames: Option<Arc<dyn FrameSourceOpener>>,
    /// Routing and geocoding; without them navigation cannot start
    pub routing: Option<Arc<dyn RoutingProvider>>,
    pub geocoder: Option<Arc<dyn Geocoder>>,
    pub geolocator: Arc<dyn Geolocator>,
}

impl Services {
    /// Build the concrete clients named by the configuration
    pub fn from_config(config: &AssistConfig, recognizer: Arc<dyn SpeechRecognizer>) -> Result<Self, ConfigError> {
        let speech: Arc<dyn SpeechSink> = match config.speech.backend {
            SpeechBackend::Log => Arc::new(LogSpeechSink),
            SpeechBackend::Command => Arc::new(CommandSpeechSink::new(
                config.speech.program.clone(),
                config.speech.args.clone(),
            )),
        };

        let frames = config.frames.path.as_ref().map(|path| {
            Arc::new(ReplayOpener {
                path: path.clone(),
                fps: config.frames.fps,
            }) as Arc<dyn FrameSourceOpener>
        });
        if frames.is_none() {
            warn!("No frame source configured; indoor and hazard workers are unavailable");
        }

        let (routing, geocoder) = match MapboxClient::new(&config.outdoor) {
            Ok(client) => {
                let client = Arc::new(client);
                (
                    Some(client.clone() as Arc<dyn RoutingProvider>),
                    Some(client as Arc<dyn Geocoder>),
                )
            }
            Err(NavError::MissingToken) => {
                warn!("No Mapbox token (outdoor.mapbox_token or MAPBOX_TOKEN); outdoor navigation is unavailable");
                (None, None)
            }
            Err(e) => return Err(ConfigError::Invalid(format!("outdoor: {}", e))),
        };

        let geolocator = IpGeolocator::new(&config.outdoor)
            .map_err(|e| ConfigError::Invalid(format!("outdoor: {}", e)))?;

        Ok(Self {
            speech,
            recognizer,
            frames,
            routing,
            geocoder,
            geolocator: Arc::new(geolocator),
        })
    }

    fn open_frames(&self) -> Result<Box<dyn FrameSource>, WorkerError> {
        let opener = self
            .frames
            .as_ref()
            .ok_or(WorkerError::Unavailable("frame source"))?;
        Ok(opener.open()?)
    }
}

/// Builds the three assistance workers from shared configuration
pub struct AssistWorkerFactory {
    config: Arc<AssistConfig>,
    services: Services,
    risk: Arc<RiskClassifier>,
    rooms: Arc<RoomClassifier>,
    layout: Arc<LayoutTable>,
}

impl AssistWorkerFactory {
    pub fn new(config: AssistConfig, services: Services) -> Result<Self, ConfigError> {
        let risk = RiskClassifier::new(config.risk.clone())
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        let rooms = RoomProfile::new(config.indoor.rooms.clone())
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        let layout = LayoutTable::new(config.indoor.layout.clone())
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        Ok(Self {
            config: Arc::new(config),
            services,
            risk: Arc::new(risk),
            rooms: Arc::new(RoomClassifier::new(rooms)),
            layout: Arc::new(layout),
        })
    }

    fn monitor(&self) -> HazardMonitor {
        HazardMonitor::new(self.risk.clone(), self.config.alert.clone())
    }
}

impl WorkerFactory for AssistWorkerFactory {
    fn create(&self, role: WorkerRole, stop: StopSignal) -> Result<WorkerFuture, WorkerError> {
        info!("Creating {} worker", role);

        match role {
            WorkerRole::Hazard => {
                let frames = self.services.open_frames()?;
                Ok(Box::pin(monitor::run(
                    self.monitor(),
                    frames,
                    self.services.speech.clone(),
                    stop,
                )))
            }
            WorkerRole::Indoor => {
                let frames = self.services.open_frames()?;
                let worker = indoor::IndoorWorker {
                    rooms: self.rooms.clone(),
                    layout: self.layout.clone(),
                    prompt: self.config.prompt.clone(),
                    monitor: self.monitor(),
                    speech: self.services.speech.clone(),
                    recognizer: self.services.recognizer.clone(),
                };
                Ok(Box::pin(worker.run(frames, stop)))
            }
            WorkerRole::Navigation => {
                let routing = self
                    .services
                    .routing
                    .clone()
                    .ok_or(WorkerError::Unavailable("routing provider"))?;
                let geocoder = self
                    .services
                    .geocoder
                    .clone()
                    .ok_or(WorkerError::Unavailable("geocoder"))?;
                let worker = navigation::NavigationWorker {
                    config: self.config.outdoor.clone(),
                    prompt: self.config.prompt.clone(),
                    speech: self.services.speech.clone(),
                    recognizer: self.services.recognizer.clone(),
                    routing,
                    geocoder,
                    geolocator: self.services.geolocator.clone(),
                };
                Ok(Box::pin(worker.run(stop)))
            }
        }
    }
}

/// Next frame, or `None` once the stream ends or stop is requested
async fn next_frame(
    source: &mut dyn FrameSource,
    stop: &mut StopSignal,
) -> Result<Option<Frame>, WorkerError> {
    if stop.is_stopped() {
        return Ok(None);
    }
    tokio::select! {
        biased;
        _ = stop.stopped() => Ok(None),
        frame = source.next_frame() => Ok(frame?),
    }
}

/// Output of `work`, or `None` if stop was requested first. `work` is
/// dropped mid-flight on stop.
async fn until_stopped<T>(stop: &mut StopSignal, work: impl Future<Output = T>) -> Option<T> {
    tokio::select! {
        biased;
        _ = stop.stopped() => None,
        output = work => Some(output),
    }
}
