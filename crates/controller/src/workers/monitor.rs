//! Hazard alerts from detector frames

use alerting::{AlertConfig, AlertThrottle};
use hazard::{Frame, FrameSource, RiskClassifier};
use speech::SpeechSink;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info};
use super::next_frame;
use crate::worker::{StopSignal, WorkerError};

/// Risk classification plus throttled speech for one worker.
///
/// Each worker owns its own monitor, so cooldown state is never shared.
pub struct HazardMonitor {
    classifier: Arc<RiskClassifier>,
    throttle: AlertThrottle,
}

impl HazardMonitor {
    pub fn new(classifier: Arc<RiskClassifier>, alert: AlertConfig) -> Self {
        Self {
            classifier,
            throttle: AlertThrottle::new(alert),
        }
    }

    pub fn throttle(&self) -> &AlertThrottle {
        &self.throttle
    }

    /// Classify a frame and speak its alerts. Returns once every alert has
    /// been spoken.
    pub async fn observe(&mut self, frame: &Frame, sink: &dyn SpeechSink) -> usize {
        let batch = self.classifier.classify_frame(frame);
        let spoken = self.throttle.dispatch(&batch, Instant::now(), sink).await;
        if spoken > 0 {
            metrics::counter!("vision_assist_alerts_spoken_total").increment(spoken as u64);
        }
        spoken
    }
}

/// Hazard worker loop
pub(super) async fn run(
    mut monitor: HazardMonitor,
    mut frames: Box<dyn FrameSource>,
    speech: Arc<dyn SpeechSink>,
    mut stop: StopSignal,
) -> Result<(), WorkerError> {
    info!("Hazard monitoring started");
    let mut processed = 0u64;

    while let Some(frame) = next_frame(frames.as_mut(), &mut stop).await? {
        let started = Instant::now();
        let spoken = monitor.observe(&frame, speech.as_ref()).await;
        metrics::histogram!("vision_assist_frame_latency_seconds", "worker" => "hazard")
            .record(started.elapsed().as_secs_f64());

        processed += 1;
        debug!("Frame {}: {} detections, {} alerts", processed, frame.detections.len(), spoken);
    }

    info!("Hazard monitoring ended after {} frames", processed);
    Ok(())
}
