//! Alert Throttle Implementation

use hazard::ClassifiedDetection;
use serde::{Deserialize, Serialize};
use speech::SpeechSink;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use crate::message::compose;

/// Alert configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Minimum time between two alert-emitting batches (milliseconds)
    pub cooldown_ms: u64,
    /// How many times a dangerous object's label is repeated
    pub danger_emphasis: usize,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: 500,
            danger_emphasis: 1,
        }
    }
}

impl AlertConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

/// Per-worker alert state
#[derive(Debug, Clone, Default)]
pub struct AlertState {
    /// When the last alert batch was emitted, `None` if never
    pub last_spoken_at: Option<Instant>,
    /// Messages emitted so far
    pub spoken_count: u64,
}

/// Decides which classified detections become spoken warnings.
///
/// One instance per worker; its state is never shared. The cooldown window
/// only closes when a batch actually produced at least one message.
#[derive(Debug)]
pub struct AlertThrottle {
    config: AlertConfig,
    state: AlertState,
}

impl AlertThrottle {
    /// Create a throttle that has never spoken
    pub fn new(config: AlertConfig) -> Self {
        debug!("Creating alert throttle with config: {:?}", config);
        Self {
            config,
            state: AlertState::default(),
        }
    }

    pub fn state(&self) -> &AlertState {
        &self.state
    }

    /// Whether `now` falls inside the cooldown window
    pub fn in_cooldown(&self, now: Instant) -> bool {
        match self.state.last_spoken_at {
            Some(last) => now.saturating_duration_since(last) < self.config.cooldown(),
            None => false,
        }
    }

    /// Messages to speak for this batch, in detection order.
    ///
    /// Batches arriving during the cooldown are dropped, not queued. Empty
    /// batches and batches with nothing to say leave the state untouched.
    /// The returned messages count as spoken; use [`AlertThrottle::dispatch`]
    /// to only count what the sink actually said.
    pub fn process(&mut self, batch: &[ClassifiedDetection], now: Instant) -> Vec<String> {
        let messages = self.pending(batch, now);
        self.record(now, messages.len());
        messages
    }

    /// Speak each message of the batch in turn, waiting for each utterance
    /// to finish. Returns the number of messages spoken; the cooldown only
    /// starts if that is at least one.
    pub async fn dispatch(
        &mut self,
        batch: &[ClassifiedDetection],
        now: Instant,
        sink: &dyn SpeechSink,
    ) -> usize {
        let mut spoken = 0;
        for message in self.pending(batch, now) {
            match sink.speak(&message).await {
                Ok(()) => {
                    info!("Alert: {}", message);
                    spoken += 1;
                }
                Err(e) => warn!("Failed to speak alert {:?}: {}", message, e),
            }
        }
        self.record(now, spoken);
        spoken
    }

    fn pending(&self, batch: &[ClassifiedDetection], now: Instant) -> Vec<String> {
        if batch.is_empty() {
            return Vec::new();
        }

        if self.in_cooldown(now) {
            debug!("Alert batch of {} dropped: in cooldown", batch.len());
            return Vec::new();
        }

        batch
            .iter()
            .filter_map(|d| compose(d, self.config.danger_emphasis))
            .collect()
    }

    fn record(&mut self, now: Instant, spoken: usize) {
        if spoken > 0 {
            self.state.last_spoken_at = Some(now);
            self.state.spoken_count += spoken as u64;
        }
    }

    /// Forget the last alert
    pub fn reset(&mut self) {
        self.state = AlertState::default();
    }
}

impl Default for AlertThrottle {
    fn default() -> Self {
        Self::new(AlertConfig::default())
    }
}
