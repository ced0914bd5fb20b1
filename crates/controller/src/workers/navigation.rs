//! Outdoor navigation worker
//!
//! Re-routes from the current position after every step until the
//! remaining route fits inside the arrival radius.

use outdoor_nav::{retry_transient, Coordinates, Geocoder, Geolocator, NavError, OutdoorConfig, RouteStep, RoutingProvider};
use speech::prompt::say;
use speech::{ask, PromptConfig, SpeechRecognizer, SpeechSink};
use std::sync::Arc;
use tracing::{info, warn};
use super::until_stopped;
use crate::worker::{StopSignal, WorkerError};

pub(super) const DESTINATION_QUESTION: &str = "Please say your destination address.";
pub(super) const NO_ADDRESS_REPLY: &str = "No destination address provided. Please try again.";
pub(super) const LOCATION_FAILED: &str = "Error: Unable to fetch current location. Check your internet connection.";
pub(super) const DESTINATION_NOT_FOUND: &str = "Could not find coordinates for the destination address.";
pub(super) const FETCHING_STEPS: &str = "Fetching navigation steps...";
pub(super) const ROUTE_FAILED: &str = "Failed to fetch navigation steps.";
pub(super) const ARRIVED: &str = "You have arrived at your destination.";

pub(super) struct NavigationWorker {
    pub config: OutdoorConfig,
    pub prompt: PromptConfig,
    pub speech: Arc<dyn SpeechSink>,
    pub recognizer: Arc<dyn SpeechRecognizer>,
    pub routing: Arc<dyn RoutingProvider>,
    pub geocoder: Arc<dyn Geocoder>,
    pub geolocator: Arc<dyn Geolocator>,
}

impl NavigationWorker {
    /// Walk the user to a spoken destination. Every network call and the
    /// destination prompt give way to a stop request.
    pub async fn run(self, mut stop: StopSignal) -> Result<(), WorkerError> {
        let Some(located) = until_stopped(&mut stop, self.locate()).await else {
            return Ok(());
        };
        let mut origin = match located {
            Ok(origin) => origin,
            Err(e) => return Err(self.fail(LOCATION_FAILED, e).await),
        };
        info!("Starting from {}", origin);

        let prompt = ask(
            self.speech.as_ref(),
            self.recognizer.as_ref(),
            DESTINATION_QUESTION,
            &self.prompt,
            |phrase| {
                let phrase = phrase.trim();
                if phrase.is_empty() {
                    Err(NO_ADDRESS_REPLY.to_string())
                } else {
                    Ok(phrase.to_string())
                }
            },
        );
        let Some(address) = until_stopped(&mut stop, prompt).await else {
            info!("Stopped while asking for the destination");
            return Ok(());
        };
        let address = address?;

        let Some(geocoded) = until_stopped(&mut stop, self.geocode(&address)).await else {
            return Ok(());
        };
        let destination = match geocoded {
            Ok(destination) => destination,
            Err(e) => return Err(self.fail(DESTINATION_NOT_FOUND, e).await),
        };
        info!("Navigating to {:?} at {}", address, destination);
        say(self.speech.as_ref(), FETCHING_STEPS).await;

        let mut legs = 0u64;
        loop {
            let Some(routed) = until_stopped(&mut stop, self.route(origin, destination)).await else {
                break;
            };
            let steps = match routed {
                Ok(steps) => steps,
                Err(e) => return Err(self.fail(ROUTE_FAILED, e).await),
            };

            if has_arrived(&steps, self.config.arrival_radius_m) {
                info!("Arrived after {} legs", legs);
                say(self.speech.as_ref(), ARRIVED).await;
                return Ok(());
            }

            let Some(next) = steps.first() else {
                return Err(self.fail(ROUTE_FAILED, NavError::NoRoute).await);
            };
            let instruction = next.spoken(self.config.step_length_m);
            info!("{}", instruction);
            say(self.speech.as_ref(), &instruction).await;
            legs += 1;

            // Time for the user to walk the step
            tokio::select! {
                biased;
                _ = stop.stopped() => break,
                _ = tokio::time::sleep(self.config.step_interval()) => {}
            }

            match until_stopped(&mut stop, self.locate()).await {
                None => break,
                Some(Ok(position)) => origin = position,
                Some(Err(e)) => warn!("Keeping last known position {}: {}", origin, e),
            }
        }

        info!("Navigation stopped after {} legs", legs);
        Ok(())
    }

    async fn locate(&self) -> Result<Coordinates, NavError> {
        retry_transient("geolocation", self.config.max_attempts, self.config.retry_backoff(), || {
            self.geolocator.current()
        })
        .await
    }

    async fn geocode(&self, address: &str) -> Result<Coordinates, NavError> {
        retry_transient("geocoding", self.config.max_attempts, self.config.retry_backoff(), || {
            self.geocoder.locate(address)
        })
        .await
    }

    async fn route(&self, origin: Coordinates, destination: Coordinates) -> Result<Vec<RouteStep>, NavError> {
        retry_transient("routing", self.config.max_attempts, self.config.retry_backoff(), || {
            self.routing.route(origin, destination)
        })
        .await
    }

    /// Tell the user, then hand back the error that ends the worker
    async fn fail(&self, message: &str, error: NavError) -> WorkerError {
        warn!("{}: {}", message, error);
        say(self.speech.as_ref(), message).await;
        WorkerError::Navigation(error)
    }
}

/// Whether the whole remaining route is within `radius_m`
fn has_arrived(steps: &[RouteStep], radius_m: f64) -> bool {
    !steps.is_empty() && steps.iter().map(|s| s.distance_m).sum::<f64>() <= radius_m
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workers::testing::{DeafRecognizer, FixedGeocoder, ScriptedRecognizer, ScriptedRouting, WalkingGeolocator};
    use tokio::time::Instant;
    use speech::{MemorySpeechSink, RecognitionError};
    use std::time::Duration;

    fn step(instruction: &str, distance_m: f64) -> RouteStep {
        RouteStep {
            instruction: instruction.to_string(),
            distance_m,
        }
    }

    fn here() -> Coordinates {
        Coordinates::new(10.74, 59.91)
    }

    fn there() -> Coordinates {
        Coordinates::new(10.75, 59.92)
    }

    struct Setup {
        sink: Arc<MemorySpeechSink>,
        routing: Arc<ScriptedRouting>,
        worker: NavigationWorker,
    }

    fn setup(
        answers: Vec<Result<&str, RecognitionError>>,
        routes: Vec<Result<Vec<RouteStep>, NavError>>,
        destination: Option<Coordinates>,
        positions: Vec<Coordinates>,
    ) -> Setup {
        let sink = Arc::new(MemorySpeechSink::new());
        let routing = Arc::new(ScriptedRouting::new(routes));
        let worker = NavigationWorker {
            config: OutdoorConfig::default(),
            prompt: PromptConfig::default(),
            speech: sink.clone(),
            recognizer: Arc::new(ScriptedRecognizer::new(answers)),
            routing: routing.clone(),
            geocoder: Arc::new(FixedGeocoder(destination)),
            geolocator: Arc::new(WalkingGeolocator::new(positions)),
        };
        Setup { sink, routing, worker }
    }

    #[tokio::test(start_paused = true)]
    async fn test_walks_to_destination() {
        let moved = Coordinates::new(10.745, 59.915);
        let s = setup(
            vec![Ok("central station")],
            vec![
                Ok(vec![step("Turn left onto Main Street.", 76.5), step("Arrive", 0.0)]),
                Ok(vec![step("Arrive", 3.0)]),
            ],
            Some(there()),
            vec![here(), moved],
        );
        let (_tx, stop) = StopSignal::channel();

        s.worker.run(stop).await.unwrap();

        assert_eq!(
            s.sink.spoken().await,
            vec![
                DESTINATION_QUESTION.to_string(),
                FETCHING_STEPS.to_string(),
                "Turn left onto Main Street. Walk 100 steps.".to_string(),
                ARRIVED.to_string(),
            ]
        );
        assert_eq!(*s.routing.calls.lock().unwrap(), vec![here(), moved]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_destination() {
        let s = setup(vec![Ok("nowhere")], vec![], None, vec![here()]);
        let (_tx, stop) = StopSignal::channel();

        let result = s.worker.run(stop).await;

        assert!(matches!(result, Err(WorkerError::Navigation(NavError::NoMatch(_)))));
        assert_eq!(s.sink.spoken().await.last().map(String::as_str), Some(DESTINATION_NOT_FOUND));
    }

    #[tokio::test(start_paused = true)]
    async fn test_location_failure_is_reported() {
        let s = setup(vec![Ok("central station")], vec![], Some(there()), vec![]);
        let (_tx, stop) = StopSignal::channel();

        let result = s.worker.run(stop).await;

        assert!(matches!(result, Err(WorkerError::Navigation(NavError::Http { status: 503, .. }))));
        assert_eq!(s.sink.spoken().await, vec![LOCATION_FAILED.to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_route_failure_is_reported() {
        let s = setup(
            vec![Ok("central station")],
            vec![Err(NavError::NoRoute)],
            Some(there()),
            vec![here()],
        );
        let (_tx, stop) = StopSignal::channel();

        let result = s.worker.run(stop).await;

        assert!(matches!(result, Err(WorkerError::Navigation(NavError::NoRoute))));
        assert_eq!(s.sink.spoken().await.last().map(String::as_str), Some(ROUTE_FAILED));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_interrupts_step_wait() {
        let s = setup(
            vec![Ok("central station")],
            vec![Ok(vec![step("Head north", 200.0)])],
            Some(there()),
            vec![here()],
        );
        let (tx, stop) = StopSignal::channel();

        let task = tokio::spawn(s.worker.run(stop));
        tokio::time::sleep(Duration::from_millis(100)).await;
        tx.send(true).unwrap();

        task.await.unwrap().unwrap();
        assert_eq!(s.routing.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_during_destination_prompt() {
        let mut s = setup(vec![], vec![], Some(there()), vec![here()]);
        s.worker.recognizer = Arc::new(DeafRecognizer);
        let (tx, stop) = StopSignal::channel();

        let task = tokio::spawn(s.worker.run(stop));
        tokio::time::sleep(Duration::from_millis(100)).await;
        let stopped_at = Instant::now();
        tx.send(true).unwrap();

        task.await.unwrap().unwrap();
        assert!(stopped_at.elapsed() < Duration::from_millis(100));
        assert_eq!(s.sink.spoken().await, vec![DESTINATION_QUESTION.to_string()]);
        assert!(s.routing.calls.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_during_location_retries() {
        // No position: every geolocation attempt fails and backs off
        let s = setup(vec![Ok("central station")], vec![], Some(there()), vec![]);
        let (tx, stop) = StopSignal::channel();

        let task = tokio::spawn(s.worker.run(stop));
        tokio::time::sleep(Duration::from_millis(500)).await;
        let stopped_at = Instant::now();
        tx.send(true).unwrap();

        task.await.unwrap().unwrap();
        assert!(stopped_at.elapsed() < Duration::from_millis(100));
        assert!(s.sink.spoken().await.is_empty());
    }

    #[test]
    fn test_arrival_radius() {
        assert!(has_arrived(&[step("Arrive", 0.0)], 5.0));
        assert!(has_arrived(&[step("Cross", 2.0), step("Arrive", 0.0)], 5.0));
        assert!(!has_arrived(&[step("Head north", 40.0), step("Arrive", 0.0)], 5.0));
        assert!(!has_arrived(&[], 5.0));
    }
}
