//! Indoor worker: guide the user to a spoken target room while warning
//! about hazards.

use hazard::FrameSource;
use indoor_nav::{describe, plan, LayoutTable, RoomClassifier};
use speech::prompt::say;
use speech::{ask, PromptConfig, SpeechRecognizer, SpeechSink};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use super::{next_frame, until_stopped, HazardMonitor};
use crate::worker::{StopSignal, WorkerError};

pub(super) const TARGET_QUESTION: &str = "Please say the name of the room you want to go to.";
pub(super) const INVALID_ROOM_REPLY: &str = "Invalid room name. Please try again.";
pub(super) const INVALID_SELECTION: &str = "Invalid room selection";

pub(super) struct IndoorWorker {
    pub rooms: Arc<RoomClassifier>,
    pub layout: Arc<LayoutTable>,
    pub prompt: PromptConfig,
    pub monitor: HazardMonitor,
    pub speech: Arc<dyn SpeechSink>,
    pub recognizer: Arc<dyn SpeechRecognizer>,
}

impl IndoorWorker {
    pub async fn run(mut self, mut frames: Box<dyn FrameSource>, mut stop: StopSignal) -> Result<(), WorkerError> {
        let layout = self.layout.clone();
        let prompt = ask(
            self.speech.as_ref(),
            self.recognizer.as_ref(),
            TARGET_QUESTION,
            &self.prompt,
            |phrase| {
                layout
                    .resolve(phrase)
                    .map(str::to_string)
                    .ok_or_else(|| INVALID_ROOM_REPLY.to_string())
            },
        );
        let Some(target) = until_stopped(&mut stop, prompt).await else {
            info!("Stopped while asking for the target room");
            return Ok(());
        };
        let target = target?;
        info!("Guiding to {}", target);

        let mut current_room: Option<String> = None;
        let mut processed = 0u64;

        while let Some(frame) = next_frame(frames.as_mut(), &mut stop).await? {
            let started = Instant::now();

            let best = self.rooms.classify(frame.labels());
            if best.score > 0.0 && current_room.as_deref() != Some(best.room.as_str()) {
                info!("Current room: {} (score {:.2})", best.room, best.score);
                self.announce(&best.room, &target).await;
                current_room = Some(best.room);
            }

            let spoken = self.monitor.observe(&frame, self.speech.as_ref()).await;
            metrics::histogram!("vision_assist_frame_latency_seconds", "worker" => "indoor")
                .record(started.elapsed().as_secs_f64());

            processed += 1;
            debug!("Frame {}: {} detections, {} alerts", processed, frame.detections.len(), spoken);
        }

        info!("Indoor guidance ended after {} frames", processed);
        Ok(())
    }

    /// Speak directions from `current` to `target`
    async fn announce(&self, current: &str, target: &str) {
        match plan(current, target, &self.layout) {
            Ok(instructions) if instructions.is_empty() => {
                debug!("{} and {} share a position; nothing to say", current, target);
            }
            Ok(instructions) => {
                let directions = describe(&instructions);
                info!("Navigation from {} to {}: {}", current, target, directions);
                say(self.speech.as_ref(), &directions).await;
            }
            Err(e) => {
                warn!("No directions from {} to {}: {}", current, target, e);
                say(self.speech.as_ref(), INVALID_SELECTION).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::{WorkerHandle, WorkerRole};
    use crate::workers::testing::{DeafRecognizer, ScriptedRecognizer};
    use alerting::AlertConfig;
    use hazard::{BoundingBox, Detection, Frame, RiskClassifier, VecFrameSource};
    use indoor_nav::{LayoutEntry, RoomProfile, RoomRule};
    use speech::prompt::GIVE_UP_REPLY;
    use speech::{MemorySpeechSink, PromptError, RecognitionError};
    use std::time::Duration;

    fn far(label: &str) -> Detection {
        // Tiny box: far away, never alerts
        Detection::new(label, 0.9, BoundingBox::new(0.0, 0.0, 10.0, 10.0))
    }

    fn frame(labels: &[&str]) -> Frame {
        Frame::new(480, labels.iter().map(|l| far(l)).collect())
    }

    fn worker(
        rooms: RoomClassifier,
        layout: LayoutTable,
        answers: Vec<Result<&str, RecognitionError>>,
        sink: Arc<MemorySpeechSink>,
    ) -> IndoorWorker {
        IndoorWorker {
            rooms: Arc::new(rooms),
            layout: Arc::new(layout),
            prompt: PromptConfig::default(),
            monitor: HazardMonitor::new(Arc::new(RiskClassifier::default()), AlertConfig::default()),
            speech: sink,
            recognizer: Arc::new(ScriptedRecognizer::new(answers)),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_guides_on_room_change() {
        let sink = Arc::new(MemorySpeechSink::new());
        let worker = worker(
            RoomClassifier::default(),
            LayoutTable::default(),
            vec![Ok("garage"), Ok("kitchen")],
            sink.clone(),
        );
        let frames = Box::new(VecFrameSource::new(vec![
            frame(&["couch", "tv"]),
            frame(&["sofa"]),
            frame(&[]),
            frame(&["refrigerator", "oven"]),
        ]));
        let (_tx, stop) = StopSignal::channel();

        worker.run(frames, stop).await.unwrap();

        assert_eq!(
            sink.spoken().await,
            vec![
                TARGET_QUESTION.to_string(),
                INVALID_ROOM_REPLY.to_string(),
                "Move right".to_string(),
                "You are already in the target room.".to_string(),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_room_without_position_is_invalid_selection() {
        let rooms = RoomProfile::new(vec![
            RoomRule::new("attic", &["trunk"]),
            RoomRule::new("kitchen", &["oven"]),
        ])
        .unwrap();
        let layout = LayoutTable::new(vec![LayoutEntry::new("kitchen", 0, 0)]).unwrap();
        let sink = Arc::new(MemorySpeechSink::new());
        let worker = worker(RoomClassifier::new(rooms), layout, vec![Ok("kitchen")], sink.clone());
        let frames = Box::new(VecFrameSource::new(vec![frame(&["trunk"])]));
        let (_tx, stop) = StopSignal::channel();

        worker.run(frames, stop).await.unwrap();

        assert_eq!(sink.spoken().await.last().map(String::as_str), Some(INVALID_SELECTION));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_without_answer() {
        let sink = Arc::new(MemorySpeechSink::new());
        let worker = worker(
            RoomClassifier::default(),
            LayoutTable::default(),
            vec![Err(RecognitionError::NotUnderstood)],
            sink.clone(),
        );
        let frames = Box::new(VecFrameSource::new(vec![frame(&["bed"])]));
        let (_tx, stop) = StopSignal::channel();

        let result = worker.run(frames, stop).await;

        assert!(matches!(result, Err(WorkerError::Prompt(PromptError::GaveUp { attempts: 3 }))));
        assert_eq!(sink.spoken().await.last().map(String::as_str), Some(GIVE_UP_REPLY));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_during_prompt_ends_promptly() {
        let sink = Arc::new(MemorySpeechSink::new());
        let mut worker = worker(RoomClassifier::default(), LayoutTable::default(), vec![], sink.clone());
        worker.recognizer = Arc::new(DeafRecognizer);
        let frames = Box::new(VecFrameSource::new(vec![frame(&["bed"])]));
        let (exits, _exit_rx) = tokio::sync::mpsc::unbounded_channel();
        let (tx, stop) = StopSignal::channel();
        let mut handle = WorkerHandle::spawn(1, WorkerRole::Indoor, tx, Box::pin(worker.run(frames, stop)), exits);

        tokio::time::sleep(Duration::from_millis(100)).await;
        let asked_at = Instant::now();
        handle.stop(Duration::from_secs(3)).await.unwrap();

        assert!(asked_at.elapsed() < Duration::from_millis(100));
        assert_eq!(sink.spoken().await, vec![TARGET_QUESTION.to_string()]);
    }
}
