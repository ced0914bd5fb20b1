//! Frame sources
//!
//! The object detector is an external collaborator; workers only see its
//! per-frame output through [`FrameSource`].

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, info};
use crate::detection::Frame;
use crate::HazardError;

/// Stream of detector output, one [`Frame`] at a time
#[async_trait]
pub trait FrameSource: Send {
    /// Next frame, or `None` once the stream has ended
    async fn next_frame(&mut self) -> Result<Option<Frame>, HazardError>;
}

/// Opens a fresh frame source for each worker
pub trait FrameSourceOpener: Send + Sync {
    fn open(&self) -> Result<Box<dyn FrameSource>, HazardError>;
}

/// In-memory frame source
#[derive(Debug, Default)]
pub struct VecFrameSource {
    frames: VecDeque<Frame>,
}

impl VecFrameSource {
    pub fn new(frames: impl IntoIterator<Item = Frame>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }
}

#[async_trait]
impl FrameSource for VecFrameSource {
    async fn next_frame(&mut self) -> Result<Option<Frame>, HazardError> {
        Ok(self.frames.pop_front())
    }
}

/// Replays newline-delimited JSON detector output, paced at a fixed rate
pub struct ReplayFrameSource {
    lines: Lines<BufReader<File>>,
    line_no: usize,
    frame_interval: Option<Duration>,
    ticker: Option<Interval>,
}

impl ReplayFrameSource {
    /// Wrap an open file. `fps == 0` disables pacing.
    pub fn new(file: File, fps: u32) -> Self {
        Self {
            lines: BufReader::new(file).lines(),
            line_no: 0,
            frame_interval: (fps > 0).then(|| Duration::from_secs_f64(1.0 / fps as f64)),
            ticker: None,
        }
    }

    async fn pace(&mut self) {
        let Some(period) = self.frame_interval else {
            return;
        };
        let ticker = self.ticker.get_or_insert_with(|| {
            let mut ticker = tokio::time::interval(period);
            // Speech blocks the loop; resume at the normal rate afterwards
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });
        ticker.tick().await;
    }
}

#[async_trait]
impl FrameSource for ReplayFrameSource {
    async fn next_frame(&mut self) -> Result<Option<Frame>, HazardError> {
        self.pace().await;

        while let Some(line) = self.lines.next_line().await? {
            self.line_no += 1;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let frame: Frame = serde_json::from_str(line).map_err(|e| HazardError::Malformed {
                line: self.line_no,
                reason: e.to_string(),
            })?;
            debug!("Replayed frame {} with {} detections", self.line_no, frame.detections.len());
            return Ok(Some(frame));
        }

        Ok(None)
    }
}

/// Opens a [`ReplayFrameSource`] per worker
#[derive(Debug, Clone)]
pub struct ReplayOpener {
    pub path: PathBuf,
    pub fps: u32,
}

impl FrameSourceOpener for ReplayOpener {
    fn open(&self) -> Result<Box<dyn FrameSource>, HazardError> {
        let file = std::fs::File::open(&self.path)?;
        info!("Replaying detections from {}", self.path.display());
        Ok(Box::new(ReplayFrameSource::new(File::from_std(file), self.fps)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{BoundingBox, Detection};

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("hazard-{}-{}.jsonl", name, std::process::id()))
    }

    #[tokio::test]
    async fn test_vec_source_drains_in_order() {
        let mut source = VecFrameSource::new(vec![Frame::new(1, vec![]), Frame::new(2, vec![])]);

        assert_eq!(source.next_frame().await.unwrap().unwrap().height, 1);
        assert_eq!(source.next_frame().await.unwrap().unwrap().height, 2);
        assert!(source.next_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_replay_skips_blank_lines() {
        let path = temp_path("replay");
        let frame = Frame::new(480, vec![Detection::new("chair", 0.9, BoundingBox::new(0.0, 0.0, 10.0, 10.0))]);
        let body = format!("{}\n\n{}\n", serde_json::to_string(&frame).unwrap(), r#"{"height":240}"#);
        std::fs::write(&path, body).unwrap();

        let opener = ReplayOpener { path: path.clone(), fps: 0 };
        let mut source = opener.open().unwrap();

        assert_eq!(source.next_frame().await.unwrap(), Some(frame));
        assert_eq!(source.next_frame().await.unwrap().unwrap().height, 240);
        assert!(source.next_frame().await.unwrap().is_none());

        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn test_replay_reports_malformed_line() {
        let path = temp_path("malformed");
        std::fs::write(&path, "{\"height\":480}\nnot json\n").unwrap();

        let mut source = ReplayOpener { path: path.clone(), fps: 0 }.open().unwrap();
        assert!(source.next_frame().await.unwrap().is_some());
        assert!(matches!(
            source.next_frame().await,
            Err(HazardError::Malformed { line: 2, .. })
        ));

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let opener = ReplayOpener { path: temp_path("missing"), fps: 0 };
        assert!(matches!(opener.open(), Err(HazardError::Io(_))));
    }
}
