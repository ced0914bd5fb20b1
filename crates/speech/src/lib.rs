//! Speech Boundary
//!
//! Text-to-speech output and speech-recognition input as seen by workers:
//! - [`SpeechSink`]: each call completes once the utterance has been spoken
//! - [`SpeechRecognizer`]: one recognized, normalized phrase per call
//! - [`prompt::ask`]: question/answer with a bounded number of retries

pub mod prompt;
pub mod recognizer;
pub mod sink;

pub use prompt::{ask, PromptConfig};
pub use recognizer::ChannelRecognizer;
pub use sink::{CommandSpeechSink, LogSpeechSink, MemorySpeechSink};

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Speech output errors
#[derive(Error, Debug)]
pub enum SpeechError {
    #[error("Speech command failed: {0}")]
    Command(String),

    #[error("Speech I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Speech recognition failures, all transient
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecognitionError {
    #[error("Speech not understood")]
    NotUnderstood,

    #[error("Speech service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("No speech before timeout")]
    Timeout,
}

/// Prompt outcome when no acceptable answer was given
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PromptError {
    #[error("No acceptable answer after {attempts} attempts")]
    GaveUp { attempts: u32 },
}

/// Text-to-speech output
///
/// `speak` returns once the utterance is complete. Callers rely on this as
/// backpressure, so implementations must not return early.
#[async_trait]
pub trait SpeechSink: Send + Sync {
    async fn speak(&self, text: &str) -> Result<(), SpeechError>;
}

/// Speech recognition input
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Listen for one phrase, returned lowercase and trimmed
    async fn listen(&self, timeout: Duration) -> Result<String, RecognitionError>;

    /// Drop phrases heard while nobody was listening
    async fn discard_pending(&self) {}
}

/// Normalize a recognized phrase
pub fn normalize_phrase(raw: &str) -> String {
    raw.trim().to_lowercase()
}
