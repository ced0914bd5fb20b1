//! Speech sinks

use async_trait::async_trait;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, info};
use crate::{SpeechError, SpeechSink};

/// Logs utterances instead of voicing them
#[derive(Debug, Default, Clone)]
pub struct LogSpeechSink;

#[async_trait]
impl SpeechSink for LogSpeechSink {
    async fn speak(&self, text: &str) -> Result<(), SpeechError> {
        info!(target: "speech", "{}", text);
        Ok(())
    }
}

/// Voices utterances through an external TTS program (e.g. `espeak`).
///
/// One process per utterance, text passed as the final argument. Calls
/// from concurrent workers queue on an internal lock, so each caller still
/// waits for its own utterance to finish.
#[derive(Debug)]
pub struct CommandSpeechSink {
    program: String,
    args: Vec<String>,
    lock: Mutex<()>,
}

impl CommandSpeechSink {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            lock: Mutex::new(()),
        }
    }
}

#[async_trait]
impl SpeechSink for CommandSpeechSink {
    async fn speak(&self, text: &str) -> Result<(), SpeechError> {
        let _turn = self.lock.lock().await;
        debug!("Speaking via {}: {}", self.program, text);

        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .kill_on_drop(true)
            .status()
            .await?;

        if status.success() {
            Ok(())
        } else {
            Err(SpeechError::Command(format!("{} exited with {}", self.program, status)))
        }
    }
}

/// Records utterances in memory, optionally taking time to "speak" each one
#[derive(Debug, Default)]
pub struct MemorySpeechSink {
    spoken: Mutex<Vec<String>>,
    utterance_time: Duration,
}

impl MemorySpeechSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Each utterance takes `utterance_time` to complete
    pub fn with_utterance_time(utterance_time: Duration) -> Self {
        Self {
            spoken: Mutex::new(Vec::new()),
            utterance_time,
        }
    }

    /// Everything spoken so far, in order
    pub async fn spoken(&self) -> Vec<String> {
        self.spoken.lock().await.clone()
    }
}

#[async_trait]
impl SpeechSink for MemorySpeechSink {
    async fn speak(&self, text: &str) -> Result<(), SpeechError> {
        if !self.utterance_time.is_zero() {
            tokio::time::sleep(self.utterance_time).await;
        }
        self.spoken.lock().await.push(text.to_string());
        Ok(())
    }
}
