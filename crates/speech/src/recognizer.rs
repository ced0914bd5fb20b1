//! Speech recognizers

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tracing::debug;
use crate::{normalize_phrase, RecognitionError, SpeechRecognizer};

/// Recognizer fed with already-transcribed phrases over a channel
#[derive(Debug)]
pub struct ChannelRecognizer {
    rx: Mutex<mpsc::Receiver<String>>,
}

impl ChannelRecognizer {
    pub fn new(rx: mpsc::Receiver<String>) -> Self {
        Self { rx: Mutex::new(rx) }
    }

    /// Create a recognizer and the sender that feeds it
    pub fn channel(buffer: usize) -> (mpsc::Sender<String>, Self) {
        let (tx, rx) = mpsc::channel(buffer);
        (tx, Self::new(rx))
    }
}

#[async_trait]
impl SpeechRecognizer for ChannelRecognizer {
    async fn listen(&self, timeout: Duration) -> Result<String, RecognitionError> {
        let mut rx = self.rx.lock().await;
        match tokio::time::timeout(timeout, rx.recv()).await {
            Err(_) => Err(RecognitionError::Timeout),
            Ok(None) => Err(RecognitionError::ServiceUnavailable("input closed".to_string())),
            Ok(Some(raw)) => {
                let phrase = normalize_phrase(&raw);
                if phrase.is_empty() {
                    Err(RecognitionError::NotUnderstood)
                } else {
                    Ok(phrase)
                }
            }
        }
    }

    async fn discard_pending(&self) {
        let mut rx = self.rx.lock().await;
        let mut dropped = 0usize;
        while rx.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            debug!("Discarded {} unheard phrases", dropped);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_phrase_is_normalized() {
        let (tx, recognizer) = ChannelRecognizer::channel(4);
        tx.send("  Living Room \n".to_string()).await.unwrap();
        assert_eq!(recognizer.listen(Duration::from_secs(1)).await.unwrap(), "living room");
    }

    #[tokio::test]
    async fn test_blank_phrase_not_understood() {
        let (tx, recognizer) = ChannelRecognizer::channel(4);
        tx.send("   ".to_string()).await.unwrap();
        assert_eq!(
            recognizer.listen(Duration::from_secs(1)).await,
            Err(RecognitionError::NotUnderstood)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_silence_times_out() {
        let (_tx, recognizer) = ChannelRecognizer::channel(4);
        assert_eq!(
            recognizer.listen(Duration::from_secs(5)).await,
            Err(RecognitionError::Timeout)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_discard_pending_keeps_later_phrases() {
        let (tx, recognizer) = ChannelRecognizer::channel(4);
        tx.send("garage".to_string()).await.unwrap();
        tx.send("kitchen".to_string()).await.unwrap();

        recognizer.discard_pending().await;
        assert_eq!(
            recognizer.listen(Duration::from_secs(1)).await,
            Err(RecognitionError::Timeout)
        );

        tx.send("bedroom".to_string()).await.unwrap();
        assert_eq!(recognizer.listen(Duration::from_secs(1)).await.unwrap(), "bedroom");
    }

    #[tokio::test]
    async fn test_closed_input_is_unavailable() {
        let (tx, recognizer) = ChannelRecognizer::channel(4);
        drop(tx);
        assert!(matches!(
            recognizer.listen(Duration::from_secs(1)).await,
            Err(RecognitionError::ServiceUnavailable(_))
        ));
    }
}
