//! Bounded voice prompts

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};
use crate::{PromptError, RecognitionError, SpeechRecognizer, SpeechSink};

pub const NOT_UNDERSTOOD_REPLY: &str = "Sorry, I couldn't understand that. Please try again.";
pub const SERVICE_TROUBLE_REPLY: &str =
    "Sorry, I'm having trouble with the speech service. Please try again.";
pub const NO_ANSWER_REPLY: &str = "I didn't hear anything. Please try again.";
pub const GIVE_UP_REPLY: &str = "Sorry, I could not get an answer. Stopping.";

/// Prompt configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// Listening attempts before giving up
    pub max_attempts: u32,
    /// How long to wait for each answer (milliseconds)
    pub listen_timeout_ms: u64,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            listen_timeout_ms: 5000,
        }
    }
}

impl PromptConfig {
    pub fn listen_timeout(&self) -> Duration {
        Duration::from_millis(self.listen_timeout_ms)
    }
}

/// Speak a message, logging rather than failing if the sink errors
pub async fn say(sink: &dyn SpeechSink, text: &str) {
    if let Err(e) = sink.speak(text).await {
        warn!("Failed to speak {:?}: {}", text, e);
    }
}

/// Ask a question and wait for an acceptable spoken answer.
///
/// `accept` turns a recognized phrase into the answer, or returns the
/// message to speak when rejecting it. Recognition failures and rejected
/// answers each use one attempt; after `max_attempts` the user is told and
/// [`PromptError::GaveUp`] is returned. Phrases heard before the question
/// are discarded.
pub async fn ask<T, F>(
    sink: &dyn SpeechSink,
    recognizer: &dyn SpeechRecognizer,
    question: &str,
    config: &PromptConfig,
    mut accept: F,
) -> Result<T, PromptError>
where
    F: FnMut(&str) -> Result<T, String>,
{
    let attempts = config.max_attempts.max(1);
    recognizer.discard_pending().await;
    say(sink, question).await;

    for attempt in 1..=attempts {
        let retry_reply = match recognizer.listen(config.listen_timeout()).await {
            Ok(phrase) => {
                info!("Heard {:?} (attempt {}/{})", phrase, attempt, attempts);
                match accept(&phrase) {
                    Ok(answer) => return Ok(answer),
                    Err(reply) => reply,
                }
            }
            Err(RecognitionError::NotUnderstood) => NOT_UNDERSTOOD_REPLY.to_string(),
            Err(RecognitionError::ServiceUnavailable(reason)) => {
                warn!("Speech service unavailable: {}", reason);
                SERVICE_TROUBLE_REPLY.to_string()
            }
            Err(RecognitionError::Timeout) => NO_ANSWER_REPLY.to_string(),
        };

        debug!("Prompt attempt {}/{} failed", attempt, attempts);
        if attempt < attempts {
            say(sink, &retry_reply).await;
        }
    }

    warn!("Giving up on prompt {:?} after {} attempts", question, attempts);
    say(sink, GIVE_UP_REPLY).await;
    Err(PromptError::GaveUp { attempts })
}
