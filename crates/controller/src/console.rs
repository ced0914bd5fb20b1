//! Console control surface
//!
//! Lines starting with `:` are controls; anything else stands in for a
//! recognized spoken phrase.

use std::io::BufRead;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};
use crate::orchestrator::{ControlEvent, OrchestratorStatus};

pub const HELP: &str = ":power  :on  :off  :indoor  :outdoor  :status  :help  :quit  (other lines are spoken input)";

/// One console line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleInput {
    Control(ControlEvent),
    Status,
    Help,
    Phrase(String),
    Unknown(String),
}

pub fn parse_line(line: &str) -> Option<ConsoleInput> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let Some(command) = line.strip_prefix(':') else {
        return Some(ConsoleInput::Phrase(speech::normalize_phrase(line)));
    };

    let input = match command.trim().to_lowercase().as_str() {
        "power" => ConsoleInput::Control(ControlEvent::TogglePower),
        "on" => ConsoleInput::Control(ControlEvent::PowerOn),
        "off" => ConsoleInput::Control(ControlEvent::PowerOff),
        "indoor" => ConsoleInput::Control(ControlEvent::SelectIndoor),
        "outdoor" => ConsoleInput::Control(ControlEvent::SelectOutdoor),
        "quit" | "exit" => ConsoleInput::Control(ControlEvent::Shutdown),
        "status" => ConsoleInput::Status,
        "help" => ConsoleInput::Help,
        other => ConsoleInput::Unknown(other.to_string()),
    };
    Some(input)
}

/// Read stdin on a dedicated thread so a pending read never holds up
/// runtime shutdown
pub fn stdin_lines() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.blocking_send(line).is_err() {
                        return;
                    }
                }
                Err(e) => {
                    warn!("Console read failed: {}", e);
                    return;
                }
            }
        }
    });
    rx
}

/// Forward console lines until input ends or the orchestrator goes away
pub async fn run(
    mut lines: mpsc::Receiver<String>,
    events: mpsc::Sender<ControlEvent>,
    phrases: mpsc::Sender<String>,
    status: watch::Receiver<OrchestratorStatus>,
) {
    while let Some(line) = lines.recv().await {
        match parse_line(&line) {
            None => {}
            Some(ConsoleInput::Control(event)) => {
                if events.send(event).await.is_err() {
                    return;
                }
                if event == ControlEvent::Shutdown {
                    return;
                }
            }
            Some(ConsoleInput::Status) => {
                let current = status.borrow().clone();
                info!(
                    mode = %current.mode,
                    powered = current.powered,
                    workers = ?current.workers,
                    last_error = ?current.last_error,
                    "Status"
                );
            }
            Some(ConsoleInput::Help) => info!("{}", HELP),
            Some(ConsoleInput::Phrase(phrase)) => {
                // Phrases typed before a question are discarded when it is asked
                let _ = phrases.try_send(phrase);
            }
            Some(ConsoleInput::Unknown(command)) => warn!("Unknown command :{} ({})", command, HELP),
        }
    }

    info!("Console input closed");
    let _ = events.send(ControlEvent::Shutdown).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_controls() {
        assert_eq!(parse_line(":power"), Some(ConsoleInput::Control(ControlEvent::TogglePower)));
        assert_eq!(parse_line(" :Indoor "), Some(ConsoleInput::Control(ControlEvent::SelectIndoor)));
        assert_eq!(parse_line(":outdoor"), Some(ConsoleInput::Control(ControlEvent::SelectOutdoor)));
        assert_eq!(parse_line(":quit"), Some(ConsoleInput::Control(ControlEvent::Shutdown)));
        assert_eq!(parse_line(":status"), Some(ConsoleInput::Status));
        assert_eq!(parse_line(":fly"), Some(ConsoleInput::Unknown("fly".to_string())));
    }

    #[test]
    fn test_help_lists_every_command() {
        for command in ["power", "on", "off", "indoor", "outdoor", "status", "help", "quit"] {
            let line = format!(":{}", command);
            assert!(HELP.split_whitespace().any(|word| word == line), "{} missing from help", line);
            assert!(!matches!(parse_line(&line), Some(ConsoleInput::Unknown(_))));
        }
    }

    #[test]
    fn test_parse_phrases() {
        assert_eq!(parse_line("  Living Room "), Some(ConsoleInput::Phrase("living room".to_string())));
        assert_eq!(parse_line("   "), None);
    }

    #[tokio::test]
    async fn test_run_routes_lines() {
        let (line_tx, line_rx) = mpsc::channel(8);
        for line in [":power", "kitchen", ":indoor", ":status"] {
            line_tx.send(line.to_string()).await.unwrap();
        }
        drop(line_tx);
        let (event_tx, mut event_rx) = mpsc::channel(8);
        let (phrase_tx, mut phrase_rx) = mpsc::channel(8);
        let (_status_tx, status_rx) = watch::channel(OrchestratorStatus::default());

        run(line_rx, event_tx, phrase_tx, status_rx).await;

        assert_eq!(event_rx.recv().await, Some(ControlEvent::TogglePower));
        assert_eq!(event_rx.recv().await, Some(ControlEvent::SelectIndoor));
        // End of input shuts down
        assert_eq!(event_rx.recv().await, Some(ControlEvent::Shutdown));
        assert_eq!(phrase_rx.recv().await, Some("kitchen".to_string()));
    }
}
