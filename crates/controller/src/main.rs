//! Vision Assist - Main Entry Point

use anyhow::Context;
use clap::Parser;
use controller::{
    console, init_logging, init_metrics, AssistConfig, AssistWorkerFactory, ControlEvent, ModeOrchestrator, Services,
};
use speech::ChannelRecognizer;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "vision-assist", version, about = "Indoor guidance, outdoor navigation and hazard alerts")]
struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Replay detector frames from this JSONL file
    #[arg(short, long)]
    frames: Option<PathBuf>,

    /// Power on at startup
    #[arg(long)]
    power_on: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AssistConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(frames) = cli.frames {
        config.frames.path = Some(frames);
    }

    init_logging(&config.logging)?;
    info!("=== Vision Assist v{} ===", env!("CARGO_PKG_VERSION"));

    // Validation warns about ambiguous settings, so it runs once logging is up
    config.validate().context("validating configuration")?;
    init_metrics(&config.logging)?;

    let (phrase_tx, recognizer) = ChannelRecognizer::channel(16);
    let services = Services::from_config(&config, Arc::new(recognizer))?;
    let orchestrator_config = config.orchestrator.clone();
    let factory = AssistWorkerFactory::new(config, services)?;
    let mut orchestrator = ModeOrchestrator::new(factory, orchestrator_config);

    let (event_tx, event_rx) = mpsc::channel(16);
    if cli.power_on {
        event_tx.send(ControlEvent::PowerOn).await?;
    }

    tokio::spawn(console::run(
        console::stdin_lines(),
        event_tx.clone(),
        phrase_tx,
        orchestrator.subscribe(),
    ));

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Cannot listen for Ctrl-C: {}", e);
            return;
        }
        info!("Interrupted");
        let _ = event_tx.send(ControlEvent::Shutdown).await;
    });

    info!("{}", console::HELP);
    orchestrator.run(event_rx).await;

    info!("Goodbye");
    Ok(())
}
