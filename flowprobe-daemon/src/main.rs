#![forbid(unsafe_code)]

//! flowprobe receiver daemon.
//!
//! Binds one UDP socket per flowlet port, reassembles the probe stream through
//! a bounded reorder window, and records drop, duplicate and burst statistics
//! to append-only tables. All measurement state lives on a single reactor
//! task; the receive loops only validate and forward.

mod intake;
mod reactor;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tracing::info;

use flowprobe_core::ReceiverConfig;
use flowprobe_telemetry::{Recorder, RecorderConfig, SamplerConfig};
use flowprobe_transport::FlowletListener;

use intake::{Intake, PreambleGate};
use reactor::Reactor;

/// Depth of the arrival queue between the receive loops and the reactor.
const ARRIVAL_QUEUE_DEPTH: usize = 1024;

#[derive(Parser, Debug)]
#[command(version, about = "Measures loss and reordering of a flowlet-split probe stream")]
struct Cli {
    /// First listen port [default: 5678]
    #[arg(long)]
    port: Option<u16>,

    /// Number of consecutive flowlet ports [default: 1]
    #[arg(long)]
    flowlets: Option<u16>,

    /// Reorder window length in slots [default: 1024]
    #[arg(long)]
    window: Option<usize>,

    /// Directory receiving the record tables [default: /tmp/flowprobe]
    #[arg(long)]
    output: Option<PathBuf>,

    /// TOML configuration file; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Logging verbosity (error, warn, info, debug, trace)
    #[arg(long)]
    log_level: Option<String>,
}

fn merged_config(cli: &Cli) -> Result<ReceiverConfig> {
    let mut cfg = match &cli.config {
        Some(path) => ReceiverConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ReceiverConfig::default(),
    };
    if let Some(port) = cli.port {
        cfg.listen_port = port;
    }
    if let Some(flowlets) = cli.flowlets {
        cfg.flowlets = flowlets;
    }
    if let Some(window) = cli.window {
        cfg.window = window;
    }
    if let Some(output) = &cli.output {
        cfg.output_dir = output.clone();
    }
    if let Some(level) = &cli.log_level {
        cfg.log_level = Some(level.clone());
    }
    Ok(cfg)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = merged_config(&cli)?;

    let level = cfg.log_level.clone().unwrap_or_else(|| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .init();

    info!("starting flowprobe receiver v{}", env!("CARGO_PKG_VERSION"));

    let (tx, rx) = mpsc::channel(ARRIVAL_QUEUE_DEPTH);
    let listener =
        FlowletListener::start(cfg.listen_port, cfg.flowlets, Arc::new(PreambleGate::new(tx)))
            .await
            .context("binding flowlet ports")?;

    let recorder = Recorder::create(RecorderConfig {
        dir: cfg.output_dir.clone(),
        ..RecorderConfig::default()
    })
    .context("creating record tables")?;

    let intake = Intake::new(cfg.window, listener.ports().to_vec());
    let sampler_config = SamplerConfig {
        drops_period: Duration::from_secs(cfg.drops_period_secs),
        flows_period: Duration::from_secs(cfg.flows_period_secs),
        flows_offset: Duration::from_secs(cfg.flows_offset_secs),
    };

    Reactor::new(intake, recorder, rx, sampler_config).run().await;
    info!("flowprobe receiver stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config_defaults() {
        let cli = Cli {
            port: Some(7000),
            flowlets: Some(4),
            window: None,
            output: None,
            config: None,
            log_level: None,
        };
        let cfg = merged_config(&cli).unwrap();
        assert_eq!(cfg.listen_port, 7000);
        assert_eq!(cfg.flowlets, 4);
        assert_eq!(cfg.window, 1024);
    }
}
