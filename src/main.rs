//! CLI for meterlink
//!
//! Connects to the configured broker and publishes one reading per line of
//! standard input. Events from the broker are logged.

use std::path::PathBuf;

use clap::Parser;
use meterlink::client::MeterClient;
use meterlink::config::{load_config, load_config_from};
use meterlink::dispatch::ClientEvent;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "meterlink", about = "Stream meter readings to a broker")]
struct Args {
    /// Configuration file (default: config/default.* if present)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Log level: error, warn, info, debug or trace
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    meterlink::utils::logging::init(&args.log_level);

    if let Err(e) = run(args).await {
        error!("Client failed: {}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    if let Ok(path) = dotenvy::dotenv() {
        info!("Loaded environment from {}", path.display());
    }
    let settings = match &args.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };

    let (client, events) = MeterClient::new(settings);
    info!("Meter {} reporting to {}", client.identity(), client.settings().url());
    client.connect()?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let consumer = tokio::spawn(log_events(events));

    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => submit(&client, line.trim()),
                None => {
                    info!("Input closed. Exiting.");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received. Exiting gracefully.");
                break;
            }
        }
    }

    client.disconnect();
    drop(client);
    let _ = consumer.await;
    Ok(())
}

fn submit(client: &MeterClient, line: &str) {
    if line.is_empty() {
        return;
    }
    match line.parse::<f64>() {
        Ok(value) if value.is_finite() => {
            client.send_reading(value);
        }
        _ => warn!("Ignoring input `{line}`: not a reading"),
    }
}

async fn log_events(mut events: mpsc::Receiver<ClientEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            ClientEvent::Connected => info!("Connected to broker"),
            ClientEvent::Disconnected => warn!("Connection to broker lost"),
            ClientEvent::Reading(reading) => {
                let at = reading
                    .recorded_at()
                    .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| "unknown time".to_string());
                info!(
                    "Usage {:.2} | Cost {:.2} | Bill {:.2} | Last update {at}",
                    reading.current_usage, reading.current_cost, reading.total_bill
                );
            }
            ClientEvent::Alert(alert) => warn!("Alert: {}", alert.message),
        }
    }
}
