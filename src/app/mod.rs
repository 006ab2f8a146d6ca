pub mod cli;
pub mod config;
pub mod logging;
pub mod serde_helpers;

pub use cli::Cli;
pub use config::{Config, ConfigError, LogFormat, LogLevel};
pub use logging::init_tracing;

use crate::LOG_TARGET;
use crate::client::Client;
use crate::domain::Event;
use clap::Parser;
use std::process;
use tracing::{error, info};

/// Sends the event described by `cli` and waits for the worker to drain.
pub fn run(cli: Cli) -> Result<uuid::Uuid, Box<dyn std::error::Error + Send + Sync>> {
    let config = match &cli.config.config_file {
        Some(path) => {
            eprintln!("Loading configuration from file: {}", path.display());
            Config::from_file(path)?
        }
        None => cli.config.clone(),
    };

    init_tracing(config.log_level, config.log_format)?;
    info!(target: LOG_TARGET, "Starting sentry-delivery v{}", crate::VERSION);

    let client = Client::new(&config)?;
    info!(
        target: LOG_TARGET,
        "Configuration: server={}, threads={}, async={}",
        client.dsn().server(),
        client.worker().number_of_threads(),
        client.worker().is_async()
    );

    let mut event = Event::from_message(cli.message.clone()).with_level(cli.level);
    for (key, value) in &cli.tags {
        event = event.with_tag(key.clone(), value.clone());
    }
    let attachments = cli.load_attachments()?;

    let result = client.capture_event_with_attachments(event, attachments);
    client.shutdown();

    let event_id = result?;
    info!(target: LOG_TARGET, event_id = %event_id.simple(), "event submitted");
    Ok(event_id)
}

// Main entry point for the binary
pub fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();

    match run(cli) {
        Ok(event_id) => {
            println!("{}", event_id.simple());
            Ok(())
        }
        Err(e) => {
            error!(target: LOG_TARGET, "Delivery failed: {}", e);
            eprintln!("sentry-delivery: {e}");
            process::exit(1);
        }
    }
}
