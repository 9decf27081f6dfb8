//! insforge-rt: command-line client for the InsForge realtime server.
//!
//! Listens on channels and prints every message as a JSON line,
//! publishes a single event, or shows and saves the config file.

mod args;
mod commands;
mod setup;

use clap::Parser;

use crate::args::{Args, Command, ConfigAction};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = match insforge_config::load_config(args.config.as_deref()) {
        Ok(config) => setup::effective_config(config, args.url.as_deref()),
        Err(e) => {
            eprintln!("insforge-rt: {e}");
            std::process::exit(2);
        }
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| setup::default_filter(config.logging.level).into()),
        )
        .init();

    // Constructing the client does not connect.
    let client = setup::build_client(&config, args.token.clone());

    let result = match &args.command {
        Command::Listen { channels, event } => {
            commands::listen(&client, channels, event.as_deref()).await
        }
        Command::Publish {
            channel,
            event,
            payload,
        } => commands::publish(&client, channel, event, payload).await,
        Command::Config { action } => match action {
            ConfigAction::Show => {
                commands::show_config(&config);
                Ok(())
            }
            ConfigAction::Save => commands::save_config(&config, args.config.as_deref()),
        },
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "Command failed");
        client.disconnect();
        std::process::exit(1);
    }
}
