use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "insforge-rt", about = "InsForge realtime command-line client")]
pub struct Args {
    /// Config file (defaults to the platform config directory).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Backend URL, overriding `base_url` from the config file.
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Access token for the socket handshake. Falls back to the anon key.
    #[arg(long, global = true, env = "INSFORGE_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Subscribe to channels and print messages until Ctrl-C.
    Listen {
        #[arg(required = true)]
        channels: Vec<String>,

        /// Only print this event (default: every event).
        #[arg(long)]
        event: Option<String>,
    },
    /// Publish one event to a channel.
    Publish {
        channel: String,
        event: String,
        /// JSON payload.
        payload: String,
    },
    /// Inspect or write the config file.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective config as JSON.
    Show,
    /// Write the effective config back to the config file.
    Save,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_listen_with_filter() {
        let args = Args::try_parse_from([
            "insforge-rt",
            "--url",
            "https://demo.insforge.app",
            "listen",
            "orders:1",
            "lobby",
            "--event",
            "updated",
        ])
        .unwrap();

        assert_eq!(args.url.as_deref(), Some("https://demo.insforge.app"));
        match args.command {
            Command::Listen { channels, event } => {
                assert_eq!(channels, vec!["orders:1", "lobby"]);
                assert_eq!(event.as_deref(), Some("updated"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_publish() {
        let args = Args::try_parse_from([
            "insforge-rt",
            "publish",
            "lobby",
            "chat",
            r#"{"text":"hi"}"#,
            "--config",
            "/tmp/insforge.toml",
        ])
        .unwrap();

        assert_eq!(args.config, Some(PathBuf::from("/tmp/insforge.toml")));
        match args.command {
            Command::Publish {
                channel,
                event,
                payload,
            } => {
                assert_eq!(channel, "lobby");
                assert_eq!(event, "chat");
                assert_eq!(payload, r#"{"text":"hi"}"#);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_config_save_with_overrides() {
        let args = Args::try_parse_from([
            "insforge-rt",
            "config",
            "save",
            "--url",
            "https://demo.insforge.app",
        ])
        .unwrap();

        assert_eq!(args.url.as_deref(), Some("https://demo.insforge.app"));
        assert!(matches!(
            args.command,
            Command::Config {
                action: ConfigAction::Save
            }
        ));
    }

    #[test]
    fn listen_requires_a_channel() {
        assert!(Args::try_parse_from(["insforge-rt", "listen"]).is_err());
    }
}
