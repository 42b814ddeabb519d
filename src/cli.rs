use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "lionchat", about = "Group chat with push notifications (CLI + console)")]
pub struct Cli {
    /// Path to config file (default: ./config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Open the interactive console on a channel
    Run {
        #[arg(long)]
        channel: String,
    },
    /// Send one message and exit
    Send {
        #[arg(long)]
        channel: String,
        #[arg(long)]
        text: Option<String>,
        /// Image file to attach
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// Print the message history of a channel
    History {
        #[arg(long)]
        channel: String,
    },
    /// List channels
    Channels {
        /// Only channels whose name starts with this prefix
        #[arg(long)]
        search: Option<String>,
    },
    /// Create a channel
    CreateChannel { name: String },
}

impl Cli {
    pub fn command_or_default(&self) -> Command {
        self.command
            .clone()
            .unwrap_or(Command::Channels { search: None })
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Command};

    #[test]
    fn defaults_to_channel_list_when_command_is_missing() {
        let cli = Cli::parse_from(["lionchat"]);

        assert_eq!(cli.command_or_default(), Command::Channels { search: None });
    }

    #[test]
    fn parses_run_with_channel_and_config() {
        let cli = Cli::parse_from(["lionchat", "run", "--channel", "c1", "--config", "custom.toml"]);

        assert_eq!(
            cli.command_or_default(),
            Command::Run {
                channel: "c1".to_owned()
            }
        );
        assert_eq!(
            cli.config
                .as_deref()
                .map(|p| p.to_string_lossy().to_string()),
            Some("custom.toml".to_owned())
        );
    }

    #[test]
    fn parses_send_with_text_and_image() {
        let cli = Cli::parse_from([
            "lionchat", "send", "--channel", "c1", "--text", "hi", "--image", "cat.png",
        ]);

        assert_eq!(
            cli.command_or_default(),
            Command::Send {
                channel: "c1".to_owned(),
                text: Some("hi".to_owned()),
                image: Some("cat.png".into()),
            }
        );
    }

    #[test]
    fn parses_create_channel_name() {
        let cli = Cli::parse_from(["lionchat", "create-channel", "General"]);

        assert_eq!(
            cli.command_or_default(),
            Command::CreateChannel {
                name: "General".to_owned()
            }
        );
    }

    #[test]
    fn run_requires_channel() {
        assert!(Cli::try_parse_from(["lionchat", "run"]).is_err());
    }
}
