//! CLI arguments module
//!
//! Defines command-line argument parsing using clap.

use clap::Parser;
use std::path::PathBuf;

/// CLI arguments for the XDCC downloader
#[derive(Debug, Parser)]
#[command(name = "xdcc-dl")]
#[command(about = "Download packs from XDCC bots over IRC", long_about = None)]
pub struct CliArgs {
    /// IRC server as host, host:port or irc://host:port
    #[arg(value_name = "SERVER")]
    pub server: String,

    /// Nick of the XDCC bot
    #[arg(value_name = "BOT", required_unless_present = "message")]
    pub bot: Option<String>,

    /// Pack number(s): 5, #5, 1-4, 1,3,9 or 1-10;3
    #[arg(value_name = "PACKS", required_unless_present = "message")]
    pub packs: Option<String>,

    /// Full XDCC message instead of BOT and PACKS, e.g. "/msg BOT xdcc send #1-3"
    #[arg(short, long, conflicts_with_all = ["bot", "packs"])]
    pub message: Option<String>,

    /// Download directory
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub out_dir: PathBuf,

    /// Download rate limit in bytes per second (accepts k, M and G suffixes)
    #[arg(short, long, value_name = "RATE")]
    pub limit: Option<String>,

    /// Seconds to wait for the XDCC request to be sent
    #[arg(short, long, default_value_t = 120)]
    pub timeout: u64,

    /// DCC read timeout in seconds
    #[arg(long, default_value_t = 5)]
    pub dcc_timeout: u64,

    /// Seconds to wait after the bot reports the pack as already requested
    #[arg(long, default_value_t = 60)]
    pub queued_cooldown: u64,

    /// Channel to join when WHOIS reports none (repeatable)
    #[arg(long = "fallback-channel", value_name = "CHANNEL")]
    pub fallback_channels: Vec<String>,

    /// Seconds to wait after joining before sending the request
    #[arg(long, default_value_t = 0)]
    pub wait_time: u64,

    /// Nick to use instead of a random one
    #[arg(long)]
    pub username: Option<String>,

    /// Give up after this many sessions per pack
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Print one JSON report per pack
    #[arg(long)]
    pub json: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Quiet mode (no output except errors)
    #[arg(short, long)]
    pub quiet: bool,
}

impl CliArgs {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Check if quiet mode is enabled
    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    /// Get the log level based on verbosity settings
    pub fn log_level(&self) -> tracing::Level {
        if self.verbose {
            tracing::Level::DEBUG
        } else if self.quiet {
            tracing::Level::ERROR
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let args = CliArgs::try_parse_from(["xdcc-dl", "irc.example.net", "BOT-A", "5"]).unwrap();

        assert_eq!(args.server, "irc.example.net");
        assert_eq!(args.bot.as_deref(), Some("BOT-A"));
        assert_eq!(args.packs.as_deref(), Some("5"));
        assert_eq!(args.out_dir, PathBuf::from("."));
        assert_eq!(args.timeout, 120);
        assert_eq!(args.dcc_timeout, 5);
        assert_eq!(args.queued_cooldown, 60);
        assert!(args.fallback_channels.is_empty());
        assert!(!args.json);
        assert_eq!(args.log_level(), tracing::Level::INFO);
    }

    #[test]
    fn test_message_replaces_bot_and_packs() {
        let args = CliArgs::try_parse_from([
            "xdcc-dl",
            "irc.example.net",
            "--message",
            "/msg BOT xdcc send #1-3",
            "-o",
            "/tmp/dl",
            "--fallback-channel",
            "#a",
            "--fallback-channel",
            "#b",
            "-v",
        ])
        .unwrap();

        assert!(args.bot.is_none());
        assert_eq!(args.message.as_deref(), Some("/msg BOT xdcc send #1-3"));
        assert_eq!(args.fallback_channels, vec!["#a", "#b"]);
        assert_eq!(args.log_level(), tracing::Level::DEBUG);
    }

    #[test]
    fn test_bot_required_without_message() {
        assert!(CliArgs::try_parse_from(["xdcc-dl", "irc.example.net"]).is_err());
        assert!(CliArgs::try_parse_from(["xdcc-dl", "irc.example.net", "BOT"]).is_err());
    }
}
