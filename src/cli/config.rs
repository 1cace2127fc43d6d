//! CLI configuration module
//!
//! Manages configuration for the CLI application and the library.

use crate::cli::args::CliArgs;
use crate::error::XdccError;
use anyhow::Result;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the XDCC downloader
#[derive(Debug, Clone)]
pub struct Config {
    /// Download directory
    pub output_dir: PathBuf,
    /// Rate limit in bytes per second, `None` for unlimited
    pub download_limit: Option<u64>,
    /// Budget for getting the XDCC request out
    pub timeout: Duration,
    /// Time the server gets to answer the watcher's PING
    pub ping_grace: Duration,
    /// DCC read timeout, also the wait for `DCC ACCEPT`
    pub dcc_timeout: Duration,
    /// TCP connect timeout for IRC and DCC
    pub connect_timeout: Duration,
    /// Sleep after an "already requested" notice
    pub queued_cooldown: Duration,
    /// Channels joined when WHOIS reports none
    pub fallback_channels: Vec<String>,
    /// Delay between joining and sending the request
    pub wait_time: Duration,
    /// Fixed nick, random when unset
    pub username: Option<String>,
    /// Upper bound on sessions per pack
    pub max_attempts: Option<u32>,
    /// Consecutive network failures before giving up
    pub max_connect_failures: u32,
    /// Verbose output
    pub verbose: bool,
    /// Quiet mode
    pub quiet: bool,
    /// JSON reports
    pub json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            download_limit: None,
            timeout: Duration::from_secs(120),
            ping_grace: Duration::from_secs(2),
            dcc_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(10),
            queued_cooldown: Duration::from_secs(60),
            fallback_channels: Vec::new(),
            wait_time: Duration::ZERO,
            username: None,
            max_attempts: None,
            max_connect_failures: 3,
            verbose: false,
            quiet: false,
            json: false,
        }
    }
}

impl Config {
    /// Create configuration from CLI arguments
    pub fn from_args(args: &CliArgs) -> Result<Self> {
        let download_limit = args.limit.as_deref().map(parse_byte_rate).transpose()?;

        Ok(Self {
            output_dir: args.out_dir.clone(),
            download_limit,
            timeout: Duration::from_secs(args.timeout),
            dcc_timeout: Duration::from_secs(args.dcc_timeout),
            queued_cooldown: Duration::from_secs(args.queued_cooldown),
            fallback_channels: args.fallback_channels.iter().map(|c| normalize_channel(c)).collect(),
            wait_time: Duration::from_secs(args.wait_time),
            username: args.username.clone(),
            max_attempts: args.max_attempts,
            verbose: args.verbose,
            quiet: args.quiet,
            json: args.json,
            ..Self::default()
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.output_dir.as_os_str().is_empty() {
            return Err(XdccError::config_error_with_field("output_dir cannot be empty", "out_dir").into());
        }

        if self.timeout.is_zero() {
            return Err(XdccError::config_error_with_field("timeout must be at least 1 second", "timeout").into());
        }

        if self.dcc_timeout.is_zero() {
            return Err(XdccError::config_error_with_field("dcc_timeout must be at least 1 second", "dcc_timeout").into());
        }

        // The watcher only stops once the request is out
        if self.wait_time >= self.timeout {
            return Err(XdccError::config_error_with_field("wait_time must be shorter than timeout", "wait_time").into());
        }

        if self.max_attempts == Some(0) {
            return Err(XdccError::config_error_with_field("max_attempts must be at least 1", "max_attempts").into());
        }

        if let Some(nick) = &self.username {
            if nick.is_empty() || nick.contains(char::is_whitespace) || nick.starts_with(char::is_numeric) {
                return Err(XdccError::config_error_with_field(format!("Invalid nick '{}'", nick), "username").into());
            }
        }

        if self.fallback_channels.iter().any(|c| c.len() < 2 || c.contains(char::is_whitespace)) {
            return Err(XdccError::config_error_with_field("Invalid fallback channel", "fallback_channel").into());
        }

        Ok(())
    }

    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Check if quiet mode is enabled
    pub fn is_quiet(&self) -> bool {
        self.quiet
    }
}

/// Parse a rate such as `1000`, `500k`, `2M` or `1G` (1024-based)
pub fn parse_byte_rate(input: &str) -> Result<u64> {
    let trimmed = input.trim();
    let (digits, multiplier) = match trimmed.char_indices().last() {
        Some((i, 'k' | 'K')) => (&trimmed[..i], 1024),
        Some((i, 'm' | 'M')) => (&trimmed[..i], 1024 * 1024),
        Some((i, 'g' | 'G')) => (&trimmed[..i], 1024 * 1024 * 1024),
        _ => (trimmed, 1),
    };

    let value: u64 = digits
        .trim()
        .parse()
        .map_err(|_| XdccError::config_error_with_field(format!("Invalid rate '{}'", input), "limit"))?;

    value
        .checked_mul(multiplier)
        .ok_or_else(|| XdccError::config_error_with_field(format!("Rate '{}' is too large", input), "limit").into())
}

fn normalize_channel(channel: &str) -> String {
    let channel = channel.trim();
    if channel.starts_with(['#', '&']) {
        channel.to_string()
    } else {
        format!("#{}", channel)
    }
}
