//! CLI module
//!
//! Command-line interface for the XDCC downloader.

pub mod args;
pub mod config;
pub mod progress;

pub use args::CliArgs;
pub use config::{parse_byte_rate, Config};
pub use progress::{DownloadStats, ProgressDisplay};
