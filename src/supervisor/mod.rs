//! Retry/timeout supervisor
//!
//! The timeout watcher bounds a session's wait for the XDCC request; the
//! retry loop starts new sessions until the pack is complete.

pub mod retry;
pub mod watcher;

pub use retry::{DownloadReport, DownloadStatus, Downloader};
pub use watcher::{TimeoutWatcher, WatchEvent};
