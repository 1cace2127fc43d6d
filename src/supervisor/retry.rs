//! Retry loop
//!
//! Re-drives IRC sessions for a pack until it is on disk or a terminal
//! failure occurs. The partial file left by an incomplete session is the
//! resume offset for the next one.

use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::cli::Config;
use crate::dcc::TransferSnapshot;
use crate::error::XdccError;
use crate::irc::{IrcSession, SessionOutcome};
use crate::pack::Pack;

/// Pause before reconnecting after a network failure
const NETWORK_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Final status of one pack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStatus {
    Completed,
    AlreadyDownloaded,
    Failed,
}

/// Summary of one pack download, printed as JSON with `--json`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DownloadReport {
    pub bot: String,
    pub pack: u64,
    pub path: Option<PathBuf>,
    pub status: DownloadStatus,
    pub reason: Option<String>,
    pub attempts: u32,
    pub bytes: u64,
    pub elapsed_secs: u64,
}

impl DownloadReport {
    fn success(pack: &Pack, outcome: &SessionOutcome, attempts: u32, elapsed: Duration) -> Self {
        let status = match outcome {
            SessionOutcome::AlreadyDownloaded { .. } => DownloadStatus::AlreadyDownloaded,
            _ => DownloadStatus::Completed,
        };
        Self {
            bot: pack.bot_nick().to_string(),
            pack: pack.pack_number(),
            path: outcome.path().cloned(),
            status,
            reason: None,
            attempts,
            bytes: outcome.bytes(),
            elapsed_secs: elapsed.as_secs(),
        }
    }

    fn failure(pack: &Pack, error: &XdccError, attempts: u32, elapsed: Duration) -> Self {
        Self {
            bot: pack.bot_nick().to_string(),
            pack: pack.pack_number(),
            path: pack.filepath().ok(),
            status: DownloadStatus::Failed,
            reason: Some(error.reason()),
            attempts,
            bytes: 0,
            elapsed_secs: elapsed.as_secs(),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.status != DownloadStatus::Failed
    }

    pub fn to_json(&self) -> Result<String, XdccError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Drives packs to completion, one session at a time
pub struct Downloader {
    config: Arc<Config>,
    cancel: CancellationToken,
    progress_tx: Option<watch::Sender<TransferSnapshot>>,
}

impl Downloader {
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            cancel: CancellationToken::new(),
            progress_tx: None,
        }
    }

    /// Abort the running session and stop retrying when `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress(mut self, progress_tx: watch::Sender<TransferSnapshot>) -> Self {
        self.progress_tx = Some(progress_tx);
        self
    }

    /// Download one pack, retrying as long as progress is possible
    pub async fn download(&self, pack: &mut Pack) -> Result<DownloadReport, XdccError> {
        let started = Instant::now();
        let mut attempts = 0;
        let result = self.retry_loop(pack, &mut attempts).await;
        let elapsed = started.elapsed();

        match result {
            Ok(outcome) => {
                info!("download completed in {} seconds", elapsed.as_secs());
                Ok(DownloadReport::success(pack, &outcome, attempts, elapsed))
            }
            Err(e) => {
                error!("download failed: {}", e.reason());
                Err(e)
            }
        }
    }

    /// Download packs in order, one report each
    pub async fn download_all(&self, packs: Vec<Pack>) -> Vec<DownloadReport> {
        let mut reports = Vec::with_capacity(packs.len());

        for mut pack in packs {
            if self.cancel.is_cancelled() {
                warn!("Skipping pack #{} after cancellation", pack.pack_number());
                break;
            }

            let started = Instant::now();
            let mut attempts = 0;
            let result = self.retry_loop(&mut pack, &mut attempts).await;
            let elapsed = started.elapsed();

            let report = match result {
                Ok(outcome) => {
                    info!("download completed in {} seconds", elapsed.as_secs());
                    DownloadReport::success(&pack, &outcome, attempts, elapsed)
                }
                Err(e) => {
                    error!("download failed: {}", e.reason());
                    DownloadReport::failure(&pack, &e, attempts, elapsed)
                }
            };
            reports.push(report);
        }

        reports
    }

    async fn retry_loop(&self, pack: &mut Pack, attempts: &mut u32) -> Result<SessionOutcome, XdccError> {
        let mut network_failures = 0u32;
        let mut queued_before = false;

        loop {
            if let Some(max) = self.config.max_attempts {
                if *attempts >= max {
                    return Err(XdccError::unrecoverable(format!("gave up after {} attempts", max)));
                }
            }
            *attempts += 1;
            info!(
                "Attempt {} for pack #{} from {} on {}",
                attempts,
                pack.pack_number(),
                pack.bot_nick(),
                pack.server()
            );

            let mut session = IrcSession::new(pack, self.config.clone()).with_cancellation(self.cancel.child_token());
            if let Some(tx) = &self.progress_tx {
                session = session.with_progress(tx.clone());
            }

            match session.run().await {
                Ok(outcome @ (SessionOutcome::Completed { .. } | SessionOutcome::AlreadyDownloaded { .. })) => {
                    return Ok(outcome);
                }
                Ok(SessionOutcome::PackAlreadyRequested) => {
                    network_failures = 0;
                    if queued_before {
                        return Err(XdccError::already_queued(pack.bot_nick(), pack.pack_number()));
                    }
                    queued_before = true;
                    warn!(
                        "Pack #{} already queued, retrying in {}s",
                        pack.pack_number(),
                        self.config.queued_cooldown.as_secs()
                    );
                    self.pause(self.config.queued_cooldown).await?;
                }
                Ok(SessionOutcome::Incomplete { progress, filesize, .. }) => {
                    network_failures = 0;
                    queued_before = false;
                    info!("Download incomplete ({} of {} bytes), retrying", progress, filesize);
                }
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e @ XdccError::NetworkError { .. }) => {
                    network_failures += 1;
                    if network_failures >= self.config.max_connect_failures {
                        return Err(XdccError::unrecoverable_with_source("connection failed repeatedly", e.to_string()));
                    }
                    warn!(
                        "{} ({} of {} allowed), retrying",
                        e, network_failures, self.config.max_connect_failures
                    );
                    self.pause(NETWORK_RETRY_DELAY).await?;
                }
                Err(e) => {
                    network_failures = 0;
                    queued_before = false;
                    warn!("{}, retrying", e);
                }
            }
        }
    }

    async fn pause(&self, duration: Duration) -> Result<(), XdccError> {
        debug!("Sleeping {:?} before the next attempt", duration);
        tokio::select! {
            _ = self.cancel.cancelled() => Err(XdccError::unrecoverable("interrupted")),
            _ = sleep(duration) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pack::Server;
    use tempfile::TempDir;
    use tokio::net::TcpListener;

    #[test]
    fn test_report_json() {
        let pack = Pack::new("BOT-A", 1, Server::new("irc.example.net"), "/tmp/dl").unwrap();
        let outcome = SessionOutcome::Completed {
            path: PathBuf::from("/tmp/dl/a.bin"),
            bytes: 100,
        };
        let report = DownloadReport::success(&pack, &outcome, 2, Duration::from_secs(7));
        assert!(report.succeeded());

        let json = report.to_json().unwrap();
        assert!(json.contains("\"status\":\"completed\""));
        assert!(json.contains("\"bot\":\"BOT-A\""));
        assert!(json.contains("\"attempts\":2"));
        assert!(json.contains("\"elapsed_secs\":7"));
    }

    #[test]
    fn test_failure_report_reason() {
        let pack = Pack::new("GHOST", 3, Server::new("irc.example.net"), "/tmp/dl").unwrap();
        let report = DownloadReport::failure(&pack, &XdccError::bot_not_found("GHOST"), 1, Duration::ZERO);
        assert!(!report.succeeded());
        assert_eq!(report.reason.as_deref(), Some("bot does not exist"));
        assert_eq!(report.path, None);
    }

    #[tokio::test]
    async fn test_refused_connections_are_unrecoverable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let dir = TempDir::new().unwrap();
        let mut pack = Pack::new("BOT", 1, Server::with_port("127.0.0.1", port), dir.path()).unwrap();
        let downloader = Downloader::new(Arc::new(Config::default()));

        let reports = downloader.download_all(vec![pack.clone()]).await;
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].attempts, 3);
        assert_eq!(reports[0].reason.as_deref(), Some("unrecoverable (connection failed repeatedly)"));

        let result = downloader.download(&mut pack).await;
        assert!(matches!(result, Err(XdccError::Unrecoverable { .. })));
    }

    #[tokio::test]
    async fn test_max_attempts_bounds_sessions() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let dir = TempDir::new().unwrap();
        let pack = Pack::new("BOT", 1, Server::with_port("127.0.0.1", port), dir.path()).unwrap();
        let config = Config {
            max_attempts: Some(2),
            ..Config::default()
        };
        let reports = Downloader::new(Arc::new(config)).download_all(vec![pack]).await;
        assert_eq!(reports[0].attempts, 2);
        assert_eq!(reports[0].reason.as_deref(), Some("unrecoverable (gave up after 2 attempts)"));
    }

    #[tokio::test]
    async fn test_cancelled_downloader_skips_packs() {
        let dir = TempDir::new().unwrap();
        let pack = Pack::new("BOT", 1, Server::new("127.0.0.1"), dir.path()).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let downloader = Downloader::new(Arc::new(Config::default())).with_cancellation(cancel);
        assert!(downloader.download_all(vec![pack]).await.is_empty());
    }
}
