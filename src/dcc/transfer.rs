//! DCC receive loop
//!
//! Connects to the peer announced in a `DCC SEND`, appends every chunk to
//! storage and answers it with an 8-byte big-endian acknowledgement of the
//! total bytes on disk. Writes and acks are strictly interleaved.

use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::time::{timeout, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::dcc::state::{DccOffer, TransferSnapshot, TransferState};
use crate::dcc::throttle::Throttle;
use crate::error::XdccError;
use crate::storage::StorageBackend;

/// Read buffer size
pub const DCC_CHUNK_SIZE: usize = 16 * 1024;

/// Size of one acknowledgement on the wire
pub const ACK_LENGTH: usize = 8;

/// Cumulative byte count as sent back to the peer
pub fn encode_ack(progress: u64) -> [u8; ACK_LENGTH] {
    progress.to_be_bytes()
}

/// One DCC file transfer
pub struct DccTransfer<S: StorageBackend> {
    offer: DccOffer,
    storage: S,
    state: TransferState,
    throttle: Throttle,
    connect_timeout: Duration,
    read_timeout: Duration,
    cancel: CancellationToken,
    progress_tx: Option<watch::Sender<TransferSnapshot>>,
}

impl<S: StorageBackend> DccTransfer<S> {
    /// Create a transfer that continues at `resume_offset` (0 for a fresh file)
    pub fn new(offer: DccOffer, storage: S, resume_offset: u64) -> Self {
        let state = TransferState::new(&offer, resume_offset);
        Self {
            offer,
            storage,
            state,
            throttle: Throttle::unlimited(),
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(5),
            cancel: CancellationToken::new(),
            progress_tx: None,
        }
    }

    pub fn with_throttle(mut self, throttle: Throttle) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn with_timeouts(mut self, connect_timeout: Duration, read_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self.read_timeout = read_timeout;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress(mut self, progress_tx: watch::Sender<TransferSnapshot>) -> Self {
        self.progress_tx = Some(progress_tx);
        self
    }

    pub fn state(&self) -> &TransferState {
        &self.state
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Run the transfer until the peer disconnects, the file is complete,
    /// a read times out, or the transfer is cancelled
    ///
    /// Network trouble after connecting ends the transfer normally; the
    /// returned state tells whether the file is complete. Storage failures
    /// and a failed connect are errors.
    pub async fn run(&mut self) -> Result<TransferState, XdccError> {
        let addr = self.offer.socket_addr();
        info!("Connecting to DCC peer {} for '{}'", addr, self.offer.filename);

        let mut stream = timeout(self.connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|e| {
                warn!("DCC connection timeout to {}", addr);
                XdccError::network_error_full("DCC connection timeout", addr.to_string(), e.to_string())
            })?
            .map_err(|e| {
                error!("Failed to connect to DCC peer {}: {}", addr, e);
                XdccError::network_error_full("Failed to connect to DCC peer", addr.to_string(), e.to_string())
            })?;

        self.storage.open(self.state.progress).await.map_err(|e| {
            error!("Failed to open storage for '{}': {}", self.offer.filename, e);
            XdccError::storage_error_full("Failed to open storage", self.offer.filename.clone(), e.to_string())
        })?;
        self.state.started = true;
        let meta = self.storage.metadata();
        debug!(
            "Writing '{}' to {:?} storage {:?} from byte {}",
            self.offer.filename, meta.storage_type, meta.path, meta.stored_len
        );

        let received = self.receive(&mut stream).await;

        // Flush before reporting anything so that a retry sees every byte
        let finished = self.storage.finish().await;
        let _ = stream.shutdown().await;

        received?;
        finished.map_err(|e| {
            error!("Failed to finalize '{}': {}", self.offer.filename, e);
            XdccError::storage_error_full("Failed to finalize storage", self.offer.filename.clone(), e.to_string())
        })?;

        self.state.completed = self.state.is_complete();
        info!(
            "DCC transfer of '{}' ended at {} / {} bytes",
            self.offer.filename, self.state.progress, self.state.filesize
        );
        Ok(self.state.clone())
    }

    async fn receive(&mut self, stream: &mut TcpStream) -> Result<(), XdccError> {
        let mut buf = vec![0u8; DCC_CHUNK_SIZE];
        let session_start = Instant::now();
        let session_offset = self.state.progress;
        self.throttle.reset();

        while !self.state.is_complete() {
            let n = tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("DCC transfer cancelled");
                    break;
                }
                read = timeout(self.read_timeout, stream.read(&mut buf)) => match read {
                    Err(_) => {
                        warn!("DCC read timed out after {:?}", self.read_timeout);
                        break;
                    }
                    Ok(Err(e)) => {
                        warn!("DCC read failed: {}", e);
                        break;
                    }
                    Ok(Ok(0)) => {
                        debug!("DCC peer closed the connection");
                        break;
                    }
                    Ok(Ok(n)) => n,
                },
            };

            let accepted = self.state.acceptable(n);
            if accepted < n {
                warn!("Peer sent {} bytes past the announced size, dropping them", n - accepted);
            }

            self.storage.write_chunk(&buf[..accepted]).await.map_err(|e| {
                error!("Failed to write chunk of '{}': {}", self.offer.filename, e);
                XdccError::storage_error_full("Failed to write chunk", self.offer.filename.clone(), e.to_string())
            })?;
            self.state.record(accepted);
            self.report_progress(session_start, session_offset);

            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("DCC transfer cancelled while throttled");
                    break;
                }
                _ = self.throttle.wait(accepted) => {}
            }

            let ack = encode_ack(self.state.progress);
            if let Err(e) = stream.write_all(&ack).await {
                warn!("Failed to send DCC acknowledgement: {}", e);
                break;
            }
            trace!("Sent ack {}", hex::encode(ack));
        }

        Ok(())
    }

    fn report_progress(&self, session_start: Instant, session_offset: u64) {
        let elapsed = session_start.elapsed().as_secs_f64();
        let received = self.state.progress - session_offset;
        let bytes_per_sec = if elapsed > 0.0 { received as f64 / elapsed } else { 0.0 };

        debug!(
            "{}: {} / {} bytes ({:.1}%)",
            self.offer.filename,
            self.state.progress,
            self.state.filesize,
            self.state.percentage()
        );

        if let Some(tx) = &self.progress_tx {
            let _ = tx.send(TransferSnapshot {
                filename: self.offer.filename.clone(),
                progress: self.state.progress,
                filesize: self.state.filesize,
                bytes_per_sec,
            });
        }
    }
}
