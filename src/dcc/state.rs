//! DCC transfer state

use serde::Serialize;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use crate::protocol::DccCommand;

/// A file offer announced by `DCC SEND`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DccOffer {
    pub filename: String,
    pub address: Ipv4Addr,
    pub port: u16,
    pub filesize: u64,
}

impl DccOffer {
    /// Build an offer from a parsed `DCC SEND`; other verbs yield `None`
    pub fn from_command(command: &DccCommand) -> Option<Self> {
        match command {
            DccCommand::Send { filename, address, port, filesize } => Some(Self {
                filename: filename.clone(),
                address: *address,
                port: *port,
                filesize: *filesize,
            }),
            _ => None,
        }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(self.address, self.port))
    }
}

/// Progress of one DCC connection
///
/// `progress` counts bytes on disk, including any resume offset. It only
/// grows, and never past `filesize`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferState {
    pub filesize: u64,
    pub progress: u64,
    pub peer_address: Ipv4Addr,
    pub peer_port: u16,
    pub started: bool,
    pub completed: bool,
}

impl TransferState {
    /// State for an offer, continuing at `resume_offset`
    pub fn new(offer: &DccOffer, resume_offset: u64) -> Self {
        Self {
            filesize: offer.filesize,
            progress: resume_offset.min(offer.filesize),
            peer_address: offer.address,
            peer_port: offer.port,
            started: false,
            completed: false,
        }
    }

    pub fn remaining(&self) -> u64 {
        self.filesize - self.progress
    }

    /// How many of `received` bytes fit before reaching `filesize`
    pub fn acceptable(&self, received: usize) -> usize {
        (received as u64).min(self.remaining()) as usize
    }

    /// Account for `bytes` written to storage
    pub fn record(&mut self, bytes: usize) {
        self.progress = (self.progress + bytes as u64).min(self.filesize);
    }

    pub fn is_complete(&self) -> bool {
        self.progress >= self.filesize
    }

    /// Percentage done, 100.0 for empty files
    pub fn percentage(&self) -> f64 {
        if self.filesize == 0 {
            return 100.0;
        }
        self.progress as f64 / self.filesize as f64 * 100.0
    }
}

/// Point-in-time view published to progress displays
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransferSnapshot {
    pub filename: String,
    pub progress: u64,
    pub filesize: u64,
    pub bytes_per_sec: f64,
}

impl TransferSnapshot {
    /// Fraction done (0.0 to 1.0)
    pub fn fraction(&self) -> f64 {
        if self.filesize == 0 {
            return 1.0;
        }
        self.progress as f64 / self.filesize as f64
    }
}
