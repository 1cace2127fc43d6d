//! xdcc-downloader
//!
//! An XDCC CLI downloader: IRC session, CTCP DCC SEND/RESUME/ACCEPT,
//! acknowledged DCC transfers with throttling, and a timeout/retry supervisor.

pub mod pack;
pub mod protocol;
pub mod irc;
pub mod dcc;
pub mod storage;
pub mod supervisor;
pub mod cli;
pub mod error;

pub use error::XdccError;

pub use pack::{parse_pack_numbers, parse_xdcc_message, Pack, Server, DEFAULT_IRC_PORT};
pub use protocol::{CtcpMessage, DccCommand, IrcMessage, IrcWire, LineWire};
pub use irc::{IrcSession, SessionFlags, SessionOutcome, SessionState, User};
pub use dcc::{encode_ack, DccOffer, DccTransfer, Throttle, TransferSnapshot, TransferState};
pub use storage::{FileStorage, MemoryStorage, StorageBackend};
pub use supervisor::{DownloadReport, DownloadStatus, Downloader, TimeoutWatcher, WatchEvent};
pub use cli::{CliArgs, Config, DownloadStats, ProgressDisplay};
