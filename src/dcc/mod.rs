//! DCC transfer module
//!
//! Receives a file over a direct TCP connection announced by a CTCP
//! `DCC SEND`, acknowledging every chunk with the cumulative byte count.

pub mod state;
pub mod throttle;
pub mod transfer;

// Re-export main types
pub use state::{DccOffer, TransferSnapshot, TransferState};
pub use throttle::Throttle;
pub use transfer::{encode_ack, DccTransfer, ACK_LENGTH, DCC_CHUNK_SIZE};
