//! IRC wire protocol module
//!
//! Implements the RFC 1459 subset an XDCC client needs, plus CTCP/DCC framing.

pub mod ctcp;
pub mod message;
pub mod numeric;
pub mod wire;

// Re-export main types
pub use ctcp::{decode_ipv4, encode_ipv4, tokenize, CtcpMessage, DccCommand, CTCP_DELIMITER};
pub use message::IrcMessage;
pub use wire::{IrcWire, LineWire, read_line, write_line, MAX_LINE_LENGTH};
