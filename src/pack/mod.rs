//! Pack descriptor module
//!
//! Identifies what to download: bot, pack number, server, and target directory.

pub mod descriptor;
pub mod parser;
pub mod server;

// Re-export main types
pub use descriptor::Pack;
pub use parser::{parse_pack_numbers, parse_xdcc_message};
pub use server::{Server, DEFAULT_IRC_PORT};
