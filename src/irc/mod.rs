//! IRC session module
//!
//! Registers with the server, locates the bot and drives the XDCC exchange.

pub mod session;
pub mod state;
pub mod user;

pub use session::IrcSession;
pub use state::{SessionFlags, SessionOutcome, SessionState};
pub use user::User;
