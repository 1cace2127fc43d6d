//! IRC session state module
//!
//! Session state machine, the flags shared with the timeout watcher, and
//! the result a session hands back to the retry loop.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

/// Where a session is in the XDCC exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Registering with the server
    Connecting,
    /// Welcome received, WHOIS sent for the bot
    WhoisPending,
    /// Joining the bot's channels
    Joining,
    /// Request sent, waiting for `DCC SEND`
    AwaitingCtcp,
    /// `DCC RESUME` sent, waiting for `DCC ACCEPT`
    ResumeRequested,
    /// DCC transfer running
    Receiving,
    /// File complete on disk
    Completed,
    /// Transfer ended short of the announced size
    Incomplete,
    /// Fatal error
    Aborted,
}

impl SessionState {
    /// Whether the session has ended
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Completed | SessionState::Incomplete | SessionState::Aborted)
    }
}

impl Default for SessionState {
    fn default() -> Self {
        SessionState::Connecting
    }
}

/// Flags the timeout watcher reads while the session runs
#[derive(Debug, Default)]
pub struct SessionFlags {
    message_sent: AtomicBool,
    disconnected: AtomicBool,
}

impl SessionFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_message_sent(&self) {
        self.message_sent.store(true, Ordering::SeqCst);
    }

    pub fn mark_disconnected(&self) {
        self.disconnected.store(true, Ordering::SeqCst);
    }

    pub fn message_sent(&self) -> bool {
        self.message_sent.load(Ordering::SeqCst)
    }

    pub fn disconnected(&self) -> bool {
        self.disconnected.load(Ordering::SeqCst)
    }

    /// Nothing left for the watcher to do
    pub fn is_settled(&self) -> bool {
        self.message_sent() || self.disconnected()
    }
}

/// How a session ended when it did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The whole file is on disk
    Completed { path: PathBuf, bytes: u64 },
    /// The file on disk was already at least as large as the offer
    AlreadyDownloaded { path: PathBuf, bytes: u64 },
    /// The peer went away early, or the bot never accepted a resume
    Incomplete {
        path: Option<PathBuf>,
        progress: u64,
        filesize: u64,
    },
    /// The bot refused a duplicate request
    PackAlreadyRequested,
}

impl SessionOutcome {
    /// Whether the pack is fully downloaded
    pub fn is_success(&self) -> bool {
        matches!(self, SessionOutcome::Completed { .. } | SessionOutcome::AlreadyDownloaded { .. })
    }

    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            SessionOutcome::Completed { path, .. } | SessionOutcome::AlreadyDownloaded { path, .. } => Some(path),
            SessionOutcome::Incomplete { path, .. } => path.as_ref(),
            SessionOutcome::PackAlreadyRequested => None,
        }
    }

    /// Bytes on disk when the session ended
    pub fn bytes(&self) -> u64 {
        match self {
            SessionOutcome::Completed { bytes, .. } | SessionOutcome::AlreadyDownloaded { bytes, .. } => *bytes,
            SessionOutcome::Incomplete { progress, .. } => *progress,
            SessionOutcome::PackAlreadyRequested => 0,
        }
    }
}

/// Strip membership prefixes (`@ + % ~ & !`) from a `319` channel entry
///
/// `&` is only a prefix when a channel name follows it, since `&chan` is
/// itself a valid local channel.
pub fn strip_channel_prefix(entry: &str) -> &str {
    let mut rest = entry;
    while let Some(c) = rest.chars().next() {
        let next_is_channel = rest[c.len_utf8()..].starts_with(['#', '&']);
        match c {
            '@' | '+' | '%' | '~' | '!' => rest = &rest[1..],
            '&' if next_is_channel => rest = &rest[1..],
            _ => break,
        }
    }
    rest
}

/// Queue position announced in a bot notice, e.g. "Queued 2h for pack 5, in position 3 of 10"
pub fn parse_queue_position(notice: &str) -> Option<u32> {
    let lower = notice.to_ascii_lowercase();
    if !lower.contains("queue") {
        return None;
    }
    let start = lower.find("position")? + "position".len();
    lower[start..]
        .split(|c: char| !c.is_ascii_digit())
        .find(|part| !part.is_empty())
        .and_then(|digits| digits.parse().ok())
}

/// Whether a notice says the pack was requested before
pub fn is_already_requested(notice: &str) -> bool {
    notice.to_ascii_lowercase().contains("already requested")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags() {
        let flags = SessionFlags::new();
        assert!(!flags.is_settled());
        flags.mark_message_sent();
        assert!(flags.message_sent());
        assert!(flags.is_settled());
        assert!(!flags.disconnected());
    }

    #[test]
    fn test_state_terminal() {
        assert!(!SessionState::default().is_terminal());
        assert!(SessionState::Incomplete.is_terminal());
        assert!(!SessionState::Receiving.is_terminal());
    }

    #[test]
    fn test_strip_channel_prefix() {
        assert_eq!(strip_channel_prefix("@#chan"), "#chan");
        assert_eq!(strip_channel_prefix("@+#chan"), "#chan");
        assert_eq!(strip_channel_prefix("~&local"), "&local");
        assert_eq!(strip_channel_prefix("&local"), "&local");
        assert_eq!(strip_channel_prefix("#plain"), "#plain");
    }

    #[test]
    fn test_parse_queue_position() {
        assert_eq!(parse_queue_position("Queued 0h2m for \"a.bin\", in position 3 of 10."), Some(3));
        assert_eq!(parse_queue_position("You have been queued, position: 12"), Some(12));
        assert_eq!(parse_queue_position("Sending you pack #1"), None);
    }

    #[test]
    fn test_already_requested() {
        assert!(is_already_requested("You already requested this pack"));
        assert!(is_already_requested("** You ALREADY REQUESTED that pack"));
        assert!(!is_already_requested("Sending you pack #1"));
    }

    #[test]
    fn test_outcome_accessors() {
        let outcome = SessionOutcome::Incomplete {
            path: Some(PathBuf::from("/tmp/a.bin")),
            progress: 40,
            filesize: 100,
        };
        assert!(!outcome.is_success());
        assert_eq!(outcome.bytes(), 40);
        assert!(SessionOutcome::Completed { path: PathBuf::from("a"), bytes: 1 }.is_success());
        assert_eq!(SessionOutcome::PackAlreadyRequested.path(), None);
    }
}
