//! XDCC pack descriptor

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::XdccError;
use crate::pack::parser::parse_xdcc_message;
use crate::pack::server::Server;

/// A numbered file offered by an XDCC bot
///
/// Everything except `filename` is fixed at construction. The filename is
/// learned from the bot's `DCC SEND` offer and never reassigned afterwards,
/// so retries keep writing to the same file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pack {
    bot_nick: String,
    pack_number: u64,
    server: Server,
    target_directory: PathBuf,
    filename: Option<String>,
}

impl Pack {
    /// Create a new pack descriptor
    pub fn new(
        bot_nick: impl Into<String>,
        pack_number: u64,
        server: Server,
        target_directory: impl Into<PathBuf>,
    ) -> Result<Self, XdccError> {
        let bot_nick = bot_nick.into();
        if bot_nick.trim().is_empty() || bot_nick.contains(char::is_whitespace) {
            return Err(XdccError::validation_error_with_field(
                format!("Invalid bot nick '{}'", bot_nick),
                "bot",
            ));
        }
        if pack_number == 0 {
            return Err(XdccError::validation_error_with_field("Pack number must be positive", "pack"));
        }

        Ok(Self {
            bot_nick,
            pack_number,
            server,
            target_directory: target_directory.into(),
            filename: None,
        })
    }

    /// Build one pack per number named in an XDCC message such as
    /// `/msg BOT xdcc send #1-3`
    pub fn from_xdcc_message(
        message: &str,
        server: Server,
        target_directory: impl Into<PathBuf>,
    ) -> Result<Vec<Self>, XdccError> {
        let (bot, numbers) = parse_xdcc_message(message)?;
        let target_directory = target_directory.into();
        numbers
            .into_iter()
            .map(|n| Self::new(bot.clone(), n, server.clone(), target_directory.clone()))
            .collect()
    }

    /// The request sent to the bot
    pub fn request_message(&self) -> String {
        format!("XDCC SEND {}", self.pack_number)
    }

    /// Target directory joined with the discovered filename
    pub fn filepath(&self) -> Result<PathBuf, XdccError> {
        match &self.filename {
            Some(name) => Ok(self.target_directory.join(name)),
            None => Err(XdccError::validation_error_with_field(
                format!("Filename of pack #{} is not known yet", self.pack_number),
                "filename",
            )),
        }
    }

    /// Record the filename announced by the bot
    ///
    /// Only the final path component of `announced` is kept. Returns the
    /// filename in effect afterwards, which is the first one ever assigned.
    pub fn assign_filename(&mut self, announced: &str) -> Result<&str, XdccError> {
        let sanitized = sanitize_filename(announced)?;
        match &self.filename {
            Some(existing) if *existing != sanitized => {
                warn!(
                    "Bot announced '{}' but pack #{} is already bound to '{}'",
                    sanitized, self.pack_number, existing
                );
            }
            Some(_) => {}
            None => {
                debug!("Pack #{} filename: {}", self.pack_number, sanitized);
                self.filename = Some(sanitized);
            }
        }
        Ok(self.filename.as_deref().unwrap_or_default())
    }

    pub fn bot_nick(&self) -> &str {
        &self.bot_nick
    }

    pub fn pack_number(&self) -> u64 {
        self.pack_number
    }

    pub fn server(&self) -> &Server {
        &self.server
    }

    pub fn target_directory(&self) -> &Path {
        &self.target_directory
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }
}

/// Strip any directory components a bot may put into a DCC filename
fn sanitize_filename(announced: &str) -> Result<String, XdccError> {
    let name = announced
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or_default()
        .trim();

    if name.is_empty() || name == "." || name == ".." {
        return Err(XdccError::invalid_ctcp_with_payload("Unusable DCC filename", announced));
    }
    Ok(name.to_string())
}
