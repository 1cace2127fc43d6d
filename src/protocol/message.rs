//! IRC protocol messages
//!
//! Parses and serializes single IRC lines (`[:prefix] COMMAND params [:trailing]`).

use anyhow::Result;
use std::fmt;
use tracing::{error, trace};

use crate::error::XdccError;

/// A single IRC protocol message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrcMessage {
    /// Origin of the message (`nick!user@host` or a server name)
    pub prefix: Option<String>,
    /// Command word or three-digit numeric, upper-cased
    pub command: String,
    /// Parameters; the trailing parameter is the last element
    pub params: Vec<String>,
}

impl IrcMessage {
    /// Create a message without prefix
    pub fn new(command: impl Into<String>, params: Vec<String>) -> Self {
        Self {
            prefix: None,
            command: command.into(),
            params,
        }
    }

    pub fn nick(nick: &str) -> Self {
        Self::new("NICK", vec![nick.to_string()])
    }

    pub fn user(username: &str, realname: &str) -> Self {
        Self::new(
            "USER",
            vec![username.to_string(), "0".to_string(), "*".to_string(), realname.to_string()],
        )
    }

    pub fn join(channel: &str) -> Self {
        Self::new("JOIN", vec![channel.to_string()])
    }

    pub fn whois(nick: &str) -> Self {
        Self::new("WHOIS", vec![nick.to_string()])
    }

    pub fn privmsg(target: &str, text: &str) -> Self {
        Self::new("PRIVMSG", vec![target.to_string(), text.to_string()])
    }

    pub fn notice(target: &str, text: &str) -> Self {
        Self::new("NOTICE", vec![target.to_string(), text.to_string()])
    }

    pub fn ping(token: &str) -> Self {
        Self::new("PING", vec![token.to_string()])
    }

    pub fn pong(token: &str) -> Self {
        Self::new("PONG", vec![token.to_string()])
    }

    pub fn quit(reason: &str) -> Self {
        Self::new("QUIT", vec![reason.to_string()])
    }

    /// Nick part of the prefix, if the message came from a user
    pub fn source_nick(&self) -> Option<&str> {
        let prefix = self.prefix.as_deref()?;
        Some(prefix.split('!').next().unwrap_or(prefix))
    }

    /// Parameter at `index`
    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }

    /// Last parameter (the trailing text of PRIVMSG/NOTICE/ERROR)
    pub fn trailing(&self) -> Option<&str> {
        self.params.last().map(String::as_str)
    }

    /// Whether the command is a numeric reply with this code
    pub fn is_numeric(&self, code: &str) -> bool {
        self.command == code
    }

    /// Parse a line without its CRLF terminator
    pub fn parse(line: &str) -> Result<Self> {
        trace!("Parsing IRC line: {}", line);
        let mut rest = line.trim_end_matches(['\r', '\n']);

        // IRCv3 message tags carry nothing we need
        if rest.starts_with('@') {
            rest = rest.split_once(' ').map(|(_, r)| r).unwrap_or("");
        }
        rest = rest.trim_start();

        let prefix = if let Some(stripped) = rest.strip_prefix(':') {
            let (prefix, remainder) = stripped.split_once(' ').unwrap_or((stripped, ""));
            rest = remainder.trim_start();
            Some(prefix.to_string())
        } else {
            None
        };

        let (command, mut rest) = rest.split_once(' ').unwrap_or((rest, ""));
        if command.is_empty() {
            error!("IRC line without command: {:?}", line);
            return Err(XdccError::protocol_error_with_source("IRC line without command", line).into());
        }

        let mut params = Vec::new();
        loop {
            rest = rest.trim_start_matches(' ');
            if rest.is_empty() {
                break;
            }
            if let Some(trailing) = rest.strip_prefix(':') {
                params.push(trailing.to_string());
                break;
            }
            let (param, remainder) = rest.split_once(' ').unwrap_or((rest, ""));
            params.push(param.to_string());
            rest = remainder;
        }

        Ok(Self {
            prefix,
            command: command.to_ascii_uppercase(),
            params,
        })
    }

    /// Serialize to a wire line without CRLF
    pub fn serialize(&self) -> String {
        let mut line = String::new();
        if let Some(prefix) = &self.prefix {
            line.push(':');
            line.push_str(prefix);
            line.push(' ');
        }
        line.push_str(&self.command);

        let count = self.params.len();
        for (i, param) in self.params.iter().enumerate() {
            line.push(' ');
            let is_last = i + 1 == count;
            if is_last && (param.is_empty() || param.contains(' ') || param.starts_with(':')) {
                line.push(':');
            }
            line.push_str(param);
        }
        line
    }
}

impl fmt::Display for IrcMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}
