//! Error types for the XDCC downloader
//!
//! This module defines the error taxonomy shared by the IRC session,
//! the DCC transfer, and the retry supervisor.

use std::fmt;

/// Comprehensive error type for XDCC operations
#[derive(Debug, Clone)]
pub enum XdccError {
    /// Malformed IRC traffic
    ProtocolError {
        message: String,
        source: Option<String>,
    },

    /// Well-formed CTCP carrying a DCC verb or arguments we cannot honour
    InvalidCtcp {
        message: String,
        payload: Option<String>,
    },

    /// Network errors (IRC server or DCC peer)
    NetworkError {
        message: String,
        address: Option<String>,
        source: Option<String>,
    },

    /// File I/O and storage errors
    StorageError {
        message: String,
        path: Option<String>,
        source: Option<String>,
    },

    /// Configuration errors
    ConfigError {
        message: String,
        field: Option<String>,
    },

    /// Validation errors (pack numbers, server strings, filenames)
    ValidationError {
        message: String,
        field: Option<String>,
    },

    /// The server answered WHOIS with NOSUCHNICK
    BotNotFound {
        bot: String,
    },

    /// The bot refused a duplicate request for the same pack
    AlreadyQueued {
        bot: String,
        pack: u64,
    },

    /// No XDCC request could be sent within the timeout budget
    Timeout {
        message: String,
        elapsed_secs: Option<u64>,
    },

    /// Server ERROR, ban, or repeated connection failures
    Unrecoverable {
        message: String,
        source: Option<String>,
    },
}

impl XdccError {
    /// Create a new ProtocolError
    pub fn protocol_error(message: impl Into<String>) -> Self {
        XdccError::ProtocolError {
            message: message.into(),
            source: None,
        }
    }

    /// Create a new ProtocolError with source
    pub fn protocol_error_with_source(message: impl Into<String>, source: impl Into<String>) -> Self {
        XdccError::ProtocolError {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a new InvalidCtcp error
    pub fn invalid_ctcp(message: impl Into<String>) -> Self {
        XdccError::InvalidCtcp {
            message: message.into(),
            payload: None,
        }
    }

    /// Create a new InvalidCtcp error carrying the offending payload
    pub fn invalid_ctcp_with_payload(message: impl Into<String>, payload: impl Into<String>) -> Self {
        XdccError::InvalidCtcp {
            message: message.into(),
            payload: Some(payload.into()),
        }
    }

    /// Create a new NetworkError
    pub fn network_error(message: impl Into<String>) -> Self {
        XdccError::NetworkError {
            message: message.into(),
            address: None,
            source: None,
        }
    }

    /// Create a new NetworkError with address and source
    pub fn network_error_full(message: impl Into<String>, address: impl Into<String>, source: impl Into<String>) -> Self {
        XdccError::NetworkError {
            message: message.into(),
            address: Some(address.into()),
            source: Some(source.into()),
        }
    }

    /// Create a new StorageError with path
    pub fn storage_error_with_path(message: impl Into<String>, path: impl Into<String>) -> Self {
        XdccError::StorageError {
            message: message.into(),
            path: Some(path.into()),
            source: None,
        }
    }

    /// Create a new StorageError with path and source
    pub fn storage_error_full(message: impl Into<String>, path: impl Into<String>, source: impl Into<String>) -> Self {
        XdccError::StorageError {
            message: message.into(),
            path: Some(path.into()),
            source: Some(source.into()),
        }
    }

    /// Create a new ConfigError with field
    pub fn config_error_with_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        XdccError::ConfigError {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a new ValidationError with field
    pub fn validation_error_with_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        XdccError::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a new BotNotFound error
    pub fn bot_not_found(bot: impl Into<String>) -> Self {
        XdccError::BotNotFound { bot: bot.into() }
    }

    /// Create a new AlreadyQueued error
    pub fn already_queued(bot: impl Into<String>, pack: u64) -> Self {
        XdccError::AlreadyQueued {
            bot: bot.into(),
            pack,
        }
    }

    /// Create a new Timeout error recording how long we waited
    pub fn timeout_after(message: impl Into<String>, elapsed_secs: u64) -> Self {
        XdccError::Timeout {
            message: message.into(),
            elapsed_secs: Some(elapsed_secs),
        }
    }

    /// Create a new Unrecoverable error
    pub fn unrecoverable(message: impl Into<String>) -> Self {
        XdccError::Unrecoverable {
            message: message.into(),
            source: None,
        }
    }

    /// Create a new Unrecoverable error with source
    pub fn unrecoverable_with_source(message: impl Into<String>, source: impl Into<String>) -> Self {
        XdccError::Unrecoverable {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Whether the retry supervisor should start another session
    pub fn is_retryable(&self) -> bool {
        matches!(self, XdccError::Timeout { .. } | XdccError::NetworkError { .. })
    }

    /// Short, user-facing reason used in the final "download failed" line
    pub fn reason(&self) -> String {
        match self {
            XdccError::BotNotFound { .. } => "bot does not exist".to_string(),
            XdccError::AlreadyQueued { .. } => "already queued".to_string(),
            XdccError::Timeout { .. } => "timed out".to_string(),
            XdccError::Unrecoverable { message, .. } => format!("unrecoverable ({})", message),
            XdccError::InvalidCtcp { message, .. } => format!("invalid CTCP ({})", message),
            other => other.to_string(),
        }
    }

    /// Add context to the error
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        let ctx = context.into();
        match &mut self {
            XdccError::ProtocolError { source, .. }
            | XdccError::NetworkError { source, .. }
            | XdccError::StorageError { source, .. }
            | XdccError::Unrecoverable { source, .. } => {
                *source = Some(source.as_ref().map_or_else(|| ctx.clone(), |s| format!("{}: {}", s, ctx)));
            }
            XdccError::InvalidCtcp { payload, .. } => {
                *payload = Some(payload.as_ref().map_or_else(|| ctx.clone(), |p| format!("{}: {}", p, ctx)));
            }
            _ => {}
        }
        self
    }
}

impl fmt::Display for XdccError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XdccError::ProtocolError { message, source } => {
                if let Some(src) = source {
                    write!(f, "Protocol error: {} (source: {})", message, src)
                } else {
                    write!(f, "Protocol error: {}", message)
                }
            }
            XdccError::InvalidCtcp { message, payload } => {
                if let Some(p) = payload {
                    write!(f, "Invalid CTCP: {} (payload: {})", message, p)
                } else {
                    write!(f, "Invalid CTCP: {}", message)
                }
            }
            XdccError::NetworkError { message, address, source } => {
                match (address, source) {
                    (Some(a), Some(s)) => write!(f, "Network error: {} (address: {}, source: {})", message, a, s),
                    (Some(a), None) => write!(f, "Network error: {} (address: {})", message, a),
                    (None, Some(s)) => write!(f, "Network error: {} (source: {})", message, s),
                    (None, None) => write!(f, "Network error: {}", message),
                }
            }
            XdccError::StorageError { message, path, source } => {
                match (path, source) {
                    (Some(p), Some(s)) => write!(f, "Storage error: {} (path: {}, source: {})", message, p, s),
                    (Some(p), None) => write!(f, "Storage error: {} (path: {})", message, p),
                    (None, Some(s)) => write!(f, "Storage error: {} (source: {})", message, s),
                    (None, None) => write!(f, "Storage error: {}", message),
                }
            }
            XdccError::ConfigError { message, field } => {
                if let Some(field_val) = field {
                    write!(f, "Config error: {} (field: {})", message, field_val)
                } else {
                    write!(f, "Config error: {}", message)
                }
            }
            XdccError::ValidationError { message, field } => {
                if let Some(field_val) = field {
                    write!(f, "Validation error: {} (field: {})", message, field_val)
                } else {
                    write!(f, "Validation error: {}", message)
                }
            }
            XdccError::BotNotFound { bot } => write!(f, "Bot does not exist: {}", bot),
            XdccError::AlreadyQueued { bot, pack } => {
                write!(f, "Pack #{} already requested from {}", pack, bot)
            }
            XdccError::Timeout { message, elapsed_secs } => {
                if let Some(secs) = elapsed_secs {
                    write!(f, "Timeout: {} (after {}s)", message, secs)
                } else {
                    write!(f, "Timeout: {}", message)
                }
            }
            XdccError::Unrecoverable { message, source } => {
                if let Some(src) = source {
                    write!(f, "Unrecoverable error: {} (source: {})", message, src)
                } else {
                    write!(f, "Unrecoverable error: {}", message)
                }
            }
        }
    }
}

impl std::error::Error for XdccError {}

impl From<std::io::Error> for XdccError {
    fn from(err: std::io::Error) -> Self {
        XdccError::storage_error_full(err.to_string(), "unknown".to_string(), err.kind().to_string())
    }
}

impl From<serde_json::Error> for XdccError {
    fn from(err: serde_json::Error) -> Self {
        XdccError::protocol_error_with_source("Failed to encode JSON report", err.to_string())
    }
}

impl From<std::net::AddrParseError> for XdccError {
    fn from(err: std::net::AddrParseError) -> Self {
        XdccError::network_error_full("Failed to parse address", "unknown".to_string(), err.to_string())
    }
}

impl From<tokio::time::error::Elapsed> for XdccError {
    fn from(_err: tokio::time::error::Elapsed) -> Self {
        XdccError::network_error("Operation timed out")
    }
}
