//! IRC server address
//!
//! Parses `host`, `host:port` and `irc://host:port` forms.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};
use url::Url;

use crate::error::XdccError;

/// Default plain-text IRC port
pub const DEFAULT_IRC_PORT: u16 = 6667;

/// IRC server to connect to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    /// Hostname or IP address
    pub address: String,
    /// TCP port
    pub port: u16,
}

impl Server {
    /// Create a server on the default port
    pub fn new(address: impl Into<String>) -> Self {
        Self::with_port(address, DEFAULT_IRC_PORT)
    }

    /// Create a server on a specific port
    pub fn with_port(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
        }
    }

    /// Parse a server string
    ///
    /// Accepts `irc.example.net`, `irc.example.net:6697` and
    /// `irc://irc.example.net:6697`.
    pub fn parse(input: &str) -> Result<Self, XdccError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(XdccError::validation_error_with_field("Server cannot be empty", "server"));
        }

        if input.contains("://") {
            return Self::parse_url(input);
        }

        match input.rsplit_once(':') {
            Some((host, port)) if !host.is_empty() => {
                let port: u16 = port.parse().map_err(|_| {
                    warn!("Invalid port in server string: {}", input);
                    XdccError::validation_error_with_field(format!("Invalid port '{}'", port), "server")
                })?;
                if port == 0 {
                    return Err(XdccError::validation_error_with_field("Port cannot be 0", "server"));
                }
                debug!("Parsed server {}:{}", host, port);
                Ok(Self::with_port(host, port))
            }
            Some(_) => Err(XdccError::validation_error_with_field(
                format!("Missing host in '{}'", input),
                "server",
            )),
            None => Ok(Self::new(input)),
        }
    }

    fn parse_url(input: &str) -> Result<Self, XdccError> {
        let url = Url::parse(input).map_err(|e| {
            warn!("Invalid server URL '{}': {}", input, e);
            XdccError::validation_error_with_field(format!("Invalid server URL: {}", e), "server")
        })?;

        if url.scheme() != "irc" {
            return Err(XdccError::validation_error_with_field(
                format!("Unsupported scheme '{}'", url.scheme()),
                "server",
            ));
        }

        let host = url
            .host_str()
            .ok_or_else(|| XdccError::validation_error_with_field("Server URL has no host", "server"))?;

        Ok(Self::with_port(host, url.port().unwrap_or(DEFAULT_IRC_PORT)))
    }

    /// `host:port` string suitable for `TcpStream::connect`
    pub fn connect_addr(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

impl fmt::Display for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.port)
    }
}
