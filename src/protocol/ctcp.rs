//! CTCP framing and DCC negotiation messages
//!
//! CTCP payloads travel inside PRIVMSG/NOTICE text between two `0x01`
//! markers. DCC offers are whitespace-separated tokens where the filename
//! may be double-quoted and contain spaces.

use std::net::Ipv4Addr;
use tracing::{debug, trace, warn};

use crate::error::XdccError;

/// CTCP frame marker
pub const CTCP_DELIMITER: char = '\x01';

/// Extract the CTCP payload from message text, if it is CTCP-framed
///
/// The closing marker is optional; some clients omit it.
pub fn extract_ctcp(text: &str) -> Option<&str> {
    let inner = text.strip_prefix(CTCP_DELIMITER)?;
    Some(inner.strip_suffix(CTCP_DELIMITER).unwrap_or(inner))
}

/// Frame a payload as CTCP
pub fn wrap_ctcp(payload: &str) -> String {
    format!("{}{}{}", CTCP_DELIMITER, payload, CTCP_DELIMITER)
}

/// Split a CTCP payload into tokens, honouring quotes
///
/// Double and single quotes group words; a backslash escapes the next
/// character outside single quotes.
pub fn tokenize(payload: &str) -> Result<Vec<String>, XdccError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;
    let mut chars = payload.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some('"') | None, '\\') => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
                in_token = true;
            }
            (Some(_), c) => current.push(c),
            (None, '"' | '\'') => {
                quote = Some(c);
                in_token = true;
            }
            (None, c) if c.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            (None, c) => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if quote.is_some() {
        return Err(XdccError::invalid_ctcp_with_payload("Unterminated quote", payload));
    }
    if in_token {
        tokens.push(current);
    }

    trace!("Tokenized CTCP payload {:?} -> {:?}", payload, tokens);
    Ok(tokens)
}

/// Quote a filename for an outgoing DCC message
fn quote_filename(filename: &str) -> String {
    let escaped = filename.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}

/// Convert the DCC 32-bit integer address to dotted-quad form
pub fn decode_ipv4(value: u32) -> Ipv4Addr {
    Ipv4Addr::new(
        ((value >> 24) & 0xff) as u8,
        ((value >> 16) & 0xff) as u8,
        ((value >> 8) & 0xff) as u8,
        (value & 0xff) as u8,
    )
}

/// Convert a dotted-quad address to the DCC 32-bit integer form
pub fn encode_ipv4(addr: Ipv4Addr) -> u32 {
    let [a, b, c, d] = addr.octets();
    (u32::from(a) << 24) | (u32::from(b) << 16) | (u32::from(c) << 8) | u32::from(d)
}

/// DCC negotiation verbs we speak
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DccCommand {
    /// Offer: connect to `address:port` and receive `filesize` bytes
    Send {
        filename: String,
        address: Ipv4Addr,
        port: u16,
        filesize: u64,
    },
    /// Our request to continue an offer at `position`
    Resume {
        filename: String,
        port: u16,
        position: u64,
    },
    /// The bot agrees to resume at `position`
    Accept {
        filename: String,
        port: u16,
        position: u64,
    },
}

impl DccCommand {
    /// Parse the tokens following `DCC`
    pub fn parse(args: &[String], payload: &str) -> Result<Self, XdccError> {
        let verb = args
            .first()
            .ok_or_else(|| XdccError::invalid_ctcp_with_payload("DCC without verb", payload))?;

        match verb.to_ascii_uppercase().as_str() {
            "SEND" => {
                let [filename, address, port, filesize] = expect_args::<4>(&args[1..], "DCC SEND", payload)?;
                let address = parse_address(address, payload)?;
                let port = parse_port(port, payload)?;
                let filesize = parse_u64(filesize, "size", payload)?;
                debug!("DCC SEND {} from {}:{} ({} bytes)", filename, address, port, filesize);
                Ok(DccCommand::Send {
                    filename: filename.clone(),
                    address,
                    port,
                    filesize,
                })
            }
            "ACCEPT" | "RESUME" => {
                let [filename, port, position] = expect_args::<3>(&args[1..], verb, payload)?;
                let port = parse_port(port, payload)?;
                let position = parse_u64(position, "position", payload)?;
                let filename = filename.clone();
                if verb.eq_ignore_ascii_case("ACCEPT") {
                    Ok(DccCommand::Accept { filename, port, position })
                } else {
                    Ok(DccCommand::Resume { filename, port, position })
                }
            }
            other => {
                warn!("Unsupported DCC verb: {}", other);
                Err(XdccError::invalid_ctcp_with_payload(
                    format!("Unsupported DCC verb '{}'", other),
                    payload,
                ))
            }
        }
    }

    /// Serialize as a CTCP payload (without the 0x01 markers)
    pub fn to_payload(&self) -> String {
        match self {
            DccCommand::Send { filename, address, port, filesize } => format!(
                "DCC SEND {} {} {} {}",
                quote_filename(filename),
                encode_ipv4(*address),
                port,
                filesize
            ),
            DccCommand::Resume { filename, port, position } => {
                format!("DCC RESUME {} {} {}", quote_filename(filename), port, position)
            }
            DccCommand::Accept { filename, port, position } => {
                format!("DCC ACCEPT {} {} {}", quote_filename(filename), port, position)
            }
        }
    }
}

fn expect_args<'a, const N: usize>(
    args: &'a [String],
    verb: &str,
    payload: &str,
) -> Result<&'a [String; N], XdccError> {
    // Extra trailing tokens (e.g. a passive-DCC token) are tolerated
    args.get(..N)
        .and_then(|slice| slice.try_into().ok())
        .ok_or_else(|| {
            XdccError::invalid_ctcp_with_payload(
                format!("{} expects {} arguments, got {}", verb, N, args.len()),
                payload,
            )
        })
}

fn parse_address(token: &str, payload: &str) -> Result<Ipv4Addr, XdccError> {
    if let Ok(value) = token.parse::<u32>() {
        return Ok(decode_ipv4(value));
    }
    token
        .parse::<Ipv4Addr>()
        .map_err(|_| XdccError::invalid_ctcp_with_payload(format!("Invalid DCC address '{}'", token), payload))
}

fn parse_port(token: &str, payload: &str) -> Result<u16, XdccError> {
    match token.parse::<u16>() {
        Ok(0) => Err(XdccError::invalid_ctcp_with_payload("Passive DCC is not supported", payload)),
        Ok(port) => Ok(port),
        Err(_) => Err(XdccError::invalid_ctcp_with_payload(
            format!("Invalid DCC port '{}'", token),
            payload,
        )),
    }
}

fn parse_u64(token: &str, what: &str, payload: &str) -> Result<u64, XdccError> {
    token
        .parse::<u64>()
        .map_err(|_| XdccError::invalid_ctcp_with_payload(format!("Invalid DCC {} '{}'", what, token), payload))
}

/// A decoded CTCP request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CtcpMessage {
    Dcc(DccCommand),
    Version,
    Ping(Option<String>),
    Other { command: String, args: Vec<String> },
}

impl CtcpMessage {
    /// Decode a CTCP payload (already stripped of its markers)
    pub fn parse(payload: &str) -> Result<Self, XdccError> {
        let tokens = tokenize(payload)?;
        let Some((command, args)) = tokens.split_first() else {
            return Err(XdccError::invalid_ctcp("Empty CTCP payload"));
        };

        match command.to_ascii_uppercase().as_str() {
            "DCC" => Ok(CtcpMessage::Dcc(DccCommand::parse(args, payload)?)),
            "VERSION" => Ok(CtcpMessage::Version),
            "PING" => Ok(CtcpMessage::Ping(args.first().cloned())),
            _ => Ok(CtcpMessage::Other {
                command: command.to_ascii_uppercase(),
                args: args.to_vec(),
            }),
        }
    }
}
