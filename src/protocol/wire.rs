//! Wire protocol utilities
//!
//! Line framing for the IRC connection. Reads are buffered in a `BytesMut`
//! owned by the codec so that a read cancelled by `tokio::select!` loses no data.

use anyhow::Result;
use bytes::{Buf, BufMut, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{trace, warn};

use super::IrcMessage;
use crate::error::XdccError;

/// Longest line we buffer before declaring the stream broken
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

/// IrcWire trait for line-oriented protocol I/O
pub trait IrcWire {
    /// Read the next message; `Ok(None)` means the peer closed the connection
    async fn read_message<R: AsyncReadExt + Unpin>(&mut self, reader: &mut R) -> Result<Option<IrcMessage>>;

    /// Write a message followed by CRLF
    async fn write_message<W: AsyncWriteExt + Unpin>(&mut self, writer: &mut W, message: &IrcMessage) -> Result<()>;
}

/// Default implementation of IrcWire
#[derive(Debug, Default)]
pub struct LineWire {
    buffer: BytesMut,
}

impl LineWire {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
        }
    }
}

impl IrcWire for LineWire {
    async fn read_message<R: AsyncReadExt + Unpin>(&mut self, reader: &mut R) -> Result<Option<IrcMessage>> {
        loop {
            while let Some(line) = read_line(&mut self.buffer) {
                let text = String::from_utf8_lossy(&line);
                if text.trim().is_empty() {
                    continue;
                }
                match IrcMessage::parse(&text) {
                    Ok(message) => return Ok(Some(message)),
                    Err(e) => warn!("Skipping malformed IRC line {:?}: {}", text, e),
                }
            }

            if self.buffer.len() > MAX_LINE_LENGTH {
                return Err(XdccError::protocol_error_with_source(
                    "IRC line too long",
                    format!("{} bytes without newline", self.buffer.len()),
                )
                .into());
            }

            let n = reader.read_buf(&mut self.buffer).await?;
            if n == 0 {
                trace!("IRC stream closed with {} buffered bytes", self.buffer.len());
                return Ok(None);
            }
        }
    }

    async fn write_message<W: AsyncWriteExt + Unpin>(&mut self, writer: &mut W, message: &IrcMessage) -> Result<()> {
        let mut buf = BytesMut::new();
        write_line(&mut buf, &message.serialize());
        writer.write_all(&buf).await?;
        writer.flush().await?;
        Ok(())
    }
}

/// Split one `\n`-terminated line off the buffer, dropping `\r\n`
pub fn read_line(buf: &mut BytesMut) -> Option<Vec<u8>> {
    let end = buf.iter().position(|&b| b == b'\n')?;
    let mut line = buf[..end].to_vec();
    buf.advance(end + 1);
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    Some(line)
}

/// Append a line and its CRLF terminator; embedded line breaks are stripped
pub fn write_line(buf: &mut BytesMut, line: &str) {
    for b in line.bytes().filter(|&b| b != b'\r' && b != b'\n') {
        buf.put_u8(b);
    }
    buf.put_slice(b"\r\n");
}
