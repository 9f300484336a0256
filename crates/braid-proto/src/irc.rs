//! IRC message codec for tokio.
//!
//! Wraps [`LineCodec`] and turns lines into [`Message`] values. A complete
//! line that fails to parse is skipped; only I/O errors and over-long lines
//! surface as errors, and those end a `FramedRead` stream.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};
use tracing::debug;

use crate::error::{ProtocolError, Result};
use crate::line::LineCodec;
use crate::message::Message;

/// Tokio codec for encoding/decoding IRC messages.
#[derive(Default)]
pub struct IrcCodec {
    inner: LineCodec,
}

impl IrcCodec {
    /// Create a codec with the RFC 2812 line limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a codec with a custom max line length in bytes.
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            inner: LineCodec::with_max_len(max_len),
        }
    }
}

impl Decoder for IrcCodec {
    type Item = Message;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Message>> {
        loop {
            let Some(line) = self.inner.decode(src)? else {
                return Ok(None);
            };
            if line.trim().is_empty() {
                continue;
            }
            match line.parse::<Message>() {
                Ok(msg) => return Ok(Some(msg)),
                Err(e) => debug!(error = %e, "Skipping malformed line"),
            }
        }
    }
}

impl Encoder<&Message> for IrcCodec {
    type Error = ProtocolError;

    fn encode(&mut self, msg: &Message, dst: &mut BytesMut) -> Result<()> {
        let line = msg.to_line().ok_or_else(|| ProtocolError::Unencodable {
            command: msg.command.clone(),
        })?;
        self.inner.encode(line, dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_malformed_and_blank_lines() {
        let mut codec = IrcCodec::new();
        let mut buf = BytesMut::from("\r\n!!!\r\nNICK bob\r\n");
        let msg = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(msg.command, "NICK");
        assert!(buf.is_empty());
    }

    #[test]
    fn encode_rejects_unrepresentable() {
        let mut codec = IrcCodec::new();
        let mut buf = BytesMut::new();
        let bad = Message::new("PRIVMSG").with_param("has space");
        assert!(matches!(
            codec.encode(&bad, &mut buf),
            Err(ProtocolError::Unencodable { .. })
        ));
        assert!(buf.is_empty());

        let good = Message::new("PING").with_trailing("x");
        codec.encode(&good, &mut buf).unwrap();
        assert_eq!(&buf[..], b"PING :x\r\n");
    }
}
