//! Pull-based parsed message stream over the read half of a socket.

use braid_proto::{IrcCodec, Message};
use futures_util::StreamExt;
use tokio::io::AsyncRead;
use tokio_util::codec::FramedRead;
use tracing::debug;

/// A lazy, finite sequence of parsed messages.
///
/// `next` returns `None` once the peer hangs up or the stream fails; the
/// caller treats both as the end of the session.
pub struct MessageStream<R> {
    inner: FramedRead<R, IrcCodec>,
    ended: bool,
}

impl<R: AsyncRead + Unpin> MessageStream<R> {
    pub fn new(reader: R, max_line_len: usize) -> Self {
        Self {
            inner: FramedRead::new(reader, IrcCodec::with_max_len(max_line_len)),
            ended: false,
        }
    }

    /// Next message, or `None` at end of stream.
    pub async fn next(&mut self) -> Option<Message> {
        if self.ended {
            return None;
        }
        match self.inner.next().await {
            Some(Ok(msg)) => {
                debug!(msg = %msg, "<");
                Some(msg)
            }
            Some(Err(e)) => {
                debug!(error = %e, "Read side failed");
                self.ended = true;
                None
            }
            None => {
                self.ended = true;
                None
            }
        }
    }
}
