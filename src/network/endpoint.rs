//! The duplex endpoint shared by client connections and relays.
//!
//! Both have a bounded outbound mailbox drained by [`write_loop`] and a read
//! side wrapped in [`MessageStream`](super::MessageStream). Termination is a
//! single [`CancellationToken`] per endpoint: cancelling it is idempotent and
//! harmless after the loops have exited.

use braid_proto::{IrcCodec, Message, ProtocolError};
use futures_util::SinkExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_util::codec::FramedWrite;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// Per-endpoint limits.
#[derive(Debug, Clone, Copy)]
pub struct EndpointSettings {
    /// Outbound mailbox capacity (SendQ) in messages.
    pub mailbox_capacity: usize,
    /// Maximum inbound line length in bytes, CR LF included.
    pub max_line_len: usize,
}

impl Default for EndpointSettings {
    fn default() -> Self {
        Self {
            mailbox_capacity: 512,
            max_line_len: braid_proto::MAX_LINE_LEN,
        }
    }
}

/// An item that can sit in an outbound mailbox.
pub trait Outgoing: Send + 'static {
    fn message(&self) -> &Message;

    /// Tear the endpoint down once this item has been written.
    fn should_kill(&self) -> bool {
        false
    }
}

impl Outgoing for Arc<Message> {
    fn message(&self) -> &Message {
        self
    }
}

/// How long a cancelled endpoint may spend flushing its queue before the
/// write half is dropped.
pub const FLUSH_GRACE: Duration = Duration::from_secs(1);

/// Drain `mailbox` into `sink` until `cancel` fires.
///
/// Unencodable messages are dropped. Write failures are logged and the loop
/// keeps going; the read side notices a dead socket and ends the session.
/// A write blocked on a peer that stopped reading is abandoned as soon as
/// `cancel` fires. Whatever is already queued is then flushed within
/// [`FLUSH_GRACE`], so a final `ERROR` reaches a live peer, and the write
/// half is shut down.
pub async fn write_loop<W, T>(
    mut sink: FramedWrite<W, IrcCodec>,
    mut mailbox: mpsc::Receiver<T>,
    cancel: CancellationToken,
) where
    W: AsyncWrite + Unpin,
    T: Outgoing,
{
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            item = mailbox.recv() => {
                let Some(item) = item else { break };
                tokio::select! {
                    biased;
                    _ = deliver(&mut sink, &item) => {}
                    _ = cancel.cancelled() => break,
                }
                if item.should_kill() {
                    cancel.cancel();
                }
            }
        }
    }

    mailbox.close();
    let flush = async {
        while let Ok(item) = mailbox.try_recv() {
            deliver(&mut sink, &item).await;
        }
        if let Err(e) = SinkExt::<&Message>::flush(&mut sink).await {
            debug!(error = %e, "Error flushing write half");
        }
        if let Err(e) = sink.get_mut().shutdown().await {
            debug!(error = %e, "Error closing write half");
        }
    };
    if tokio::time::timeout(FLUSH_GRACE, flush).await.is_err() {
        debug!("Peer not reading, dropping write half");
    }
}

async fn deliver<W, T>(sink: &mut FramedWrite<W, IrcCodec>, item: &T)
where
    W: AsyncWrite + Unpin,
    T: Outgoing,
{
    let msg = item.message();
    match sink.send(msg).await {
        Ok(()) => debug!(msg = %msg, ">"),
        Err(ProtocolError::Unencodable { command }) => {
            debug!(%command, "Dropping unencodable message");
        }
        Err(e) => error!(error = %e, "Write failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn flushes_queue_on_cancel() {
        let (client, mut server) = tokio::io::duplex(4096);
        let (tx, rx) = mpsc::channel::<Arc<Message>>(8);
        let cancel = CancellationToken::new();
        tx.try_send(Arc::new(Message::new("PING").with_trailing("a"))).unwrap();
        tx.try_send(Arc::new(Message::new("PRIVMSG").with_param("bad param"))).unwrap();
        tx.try_send(Arc::new(Message::error("bye"))).unwrap();
        cancel.cancel();

        write_loop(FramedWrite::new(client, IrcCodec::new()), rx, cancel).await;

        let mut out = String::new();
        server.read_to_string(&mut out).await.unwrap();
        assert_eq!(out, "PING :a\r\nERROR :bye\r\n");
    }

    #[tokio::test]
    async fn cancel_abandons_blocked_write() {
        // The peer never reads, so the second line cannot be written.
        let (client, _server) = tokio::io::duplex(64);
        let (tx, rx) = mpsc::channel::<Arc<Message>>(8);
        let cancel = CancellationToken::new();
        let line = Arc::new(
            Message::new("PRIVMSG")
                .with_param("bob")
                .with_trailing("x".repeat(100)),
        );
        tx.try_send(Arc::clone(&line)).unwrap();
        tx.try_send(line).unwrap();

        let task = tokio::spawn(write_loop(
            FramedWrite::new(client, IrcCodec::new()),
            rx,
            cancel.clone(),
        ));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!task.is_finished());

        cancel.cancel();
        tokio::time::timeout(FLUSH_GRACE * 3, task)
            .await
            .unwrap()
            .unwrap();
    }

    struct Killing(Arc<Message>);

    impl Outgoing for Killing {
        fn message(&self) -> &Message {
            &self.0
        }

        fn should_kill(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn should_kill_cancels_endpoint() {
        let (client, _server) = tokio::io::duplex(4096);
        let (tx, rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        tx.try_send(Killing(Arc::new(Message::error("gone")))).unwrap();

        write_loop(FramedWrite::new(client, IrcCodec::new()), rx, cancel.clone()).await;
        assert!(cancel.is_cancelled());
    }
}
