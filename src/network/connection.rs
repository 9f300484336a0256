//! Connection - Handles an individual client connection.
//!
//! Each Connection runs two loops:
//!
//! ```text
//!   socket ──▶ MessageStream ──▶ Handler::handle ──▶ (Matrix, Sinks)
//!                                                        │
//!   socket ◀── write_loop ◀── mailbox ◀── ConnectionHandle (Sink)
//! ```
//!
//! The read loop dispatches one message at a time. The write loop runs on
//! its own task. Both stop when the connection's cancellation token fires.

use super::endpoint::{EndpointSettings, write_loop};
use super::stream::MessageStream;
use crate::handlers::Handler;
use crate::state::Sink;
use braid_proto::{IrcCodec, Message};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::codec::FramedWrite;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, warn};

/// Process-unique connection identifier.
pub type ConnectionId = u64;

/// Reason given to the handler when a session ends without a QUIT.
pub const IMPLICIT_QUIT_REASON: &str = "QUITing";

/// Cloneable reference to a live connection.
///
/// This is what command functions see: a [`Sink`] into the connection's
/// mailbox plus the ability to end the session.
#[derive(Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    host: Arc<str>,
    outbox: mpsc::Sender<Arc<Message>>,
    cancel: CancellationToken,
}

impl ConnectionHandle {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Peer host as seen by the gateway.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Request termination of both loops. Safe to call any number of times
    /// and after the connection has already ended.
    pub fn kill(&self) {
        self.cancel.cancel();
    }

    pub fn is_killed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// A handle wired to a bare mailbox, for driving handlers without a socket.
    #[cfg(test)]
    pub(crate) fn detached(
        id: ConnectionId,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<Arc<Message>>) {
        let (outbox, mailbox) = mpsc::channel(capacity);
        let handle = Self {
            id,
            host: Arc::from("127.0.0.1"),
            outbox,
            cancel: CancellationToken::new(),
        };
        (handle, mailbox)
    }
}

impl Sink for ConnectionHandle {
    fn send(&self, msg: Arc<Message>) {
        match self.outbox.try_send(msg) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(connection = self.id, "SendQ exceeded, disconnecting");
                self.kill();
            }
            Err(TrySendError::Closed(msg)) => {
                debug!(connection = self.id, msg = %msg, "Dropping message for closed connection");
            }
        }
    }
}

/// A client connection.
pub struct Connection<S> {
    stream: S,
    handle: ConnectionHandle,
    mailbox: mpsc::Receiver<Arc<Message>>,
    handler: Handler,
    settings: EndpointSettings,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    /// Wrap an accepted stream. `cancel` is usually a child of the server's
    /// shutdown token.
    pub fn new(
        id: ConnectionId,
        host: &str,
        stream: S,
        handler: Handler,
        settings: EndpointSettings,
        cancel: CancellationToken,
    ) -> Self {
        let (outbox, mailbox) = mpsc::channel(settings.mailbox_capacity);
        Self {
            stream,
            handle: ConnectionHandle {
                id,
                host: Arc::from(host),
                outbox,
                cancel,
            },
            mailbox,
            handler,
            settings,
        }
    }

    pub fn handle(&self) -> ConnectionHandle {
        self.handle.clone()
    }

    /// Run the session to completion.
    ///
    /// Returns once both loops have stopped and the socket is closed. The
    /// handler sees exactly one QUIT: the client's own, or a synthesized one
    /// if the session ended any other way.
    pub async fn run(self) {
        let Self {
            stream,
            handle,
            mailbox,
            mut handler,
            settings,
        } = self;
        let span = crate::telemetry::spans::connection(handle.id, &handle.host);

        async move {
            let (reader, writer) = tokio::io::split(stream);
            let writer = tokio::spawn(
                write_loop(
                    FramedWrite::new(writer, IrcCodec::new()),
                    mailbox,
                    handle.cancel.clone(),
                )
                .in_current_span(),
            );

            let mut messages = MessageStream::new(reader, settings.max_line_len);
            let mut saw_quit = false;
            loop {
                let next = tokio::select! {
                    biased;
                    _ = handle.cancel.cancelled() => break,
                    next = messages.next() => next,
                };
                let Some(msg) = next else { break };
                saw_quit |= msg.is_command("QUIT");
                handler = handler.handle(&handle, msg).await;
            }

            if !saw_quit {
                handler = handler
                    .handle(&handle, Message::quit(IMPLICIT_QUIT_REASON))
                    .await;
            }
            handler.closed(&handle).await;
            handle.kill();

            if let Err(e) = writer.await {
                warn!(error = %e, "Writer task failed");
            }
            debug!("Connection closed");
        }
        .instrument(span)
        .await
    }
}
