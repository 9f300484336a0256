//! Relay - a duplex endpoint owned by the [`Dispatcher`](super::Dispatcher).
//!
//! Structurally a Relay is a Connection without a Handler: the inbox loop
//! (the shared [`write_loop`]) drains the relay's mailbox to the socket, and
//! the outbox loop forwards every parsed message, tagged with the relay's
//! id, into the Dispatcher's shared inbox.

use super::endpoint::{EndpointSettings, Outgoing, write_loop};
use super::stream::MessageStream;
use braid_proto::{IrcCodec, Message};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::codec::FramedWrite;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, warn};

/// Dispatcher-assigned relay identifier. Monotonic, never reused.
pub type RelayId = u64;

/// A routed message.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub message: Arc<Message>,
    /// Relay the message came from, if any.
    pub origin: Option<RelayId>,
    /// Tear the destination down once this has been written.
    pub should_kill: bool,
}

impl Envelope {
    pub fn new(message: impl Into<Arc<Message>>) -> Self {
        Self {
            message: message.into(),
            origin: None,
            should_kill: false,
        }
    }

    pub fn from_relay(origin: RelayId, message: impl Into<Arc<Message>>) -> Self {
        Self {
            origin: Some(origin),
            ..Self::new(message)
        }
    }

    /// A final message after which the destination shuts down.
    pub fn killing(message: impl Into<Arc<Message>>) -> Self {
        Self {
            should_kill: true,
            ..Self::new(message)
        }
    }
}

impl Outgoing for Envelope {
    fn message(&self) -> &Message {
        &self.message
    }

    fn should_kill(&self) -> bool {
        self.should_kill
    }
}

/// Cloneable reference to a live relay.
#[derive(Clone)]
pub struct RelayHandle {
    id: RelayId,
    inbox: mpsc::Sender<Envelope>,
    cancel: CancellationToken,
}

impl RelayHandle {
    pub fn id(&self) -> RelayId {
        self.id
    }

    /// Queue an envelope for the relay's socket.
    ///
    /// A full mailbox kills the relay, as for client connections.
    pub fn send(&self, envelope: Envelope) {
        match self.inbox.try_send(envelope) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(relay = self.id, "Relay SendQ exceeded, disconnecting");
                self.kill();
            }
            Err(TrySendError::Closed(_)) => {
                debug!(relay = self.id, "Dropping envelope for closed relay");
            }
        }
    }

    /// Request termination. Idempotent.
    pub fn kill(&self) {
        self.cancel.cancel();
    }

    pub fn is_killed(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// A relay endpoint, created by [`Dispatcher::new_relay`](super::Dispatcher::new_relay).
pub struct Relay<S> {
    stream: S,
    handle: RelayHandle,
    mailbox: mpsc::Receiver<Envelope>,
    /// The Dispatcher's shared inbox.
    outbox: mpsc::Sender<Envelope>,
    settings: EndpointSettings,
}

impl<S> Relay<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    pub(super) fn new(
        id: RelayId,
        stream: S,
        outbox: mpsc::Sender<Envelope>,
        settings: EndpointSettings,
        cancel: CancellationToken,
    ) -> Self {
        let (inbox, mailbox) = mpsc::channel(settings.mailbox_capacity);
        Self {
            stream,
            handle: RelayHandle { id, inbox, cancel },
            mailbox,
            outbox,
            settings,
        }
    }

    pub fn id(&self) -> RelayId {
        self.handle.id
    }

    pub fn handle(&self) -> RelayHandle {
        self.handle.clone()
    }

    /// Give up the socket and keep only the mailbox.
    #[cfg(test)]
    pub(super) fn mailbox_for_test(self) -> mpsc::Receiver<Envelope> {
        self.mailbox
    }

    /// Run both loops to completion.
    ///
    /// When the outbox loop stops, one `QUIT` tagged with this relay is sent
    /// to the Dispatcher so it can tear down routing state.
    pub async fn run(self) {
        let Self {
            stream,
            handle,
            mailbox,
            outbox,
            settings,
        } = self;
        let span = crate::telemetry::spans::relay(handle.id);

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
            loop {
                let next = tokio::select! {
                    biased;
                    _ = handle.cancel.cancelled() => break,
                    next = messages.next() => next,
                };
                let Some(msg) = next else { break };
                if outbox
                    .send(Envelope::from_relay(handle.id, msg))
                    .await
                    .is_err()
                {
                    debug!("Dispatcher gone");
                    break;
                }
            }

            let quit = Envelope::from_relay(handle.id, Message::new("QUIT"));
            if outbox.send(quit).await.is_err() {
                debug!("Dispatcher gone before relay QUIT");
            }
            handle.kill();

            if let Err(e) = writer.await {
                warn!(error = %e, "Relay writer task failed");
            }
            debug!("Relay closed");
        }
        .instrument(span)
        .await
    }
}
