//! The outbound delivery capability.

use braid_proto::Message;
use std::sync::Arc;

/// Asynchronous delivery of messages to one or many recipients.
///
/// `send` never blocks: implementations queue the message and return.
/// Connections queue into their mailbox; [`ChannelSink`](super::ChannelSink)
/// fans out to every member's own sink.
pub trait Sink: Send + Sync {
    /// Queue `msg` for delivery.
    fn send(&self, msg: Arc<Message>);
}

impl<T: Sink + ?Sized> Sink for Arc<T> {
    fn send(&self, msg: Arc<Message>) {
        (**self).send(msg)
    }
}
