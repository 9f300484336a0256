//! Network module.
//!
//! Contains the Gateway (TCP listeners), client Connections, Relays and the
//! Dispatcher that routes between relays. Connections and relays share one
//! endpoint implementation: a bounded mailbox drained by the same write
//! loop, a [`MessageStream`] on the read side, and a cancellation token.

mod connection;
mod dispatcher;
mod endpoint;
mod gateway;
mod relay;
mod stream;

pub use connection::{Connection, ConnectionHandle, ConnectionId, IMPLICIT_QUIT_REASON};
pub use dispatcher::{Dispatcher, Phase, RelayKind, handle_linked, handle_new, run_dispatcher};
pub use endpoint::{EndpointSettings, Outgoing, write_loop};
pub use gateway::Gateway;
pub use relay::{Envelope, Relay, RelayHandle, RelayId};
pub use stream::MessageStream;
