//! Gateway - TCP listeners that accept incoming connections.
//!
//! The Gateway binds the client listener and, optionally, the relay
//! listener, and spawns one task per accepted socket. Every endpoint gets a
//! child of the server's shutdown token, so cancelling that token ends the
//! accept loops and every live session.

use super::connection::{Connection, ConnectionId};
use super::dispatcher::{Dispatcher, run_dispatcher};
use super::endpoint::EndpointSettings;
use crate::handlers::{Commands, Handler};
use crate::state::MatrixHandle;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

/// The Gateway accepts incoming TCP connections and spawns endpoints.
pub struct Gateway {
    client_listener: TcpListener,
    relay_listener: Option<TcpListener>,
    state: MatrixHandle,
    commands: Arc<Commands>,
    settings: EndpointSettings,
    shutdown: CancellationToken,
}

impl Gateway {
    /// Bind the gateway to the specified addresses.
    pub async fn bind(
        addr: SocketAddr,
        relay_addr: Option<SocketAddr>,
        state: MatrixHandle,
        settings: EndpointSettings,
        shutdown: CancellationToken,
    ) -> anyhow::Result<Self> {
        let client_listener = TcpListener::bind(addr).await?;
        info!(addr = %client_listener.local_addr()?, "Client listener bound");

        let relay_listener = match relay_addr {
            Some(addr) => {
                let listener = TcpListener::bind(addr).await?;
                info!(addr = %listener.local_addr()?, "Relay listener bound");
                Some(listener)
            }
            None => None,
        };

        Ok(Self {
            client_listener,
            relay_listener,
            state,
            commands: Arc::new(Commands::new()),
            settings,
            shutdown,
        })
    }

    /// Address the client listener actually bound.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.client_listener.local_addr()
    }

    /// Address the relay listener actually bound, if any.
    pub fn relay_addr(&self) -> Option<SocketAddr> {
        self.relay_listener
            .as_ref()
            .and_then(|l| l.local_addr().ok())
    }

    /// Run the gateway until the shutdown token fires.
    #[instrument(skip(self), name = "gateway")]
    pub async fn run(self) -> anyhow::Result<()> {
        if let Some(listener) = self.relay_listener {
            let (dispatcher, inbox) = Dispatcher::new(self.settings, self.shutdown.clone());
            let dispatcher = Arc::new(Mutex::new(dispatcher));
            tokio::spawn(run_dispatcher(
                Arc::clone(&dispatcher),
                inbox,
                self.shutdown.clone(),
            ));
            tokio::spawn(accept_relays(listener, dispatcher, self.shutdown.clone()));
        }

        let mut next_id: ConnectionId = 0;
        loop {
            let accepted = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                accepted = self.client_listener.accept() => accepted,
            };
            match accepted {
                Ok((stream, addr)) => {
                    next_id += 1;
                    debug!(id = next_id, %addr, "Accepted client");
                    let handler = Handler::registration(self.state.clone(), Arc::clone(&self.commands));
                    let conn = Connection::new(
                        next_id,
                        &addr.ip().to_string(),
                        stream,
                        handler,
                        self.settings,
                        self.shutdown.child_token(),
                    );
                    tokio::spawn(conn.run());
                }
                Err(e) => error!(error = %e, "Accept failed"),
            }
        }
        info!("Gateway stopped");
        Ok(())
    }
}

async fn accept_relays(
    listener: TcpListener,
    dispatcher: Arc<Mutex<Dispatcher>>,
    shutdown: CancellationToken,
) {
    loop {
        let accepted = tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => accepted,
        };
        match accepted {
            Ok((stream, addr)) => {
                let relay = dispatcher.lock().new_relay(stream);
                debug!(relay = relay.id(), %addr, "Accepted relay");
                tokio::spawn(relay.run());
            }
            Err(e) => error!(error = %e, "Relay accept failed"),
        }
    }
}
