//! Dispatcher - central registry and router for relays.
//!
//! Every relay forwards what it reads into one shared inbox. The routing
//! loop takes each envelope and runs the origin relay's current phase
//! function on it. Phases:
//!
//! ```text
//!   handle_new ──SERVER <name>──▶ handle_linked (server)
//!              ──NICK <name>────▶ handle_linked (client)
//! ```
//!
//! Two visibility maps record which relays each relay may route to, split
//! by the kind of the peer: `relay_to_client` and `relay_to_server`.

use super::endpoint::EndpointSettings;
use super::relay::{Envelope, Relay, RelayHandle, RelayId};
use braid_proto::Message;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Per-relay routing function.
pub type Phase = fn(&mut Dispatcher, Envelope);

/// What a relay turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayKind {
    /// Not introduced yet.
    Unknown,
    Client,
    Server,
}

struct RelayEntry {
    handle: RelayHandle,
    phase: Phase,
    kind: RelayKind,
    name: Option<String>,
}

pub struct Dispatcher {
    next_id: RelayId,
    relay_to_client: HashMap<RelayId, HashSet<RelayId>>,
    relay_to_server: HashMap<RelayId, HashSet<RelayId>>,
    relays: HashMap<RelayId, RelayEntry>,
    inbox: mpsc::Sender<Envelope>,
    settings: EndpointSettings,
    shutdown: CancellationToken,
}

impl Dispatcher {
    /// Create a dispatcher and the receiving end of its shared inbox.
    pub fn new(
        settings: EndpointSettings,
        shutdown: CancellationToken,
    ) -> (Self, mpsc::Receiver<Envelope>) {
        let (inbox, rx) = mpsc::channel(settings.mailbox_capacity);
        let dispatcher = Self {
            next_id: 0,
            relay_to_client: HashMap::new(),
            relay_to_server: HashMap::new(),
            relays: HashMap::new(),
            inbox,
            settings,
            shutdown,
        };
        (dispatcher, rx)
    }

    /// Register a new relay over `stream`.
    ///
    /// The relay starts in the `handle_new` phase with empty visibility
    /// sets. The caller spawns [`Relay::run`].
    pub fn new_relay<S>(&mut self, stream: S) -> Relay<S>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let id = self.next_id;
        self.next_id += 1;

        let relay = Relay::new(
            id,
            stream,
            self.inbox.clone(),
            self.settings,
            self.shutdown.child_token(),
        );
        self.relay_to_client.insert(id, HashSet::new());
        self.relay_to_server.insert(id, HashSet::new());
        self.relays.insert(
            id,
            RelayEntry {
                handle: relay.handle(),
                phase: handle_new,
                kind: RelayKind::Unknown,
                name: None,
            },
        );
        debug!(relay = id, "Relay registered");
        relay
    }

    /// Drop `id`'s own visibility entries.
    ///
    /// Neither closes the relay nor touches other relays' sets; see
    /// [`Dispatcher::disconnect`] for the full teardown.
    pub fn kill_relay(&mut self, id: RelayId) {
        self.relay_to_client.remove(&id);
        self.relay_to_server.remove(&id);
    }

    /// Client relays `id` may route to.
    pub fn clients_visible_to(&self, id: RelayId) -> Option<&HashSet<RelayId>> {
        self.relay_to_client.get(&id)
    }

    /// Server relays `id` may route to.
    pub fn servers_visible_to(&self, id: RelayId) -> Option<&HashSet<RelayId>> {
        self.relay_to_server.get(&id)
    }

    pub fn kind(&self, id: RelayId) -> Option<RelayKind> {
        self.relays.get(&id).map(|e| e.kind)
    }

    pub fn relay_count(&self) -> usize {
        self.relays.len()
    }

    /// Make `a` and `b` visible to each other, filed by each one's kind.
    pub fn link(&mut self, a: RelayId, b: RelayId) {
        if a == b {
            return;
        }
        for (from, to) in [(a, b), (b, a)] {
            let map = match self.kind(to) {
                Some(RelayKind::Server) => &mut self.relay_to_server,
                Some(_) => &mut self.relay_to_client,
                None => continue,
            };
            if let Some(set) = map.get_mut(&from) {
                set.insert(to);
            }
        }
    }

    /// Route one envelope through its origin's phase function.
    pub fn route(&mut self, envelope: Envelope) {
        let Some(origin) = envelope.origin else {
            debug!(msg = %envelope.message, "Dropping envelope without origin");
            return;
        };
        let Some(phase) = self.relays.get(&origin).map(|e| e.phase) else {
            debug!(relay = origin, msg = %envelope.message, "Dropping envelope from unknown relay");
            return;
        };
        phase(self, envelope);
    }

    fn set_phase(&mut self, id: RelayId, kind: RelayKind, name: &str, phase: Phase) {
        if let Some(entry) = self.relays.get_mut(&id) {
            entry.kind = kind;
            entry.name = Some(name.to_string());
            entry.phase = phase;
        }
    }

    /// Everyone `id` can route to.
    fn visible(&self, id: RelayId) -> HashSet<RelayId> {
        let clients = self.relay_to_client.get(&id).into_iter().flatten();
        let servers = self.relay_to_server.get(&id).into_iter().flatten();
        clients.chain(servers).copied().collect()
    }

    fn send_to(&self, id: RelayId, envelope: Envelope) {
        if let Some(entry) = self.relays.get(&id) {
            entry.handle.send(envelope);
        }
    }

    /// Full teardown of a relay.
    ///
    /// Tells the peers that could see it (`QUIT` for clients, `SQUIT` for
    /// servers), removes it from every visibility set, sends a final
    /// `ERROR` and kills it.
    pub fn disconnect(&mut self, id: RelayId, reason: &str) {
        let Some(entry) = self.relays.remove(&id) else {
            return;
        };
        let peers = self.visible(id);
        self.kill_relay(id);
        for set in self
            .relay_to_client
            .values_mut()
            .chain(self.relay_to_server.values_mut())
        {
            set.remove(&id);
        }

        let name = entry.name.as_deref().unwrap_or("*");
        let notice = match entry.kind {
            RelayKind::Client => Some(Message::quit(reason).with_prefix(name)),
            RelayKind::Server => Some(Message::new("SQUIT").with_param(name).with_trailing(reason)),
            RelayKind::Unknown => None,
        };
        if let Some(notice) = notice {
            let notice = Arc::new(notice);
            for peer in peers {
                self.send_to(peer, Envelope::from_relay(id, Arc::clone(&notice)));
            }
        }

        info!(relay = id, kind = ?entry.kind, name, reason, "Relay disconnected");
        entry
            .handle
            .send(Envelope::killing(Message::error(format!("Closing Link: {reason}"))));
        entry.handle.kill();
    }
}

/// Phase for relays that have not introduced themselves.
pub fn handle_new(d: &mut Dispatcher, envelope: Envelope) {
    let Some(id) = envelope.origin else { return };
    let msg = &envelope.message;

    let kind = if msg.is_command("SERVER") {
        RelayKind::Server
    } else if msg.is_command("NICK") {
        RelayKind::Client
    } else if msg.is_command("QUIT") {
        d.disconnect(id, msg.arg(0).unwrap_or("Connection closed"));
        return;
    } else {
        debug!(relay = id, msg = %msg, "Ignoring message before introduction");
        return;
    };
    let Some(name) = msg.arg(0).filter(|n| !n.is_empty()) else {
        d.send_to(id, Envelope::new(Message::error("Missing name")));
        return;
    };

    d.set_phase(id, kind, name, handle_linked);
    let linked: Vec<RelayId> = d
        .relays
        .iter()
        .filter(|(other, e)| **other != id && e.kind != RelayKind::Unknown)
        .map(|(other, _)| *other)
        .collect();
    for other in linked {
        d.link(id, other);
    }
    info!(relay = id, ?kind, name, "Relay introduced");
}

/// Phase for introduced relays: forward to everyone visible.
pub fn handle_linked(d: &mut Dispatcher, envelope: Envelope) {
    let Some(id) = envelope.origin else { return };
    if envelope.message.is_command("QUIT") {
        let reason = envelope.message.arg(0).unwrap_or("Connection closed");
        d.disconnect(id, reason);
        return;
    }

    let mut message = envelope.message;
    if message.prefix.is_none()
        && let Some(name) = d.relays.get(&id).and_then(|e| e.name.clone())
    {
        Arc::make_mut(&mut message).prefix = Some(name);
    }
    for peer in d.visible(id) {
        d.send_to(peer, Envelope::from_relay(id, Arc::clone(&message)));
    }
}

/// Drain the shared inbox until shutdown.
pub async fn run_dispatcher(
    dispatcher: Arc<Mutex<Dispatcher>>,
    mut inbox: mpsc::Receiver<Envelope>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            envelope = inbox.recv() => {
                let Some(envelope) = envelope else { break };
                dispatcher.lock().route(envelope);
            }
        }
    }
    debug!("Dispatcher stopped");
}
