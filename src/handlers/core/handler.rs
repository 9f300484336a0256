//! Per-connection protocol state machine.
//!
//! A connection always has exactly one current [`Handler`]. Each message is
//! passed to it by value and a (possibly different) handler comes back:
//!
//! ```text
//!   Registration ──NICK+USER──▶ User
//! ```
//!
//! Every dispatch takes the Matrix exactly once, before the command lookup,
//! and hands it back when the guard drops.

use super::context::{Context, RegContext, Registration, Transition};
use super::registry::Commands;
use crate::error::HandlerError;
use crate::network::ConnectionHandle;
use crate::state::{MatrixHandle, Sink};
use braid_proto::Message;
use std::sync::Arc;
use tracing::{debug, warn};

/// The current protocol phase of a connection.
pub enum Handler {
    Registration(RegistrationHandler),
    User(UserHandler),
}

impl Handler {
    /// Handler for a freshly accepted connection.
    pub fn registration(state: MatrixHandle, commands: Arc<Commands>) -> Self {
        Self::Registration(RegistrationHandler {
            state,
            commands,
            pending: Registration::default(),
        })
    }

    /// Handler for a registered session known by `nick`.
    pub fn user(state: MatrixHandle, nick: impl Into<String>, commands: Arc<Commands>) -> Self {
        Self::User(UserHandler {
            state,
            nick: nick.into(),
            commands,
        })
    }

    /// Interpret one message and return the handler for the next one.
    pub async fn handle(self, conn: &ConnectionHandle, msg: Message) -> Handler {
        match self {
            Self::Registration(h) => h.handle(conn, msg).await,
            Self::User(h) => h.handle(conn, msg).await,
        }
    }

    /// Session teardown. Removes the user this connection registered, if it
    /// is still present, then kills the connection.
    pub async fn closed(&self, conn: &ConnectionHandle) {
        if let Self::User(h) = self {
            let mut matrix = h.state.acquire().await;
            if let Some(user) = matrix.get_user(&h.nick)
                && user.connection == Some(conn.id())
            {
                let id = user.id;
                matrix.remove_user(id);
            }
        }
        conn.kill();
    }

    /// Cached nick of a registered session.
    pub fn nick(&self) -> Option<&str> {
        match self {
            Self::Registration(_) => None,
            Self::User(h) => Some(&h.nick),
        }
    }

    pub fn is_registered(&self) -> bool {
        matches!(self, Self::User(_))
    }
}

/// Handler for a connection that has not completed NICK/USER.
pub struct RegistrationHandler {
    state: MatrixHandle,
    commands: Arc<Commands>,
    pending: Registration,
}

impl RegistrationHandler {
    async fn handle(mut self, conn: &ConnectionHandle, msg: Message) -> Handler {
        let mut matrix = self.state.acquire().await;

        let Some(command) = self.commands.registration_command(&msg.command) else {
            if self.commands.user_command(&msg.command).is_some()
                && let Some(reply) = HandlerError::NotRegistered.to_irc_reply(
                    &matrix.server_info.name,
                    self.pending.reply_nick(),
                    &msg.command,
                )
            {
                conn.send(Arc::new(reply));
            }
            return Handler::Registration(self);
        };

        let mut ctx = RegContext {
            matrix: &mut matrix,
            conn,
            pending: &mut self.pending,
            state: &self.state,
            commands: &self.commands,
        };
        let result = command(&mut ctx, &msg);

        match result {
            Ok(Transition::Stay) => Handler::Registration(self),
            Ok(Transition::Become(next)) => next,
            Err(e) => {
                debug!(command = %msg.command, error = %e, code = e.error_code(), "Command failed");
                if let Some(reply) =
                    e.to_irc_reply(&matrix.server_info.name, self.pending.reply_nick(), &msg.command)
                {
                    conn.send(Arc::new(reply));
                }
                Handler::Registration(self)
            }
        }
    }
}

/// Handler for a registered session.
pub struct UserHandler {
    state: MatrixHandle,
    /// Cached nick; refreshed after every command.
    nick: String,
    commands: Arc<Commands>,
}

impl UserHandler {
    async fn handle(mut self, conn: &ConnectionHandle, msg: Message) -> Handler {
        let mut matrix = self.state.acquire().await;

        let Some(command) = self.commands.user_command(&msg.command) else {
            return Handler::User(self);
        };
        let Some(uid) = matrix.user_id(&self.nick) else {
            warn!(nick = %self.nick, "Registered session has no user");
            return Handler::User(self);
        };

        let span = crate::telemetry::spans::command(&msg.command, &self.nick);
        let _enter = span.enter();

        let mut ctx = Context {
            matrix: &mut matrix,
            conn,
            uid,
        };
        let result = command(&mut ctx, &msg);

        if let Some(user) = matrix.user(uid) {
            self.nick.clone_from(&user.nick);
        }

        match result {
            Ok(Transition::Stay) => Handler::User(self),
            Ok(Transition::Become(next)) => next,
            Err(e) => {
                debug!(error = %e, code = e.error_code(), "Command failed");
                if let Some(reply) =
                    e.to_irc_reply(&matrix.server_info.name, &self.nick, &msg.command)
                {
                    conn.send(Arc::new(reply));
                }
                Handler::User(self)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing::server_info;
    use crate::state::{Matrix, MatrixConfig};
    use tokio::sync::mpsc;

    fn setup() -> (MatrixHandle, Arc<Commands>) {
        let state = MatrixHandle::new(Matrix::new(server_info(), MatrixConfig::default()));
        (state, Arc::new(Commands::new()))
    }

    fn line(s: &str) -> Message {
        s.parse().unwrap()
    }

    fn drain(rx: &mut mpsc::Receiver<Arc<Message>>) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg.command.clone());
        }
        out
    }

    async fn register(
        state: &MatrixHandle,
        commands: &Arc<Commands>,
        conn: &ConnectionHandle,
        nick: &str,
    ) -> Handler {
        let h = Handler::registration(state.clone(), Arc::clone(commands));
        let h = h.handle(conn, line(&format!("NICK {nick}"))).await;
        let h = h.handle(conn, line(&format!("USER {nick} 0 * :{nick}"))).await;
        assert!(h.is_registered());
        h
    }

    #[tokio::test]
    async fn every_dispatch_releases_the_matrix() {
        let (state, commands) = setup();
        let (conn, _rx) = ConnectionHandle::detached(1, 64);
        let mut h = register(&state, &commands, &conn, "alice").await;
        for raw in ["FOO bar", "PRIVMSG nobody :hi", "JOIN", "JOIN #a", "PING x"] {
            h = h.handle(&conn, line(raw)).await;
        }
        let stats = state.stats();
        assert_eq!(stats.acquired, 7);
        assert_eq!(stats.outstanding(), 0);
    }

    #[tokio::test]
    async fn unknown_command_is_ignored() {
        let (state, commands) = setup();
        let (conn, mut rx) = ConnectionHandle::detached(1, 64);
        let h = register(&state, &commands, &conn, "alice").await;
        drain(&mut rx);
        let before = state.stats().acquired;

        let h = h.handle(&conn, line("FROB :x")).await;
        assert_eq!(h.nick(), Some("alice"));
        assert!(drain(&mut rx).is_empty());
        assert_eq!(state.stats().acquired, before + 1);
        assert_eq!(state.stats().outstanding(), 0);
        assert!(!conn.is_killed());
    }

    #[tokio::test]
    async fn user_commands_need_registration() {
        let (state, commands) = setup();
        let (conn, mut rx) = ConnectionHandle::detached(1, 16);
        let h = Handler::registration(state.clone(), commands);
        let h = h.handle(&conn, line("PRIVMSG bob :hi")).await;
        let h = h.handle(&conn, line("FOO")).await;
        assert!(!h.is_registered());
        assert_eq!(drain(&mut rx), vec!["451"]);
    }

    #[tokio::test]
    async fn registration_sends_welcome() {
        let (state, commands) = setup();
        let (conn, mut rx) = ConnectionHandle::detached(1, 64);
        let h = register(&state, &commands, &conn, "alice").await;
        assert_eq!(h.nick(), Some("alice"));
        let replies = drain(&mut rx);
        assert_eq!(&replies[..4], ["001", "002", "003", "004"]);
        assert_eq!(replies.last().map(String::as_str), Some("422"));
    }

    #[tokio::test]
    async fn nick_change_is_followed() {
        let (state, commands) = setup();
        let (conn, mut rx) = ConnectionHandle::detached(1, 64);
        let h = register(&state, &commands, &conn, "alice").await;
        let h = h.handle(&conn, line("NICK bob")).await;
        assert_eq!(h.nick(), Some("bob"));
        drain(&mut rx);

        let h = h.handle(&conn, line("AWAY :lunch")).await;
        assert_eq!(drain(&mut rx), vec!["306"]);
        let matrix = state.acquire().await;
        assert_eq!(matrix.get_user("bob").and_then(|u| u.away.clone()).as_deref(), Some("lunch"));
        assert!(matrix.get_user("alice").is_none());
        drop(matrix);
        drop(h);
    }

    #[tokio::test]
    async fn closed_only_removes_own_user() {
        let (state, commands) = setup();
        let (conn, _rx) = ConnectionHandle::detached(1, 64);
        let h = register(&state, &commands, &conn, "alice").await;

        let (other, _other_rx) = ConnectionHandle::detached(2, 8);
        h.closed(&other).await;
        assert!(other.is_killed());
        assert_eq!(state.acquire().await.user_count(), 1);

        h.closed(&conn).await;
        assert!(conn.is_killed());
        assert_eq!(state.acquire().await.user_count(), 0);
    }

    #[tokio::test]
    async fn quit_removes_user_and_kills() {
        let (state, commands) = setup();
        let (conn, mut rx) = ConnectionHandle::detached(1, 64);
        let h = register(&state, &commands, &conn, "alice").await;
        drain(&mut rx);
        let h = h.handle(&conn, line("QUIT :bye")).await;
        assert!(conn.is_killed());
        assert_eq!(drain(&mut rx), vec!["ERROR"]);
        assert_eq!(state.acquire().await.user_count(), 0);
        h.closed(&conn).await;
        assert_eq!(state.stats().outstanding(), 0);
    }
}
