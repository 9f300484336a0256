//! Command handler context and core types.
//!
//! Command functions are plain synchronous functions. They receive a
//! context holding the exclusively-owned [`Matrix`] for the duration of the
//! call, and return a [`Transition`] telling the connection which
//! [`Handler`](super::Handler) to use for the next message.

use super::handler::Handler;
use super::registry::Commands;
use crate::error::HandlerError;
use crate::network::ConnectionHandle;
use crate::state::{Matrix, MatrixHandle, Sink, User, UserId};
use braid_proto::{Message, Response};
use std::sync::Arc;

/// What the connection should do with its handler after a command.
pub enum Transition {
    /// Keep the current handler.
    Stay,
    /// Switch session phase.
    Become(Handler),
}

/// Result type for command functions.
pub type CommandResult = Result<Transition, HandlerError>;

/// A registered-phase command.
pub type UserCommand = fn(&mut Context<'_>, &Message) -> CommandResult;

/// A registration-phase command.
pub type RegCommand = fn(&mut RegContext<'_>, &Message) -> CommandResult;

/// Handler context for registered users.
pub struct Context<'a> {
    /// Shared server state, exclusively held.
    pub matrix: &'a mut Matrix,
    /// The originating connection.
    pub conn: &'a ConnectionHandle,
    /// The acting user.
    pub uid: UserId,
}

impl Context<'_> {
    pub fn server_name(&self) -> &str {
        &self.matrix.server_info.name
    }

    /// The acting user.
    pub fn user(&self) -> Result<&User, HandlerError> {
        self.matrix
            .user(self.uid)
            .ok_or_else(|| HandlerError::Internal(format!("user {} vanished", self.uid)))
    }

    pub fn nick(&self) -> Result<&str, HandlerError> {
        self.user().map(|u| u.nick.as_str())
    }

    /// Send a message to the originating connection.
    pub fn send(&self, msg: impl Into<Arc<Message>>) {
        self.conn.send(msg.into());
    }

    /// Build and send a server numeric addressed to the acting user.
    pub fn reply(&self, response: Response, args: Vec<String>) -> Result<(), HandlerError> {
        let msg = numeric_to(self.server_name(), self.nick()?, response, args);
        self.send(msg);
        Ok(())
    }

    /// Report a failure to the user without aborting the command.
    ///
    /// Used by commands that act on several targets, where one bad target
    /// must not stop the rest.
    pub fn report(&self, err: &HandlerError, command: &str) {
        if let Ok(nick) = self.nick()
            && let Some(reply) = err.to_irc_reply(self.server_name(), nick, command)
        {
            self.send(reply);
        }
    }
}

/// Connection details collected before registration completes.
#[derive(Debug, Default, Clone)]
pub struct Registration {
    pub nick: Option<String>,
    pub username: Option<String>,
    pub realname: Option<String>,
}

impl Registration {
    pub fn is_complete(&self) -> bool {
        self.nick.is_some() && self.username.is_some()
    }

    /// Nick to address replies to: the requested one, or `*`.
    pub fn reply_nick(&self) -> &str {
        self.nick.as_deref().unwrap_or("*")
    }
}

/// Handler context for connections that have not registered yet.
pub struct RegContext<'a> {
    pub matrix: &'a mut Matrix,
    pub conn: &'a ConnectionHandle,
    pub pending: &'a mut Registration,
    /// Needed to build the registered-phase handler.
    pub state: &'a MatrixHandle,
    pub commands: &'a Arc<Commands>,
}

impl RegContext<'_> {
    pub fn server_name(&self) -> &str {
        &self.matrix.server_info.name
    }

    pub fn send(&self, msg: impl Into<Arc<Message>>) {
        self.conn.send(msg.into());
    }

    pub fn reply(&self, response: Response, args: Vec<String>) {
        let msg = numeric_to(self.server_name(), self.pending.reply_nick(), response, args);
        self.send(msg);
    }
}

/// `:server <numeric> <nick> args...`
pub fn numeric_to(server: &str, nick: &str, response: Response, args: Vec<String>) -> Message {
    let mut full = Vec::with_capacity(args.len() + 1);
    full.push(nick.to_string());
    full.extend(args);
    Message::numeric(server, response, full)
}
