//! Command tables.
//!
//! Built once at startup and shared by every connection. One table per
//! session phase; a command missing from a phase's table is ignored in
//! that phase.

use super::context::{RegCommand, UserCommand};
use crate::handlers::{
    channel::{invite, join, kick, list, names, part, topic},
    connection::{nick, ping, quit, user},
    messaging, mode, server_query, user_query, user_status,
};
use std::collections::HashMap;

/// Per-phase dispatch tables.
pub struct Commands {
    registration: HashMap<&'static str, RegCommand>,
    user: HashMap<&'static str, UserCommand>,
}

impl Commands {
    /// Create the tables with all commands registered.
    pub fn new() -> Self {
        let mut registration: HashMap<&'static str, RegCommand> = HashMap::new();
        registration.insert("NICK", nick::handle_unregistered);
        registration.insert("USER", user::handle_unregistered);
        registration.insert("PING", ping::handle_unregistered);
        registration.insert("QUIT", quit::handle_unregistered);

        let mut user: HashMap<&'static str, UserCommand> = HashMap::new();
        user.insert("AWAY", user_status::away);
        user.insert("INVITE", invite::handle);
        user.insert("JOIN", join::handle);
        user.insert("KICK", kick::handle);
        user.insert("LIST", list::handle);
        user.insert("MODE", mode::handle);
        user.insert("MOTD", server_query::motd);
        user.insert("NAMES", names::handle);
        user.insert("NICK", nick::handle);
        user.insert("NOTICE", messaging::notice);
        user.insert("PART", part::handle);
        user.insert("PING", ping::handle);
        user.insert("PONG", ping::handle_pong);
        user.insert("PRIVMSG", messaging::privmsg);
        user.insert("QUIT", quit::handle);
        user.insert("TOPIC", topic::handle);
        user.insert("USER", user::handle_registered);
        user.insert("WHO", user_query::who);

        Self { registration, user }
    }

    pub fn user_command(&self, name: &str) -> Option<UserCommand> {
        self.user.get(name.to_ascii_uppercase().as_str()).copied()
    }

    pub fn registration_command(&self, name: &str) -> Option<RegCommand> {
        self.registration
            .get(name.to_ascii_uppercase().as_str())
            .copied()
    }

    /// Registered-phase command names, sorted.
    pub fn user_command_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.user.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for Commands {
    fn default() -> Self {
        Self::new()
    }
}
