//! The Matrix - Central shared state for the IRC server.
//!
//! The Matrix holds all users and channels. It is plain data: there is no
//! interior locking. Exclusive access is obtained through
//! [`MatrixHandle::acquire`](super::MatrixHandle::acquire), so every
//! mutation and every broadcast happens with exactly one owner.

use super::{Channel, ChannelSink, User, UserId, UserParams};
use crate::error::HandlerError;
use braid_proto::irc_to_lower;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// This server's identity information.
#[derive(Debug, Clone)]
pub struct ServerInfo {
    pub name: String,
    pub network: String,
    pub description: String,
    pub version: String,
    pub created: DateTime<Utc>,
    /// Message of the day, one entry per line. Empty means no MOTD.
    pub motd: Vec<String>,
}

/// Configuration accessible to handlers via Matrix.
#[derive(Debug, Clone)]
pub struct MatrixConfig {
    /// Maximum nickname length.
    pub nick_len: usize,
    /// Maximum channels per user.
    pub max_channels: usize,
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            nick_len: braid_proto::DEFAULT_NICK_MAX_LEN,
            max_channels: 20,
        }
    }
}

/// The Matrix - Central shared state container.
pub struct Matrix {
    /// This server's identity.
    pub server_info: ServerInfo,

    /// Server configuration (for handlers to access).
    pub config: MatrixConfig,

    /// All registered users, indexed by id.
    users: HashMap<UserId, User>,

    /// Folded nick to id mapping for nick lookups.
    nicks: HashMap<String, UserId>,

    /// All channels, indexed by folded name.
    channels: HashMap<String, Channel>,

    next_user_id: UserId,
}

impl Matrix {
    pub fn new(server_info: ServerInfo, config: MatrixConfig) -> Self {
        Self {
            server_info,
            config,
            users: HashMap::new(),
            nicks: HashMap::new(),
            channels: HashMap::new(),
            next_user_id: 1,
        }
    }

    // === Users ===

    /// Resolve a nick to a registered user.
    pub fn get_user(&self, nick: &str) -> Option<&User> {
        self.user_id(nick).and_then(|id| self.users.get(&id))
    }

    /// Resolve a nick to its user id.
    pub fn user_id(&self, nick: &str) -> Option<UserId> {
        self.nicks.get(&irc_to_lower(nick)).copied()
    }

    pub fn user(&self, id: UserId) -> Option<&User> {
        self.users.get(&id)
    }

    pub fn user_mut(&mut self, id: UserId) -> Option<&mut User> {
        self.users.get_mut(&id)
    }

    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    pub fn nick_in_use(&self, nick: &str) -> bool {
        self.nicks.contains_key(&irc_to_lower(nick))
    }

    /// Register a new user.
    pub fn add_user(&mut self, params: UserParams) -> Result<UserId, HandlerError> {
        let key = irc_to_lower(&params.nick);
        if self.nicks.contains_key(&key) {
            return Err(HandlerError::NicknameInUse(params.nick));
        }
        let id = self.next_user_id;
        self.next_user_id += 1;
        debug!(id, nick = %params.nick, "User registered");
        self.nicks.insert(key, id);
        self.users.insert(id, User::new(id, params));
        Ok(id)
    }

    /// Change a user's nick, returning the old one.
    ///
    /// A change that only differs in case is allowed.
    pub fn rename_user(&mut self, id: UserId, new_nick: &str) -> Result<String, HandlerError> {
        let new_key = irc_to_lower(new_nick);
        if let Some(owner) = self.nicks.get(&new_key)
            && *owner != id
        {
            return Err(HandlerError::NicknameInUse(new_nick.to_string()));
        }
        let user = self
            .users
            .get_mut(&id)
            .ok_or_else(|| HandlerError::Internal(format!("rename of unknown user {id}")))?;
        let old_nick = std::mem::replace(&mut user.nick, new_nick.to_string());
        self.nicks.remove(&irc_to_lower(&old_nick));
        self.nicks.insert(new_key, id);
        Ok(old_nick)
    }

    /// Remove a user from the registry and from every channel.
    ///
    /// Channels left empty are destroyed. Returns `None` if the user was
    /// already gone, which makes repeated teardown harmless.
    pub fn remove_user(&mut self, id: UserId) -> Option<User> {
        let user = self.users.remove(&id)?;
        let key = user.nick_key();
        if self.nicks.get(&key) == Some(&id) {
            self.nicks.remove(&key);
        }
        for name in &user.channels {
            self.leave(name, id);
        }
        debug!(id, nick = %user.nick, "User removed");
        Some(user)
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    // === Channels ===

    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels.get(&irc_to_lower(name))
    }

    pub fn channel_mut(&mut self, name: &str) -> Option<&mut Channel> {
        self.channels.get_mut(&irc_to_lower(name))
    }

    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.channels.values()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Add `id` to a channel, creating it on first join.
    ///
    /// The creator of a channel becomes its operator. Returns `true` if the
    /// channel was created. Admission checks are the caller's business.
    pub fn join_channel(&mut self, name: &str, id: UserId) -> bool {
        let key = irc_to_lower(name);
        let mut created = false;
        let channel = self.channels.entry(key.clone()).or_insert_with(|| {
            created = true;
            Channel::new(name)
        });
        channel.add_member(id);
        if created {
            channel.set_op(id, true);
            debug!(channel = %name, "Channel created");
        }
        if let Some(user) = self.users.get_mut(&id) {
            user.channels.insert(key);
        }
        created
    }

    /// Remove `id` from a channel, destroying it when empty.
    ///
    /// Returns `false` if the user was not a member.
    pub fn part_channel(&mut self, name: &str, id: UserId) -> bool {
        let key = irc_to_lower(name);
        if let Some(user) = self.users.get_mut(&id) {
            user.channels.remove(&key);
        }
        self.leave(&key, id)
    }

    fn leave(&mut self, key: &str, id: UserId) -> bool {
        let Some(channel) = self.channels.get_mut(key) else {
            return false;
        };
        let was_member = channel.remove_member(id);
        if channel.is_empty() {
            debug!(channel = %channel.name, "Channel destroyed");
            self.channels.remove(key);
        }
        was_member
    }

    /// Broadcast sink for a channel.
    pub fn channel_sink(&self, name: &str) -> Option<ChannelSink<'_>> {
        self.channel(name)
            .map(|channel| ChannelSink::new(channel, &self.users))
    }

    /// Everyone sharing at least one channel with `id`, excluding `id`.
    pub fn peers_of(&self, id: UserId) -> HashSet<UserId> {
        let Some(user) = self.users.get(&id) else {
            return HashSet::new();
        };
        user.channels
            .iter()
            .filter_map(|key| self.channels.get(key))
            .flat_map(|channel| channel.members())
            .filter(|peer| *peer != id)
            .collect()
    }
}
