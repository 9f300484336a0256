//! Channel entity and broadcast sink.
//!
//! Membership is three sets of [`UserId`]: clients, ops and voice. Ops and
//! voice are always subsets of clients; every mutator here keeps it that way.
//! A `Channel` is only reachable through a [`Matrix`](super::Matrix), which
//! in turn is only reachable while the hand-off guard is held, so broadcasts
//! never observe a half-updated member set.

use super::{Sink, User, UserId};
use braid_proto::{Message, irc_to_lower};
use chrono::{DateTime, Utc};
use glob::{MatchOptions, Pattern};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Channel topic with metadata.
#[derive(Debug, Clone)]
pub struct Topic {
    pub text: String,
    pub set_by: String,
    pub set_at: DateTime<Utc>,
}

/// A `nick!user@host` ban mask. `*` and `?` are wildcards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BanMask {
    pub nick: String,
    pub user: String,
    pub host: String,
}

impl BanMask {
    /// Parse a mask, filling missing parts with `*`.
    ///
    /// `bob` becomes `bob!*@*`, `*@evil.host` becomes `*!*@evil.host`.
    pub fn parse(mask: &str) -> Self {
        let (nick_user, host) = match mask.split_once('@') {
            Some((left, host)) => (left, host),
            None => (mask, "*"),
        };
        let (nick, user) = match nick_user.split_once('!') {
            Some((nick, user)) => (nick, user),
            None if mask.contains('@') => ("*", nick_user),
            None => (nick_user, "*"),
        };
        let or_star = |s: &str| if s.is_empty() { "*".to_string() } else { s.to_string() };
        Self {
            nick: or_star(nick),
            user: or_star(user),
            host: or_star(host),
        }
    }

    /// Whether `user` is covered by this mask (case-insensitive).
    pub fn matches(&self, user: &User) -> bool {
        wildcard_match(&self.nick, &user.nick)
            && wildcard_match(&self.user, &user.username)
            && wildcard_match(&self.host, &user.host)
    }
}

impl fmt::Display for BanMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}!{}@{}", self.nick, self.user, self.host)
    }
}

/// IRC wildcard match. Only `*` and `?` are special; `[` and `]` are
/// ordinary nick characters, so everything else is escaped for `glob`.
fn wildcard_match(mask: &str, value: &str) -> bool {
    let mut pattern = String::with_capacity(mask.len());
    for c in irc_to_lower(mask).chars() {
        match c {
            '*' | '?' => pattern.push(c),
            _ => pattern.push_str(&Pattern::escape(c.encode_utf8(&mut [0; 4]))),
        }
    }
    let options = MatchOptions {
        case_sensitive: false,
        require_literal_separator: false,
        require_literal_leading_dot: false,
    };
    Pattern::new(&pattern)
        .map(|p| p.matches_with(&irc_to_lower(value), options))
        .unwrap_or(false)
}

/// A channel.
#[derive(Debug)]
pub struct Channel {
    pub name: String,
    pub topic: Option<Topic>,
    /// Join limit (+l).
    pub limit: Option<usize>,
    /// Join key (+k).
    pub key: Option<String>,
    /// Ban masks (+b).
    pub bans: Vec<BanMask>,
    /// Invite-only (+i).
    pub invite_only: bool,
    pub created_at: DateTime<Utc>,
    clients: HashSet<UserId>,
    ops: HashSet<UserId>,
    voice: HashSet<UserId>,
    invites: HashSet<UserId>,
}

impl Channel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            topic: None,
            limit: None,
            key: None,
            bans: Vec::new(),
            invite_only: false,
            created_at: Utc::now(),
            clients: HashSet::new(),
            ops: HashSet::new(),
            voice: HashSet::new(),
            invites: HashSet::new(),
        }
    }

    /// Add a member. Returns `false` if already present.
    ///
    /// Consumes any pending invite for the user.
    pub fn add_member(&mut self, id: UserId) -> bool {
        self.invites.remove(&id);
        self.clients.insert(id)
    }

    /// Remove a member from all three sets. Returns `false` if absent.
    pub fn remove_member(&mut self, id: UserId) -> bool {
        self.ops.remove(&id);
        self.voice.remove(&id);
        self.clients.remove(&id)
    }

    pub fn is_member(&self, id: UserId) -> bool {
        self.clients.contains(&id)
    }

    pub fn is_op(&self, id: UserId) -> bool {
        self.ops.contains(&id)
    }

    pub fn is_voiced(&self, id: UserId) -> bool {
        self.voice.contains(&id)
    }

    /// Grant or revoke operator status. Non-members are refused.
    pub fn set_op(&mut self, id: UserId, op: bool) -> bool {
        set_flag(&self.clients, &mut self.ops, id, op)
    }

    /// Grant or revoke voice. Non-members are refused.
    pub fn set_voice(&mut self, id: UserId, voice: bool) -> bool {
        set_flag(&self.clients, &mut self.voice, id, voice)
    }

    pub fn invite(&mut self, id: UserId) {
        self.invites.insert(id);
    }

    pub fn is_invited(&self, id: UserId) -> bool {
        self.invites.contains(&id)
    }

    pub fn members(&self) -> impl Iterator<Item = UserId> + '_ {
        self.clients.iter().copied()
    }

    pub fn member_count(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.limit.is_some_and(|limit| self.clients.len() >= limit)
    }

    pub fn is_banned(&self, user: &User) -> bool {
        self.bans.iter().any(|ban| ban.matches(user))
    }

    /// Add a ban mask. Returns `false` if it was already listed.
    pub fn add_ban(&mut self, mask: BanMask) -> bool {
        if self.bans.contains(&mask) {
            return false;
        }
        self.bans.push(mask);
        true
    }

    /// Remove a ban mask. Returns `false` if it was not listed.
    pub fn remove_ban(&mut self, mask: &BanMask) -> bool {
        let before = self.bans.len();
        self.bans.retain(|ban| ban != mask);
        self.bans.len() != before
    }

    /// NAMES prefix for a member: `@` for ops, `+` for voice.
    pub fn prefix_for(&self, id: UserId) -> &'static str {
        if self.is_op(id) {
            "@"
        } else if self.is_voiced(id) {
            "+"
        } else {
            ""
        }
    }

    /// Mode string and arguments, e.g. `("+ikl", ["secret", "10"])`.
    ///
    /// The key is only revealed to members.
    pub fn mode_string(&self, reveal_key: bool) -> (String, Vec<String>) {
        let mut modes = String::from("+");
        let mut args = Vec::new();
        if self.invite_only {
            modes.push('i');
        }
        if let Some(key) = &self.key {
            modes.push('k');
            args.push(if reveal_key { key.clone() } else { "*".to_string() });
        }
        if let Some(limit) = self.limit {
            modes.push('l');
            args.push(limit.to_string());
        }
        (modes, args)
    }
}

fn set_flag(clients: &HashSet<UserId>, set: &mut HashSet<UserId>, id: UserId, on: bool) -> bool {
    if !clients.contains(&id) {
        return false;
    }
    if on {
        set.insert(id);
    } else {
        set.remove(&id);
    }
    true
}

/// Fan-out sink bound to one channel.
///
/// Borrows the member set and the user table from the same `Matrix`, so
/// membership cannot change while a broadcast is in progress.
pub struct ChannelSink<'a> {
    channel: &'a Channel,
    users: &'a HashMap<UserId, User>,
}

impl<'a> ChannelSink<'a> {
    pub(crate) fn new(channel: &'a Channel, users: &'a HashMap<UserId, User>) -> Self {
        Self { channel, users }
    }

    /// Deliver to every member except `except`.
    pub fn send_except(&self, msg: Arc<Message>, except: UserId) {
        for id in self.channel.members().filter(|id| *id != except) {
            if let Some(user) = self.users.get(&id) {
                user.sink().send(Arc::clone(&msg));
            }
        }
    }
}

impl Sink for ChannelSink<'_> {
    fn send(&self, msg: Arc<Message>) {
        for id in self.channel.members() {
            if let Some(user) = self.users.get(&id) {
                user.sink().send(Arc::clone(&msg));
            }
        }
    }
}
