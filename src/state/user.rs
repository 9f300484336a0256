//! Registered users.

use super::Sink;
use braid_proto::{Message, irc_to_lower};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Stable registry key for a user. Nicks change, ids do not.
pub type UserId = u64;

/// A registered user.
pub struct User {
    pub id: UserId,
    pub nick: String,
    pub username: String,
    pub realname: String,
    pub host: String,
    /// Away message, if the user is marked away.
    pub away: Option<String>,
    /// Connection this user registered from.
    pub connection: Option<u64>,
    /// Folded names of joined channels.
    pub(crate) channels: HashSet<String>,
    sink: Arc<dyn Sink>,
}

/// Parameters for creating a new user.
pub struct UserParams {
    pub nick: String,
    pub username: String,
    pub realname: String,
    pub host: String,
    pub connection: Option<u64>,
    pub sink: Arc<dyn Sink>,
}

impl User {
    pub(crate) fn new(id: UserId, params: UserParams) -> Self {
        Self {
            id,
            nick: params.nick,
            username: params.username,
            realname: params.realname,
            host: params.host,
            away: None,
            connection: params.connection,
            channels: HashSet::new(),
            sink: params.sink,
        }
    }

    /// `nick!user@host`, used as the prefix of messages this user originates.
    pub fn hostmask(&self) -> String {
        format!("{}!{}@{}", self.nick, self.username, self.host)
    }

    /// Folded nick, the key of the nick index.
    pub fn nick_key(&self) -> String {
        irc_to_lower(&self.nick)
    }

    /// Folded names of the channels this user is on.
    pub fn channels(&self) -> impl Iterator<Item = &str> {
        self.channels.iter().map(String::as_str)
    }

    /// Direct delivery sink.
    pub fn sink(&self) -> &dyn Sink {
        self.sink.as_ref()
    }

    /// Queue a message for this user.
    pub fn send(&self, msg: impl Into<Arc<Message>>) {
        self.sink.send(msg.into());
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("nick", &self.nick)
            .field("username", &self.username)
            .field("host", &self.host)
            .field("away", &self.away)
            .field("channels", &self.channels)
            .finish_non_exhaustive()
    }
}
