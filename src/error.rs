//! Unified error handling for braid.
//!
//! Command functions report protocol-level failures as [`HandlerError`];
//! the handler turns them into ordinary numeric replies to the originating
//! connection. They never tear the session down.

use braid_proto::{Message, Response};
use thiserror::Error;

// ============================================================================
// Handler Errors (command processing)
// ============================================================================

/// Errors that can occur during command handling.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("not enough parameters")]
    NeedMoreParams,

    #[error("no text to send")]
    NoTextToSend,

    #[error("no recipient given")]
    NoRecipient,

    #[error("no nickname given")]
    NoNicknameGiven,

    #[error("nickname in use: {0}")]
    NicknameInUse(String),

    #[error("erroneous nickname: {0}")]
    ErroneousNickname(String),

    #[error("not registered")]
    NotRegistered,

    #[error("already registered")]
    AlreadyRegistered,

    #[error("no such nick: {0}")]
    NoSuchNick(String),

    #[error("no such channel: {0}")]
    NoSuchChannel(String),

    #[error("bad channel mask: {0}")]
    BadChanMask(String),

    #[error("too many channels: {0}")]
    TooManyChannels(String),

    #[error("cannot send to channel: {0}")]
    CannotSendToChan(String),

    #[error("unknown mode: {0}")]
    UnknownMode(char),

    #[error("{channel}: {error}")]
    Channel { channel: String, error: ChannelError },

    #[error("internal error: {0}")]
    Internal(String),
}

impl HandlerError {
    /// Get a static error code string for log labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NeedMoreParams => "need_more_params",
            Self::NoTextToSend => "no_text_to_send",
            Self::NoRecipient => "no_recipient",
            Self::NoNicknameGiven => "no_nickname_given",
            Self::NicknameInUse(_) => "nickname_in_use",
            Self::ErroneousNickname(_) => "erroneous_nickname",
            Self::NotRegistered => "not_registered",
            Self::AlreadyRegistered => "already_registered",
            Self::NoSuchNick(_) => "no_such_nick",
            Self::NoSuchChannel(_) => "no_such_channel",
            Self::BadChanMask(_) => "bad_chan_mask",
            Self::TooManyChannels(_) => "too_many_channels",
            Self::CannotSendToChan(_) => "cannot_send_to_chan",
            Self::UnknownMode(_) => "unknown_mode",
            Self::Channel { .. } => "channel",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Shorthand for a channel-scoped error.
    pub fn channel(channel: impl Into<String>, error: ChannelError) -> Self {
        Self::Channel {
            channel: channel.into(),
            error,
        }
    }

    /// Convert to an IRC error reply message.
    ///
    /// Returns `None` for errors that don't warrant a client-visible reply.
    pub fn to_irc_reply(&self, server_name: &str, nick: &str, cmd_name: &str) -> Option<Message> {
        let nick = nick.to_string();
        let (response, args) = match self {
            Self::NeedMoreParams => (
                Response::ERR_NEEDMOREPARAMS,
                vec![nick, cmd_name.to_string(), "Not enough parameters".into()],
            ),
            Self::NoTextToSend => (Response::ERR_NOTEXTTOSEND, vec![nick, "No text to send".into()]),
            Self::NoRecipient => (
                Response::ERR_NORECIPIENT,
                vec![nick, format!("No recipient given ({cmd_name})")],
            ),
            Self::NoNicknameGiven => (
                Response::ERR_NONICKNAMEGIVEN,
                vec![nick, "No nickname given".into()],
            ),
            Self::NicknameInUse(bad) => (
                Response::ERR_NICKNAMEINUSE,
                vec![nick, bad.clone(), "Nickname is already in use".into()],
            ),
            Self::ErroneousNickname(bad) => (
                Response::ERR_ERRONEOUSNICKNAME,
                vec![nick, bad.clone(), "Erroneous nickname".into()],
            ),
            Self::NotRegistered => (
                Response::ERR_NOTREGISTERED,
                vec![nick, "You have not registered".into()],
            ),
            Self::AlreadyRegistered => (
                Response::ERR_ALREADYREGISTRED,
                vec![nick, "You may not reregister".into()],
            ),
            Self::NoSuchNick(target) => (
                Response::ERR_NOSUCHNICK,
                vec![nick, target.clone(), "No such nick/channel".into()],
            ),
            Self::NoSuchChannel(chan) => (
                Response::ERR_NOSUCHCHANNEL,
                vec![nick, chan.clone(), "No such channel".into()],
            ),
            Self::BadChanMask(chan) => (
                Response::ERR_BADCHANMASK,
                vec![nick, chan.clone(), "Bad Channel Mask".into()],
            ),
            Self::TooManyChannels(chan) => (
                Response::ERR_TOOMANYCHANNELS,
                vec![nick, chan.clone(), "You have joined too many channels".into()],
            ),
            Self::CannotSendToChan(chan) => (
                Response::ERR_CANNOTSENDTOCHAN,
                vec![nick, chan.clone(), "Cannot send to channel".into()],
            ),
            Self::UnknownMode(c) => (
                Response::ERR_UNKNOWNMODE,
                vec![nick, c.to_string(), "is unknown mode char to me".into()],
            ),
            Self::Channel { channel, error } => {
                return Some(error.to_irc_reply(server_name, &nick, channel));
            }
            Self::Internal(_) => return None,
        };
        Some(Message::numeric(server_name, response, args))
    }
}

// ============================================================================
// Channel Errors
// ============================================================================

/// Channel operation errors.
///
/// These represent channel-specific refusals that map to RFC-compliant
/// numerics scoped to one channel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    #[error("not on channel")]
    NotOnChannel,

    #[error("you're not channel operator")]
    ChanOpPrivsNeeded,

    #[error("user {0} is not on that channel")]
    UserNotInChannel(String),

    #[error("user {0} is already on that channel")]
    UserOnChannel(String),

    #[error("cannot join channel (+b)")]
    BannedFromChan,

    #[error("cannot join channel (+i)")]
    InviteOnlyChan,

    #[error("cannot join channel (+l)")]
    ChannelIsFull,

    #[error("cannot join channel (+k)")]
    BadChannelKey,
}

impl ChannelError {
    /// Convert to an IRC error reply message.
    pub fn to_irc_reply(&self, server_name: &str, nick: &str, channel: &str) -> Message {
        let nick = nick.to_string();
        let channel = channel.to_string();
        let (response, args) = match self {
            Self::NotOnChannel => (
                Response::ERR_NOTONCHANNEL,
                vec![nick, channel, "You're not on that channel".into()],
            ),
            Self::ChanOpPrivsNeeded => (
                Response::ERR_CHANOPRIVSNEEDED,
                vec![nick, channel, "You're not channel operator".into()],
            ),
            Self::UserNotInChannel(target) => (
                Response::ERR_USERNOTINCHANNEL,
                vec![nick, target.clone(), channel, "They aren't on that channel".into()],
            ),
            Self::UserOnChannel(target) => (
                Response::ERR_USERONCHANNEL,
                vec![nick, target.clone(), channel, "is already on channel".into()],
            ),
            Self::BannedFromChan => (
                Response::ERR_BANNEDFROMCHAN,
                vec![nick, channel, "Cannot join channel (+b)".into()],
            ),
            Self::InviteOnlyChan => (
                Response::ERR_INVITEONLYCHAN,
                vec![nick, channel, "Cannot join channel (+i)".into()],
            ),
            Self::ChannelIsFull => (
                Response::ERR_CHANNELISFULL,
                vec![nick, channel, "Cannot join channel (+l)".into()],
            ),
            Self::BadChannelKey => (
                Response::ERR_BADCHANNELKEY,
                vec![nick, channel, "Cannot join channel (+k)".into()],
            ),
        };
        Message::numeric(server_name, response, args)
    }
}
