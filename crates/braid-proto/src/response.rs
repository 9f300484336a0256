//! IRC numeric response codes (RFC 2812).
//!
//! Only the numerics the braid server emits are listed.

#![allow(non_camel_case_types)]

use std::fmt;

/// IRC server response code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u16)]
#[non_exhaustive]
pub enum Response {
    // === Connection Registration ===
    /// 001 - Welcome to the IRC network
    RPL_WELCOME = 1,
    /// 002 - Your host is running version
    RPL_YOURHOST = 2,
    /// 003 - Server creation date
    RPL_CREATED = 3,
    /// 004 - Server info
    RPL_MYINFO = 4,

    // === Command Responses ===
    /// 301 - Target is away
    RPL_AWAY = 301,
    /// 305 - No longer marked away
    RPL_UNAWAY = 305,
    /// 306 - Marked away
    RPL_NOWAWAY = 306,
    /// 315 - End of WHO
    RPL_ENDOFWHO = 315,
    /// 321 - LIST header
    RPL_LISTSTART = 321,
    /// 322 - LIST entry
    RPL_LIST = 322,
    /// 323 - End of LIST
    RPL_LISTEND = 323,
    /// 324 - Channel modes
    RPL_CHANNELMODEIS = 324,
    /// 331 - No topic set
    RPL_NOTOPIC = 331,
    /// 332 - Channel topic
    RPL_TOPIC = 332,
    /// 333 - Topic setter and time
    RPL_TOPICWHOTIME = 333,
    /// 341 - Invite sent
    RPL_INVITING = 341,
    /// 352 - WHO entry
    RPL_WHOREPLY = 352,
    /// 353 - NAMES entry
    RPL_NAMREPLY = 353,
    /// 366 - End of NAMES
    RPL_ENDOFNAMES = 366,
    /// 367 - Ban list entry
    RPL_BANLIST = 367,
    /// 368 - End of ban list
    RPL_ENDOFBANLIST = 368,
    /// 372 - MOTD line
    RPL_MOTD = 372,
    /// 375 - MOTD start
    RPL_MOTDSTART = 375,
    /// 376 - End of MOTD
    RPL_ENDOFMOTD = 376,

    // === Error Replies ===
    /// 401 - No such nick/channel
    ERR_NOSUCHNICK = 401,
    /// 403 - No such channel
    ERR_NOSUCHCHANNEL = 403,
    /// 404 - Cannot send to channel
    ERR_CANNOTSENDTOCHAN = 404,
    /// 405 - Joined too many channels
    ERR_TOOMANYCHANNELS = 405,
    /// 411 - No recipient given
    ERR_NORECIPIENT = 411,
    /// 412 - No text to send
    ERR_NOTEXTTOSEND = 412,
    /// 422 - MOTD file missing
    ERR_NOMOTD = 422,
    /// 431 - No nickname given
    ERR_NONICKNAMEGIVEN = 431,
    /// 432 - Erroneous nickname
    ERR_ERRONEOUSNICKNAME = 432,
    /// 433 - Nickname in use
    ERR_NICKNAMEINUSE = 433,
    /// 441 - User not in channel
    ERR_USERNOTINCHANNEL = 441,
    /// 442 - Not on channel
    ERR_NOTONCHANNEL = 442,
    /// 443 - User already on channel
    ERR_USERONCHANNEL = 443,
    /// 451 - Not registered
    ERR_NOTREGISTERED = 451,
    /// 461 - Not enough parameters
    ERR_NEEDMOREPARAMS = 461,
    /// 462 - Already registered
    ERR_ALREADYREGISTRED = 462,
    /// 471 - Channel is full (+l)
    ERR_CHANNELISFULL = 471,
    /// 472 - Unknown mode character
    ERR_UNKNOWNMODE = 472,
    /// 473 - Invite only channel (+i)
    ERR_INVITEONLYCHAN = 473,
    /// 474 - Banned from channel (+b)
    ERR_BANNEDFROMCHAN = 474,
    /// 475 - Bad channel key (+k)
    ERR_BADCHANNELKEY = 475,
    /// 476 - Bad channel mask
    ERR_BADCHANMASK = 476,
    /// 482 - Channel operator privileges needed
    ERR_CHANOPRIVSNEEDED = 482,
}

impl Response {
    /// Numeric value of the response.
    #[inline]
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Whether this is an error reply (400-599).
    pub fn is_error(self) -> bool {
        (400..600).contains(&self.code())
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}", self.code())
    }
}
