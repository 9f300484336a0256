//! # braid-proto
//!
//! IRC message grammar and wire encoding for the braid server.
//!
//! - [`Message`] parsing (`str::parse`) and encoding ([`Message::to_line`])
//! - [`IrcCodec`] / [`LineCodec`] for `tokio_util::codec` framing
//! - [`Response`] numerics
//! - Nickname/channel validation and RFC 1459 casemapping
//!
//! ```rust
//! use braid_proto::Message;
//!
//! let msg: Message = ":nick!user@host PRIVMSG #rust :hello there".parse().unwrap();
//! assert_eq!(msg.command, "PRIVMSG");
//! assert_eq!(msg.arg(0), Some("#rust"));
//! assert_eq!(msg.arg(1), Some("hello there"));
//! assert_eq!(msg.to_line().as_deref(), Some(":nick!user@host PRIVMSG #rust :hello there\r\n"));
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod casemap;
pub mod chan;
pub mod error;
pub mod irc;
pub mod line;
pub mod message;
pub mod nick;
pub mod response;

pub use self::casemap::{irc_eq, irc_to_lower};
pub use self::chan::ChannelExt;
pub use self::error::{MessageParseError, ProtocolError};
pub use self::irc::IrcCodec;
pub use self::line::LineCodec;
pub use self::message::{Message, MAX_LINE_LEN, MAX_PARAMS};
pub use self::nick::{NickExt, DEFAULT_NICK_MAX_LEN};
pub use self::response::Response;
