//! Helper functions for IRC command handlers.

use crate::error::HandlerError;
use braid_proto::Message;

/// Argument `index`, or ERR_NEEDMOREPARAMS when it is missing or empty.
pub fn need(msg: &Message, index: usize) -> Result<&str, HandlerError> {
    match msg.arg(index) {
        Some(arg) if !arg.is_empty() => Ok(arg),
        _ => Err(HandlerError::NeedMoreParams),
    }
}

/// Split a comma-separated target list, skipping empty entries.
pub fn split_list(list: &str) -> impl Iterator<Item = &str> {
    list.split(',').filter(|s| !s.is_empty())
}

/// A message originating from `mask` (a user's `nick!user@host`).
pub fn from_user(mask: &str, command: &str) -> Message {
    Message::new(command).with_prefix(mask)
}
