//! Channel command handlers.
//!
//! Handles JOIN, PART, TOPIC, NAMES, LIST, KICK and INVITE.

pub mod invite;
pub mod join;
pub mod kick;
pub mod list;
pub mod names;
pub mod part;
pub mod topic;

use crate::error::{ChannelError, HandlerError};
use crate::state::{Channel, Matrix, UserId};

/// Look up a channel the acting user must be on.
pub(super) fn joined_channel<'m>(
    matrix: &'m Matrix,
    name: &str,
    uid: UserId,
) -> Result<&'m Channel, HandlerError> {
    let chan = matrix
        .channel(name)
        .ok_or_else(|| HandlerError::NoSuchChannel(name.to_string()))?;
    if !chan.is_member(uid) {
        return Err(HandlerError::channel(&chan.name, ChannelError::NotOnChannel));
    }
    Ok(chan)
}

/// Like [`joined_channel`], additionally requiring operator status.
pub(super) fn operated_channel<'m>(
    matrix: &'m Matrix,
    name: &str,
    uid: UserId,
) -> Result<&'m Channel, HandlerError> {
    let chan = joined_channel(matrix, name, uid)?;
    if !chan.is_op(uid) {
        return Err(HandlerError::channel(&chan.name, ChannelError::ChanOpPrivsNeeded));
    }
    Ok(chan)
}
