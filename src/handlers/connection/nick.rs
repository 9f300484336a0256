//! NICK command handler.
//!
//! # RFC 2812 §3.1.2 - Nick message
//!
//! ```text
//! NICK <nickname>
//! ```
//!
//! Before registration it records the requested nick. Afterwards it renames
//! the user and tells the user and every channel peer, once each.

use super::welcome;
use crate::error::HandlerError;
use crate::handlers::core::{CommandResult, Context, RegContext, Transition};
use crate::handlers::helpers::from_user;
use braid_proto::{Message, NickExt};
use std::sync::Arc;
use tracing::info;

fn validate(nick: Option<&str>, max_len: usize) -> Result<&str, HandlerError> {
    let nick = nick
        .filter(|n| !n.is_empty())
        .ok_or(HandlerError::NoNicknameGiven)?;
    if !nick.is_valid_nick_len(max_len) {
        return Err(HandlerError::ErroneousNickname(nick.to_string()));
    }
    Ok(nick)
}

/// NICK during registration.
pub fn handle_unregistered(ctx: &mut RegContext<'_>, msg: &Message) -> CommandResult {
    let nick = validate(msg.arg(0), ctx.matrix.config.nick_len)?;
    if ctx.matrix.nick_in_use(nick) {
        return Err(HandlerError::NicknameInUse(nick.to_string()));
    }
    ctx.pending.nick = Some(nick.to_string());
    welcome::try_register(ctx)
}

/// NICK for a registered user.
pub fn handle(ctx: &mut Context<'_>, msg: &Message) -> CommandResult {
    let new_nick = validate(msg.arg(0), ctx.matrix.config.nick_len)?;
    let user = ctx.user()?;
    if user.nick == new_nick {
        return Ok(Transition::Stay);
    }
    let mask = user.hostmask();

    let old_nick = ctx.matrix.rename_user(ctx.uid, new_nick)?;
    info!(old = %old_nick, new = %new_nick, "Nick change");

    let notice = Arc::new(from_user(&mask, "NICK").with_trailing(new_nick));
    ctx.send(Arc::clone(&notice));
    for peer in ctx.matrix.peers_of(ctx.uid) {
        if let Some(user) = ctx.matrix.user(peer) {
            user.sink().send(Arc::clone(&notice));
        }
    }
    Ok(Transition::Stay)
}
