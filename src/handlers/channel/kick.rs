//! KICK command handler.
//!
//! ```text
//! KICK <channel> <nick> [<reason>]
//! ```

use super::operated_channel;
use crate::error::{ChannelError, HandlerError};
use crate::handlers::core::{CommandResult, Context, Transition};
use crate::handlers::helpers::{from_user, need};
use crate::state::Sink;
use braid_proto::Message;
use std::sync::Arc;
use tracing::info;

pub fn handle(ctx: &mut Context<'_>, msg: &Message) -> CommandResult {
    let name = need(msg, 0)?;
    let target_nick = need(msg, 1)?;

    let chan = operated_channel(ctx.matrix, name, ctx.uid)?;
    let target = ctx
        .matrix
        .get_user(target_nick)
        .ok_or_else(|| HandlerError::NoSuchNick(target_nick.to_string()))?;
    if !chan.is_member(target.id) {
        return Err(HandlerError::channel(
            &chan.name,
            ChannelError::UserNotInChannel(target.nick.clone()),
        ));
    }

    let kicker = ctx.user()?;
    let reason = msg
        .arg(2)
        .filter(|r| !r.is_empty())
        .unwrap_or(kicker.nick.as_str())
        .to_string();
    let kick = from_user(&kicker.hostmask(), "KICK")
        .with_param(chan.name.as_str())
        .with_param(target.nick.as_str())
        .with_trailing(reason);
    info!(channel = %chan.name, kicker = %kicker.nick, target = %target.nick, "Kick");

    let target_id = target.id;
    if let Some(sink) = ctx.matrix.channel_sink(name) {
        sink.send(Arc::new(kick));
    }
    ctx.matrix.part_channel(name, target_id);
    Ok(Transition::Stay)
}
