//! INVITE command handler.
//!
//! ```text
//! INVITE <nick> <channel>
//! ```
//!
//! Inviting to a channel that does not exist is allowed and records
//! nothing. On an invite-only channel only operators may invite.

use crate::error::{ChannelError, HandlerError};
use crate::handlers::core::{CommandResult, Context, Transition};
use crate::handlers::helpers::{from_user, need};
use braid_proto::{Message, Response};

pub fn handle(ctx: &mut Context<'_>, msg: &Message) -> CommandResult {
    let target_nick = need(msg, 0)?;
    let name = need(msg, 1)?;

    let target = ctx
        .matrix
        .get_user(target_nick)
        .ok_or_else(|| HandlerError::NoSuchNick(target_nick.to_string()))?;
    let target_id = target.id;
    let target_nick = target.nick.clone();

    let mut chan_name = name.to_string();
    if let Some(chan) = ctx.matrix.channel(name) {
        if !chan.is_member(ctx.uid) {
            return Err(HandlerError::channel(&chan.name, ChannelError::NotOnChannel));
        }
        if chan.is_member(target_id) {
            return Err(HandlerError::channel(
                &chan.name,
                ChannelError::UserOnChannel(target_nick),
            ));
        }
        if chan.invite_only && !chan.is_op(ctx.uid) {
            return Err(HandlerError::channel(&chan.name, ChannelError::ChanOpPrivsNeeded));
        }
        chan_name.clone_from(&chan.name);
    }
    if let Some(chan) = ctx.matrix.channel_mut(name) {
        chan.invite(target_id);
    }

    ctx.reply(
        Response::RPL_INVITING,
        vec![target_nick.clone(), chan_name.clone()],
    )?;
    let mask = ctx.user()?.hostmask();
    if let Some(target) = ctx.matrix.user(target_id) {
        target.send(
            from_user(&mask, "INVITE")
                .with_param(target_nick.as_str())
                .with_trailing(chan_name),
        );
        if let Some(away) = &target.away {
            ctx.reply(Response::RPL_AWAY, vec![target_nick, away.clone()])?;
        }
    }
    Ok(Transition::Stay)
}
