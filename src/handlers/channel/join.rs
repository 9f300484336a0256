//! JOIN command handler.
//!
//! # RFC 2812 §3.2.1 - Join message
//!
//! ```text
//! JOIN <channels> [<keys>]
//! JOIN 0
//! ```
//!
//! ## Behavior
//! - Channels are created on first join; the creator becomes operator
//! - Admission checks in order: ban (+b), invite-only (+i), key (+k), limit (+l)
//! - An invite bypasses the ban and invite-only checks and is consumed on join
//! - `JOIN 0` parts every channel the user is on
//! - A failure on one channel does not stop the others

use super::names::{end_of_names, send_names};
use super::part::part_one;
use crate::error::{ChannelError, HandlerError};
use crate::handlers::core::{CommandResult, Context, Transition};
use crate::handlers::helpers::{from_user, need, split_list};
use crate::state::Sink;
use braid_proto::{ChannelExt, Message, Response};
use std::sync::Arc;
use tracing::debug;

pub fn handle(ctx: &mut Context<'_>, msg: &Message) -> CommandResult {
    let targets = need(msg, 0)?;

    if targets == "0" {
        let joined: Vec<String> = ctx.user()?.channels().map(str::to_string).collect();
        for name in joined {
            if let Err(e) = part_one(ctx, &name, None) {
                ctx.report(&e, "PART");
            }
        }
        return Ok(Transition::Stay);
    }

    let mut keys = msg.arg(1).map(|k| k.split(',')).into_iter().flatten();
    for name in split_list(targets) {
        let key = keys.next().filter(|k| !k.is_empty());
        if let Err(e) = join_one(ctx, name, key) {
            ctx.report(&e, "JOIN");
        }
    }
    Ok(Transition::Stay)
}

fn join_one(ctx: &mut Context<'_>, name: &str, key: Option<&str>) -> Result<(), HandlerError> {
    if !name.is_channel_name() {
        return Err(HandlerError::BadChanMask(name.to_string()));
    }
    let user = ctx.user()?;
    let mask = user.hostmask();

    if let Some(chan) = ctx.matrix.channel(name) {
        if chan.is_member(ctx.uid) {
            return Ok(());
        }
        let invited = chan.is_invited(ctx.uid);
        let refusal = if !invited && chan.is_banned(user) {
            Some(ChannelError::BannedFromChan)
        } else if chan.invite_only && !invited {
            Some(ChannelError::InviteOnlyChan)
        } else if chan.key.as_deref().is_some_and(|k| Some(k) != key) {
            Some(ChannelError::BadChannelKey)
        } else if chan.is_full() {
            Some(ChannelError::ChannelIsFull)
        } else {
            None
        };
        if let Some(error) = refusal {
            return Err(HandlerError::channel(&chan.name, error));
        }
    }
    if user.channels.len() >= ctx.matrix.config.max_channels {
        return Err(HandlerError::TooManyChannels(name.to_string()));
    }

    let created = ctx.matrix.join_channel(name, ctx.uid);
    debug!(channel = %name, created, "Joined channel");

    let Some(chan) = ctx.matrix.channel(name) else {
        return Err(HandlerError::Internal(format!("{name} vanished after join")));
    };
    if let Some(sink) = ctx.matrix.channel_sink(name) {
        sink.send(Arc::new(from_user(&mask, "JOIN").with_param(chan.name.as_str())));
    }

    let nick = ctx.nick()?;
    if let Some(topic) = &chan.topic {
        ctx.reply(Response::RPL_TOPIC, vec![chan.name.clone(), topic.text.clone()])?;
        ctx.reply(
            Response::RPL_TOPICWHOTIME,
            vec![
                chan.name.clone(),
                topic.set_by.clone(),
                topic.set_at.timestamp().to_string(),
            ],
        )?;
    }
    send_names(ctx.matrix, chan, nick, ctx.conn);
    ctx.send(end_of_names(ctx.server_name(), nick, &chan.name));
    Ok(())
}
