//! PRIVMSG and NOTICE handlers.
//!
//! ```text
//! PRIVMSG <targets> :<text>
//! NOTICE <targets> :<text>
//! ```
//!
//! Targets are nicks or channels. A channel message goes to every member
//! except the sender, who must be a member. NOTICE never generates error
//! replies or away notices.

use crate::error::HandlerError;
use crate::handlers::core::{CommandResult, Context, Transition};
use crate::handlers::helpers::{from_user, split_list};
use braid_proto::{ChannelExt, Message, Response};
use std::sync::Arc;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Kind {
    Privmsg,
    Notice,
}

impl Kind {
    fn command(self) -> &'static str {
        match self {
            Self::Privmsg => "PRIVMSG",
            Self::Notice => "NOTICE",
        }
    }
}

pub fn privmsg(ctx: &mut Context<'_>, msg: &Message) -> CommandResult {
    relay_text(ctx, msg, Kind::Privmsg)
}

pub fn notice(ctx: &mut Context<'_>, msg: &Message) -> CommandResult {
    relay_text(ctx, msg, Kind::Notice)
}

fn relay_text(ctx: &mut Context<'_>, msg: &Message, kind: Kind) -> CommandResult {
    let quiet = |result: Result<(), HandlerError>| match kind {
        Kind::Notice => Ok(Transition::Stay),
        Kind::Privmsg => result.map(|()| Transition::Stay),
    };

    let Some(targets) = msg.arg(0).filter(|t| !t.is_empty()) else {
        return quiet(Err(HandlerError::NoRecipient));
    };
    let Some(text) = msg.arg(1).filter(|t| !t.is_empty()) else {
        return quiet(Err(HandlerError::NoTextToSend));
    };

    let mask = ctx.user()?.hostmask();
    for target in split_list(targets) {
        let out = Arc::new(
            from_user(&mask, kind.command())
                .with_param(target)
                .with_trailing(text)
                .truncate_to_fit(),
        );
        let result = if target.is_channel_name() {
            to_channel(ctx, target, out)
        } else {
            to_user(ctx, target, out, kind)
        };
        if let Err(e) = result
            && kind == Kind::Privmsg
        {
            ctx.report(&e, kind.command());
        }
    }
    Ok(Transition::Stay)
}

fn to_channel(ctx: &Context<'_>, name: &str, out: Arc<Message>) -> Result<(), HandlerError> {
    let chan = ctx
        .matrix
        .channel(name)
        .ok_or_else(|| HandlerError::NoSuchNick(name.to_string()))?;
    if !chan.is_member(ctx.uid) {
        return Err(HandlerError::CannotSendToChan(chan.name.clone()));
    }
    if let Some(sink) = ctx.matrix.channel_sink(name) {
        sink.send_except(out, ctx.uid);
    }
    Ok(())
}

fn to_user(
    ctx: &Context<'_>,
    nick: &str,
    out: Arc<Message>,
    kind: Kind,
) -> Result<(), HandlerError> {
    let target = ctx
        .matrix
        .get_user(nick)
        .ok_or_else(|| HandlerError::NoSuchNick(nick.to_string()))?;
    target.send(out);
    if kind == Kind::Privmsg
        && let Some(away) = &target.away
    {
        ctx.reply(Response::RPL_AWAY, vec![target.nick.clone(), away.clone()])?;
    }
    Ok(())
}
