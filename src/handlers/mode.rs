//! MODE command handler.
//!
//! # RFC 2812 §3.2.3 - Channel mode message
//!
//! ```text
//! MODE <channel> [<modestring> [<args>...]]
//! ```
//!
//! ## Supported channel modes
//! - `o` / `v`: operator and voice, argument is a nick
//! - `k`: key, argument required when setting
//! - `l`: member limit, argument required when setting
//! - `i`: invite-only
//! - `b`: ban mask; without an argument lists the bans (367/368)
//!
//! User modes are not supported: MODE on a nick is accepted and ignored.

use crate::error::{ChannelError, HandlerError};
use crate::handlers::core::{CommandResult, Context, Transition};
use crate::handlers::helpers::{from_user, need};
use crate::state::{BanMask, Channel, Sink, UserId};
use braid_proto::{ChannelExt, Message, Response};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
struct ModeChange {
    adding: bool,
    mode: char,
    arg: Option<String>,
}

/// Split a modestring and its arguments into individual changes.
///
/// Returns the changes and any unknown mode characters.
fn parse_modes<'a>(
    modestring: &str,
    mut args: impl Iterator<Item = &'a str>,
) -> (Vec<ModeChange>, Vec<char>) {
    let mut changes = Vec::new();
    let mut unknown = Vec::new();
    let mut adding = true;
    for mode in modestring.chars() {
        let takes_arg = match mode {
            '+' => {
                adding = true;
                continue;
            }
            '-' => {
                adding = false;
                continue;
            }
            'o' | 'v' | 'b' => true,
            'k' | 'l' => adding,
            'i' => false,
            other => {
                unknown.push(other);
                continue;
            }
        };
        let arg = if takes_arg {
            args.next().map(str::to_string)
        } else {
            None
        };
        changes.push(ModeChange { adding, mode, arg });
    }
    (changes, unknown)
}

pub fn handle(ctx: &mut Context<'_>, msg: &Message) -> CommandResult {
    let target = need(msg, 0)?;
    if !target.is_channel_name() {
        return match ctx.matrix.get_user(target) {
            Some(_) => Ok(Transition::Stay),
            None => Err(HandlerError::NoSuchNick(target.to_string())),
        };
    }

    let chan = ctx
        .matrix
        .channel(target)
        .ok_or_else(|| HandlerError::NoSuchChannel(target.to_string()))?;
    let chan_name = chan.name.clone();

    let Some(modestring) = msg.arg(1) else {
        let (modes, mut args) = chan.mode_string(chan.is_member(ctx.uid));
        let mut reply = vec![chan_name, modes];
        reply.append(&mut args);
        ctx.reply(Response::RPL_CHANNELMODEIS, reply)?;
        return Ok(Transition::Stay);
    };

    let rest = (2..msg.arg_count()).filter_map(|i| msg.arg(i));
    let (changes, unknown) = parse_modes(modestring, rest);
    for c in unknown {
        ctx.report(&HandlerError::UnknownMode(c), "MODE");
    }

    // A bare `b` is a ban list query and needs no privileges.
    let (queries, changes): (Vec<_>, Vec<_>) = changes
        .into_iter()
        .partition(|c| c.mode == 'b' && c.arg.is_none());
    if !queries.is_empty() {
        send_ban_list(ctx, chan)?;
    }
    if changes.is_empty() {
        return Ok(Transition::Stay);
    }

    if !chan.is_member(ctx.uid) {
        return Err(HandlerError::channel(chan_name, ChannelError::NotOnChannel));
    }
    if !chan.is_op(ctx.uid) {
        return Err(HandlerError::channel(chan_name, ChannelError::ChanOpPrivsNeeded));
    }

    // Resolve nick arguments while the Matrix is only borrowed shared.
    let mut resolved: Vec<(ModeChange, Option<UserId>)> = Vec::with_capacity(changes.len());
    for change in changes {
        let target = match (change.mode, change.arg.as_deref()) {
            ('o' | 'v', Some(nick)) => match ctx.matrix.get_user(nick) {
                Some(user) if chan.is_member(user.id) => Some(user.id),
                Some(user) => {
                    ctx.report(
                        &HandlerError::channel(
                            &chan_name,
                            ChannelError::UserNotInChannel(user.nick.clone()),
                        ),
                        "MODE",
                    );
                    continue;
                }
                None => {
                    ctx.report(&HandlerError::NoSuchNick(nick.to_string()), "MODE");
                    continue;
                }
            },
            ('o' | 'v', None) => continue,
            _ => None,
        };
        resolved.push((change, target));
    }

    let Some(chan) = ctx.matrix.channel_mut(target) else {
        return Ok(Transition::Stay);
    };
    let applied: Vec<ModeChange> = resolved
        .into_iter()
        .filter_map(|(change, uid)| apply(chan, change, uid))
        .collect();
    if applied.is_empty() {
        return Ok(Transition::Stay);
    }

    let mut out = from_user(&ctx.user()?.hostmask(), "MODE").with_param(chan_name);
    let mut modes = String::new();
    let mut last_sign = None;
    let mut args = Vec::new();
    for change in applied {
        if last_sign != Some(change.adding) {
            modes.push(if change.adding { '+' } else { '-' });
            last_sign = Some(change.adding);
        }
        modes.push(change.mode);
        args.extend(change.arg);
    }
    out = out.with_param(modes);
    for arg in args {
        out = out.with_param(arg);
    }
    if let Some(sink) = ctx.matrix.channel_sink(target) {
        sink.send(Arc::new(out));
    }
    Ok(Transition::Stay)
}

/// Apply one change. Returns it, normalized, if it changed anything.
fn apply(chan: &mut Channel, change: ModeChange, uid: Option<UserId>) -> Option<ModeChange> {
    let ModeChange { adding, mode, arg } = change;
    let changed = match mode {
        'o' => uid.is_some_and(|id| chan.is_op(id) != adding && chan.set_op(id, adding)),
        'v' => uid.is_some_and(|id| chan.is_voiced(id) != adding && chan.set_voice(id, adding)),
        'i' => std::mem::replace(&mut chan.invite_only, adding) != adding,
        'k' if adding => {
            let key = arg.clone().filter(|k| !k.is_empty() && !k.contains(' '))?;
            chan.key.replace(key.clone()).as_ref() != Some(&key)
        }
        'k' => chan.key.take().is_some(),
        'l' if adding => {
            let limit = arg.as_deref()?.parse::<usize>().ok().filter(|l| *l > 0)?;
            chan.limit.replace(limit) != Some(limit)
        }
        'l' => chan.limit.take().is_some(),
        'b' => {
            let mask = BanMask::parse(arg.as_deref()?);
            let changed = if adding {
                chan.add_ban(mask.clone())
            } else {
                chan.remove_ban(&mask)
            };
            return changed.then(|| ModeChange {
                adding,
                mode,
                arg: Some(mask.to_string()),
            });
        }
        _ => false,
    };
    let arg = match mode {
        'k' if !adding => Some("*".to_string()),
        'i' => None,
        'l' if !adding => None,
        _ => arg,
    };
    changed.then_some(ModeChange { adding, mode, arg })
}

fn send_ban_list(ctx: &Context<'_>, chan: &Channel) -> Result<(), HandlerError> {
    for ban in &chan.bans {
        ctx.reply(Response::RPL_BANLIST, vec![chan.name.clone(), ban.to_string()])?;
    }
    ctx.reply(
        Response::RPL_ENDOFBANLIST,
        vec![chan.name.clone(), "End of channel ban list".into()],
    )
}
