//! WHO command handler.
//!
//! ```text
//! WHO [<mask>]
//! ```
//!
//! A channel mask lists that channel's members; anything else is matched as
//! a `nick!user@host` mask against all users. Always ends with 315.

use crate::handlers::core::{CommandResult, Context, Transition};
use crate::state::{BanMask, Channel, User};
use braid_proto::{ChannelExt, Message, Response};

fn who_reply(server: &str, channel: &str, user: &User, chan: Option<&Channel>) -> Vec<String> {
    let mut flags = String::from(if user.away.is_some() { "G" } else { "H" });
    if let Some(chan) = chan {
        flags.push_str(chan.prefix_for(user.id));
    }
    vec![
        channel.to_string(),
        user.username.clone(),
        user.host.clone(),
        server.to_string(),
        user.nick.clone(),
        flags,
        format!("0 {}", user.realname),
    ]
}

pub fn who(ctx: &mut Context<'_>, msg: &Message) -> CommandResult {
    let mask = msg.arg(0).filter(|m| !m.is_empty()).unwrap_or("*");
    let server = ctx.server_name();

    let mut replies = Vec::new();
    if mask.is_channel_name() {
        if let Some(chan) = ctx.matrix.channel(mask) {
            for id in chan.members() {
                if let Some(user) = ctx.matrix.user(id) {
                    replies.push(who_reply(server, &chan.name, user, Some(chan)));
                }
            }
        }
    } else {
        let pattern = BanMask::parse(mask);
        for user in ctx.matrix.users().filter(|u| pattern.matches(u)) {
            replies.push(who_reply(server, "*", user, None));
        }
    }

    for reply in replies {
        ctx.reply(Response::RPL_WHOREPLY, reply)?;
    }
    ctx.reply(
        Response::RPL_ENDOFWHO,
        vec![mask.to_string(), "End of WHO list".into()],
    )?;
    Ok(Transition::Stay)
}
