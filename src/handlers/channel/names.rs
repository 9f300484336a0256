//! NAMES command handler.
//!
//! ```text
//! NAMES [<channels>]
//! ```

use crate::handlers::core::{CommandResult, Context, Transition, numeric_to};
use crate::handlers::helpers::split_list;
use crate::state::{Channel, Matrix, Sink};
use braid_proto::{Message, Response};
use std::sync::Arc;

/// Keeps each 353 line comfortably inside the 512 byte limit.
const NAMES_PER_LINE: usize = 20;

/// RPL_NAMREPLY lines for `chan`, without the terminating 366.
pub fn send_names(matrix: &Matrix, chan: &Channel, nick: &str, sink: &dyn Sink) {
    let server = matrix.server_info.name.as_str();
    let mut names: Vec<String> = chan
        .members()
        .filter_map(|id| {
            matrix
                .user(id)
                .map(|u| format!("{}{}", chan.prefix_for(id), u.nick))
        })
        .collect();
    names.sort_unstable();

    for chunk in names.chunks(NAMES_PER_LINE) {
        sink.send(Arc::new(numeric_to(
            server,
            nick,
            Response::RPL_NAMREPLY,
            vec!["=".into(), chan.name.clone(), chunk.join(" ")],
        )));
    }
}

/// RPL_ENDOFNAMES for `target`.
pub fn end_of_names(server: &str, nick: &str, target: &str) -> Message {
    numeric_to(
        server,
        nick,
        Response::RPL_ENDOFNAMES,
        vec![target.to_string(), "End of /NAMES list".into()],
    )
}

pub fn handle(ctx: &mut Context<'_>, msg: &Message) -> CommandResult {
    let nick = ctx.nick()?;
    let server = ctx.server_name();

    match msg.arg(0).filter(|a| !a.is_empty()) {
        Some(list) => {
            for name in split_list(list) {
                match ctx.matrix.channel(name) {
                    Some(chan) => {
                        send_names(ctx.matrix, chan, nick, ctx.conn);
                        ctx.send(end_of_names(server, nick, &chan.name));
                    }
                    None => ctx.send(end_of_names(server, nick, name)),
                }
            }
        }
        None => {
            for chan in ctx.matrix.channels() {
                send_names(ctx.matrix, chan, nick, ctx.conn);
            }
            ctx.send(end_of_names(server, nick, "*"));
        }
    }
    Ok(Transition::Stay)
}
