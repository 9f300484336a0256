//! Server query handlers: MOTD.

use crate::handlers::core::{CommandResult, Context, Transition, numeric_to};
use crate::state::{ServerInfo, Sink};
use braid_proto::{Message, Response};
use std::sync::Arc;

/// Send the MOTD (375/372/376), or ERR_NOMOTD (422) when there is none.
pub fn send_motd(info: &ServerInfo, nick: &str, sink: &dyn Sink) {
    let server = info.name.as_str();
    let reply = |response, text: String| Arc::new(numeric_to(server, nick, response, vec![text]));

    if info.motd.is_empty() {
        sink.send(reply(Response::ERR_NOMOTD, "MOTD File is missing".into()));
        return;
    }
    sink.send(reply(
        Response::RPL_MOTDSTART,
        format!("- {server} Message of the day - "),
    ));
    for line in &info.motd {
        sink.send(reply(Response::RPL_MOTD, format!("- {line}")));
    }
    sink.send(reply(Response::RPL_ENDOFMOTD, "End of /MOTD command.".into()));
}

/// MOTD [<target>]
pub fn motd(ctx: &mut Context<'_>, _msg: &Message) -> CommandResult {
    send_motd(&ctx.matrix.server_info, ctx.nick()?, ctx.conn);
    Ok(Transition::Stay)
}
