//! PING and PONG handlers.

use crate::handlers::core::{CommandResult, Context, RegContext, Transition};
use braid_proto::Message;

fn pong(server: &str, msg: &Message) -> Message {
    Message::pong(server, msg.arg(0))
}

/// PING before registration.
pub fn handle_unregistered(ctx: &mut RegContext<'_>, msg: &Message) -> CommandResult {
    ctx.send(pong(ctx.server_name(), msg));
    Ok(Transition::Stay)
}

/// PING <token>
pub fn handle(ctx: &mut Context<'_>, msg: &Message) -> CommandResult {
    ctx.send(pong(ctx.server_name(), msg));
    Ok(Transition::Stay)
}

/// PONG produces no output.
pub fn handle_pong(_ctx: &mut Context<'_>, _msg: &Message) -> CommandResult {
    Ok(Transition::Stay)
}
