//! QUIT command handler.
//!
//! ```text
//! QUIT [<reason>]
//! ```
//!
//! Tells every channel peer, sends the client a closing `ERROR`, removes the
//! user and ends the connection. The connection also routes its synthesized
//! end-of-stream QUIT through here, so teardown has one path.

use crate::handlers::core::{CommandResult, Context, RegContext, Transition};
use crate::handlers::helpers::from_user;
use braid_proto::Message;
use std::sync::Arc;
use tracing::info;

fn reason(msg: &Message) -> &str {
    msg.arg(0).filter(|r| !r.is_empty()).unwrap_or("Client Quit")
}

/// QUIT before registration.
pub fn handle_unregistered(ctx: &mut RegContext<'_>, msg: &Message) -> CommandResult {
    ctx.send(Message::error(format!(
        "Closing Link: {} (Quit: {})",
        ctx.conn.host(),
        reason(msg)
    )));
    ctx.conn.kill();
    Ok(Transition::Stay)
}

/// QUIT for a registered user.
pub fn handle(ctx: &mut Context<'_>, msg: &Message) -> CommandResult {
    let reason = reason(msg);
    let user = ctx.user()?;
    let (nick, mask, host) = (user.nick.clone(), user.hostmask(), user.host.clone());
    info!(nick = %nick, reason = %reason, "Client quit");

    let quit = Arc::new(from_user(&mask, "QUIT").with_trailing(format!("Quit: {reason}")));
    for peer in ctx.matrix.peers_of(ctx.uid) {
        if let Some(user) = ctx.matrix.user(peer) {
            user.sink().send(Arc::clone(&quit));
        }
    }

    ctx.send(Message::error(format!("Closing Link: {host} (Quit: {reason})")));
    ctx.matrix.remove_user(ctx.uid);
    ctx.conn.kill();
    Ok(Transition::Stay)
}
