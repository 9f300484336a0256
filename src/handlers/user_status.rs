//! AWAY command handler.
//!
//! ```text
//! AWAY [:<message>]
//! ```
//!
//! With a non-empty message the user is marked away (306); without one the
//! mark is cleared (305). PRIVMSG to an away user answers with 301.

use crate::handlers::core::{CommandResult, Context, Transition};
use braid_proto::{Message, Response};

pub fn away(ctx: &mut Context<'_>, msg: &Message) -> CommandResult {
    let text = msg.arg(0).filter(|t| !t.is_empty()).map(str::to_string);
    let now_away = text.is_some();
    if let Some(user) = ctx.matrix.user_mut(ctx.uid) {
        user.away = text;
    }

    if now_away {
        ctx.reply(
            Response::RPL_NOWAWAY,
            vec!["You have been marked as being away".into()],
        )?;
    } else {
        ctx.reply(
            Response::RPL_UNAWAY,
            vec!["You are no longer marked as being away".into()],
        )?;
    }
    Ok(Transition::Stay)
}
