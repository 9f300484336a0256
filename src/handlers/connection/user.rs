//! USER command handler.
//!
//! ```text
//! USER <username> <mode> <unused> :<realname>
//! ```

use super::welcome;
use crate::error::HandlerError;
use crate::handlers::core::{CommandResult, Context, RegContext};
use crate::handlers::helpers::need;
use braid_proto::Message;

/// Longest accepted username; longer ones are truncated.
const MAX_USERNAME_LEN: usize = 10;

/// USER during registration.
pub fn handle_unregistered(ctx: &mut RegContext<'_>, msg: &Message) -> CommandResult {
    if ctx.pending.username.is_some() {
        return Err(HandlerError::AlreadyRegistered);
    }
    if msg.arg_count() < 4 {
        return Err(HandlerError::NeedMoreParams);
    }
    let username = need(msg, 0)?;
    let realname = need(msg, 3)?;

    let username: String = username
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '@' && *c != '!')
        .take(MAX_USERNAME_LEN)
        .collect();
    if username.is_empty() {
        return Err(HandlerError::NeedMoreParams);
    }
    ctx.pending.username = Some(username);
    ctx.pending.realname = Some(realname.to_string());
    welcome::try_register(ctx)
}

/// USER after registration.
pub fn handle_registered(_ctx: &mut Context<'_>, _msg: &Message) -> CommandResult {
    Err(HandlerError::AlreadyRegistered)
}
