//! PART command handler.
//!
//! ```text
//! PART <channels> [<reason>]
//! ```
//!
//! The PART is broadcast before the member is removed, so the parting user
//! sees it too. Empty channels are destroyed.

use super::joined_channel;
use crate::error::HandlerError;
use crate::handlers::core::{CommandResult, Context, Transition};
use crate::handlers::helpers::{from_user, need, split_list};
use crate::state::Sink;
use braid_proto::Message;
use std::sync::Arc;

pub fn handle(ctx: &mut Context<'_>, msg: &Message) -> CommandResult {
    let targets = need(msg, 0)?;
    let reason = msg.arg(1).filter(|r| !r.is_empty());
    for name in split_list(targets) {
        if let Err(e) = part_one(ctx, name, reason) {
            ctx.report(&e, "PART");
        }
    }
    Ok(Transition::Stay)
}

/// Leave one channel, telling its members.
pub(super) fn part_one(
    ctx: &mut Context<'_>,
    name: &str,
    reason: Option<&str>,
) -> Result<(), HandlerError> {
    let chan = joined_channel(ctx.matrix, name, ctx.uid)?;
    let mut part = from_user(&ctx.user()?.hostmask(), "PART").with_param(chan.name.as_str());
    if let Some(reason) = reason {
        part = part.with_trailing(reason);
    }
    if let Some(sink) = ctx.matrix.channel_sink(name) {
        sink.send(Arc::new(part));
    }
    ctx.matrix.part_channel(name, ctx.uid);
    Ok(())
}
