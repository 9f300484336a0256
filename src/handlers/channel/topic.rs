//! TOPIC command handler.
//!
//! ```text
//! TOPIC <channel> [:<topic>]
//! ```
//!
//! Without a topic argument, replies with the current topic (332 + 333) or
//! 331. Setting requires channel operator status; an empty topic clears it.

use super::{joined_channel, operated_channel};
use crate::handlers::core::{CommandResult, Context, Transition};
use crate::handlers::helpers::{from_user, need};
use crate::state::{Sink, Topic};
use braid_proto::{Message, Response};
use chrono::Utc;
use std::sync::Arc;

pub fn handle(ctx: &mut Context<'_>, msg: &Message) -> CommandResult {
    let name = need(msg, 0)?;

    let Some(text) = msg.arg(1) else {
        let chan = joined_channel(ctx.matrix, name, ctx.uid)?;
        match &chan.topic {
            Some(topic) => {
                ctx.reply(Response::RPL_TOPIC, vec![chan.name.clone(), topic.text.clone()])?;
                ctx.reply(
                    Response::RPL_TOPICWHOTIME,
                    vec![
                        chan.name.clone(),
                        topic.set_by.clone(),
                        topic.set_at.timestamp().to_string(),
                    ],
                )?;
            }
            None => {
                ctx.reply(Response::RPL_NOTOPIC, vec![chan.name.clone(), "No topic is set".into()])?;
            }
        }
        return Ok(Transition::Stay);
    };

    let chan_name = operated_channel(ctx.matrix, name, ctx.uid)?.name.clone();
    let nick = ctx.nick()?.to_string();
    let mask = ctx.user()?.hostmask();

    if let Some(chan) = ctx.matrix.channel_mut(name) {
        chan.topic = (!text.is_empty()).then(|| Topic {
            text: text.to_string(),
            set_by: nick,
            set_at: Utc::now(),
        });
    }
    if let Some(sink) = ctx.matrix.channel_sink(name) {
        sink.send(Arc::new(
            from_user(&mask, "TOPIC")
                .with_param(chan_name)
                .with_trailing(text),
        ));
    }
    Ok(Transition::Stay)
}
