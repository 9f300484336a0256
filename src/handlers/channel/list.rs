//! LIST command handler.
//!
//! ```text
//! LIST [<channels>]
//! ```

use crate::handlers::core::{CommandResult, Context, Transition};
use crate::handlers::helpers::split_list;
use crate::state::Channel;
use braid_proto::{Message, Response};

fn entry(chan: &Channel) -> Vec<String> {
    vec![
        chan.name.clone(),
        chan.member_count().to_string(),
        chan.topic
            .as_ref()
            .map(|t| t.text.clone())
            .unwrap_or_default(),
    ]
}

pub fn handle(ctx: &mut Context<'_>, msg: &Message) -> CommandResult {
    ctx.reply(
        Response::RPL_LISTSTART,
        vec!["Channel".into(), "Users  Name".into()],
    )?;

    let entries: Vec<Vec<String>> = match msg.arg(0).filter(|a| !a.is_empty()) {
        Some(list) => split_list(list)
            .filter_map(|name| ctx.matrix.channel(name))
            .map(entry)
            .collect(),
        None => {
            let mut all: Vec<&Channel> = ctx.matrix.channels().collect();
            all.sort_unstable_by(|a, b| a.name.cmp(&b.name));
            all.into_iter().map(entry).collect()
        }
    };
    for args in entries {
        ctx.reply(Response::RPL_LIST, args)?;
    }

    ctx.reply(Response::RPL_LISTEND, vec!["End of /LIST".into()])?;
    Ok(Transition::Stay)
}
