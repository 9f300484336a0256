//! Registration completion and the welcome burst.

use crate::error::HandlerError;
use crate::handlers::core::{CommandResult, Handler, RegContext, Transition, numeric_to};
use crate::handlers::server_query::send_motd;
use crate::state::{Matrix, UserId, UserParams};
use braid_proto::Response;
use std::sync::Arc;
use tracing::info;

/// User modes advertised in RPL_MYINFO.
const USER_MODES: &str = "o";
/// Channel modes advertised in RPL_MYINFO.
const CHANNEL_MODES: &str = "biklov";

/// Complete registration once both NICK and USER have been seen.
///
/// On success the user enters the Matrix and the session switches to the
/// registered-phase handler.
pub fn try_register(ctx: &mut RegContext<'_>) -> CommandResult {
    if !ctx.pending.is_complete() {
        return Ok(Transition::Stay);
    }
    let (Some(nick), Some(username)) = (ctx.pending.nick.clone(), ctx.pending.username.clone())
    else {
        return Ok(Transition::Stay);
    };

    let params = UserParams {
        nick: nick.clone(),
        username,
        realname: ctx.pending.realname.clone().unwrap_or_default(),
        host: ctx.conn.host().to_string(),
        connection: Some(ctx.conn.id()),
        sink: Arc::new(ctx.conn.clone()),
    };
    let uid = match ctx.matrix.add_user(params) {
        Ok(uid) => uid,
        Err(e @ HandlerError::NicknameInUse(_)) => {
            // Someone registered the nick after it was requested.
            ctx.pending.nick = None;
            return Err(e);
        }
        Err(e) => return Err(e),
    };

    send_welcome_burst(ctx.matrix, uid)?;
    info!(nick = %nick, connection = ctx.conn.id(), "Client registered");

    Ok(Transition::Become(Handler::user(
        ctx.state.clone(),
        nick,
        Arc::clone(ctx.commands),
    )))
}

/// RPL_WELCOME through RPL_MYINFO followed by the MOTD.
pub fn send_welcome_burst(matrix: &Matrix, uid: UserId) -> Result<(), HandlerError> {
    let user = matrix
        .user(uid)
        .ok_or_else(|| HandlerError::Internal(format!("user {uid} missing after registration")))?;
    let info = &matrix.server_info;
    let server = info.name.as_str();
    let nick = user.nick.as_str();

    let burst = [
        (
            Response::RPL_WELCOME,
            vec![format!(
                "Welcome to the {} Internet Relay Chat Network {}",
                info.network,
                user.hostmask()
            )],
        ),
        (
            Response::RPL_YOURHOST,
            vec![format!(
                "Your host is {}, running version {}",
                server, info.version
            )],
        ),
        (
            Response::RPL_CREATED,
            vec![format!(
                "This server was created {}",
                info.created.format("%a %b %e %Y at %H:%M:%S UTC")
            )],
        ),
        (
            Response::RPL_MYINFO,
            vec![
                server.to_string(),
                info.version.clone(),
                USER_MODES.to_string(),
                CHANNEL_MODES.to_string(),
            ],
        ),
    ];
    for (response, args) in burst {
        user.send(numeric_to(server, nick, response, args));
    }
    send_motd(info, nick, user.sink());
    Ok(())
}
