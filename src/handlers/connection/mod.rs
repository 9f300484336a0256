//! Connection registration and session commands: NICK, USER, PING, PONG,
//! QUIT, and the welcome burst sent when registration completes.

pub mod nick;
pub mod ping;
pub mod quit;
pub mod user;
pub mod welcome;
