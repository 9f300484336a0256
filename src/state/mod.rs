//! State management module.
//!
//! Contains the Matrix (shared server state), its entities, and the
//! hand-off through which sessions take exclusive turns mutating it.

mod channel;
mod handoff;
mod matrix;
mod sink;
mod user;

pub use channel::{BanMask, Channel, ChannelSink, Topic};
pub use handoff::{HandoffStats, MatrixGuard, MatrixHandle};
pub use matrix::{Matrix, MatrixConfig, ServerInfo};
pub use sink::Sink;
pub use user::{User, UserId, UserParams};
