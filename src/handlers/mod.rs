//! IRC command handlers.
//!
//! The [`Handler`] state machine lives in `core`; command bodies are plain
//! functions grouped by the area of the protocol they cover and registered
//! in [`Commands`].

mod channel;
mod connection;
mod core;
mod helpers;
mod messaging;
mod mode;
mod server_query;
mod user_query;
mod user_status;

pub use self::core::{
    CommandResult, Commands, Context, Handler, RegContext, Registration, RegistrationHandler,
    Transition, UserHandler,
};
pub use helpers::{need, split_list};
