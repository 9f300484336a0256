//! Core handler infrastructure: the per-connection state machine, command
//! contexts, and the dispatch tables.

mod context;
mod handler;
mod registry;

pub use context::{
    CommandResult, Context, RegCommand, RegContext, Registration, Transition, UserCommand,
    numeric_to,
};
pub use handler::{Handler, RegistrationHandler, UserHandler};
pub use registry::Commands;
