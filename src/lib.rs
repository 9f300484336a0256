//! braid - a small IRC daemon.
//!
//! Each client socket is driven by a [`network::Connection`] whose read
//! loop hands parsed messages to a [`handlers::Handler`]. Handlers take
//! exclusive ownership of the shared [`state::Matrix`] for the length of
//! one command and release it before the next message is read. A separate
//! [`network::Dispatcher`] routes traffic between relay endpoints.

pub mod config;
pub mod error;
pub mod handlers;
pub mod network;
pub mod state;
pub mod telemetry;
