//! Tracing setup and span constructors.

use crate::config::{LogFormat, LoggingConfig};
use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// `RUST_LOG` overrides the configured level.
pub fn init_tracing(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    match config.format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Standardized span constructors for IRC observability.
pub mod spans {
    use tracing::{Span, info_span};

    /// Create a span for a client connection.
    pub fn connection(id: u64, host: &str) -> Span {
        info_span!("connection", id, host = %host)
    }

    /// Create a span for a relay endpoint.
    pub fn relay(id: u64) -> Span {
        info_span!("relay", id)
    }

    /// Create a span for a command execution.
    pub fn command(name: &str, source: &str) -> Span {
        info_span!("command", name = %name, source = %source)
    }
}
