//! Error types for the IRC protocol library.

use thiserror::Error;

/// Convenience type alias for Results using [`ProtocolError`].
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

/// Top-level protocol errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// I/O error during reading or writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A line exceeded the configured maximum length.
    #[error("message too long: {actual} bytes (limit {limit})")]
    MessageTooLong {
        /// Observed length in bytes.
        actual: usize,
        /// Configured limit in bytes.
        limit: usize,
    },

    /// A line could not be parsed as an IRC message.
    #[error("invalid message {string:?}: {cause}")]
    InvalidMessage {
        /// The offending line.
        string: String,
        /// Why parsing failed.
        cause: MessageParseError,
    },

    /// A message cannot be represented on the wire.
    #[error("unencodable {command} message")]
    Unencodable {
        /// Command of the rejected message.
        command: String,
    },
}

impl ProtocolError {
    /// Whether the error ends the stream it came from.
    ///
    /// Unencodable messages only affect the message itself.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Unencodable { .. })
    }
}

/// Reasons a line failed to parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageParseError {
    /// The line was empty.
    #[error("empty message")]
    EmptyMessage,

    /// The parser stopped at the given byte offset.
    #[error("parse error at position {position}")]
    ParseContext {
        /// Byte offset of the failure.
        position: usize,
    },
}
