//! Parse errors.

use thiserror::Error;

/// Errors produced while parsing a raw IRC line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageParseError {
    /// The line was empty (or only whitespace / line terminators).
    #[error("empty message")]
    EmptyMessage,

    /// The line had no recognizable command token.
    #[error("invalid command at position {position}: {line:?}")]
    InvalidCommand {
        /// The offending line.
        line: String,
        /// Byte offset where parsing stopped.
        position: usize,
    },
}
