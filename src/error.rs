//! Unified error handling for mxbld.
//!
//! Failures are split by where they are caught: dispatcher handlers return
//! [`HandlerError`], administrative commands return [`CommandError`]. Both are
//! logged at the boundary that catches them and never stop the dispatch loop.
//! Bad command input is not an error at all; it is ordinary reply text.

use crate::db::DbError;
use crate::irc::OutboundError;
use thiserror::Error;

// ============================================================================
// Handler Errors (dispatcher)
// ============================================================================

/// Errors that can occur inside a dispatcher handler.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("database error: {0}")]
    Db(#[from] DbError),

    #[error("send error: {0}")]
    Send(#[from] OutboundError),

    #[error("handler panicked: {0}")]
    Panicked(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl HandlerError {
    /// Get a static error code string for log labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Db(_) => "db_error",
            Self::Send(_) => "send_error",
            Self::Panicked(_) => "panicked",
            Self::Internal(_) => "internal_error",
        }
    }
}

/// Result type for dispatcher handlers.
pub type HandlerResult = Result<(), HandlerError>;

// ============================================================================
// Command Errors (command router)
// ============================================================================

/// Uncaught failures of an administrative command.
///
/// These never produce a reply; the router logs them and moves on.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("database error: {0}")]
    Db(#[from] DbError),

    #[error("send error: {0}")]
    Send(#[from] OutboundError),
}
