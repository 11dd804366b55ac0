use std::fmt;
use std::io;

use crate::model::order::{Collection, OrderId};

/// Machine-readable error codes for scripts and the CLI's JSON output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotInitialized,
    ConfigParseError,
    MissingField,
    OrderNotFound,
    RemoteUnavailable,
    RemoteNotConfigured,
    MalformedSnapshot,
    StorageWriteFailed,
    LockContention,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotInitialized => "E1001",
            Self::ConfigParseError => "E1002",
            Self::MissingField => "E2001",
            Self::OrderNotFound => "E2002",
            Self::RemoteUnavailable => "E3001",
            Self::RemoteNotConfigured => "E3002",
            Self::MalformedSnapshot => "E3003",
            Self::StorageWriteFailed => "E5001",
            Self::LockContention => "E5002",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotInitialized => "Order desk not initialized",
            Self::ConfigParseError => "Config file parse error",
            Self::MissingField => "Required order field is empty",
            Self::OrderNotFound => "Order not found",
            Self::RemoteUnavailable => "Remote snapshot unavailable",
            Self::RemoteNotConfigured => "No remote configured",
            Self::MalformedSnapshot => "Malformed order snapshot",
            Self::StorageWriteFailed => "Local storage write failed",
            Self::LockContention => "Lock contention",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NotInitialized => Some("Run `od init` in the shop directory."),
            Self::ConfigParseError => Some("Fix syntax in .orderdesk/config.toml and retry."),
            Self::MissingField => Some("Customer name, phone number and product are required."),
            Self::OrderNotFound => Some("Check the id with `od list --all`."),
            Self::RemoteUnavailable => {
                Some("Local data is unchanged; retry `od sync` when the network is back.")
            }
            Self::RemoteNotConfigured => {
                Some("Set [remote] url, or owner/repo/path, in .orderdesk/config.toml.")
            }
            Self::MalformedSnapshot => {
                Some("The remote file is not an order snapshot; inspect it before pushing.")
            }
            Self::StorageWriteFailed => Some("Check disk space and write permissions."),
            Self::LockContention => Some("Retry after the other `od` process finishes."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors raised by order store operations.
///
/// None of these are fatal to a running process: validation and not-found
/// reject a single command, transport and malformed-snapshot failures leave
/// local state untouched.
#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("{field} must not be empty")]
    Validation { field: &'static str },

    #[error("order {id} is not in the {collection} set")]
    NotFound { id: OrderId, collection: Collection },

    #[error("remote transport failed: {0}")]
    Transport(String),

    #[error("malformed snapshot: {0}")]
    MalformedSnapshot(String),

    #[error("storage error: {0}")]
    Storage(#[from] io::Error),
}

impl OrderError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Validation { .. } => ErrorCode::MissingField,
            Self::NotFound { .. } => ErrorCode::OrderNotFound,
            Self::Transport(_) => ErrorCode::RemoteUnavailable,
            Self::MalformedSnapshot(_) => ErrorCode::MalformedSnapshot,
            Self::Storage(_) => ErrorCode::StorageWriteFailed,
        }
    }

    /// Remote failures degrade to local-only operation.
    #[must_use]
    pub const fn is_remote(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::MalformedSnapshot(_))
    }
}
