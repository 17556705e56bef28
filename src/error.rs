//! Error types for the address-range engine.
//!
//! Every engine operation fails with one of the four [`IpamError`] kinds. None
//! of them leaves a partial mutation behind: validation always runs before the
//! write, and the write is applied as one unit.

use thiserror::Error;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, IpamError>;

/// Engine errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IpamError {
    /// Malformed input: bad prefix, bad bounds, non-contiguous plan.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The target is in the wrong state for the operation, or a fan-out limit was hit.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The write would break a storage invariant (overlap, member mismatch).
    #[error("validation failed: {0}")]
    Validation(String),

    /// Unknown id or address.
    #[error("target does not exist: {0}")]
    TargetNotExist(String),
}

impl IpamError {
    /// Stable code the request layer puts on the wire.
    pub fn code(&self) -> &'static str {
        match self {
            IpamError::InvalidArgument(_) => "InvalidArgument",
            IpamError::Conflict(_) => "ConflictError",
            IpamError::Validation(_) => "ValidationError",
            IpamError::TargetNotExist(_) => "TargetNotExist",
        }
    }

    /// Message without the kind prefix.
    pub fn message(&self) -> &str {
        match self {
            IpamError::InvalidArgument(m)
            | IpamError::Conflict(m)
            | IpamError::Validation(m)
            | IpamError::TargetNotExist(m) => m,
        }
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        IpamError::InvalidArgument(msg.into())
    }

    pub(crate) fn conflict(msg: impl Into<String>) -> Self {
        IpamError::Conflict(msg.into())
    }

    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        IpamError::Validation(msg.into())
    }

    pub(crate) fn not_found(msg: impl Into<String>) -> Self {
        IpamError::TargetNotExist(msg.into())
    }
}

/// Failure to append an audit record. Never surfaces from a range operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("ledger is not accepting records: {0}")]
    Unavailable(String),
}

/// Failure to save or restore a store snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("snapshot JSON error at path={path}: {message}")]
    Json { path: String, message: String },

    #[error("snapshot row rejected: {0}")]
    Restore(#[from] IpamError),
}
