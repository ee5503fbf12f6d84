use remotelink_core::{CommandId, CoreError};

use crate::store::StoreError;

/// Errors surfaced by the relay's operations.
///
/// A failed delivery is an [`Outcome`](remotelink_core::Outcome), not an
/// error, so there is no transport variant.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Caller input was rejected before any write.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A referenced command does not exist.
    #[error("command {0} not found")]
    NotFound(CommandId),

    /// Telemetry could not be decoded; the event is dropped.
    #[error("malformed telemetry payload: {0}")]
    MalformedPayload(String),

    /// Some writes of a batch failed while the others were applied.
    #[error("{failed} of {total} writes failed")]
    PartialCascade { failed: usize, total: usize },

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl RelayError {
    /// Machine-readable code reported to HTTP callers.
    pub fn code(&self) -> &'static str {
        match self {
            RelayError::InvalidArgument(_) => "invalid-argument",
            RelayError::NotFound(_) => "not-found",
            RelayError::MalformedPayload(_) => "malformed-payload",
            RelayError::PartialCascade { .. } => "partial-cascade",
            RelayError::Store(_) => "internal",
        }
    }
}

impl From<CoreError> for RelayError {
    fn from(err: CoreError) -> Self {
        RelayError::InvalidArgument(err.to_string())
    }
}
