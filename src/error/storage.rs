use crate::types::{BatchId, PaymentId, Status};

/// Errors returned by [`StorageApi`](crate::storage::StorageApi).
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The batch does not exist.
    #[error("batch {0} not found")]
    BatchNotFound(BatchId),
    /// The payment does not exist.
    #[error("payment {0} not found")]
    PaymentNotFound(PaymentId),
    /// The write would move a status backwards.
    #[error("refusing to move {record} from {from} to {to}")]
    InvalidTransition {
        /// Human readable record name, eg. `payment 4`.
        record: String,
        /// Current status.
        from: Status,
        /// Requested status.
        to: Status,
    },
    /// A stored row could not be decoded.
    #[error("malformed row: {0}")]
    MalformedRow(String),
    /// A deserialization error occurred.
    #[error("a deserialization error occurred: {0}")]
    SerdeError(#[from] serde_json::Error),
    /// An internal error occurred.
    #[error("storage backend error: {0}")]
    InternalError(#[from] eyre::Error),
}
