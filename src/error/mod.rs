//! Payroll error types.

mod payment;
pub use payment::PaymentError;

mod storage;
pub use storage::StorageError;

use crate::lock::LockError;

/// Errors that abort a payroll run.
///
/// Anything that only concerns a single payment is a [`PaymentError`] and is handled inside the
/// run instead.
#[derive(Debug, thiserror::Error)]
pub enum PayrollError {
    /// The status store failed. Continuing without durable state could pay someone twice.
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] StorageError),
    /// Another run holds the store.
    #[error(transparent)]
    Lock(#[from] LockError),
    /// The run was cancelled.
    #[error("payroll run cancelled")]
    Cancelled,
}
