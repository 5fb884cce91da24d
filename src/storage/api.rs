//! Payroll storage api.

use crate::{
    error::StorageError,
    types::{Batch, BatchId, NewPayee, Payee, Payment, PaymentId, PendingTransferRecord, Status},
};
use async_trait::async_trait;
use std::fmt::Debug;

/// Type alias for `Result<T, StorageError>`
pub type Result<T> = core::result::Result<T, StorageError>;

/// Storage API.
///
/// Status writes must never move a record backwards, see [`Status::can_transition_to`].
#[async_trait]
pub trait StorageApi: Debug + Send + Sync {
    /// Adds a payee to the roster.
    async fn write_payee(&self, payee: &NewPayee) -> Result<Payee>;

    /// Reads the roster, ordered by id.
    async fn read_payees(&self) -> Result<Vec<Payee>>;

    /// Creates a batch in [`Status::Created`] with one payment per payee on the roster, at the
    /// payee's current amount, atomically.
    async fn create_batch(&self) -> Result<BatchId>;

    /// Reads all batches in the given status, ordered by id.
    async fn read_batches_by_status(&self, status: Status) -> Result<Vec<Batch>>;

    /// Reads a single batch.
    async fn read_batch(&self, id: BatchId) -> Result<Option<Batch>>;

    /// Reads all payments of a batch, ordered by id.
    async fn read_payments(&self, batch: BatchId) -> Result<Vec<Payment>>;

    /// Reads the payments of a batch that are not [`Status::Done`], ordered by id.
    async fn read_outstanding_payments(&self, batch: BatchId) -> Result<Vec<Payment>>;

    /// Writes the status of a batch.
    async fn write_batch_status(&self, id: BatchId, status: Status) -> Result<()>;

    /// Writes the status of a payment.
    async fn write_payment_status(&self, id: PaymentId, status: Status) -> Result<()>;

    /// Writes or clears the error note of a payment.
    async fn write_payment_error(&self, id: PaymentId, error: Option<&str>) -> Result<()>;

    /// Records the signed transfer of a payment before it is broadcast.
    async fn write_pending_transfer(
        &self,
        id: PaymentId,
        transfer: &PendingTransferRecord,
    ) -> Result<()>;

    /// Removes the recorded transfer of a payment.
    async fn remove_pending_transfer(&self, id: PaymentId) -> Result<()>;
}
