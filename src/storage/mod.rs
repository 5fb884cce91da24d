//! Payroll storage

mod api;
pub use api::StorageApi;
mod memory;
mod sqlite;

use crate::types::{
    Batch, BatchId, NewPayee, Payee, Payment, PaymentId, PendingTransferRecord, Status,
};
use async_trait::async_trait;
use sqlx::SqlitePool;
use std::sync::Arc;

/// Payroll storage interface.
#[derive(Debug, Clone)]
pub struct PayrollStorage {
    inner: Arc<dyn StorageApi>,
}

impl PayrollStorage {
    /// Create [`PayrollStorage`] with a in-memory backend. Used for testing only.
    pub fn in_memory() -> Self {
        Self { inner: Arc::new(memory::InMemoryStorage::default()) }
    }

    /// Create [`PayrollStorage`] with a SQLite backend. Migrations must already be applied.
    pub fn sqlite(pool: SqlitePool) -> Self {
        Self { inner: Arc::new(sqlite::SqliteStorage::new(pool)) }
    }

    /// Connects to the SQLite database at `url` and applies pending migrations.
    pub async fn connect(url: &str) -> eyre::Result<Self> {
        let pool = SqlitePool::connect(url).await?;
        sqlx::migrate!().run(&pool).await?;
        Ok(Self::sqlite(pool))
    }
}

#[async_trait]
impl StorageApi for PayrollStorage {
    async fn write_payee(&self, payee: &NewPayee) -> api::Result<Payee> {
        self.inner.write_payee(payee).await
    }

    async fn read_payees(&self) -> api::Result<Vec<Payee>> {
        self.inner.read_payees().await
    }

    async fn create_batch(&self) -> api::Result<BatchId> {
        self.inner.create_batch().await
    }

    async fn read_batches_by_status(&self, status: Status) -> api::Result<Vec<Batch>> {
        self.inner.read_batches_by_status(status).await
    }

    async fn read_batch(&self, id: BatchId) -> api::Result<Option<Batch>> {
        self.inner.read_batch(id).await
    }

    async fn read_payments(&self, batch: BatchId) -> api::Result<Vec<Payment>> {
        self.inner.read_payments(batch).await
    }

    async fn read_outstanding_payments(&self, batch: BatchId) -> api::Result<Vec<Payment>> {
        self.inner.read_outstanding_payments(batch).await
    }

    async fn write_batch_status(&self, id: BatchId, status: Status) -> api::Result<()> {
        self.inner.write_batch_status(id, status).await
    }

    async fn write_payment_status(&self, id: PaymentId, status: Status) -> api::Result<()> {
        self.inner.write_payment_status(id, status).await
    }

    async fn write_payment_error(&self, id: PaymentId, error: Option<&str>) -> api::Result<()> {
        self.inner.write_payment_error(id, error).await
    }

    async fn write_pending_transfer(
        &self,
        id: PaymentId,
        transfer: &PendingTransferRecord,
    ) -> api::Result<()> {
        self.inner.write_pending_transfer(id, transfer).await
    }

    async fn remove_pending_transfer(&self, id: PaymentId) -> api::Result<()> {
        self.inner.remove_pending_transfer(id).await
    }
}
