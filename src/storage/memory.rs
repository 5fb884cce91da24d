//! Payroll storage implementation in-memory. For testing only.

use super::{StorageApi, api::Result};
use crate::{
    error::StorageError,
    types::{
        Batch, BatchId, NewPayee, Payee, PayeeId, Payment, PaymentId, PendingTransferRecord,
        Status,
    },
};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};

/// [`StorageApi`] implementation in-memory. Used for testing
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    payees: DashMap<PayeeId, Payee>,
    batches: DashMap<BatchId, Batch>,
    payments: DashMap<PaymentId, Payment>,
    next_id: AtomicI64,
}

impl InMemoryStorage {
    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }
}

#[async_trait]
impl StorageApi for InMemoryStorage {
    async fn write_payee(&self, payee: &NewPayee) -> Result<Payee> {
        let payee = Payee {
            id: PayeeId(self.next_id()),
            name: payee.name.clone(),
            address: payee.address.clone(),
            amount: payee.amount,
        };
        self.payees.insert(payee.id, payee.clone());
        Ok(payee)
    }

    async fn read_payees(&self) -> Result<Vec<Payee>> {
        let mut payees: Vec<_> = self.payees.iter().map(|p| p.value().clone()).collect();
        payees.sort_by_key(|p| p.id);
        Ok(payees)
    }

    async fn create_batch(&self) -> Result<BatchId> {
        let now = Utc::now();
        let batch = Batch { id: BatchId(self.next_id()), status: Status::Created, created_at: now };

        for payee in self.read_payees().await? {
            let payment = Payment {
                id: PaymentId(self.next_id()),
                batch_id: batch.id,
                payee_id: payee.id,
                amount: payee.amount,
                address: payee.address,
                status: Status::Created,
                error: None,
                created_at: now,
                pending: None,
            };
            self.payments.insert(payment.id, payment);
        }

        let id = batch.id;
        self.batches.insert(id, batch);
        Ok(id)
    }

    async fn read_batches_by_status(&self, status: Status) -> Result<Vec<Batch>> {
        let mut batches: Vec<_> = self
            .batches
            .iter()
            .filter(|b| b.status == status)
            .map(|b| b.value().clone())
            .collect();
        batches.sort_by_key(|b| b.id);
        Ok(batches)
    }

    async fn read_batch(&self, id: BatchId) -> Result<Option<Batch>> {
        Ok(self.batches.get(&id).map(|b| b.value().clone()))
    }

    async fn read_payments(&self, batch: BatchId) -> Result<Vec<Payment>> {
        let mut payments: Vec<_> = self
            .payments
            .iter()
            .filter(|p| p.batch_id == batch)
            .map(|p| p.value().clone())
            .collect();
        payments.sort_by_key(|p| p.id);
        Ok(payments)
    }

    async fn read_outstanding_payments(&self, batch: BatchId) -> Result<Vec<Payment>> {
        let mut payments = self.read_payments(batch).await?;
        payments.retain(|p| !p.status.is_final());
        Ok(payments)
    }

    async fn write_batch_status(&self, id: BatchId, status: Status) -> Result<()> {
        let mut batch = self.batches.get_mut(&id).ok_or(StorageError::BatchNotFound(id))?;
        if !batch.status.can_transition_to(status) {
            return Err(StorageError::InvalidTransition {
                record: format!("batch {id}"),
                from: batch.status,
                to: status,
            });
        }
        batch.status = status;
        Ok(())
    }

    async fn write_payment_status(&self, id: PaymentId, status: Status) -> Result<()> {
        let mut payment = self.payments.get_mut(&id).ok_or(StorageError::PaymentNotFound(id))?;
        if !payment.status.can_transition_to(status) {
            return Err(StorageError::InvalidTransition {
                record: format!("payment {id}"),
                from: payment.status,
                to: status,
            });
        }
        payment.status = status;
        Ok(())
    }

    async fn write_payment_error(&self, id: PaymentId, error: Option<&str>) -> Result<()> {
        let mut payment = self.payments.get_mut(&id).ok_or(StorageError::PaymentNotFound(id))?;
        payment.error = error.map(str::to_string);
        Ok(())
    }

    async fn write_pending_transfer(
        &self,
        id: PaymentId,
        transfer: &PendingTransferRecord,
    ) -> Result<()> {
        let mut payment = self.payments.get_mut(&id).ok_or(StorageError::PaymentNotFound(id))?;
        payment.pending = Some(transfer.clone());
        Ok(())
    }

    async fn remove_pending_transfer(&self, id: PaymentId) -> Result<()> {
        let mut payment = self.payments.get_mut(&id).ok_or(StorageError::PaymentNotFound(id))?;
        payment.pending = None;
        Ok(())
    }
}
