//! Payroll storage implementation using a SQLite database.

use super::{StorageApi, api::Result};
use crate::{
    error::StorageError,
    types::{
        Batch, BatchId, NewPayee, Payee, PayeeId, Payment, PaymentId, PendingTransferRecord,
        Status,
    },
};
use alloy::primitives::U256;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};
use tracing::instrument;

/// SQLite storage implementation.
#[derive(Debug)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Creates a new SQLite storage instance.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Moves the row `id` of `table` to `status`, refusing backward moves.
    async fn update_status(
        &self,
        table: &'static str,
        id: i64,
        status: Status,
        not_found: StorageError,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(eyre::Error::from)?;

        let current: Option<RowStatus> =
            sqlx::query_scalar(&format!("SELECT status FROM {table} WHERE id = ?"))
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(eyre::Error::from)?;
        let current = Status::from(current.ok_or(not_found)?);

        if !current.can_transition_to(status) {
            return Err(StorageError::InvalidTransition {
                record: format!("{} {id}", table.trim_end_matches(['e', 's'])),
                from: current,
                to: status,
            });
        }

        sqlx::query(&format!("UPDATE {table} SET status = ? WHERE id = ?"))
            .bind(RowStatus::from(status))
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(eyre::Error::from)?;

        tx.commit().await.map_err(eyre::Error::from)?;

        Ok(())
    }

    /// Runs an update against a single payment, failing if it does not exist.
    async fn update_payment<'q>(
        &self,
        id: PaymentId,
        query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    ) -> Result<()> {
        let result = query.execute(&self.pool).await.map_err(eyre::Error::from)?;
        if result.rows_affected() == 0 {
            return Err(StorageError::PaymentNotFound(id));
        }
        Ok(())
    }
}

/// This is a wrapper around [`Status`] so the persisted representation stays independent from
/// the domain type.
#[derive(Debug, Clone, Copy, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
enum RowStatus {
    Created,
    Processing,
    Done,
}

impl From<Status> for RowStatus {
    fn from(status: Status) -> Self {
        match status {
            Status::Created => Self::Created,
            Status::Processing => Self::Processing,
            Status::Done => Self::Done,
        }
    }
}

impl From<RowStatus> for Status {
    fn from(status: RowStatus) -> Self {
        match status {
            RowStatus::Created => Self::Created,
            RowStatus::Processing => Self::Processing,
            RowStatus::Done => Self::Done,
        }
    }
}

fn decode_amount(row: &SqliteRow) -> Result<U256> {
    let amount: String = row.try_get("amount").map_err(eyre::Error::from)?;
    U256::from_str_radix(&amount, 10)
        .map_err(|err| StorageError::MalformedRow(format!("amount {amount:?}: {err}")))
}

fn payee_from_row(row: &SqliteRow) -> Result<Payee> {
    Ok(Payee {
        id: PayeeId(row.try_get("id").map_err(eyre::Error::from)?),
        name: row.try_get("name").map_err(eyre::Error::from)?,
        address: row.try_get("address").map_err(eyre::Error::from)?,
        amount: decode_amount(row)?,
    })
}

fn batch_from_row(row: &SqliteRow) -> Result<Batch> {
    Ok(Batch {
        id: BatchId(row.try_get("id").map_err(eyre::Error::from)?),
        status: row.try_get::<RowStatus, _>("status").map_err(eyre::Error::from)?.into(),
        created_at: row.try_get::<DateTime<Utc>, _>("created_at").map_err(eyre::Error::from)?,
    })
}

fn payment_from_row(row: &SqliteRow) -> Result<Payment> {
    let pending: Option<String> = row.try_get("pending_transfer").map_err(eyre::Error::from)?;

    Ok(Payment {
        id: PaymentId(row.try_get("id").map_err(eyre::Error::from)?),
        batch_id: BatchId(row.try_get("batch_id").map_err(eyre::Error::from)?),
        payee_id: PayeeId(row.try_get("payee_id").map_err(eyre::Error::from)?),
        amount: decode_amount(row)?,
        address: row.try_get("address").map_err(eyre::Error::from)?,
        status: row.try_get::<RowStatus, _>("status").map_err(eyre::Error::from)?.into(),
        error: row.try_get("error").map_err(eyre::Error::from)?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at").map_err(eyre::Error::from)?,
        pending: pending.as_deref().map(serde_json::from_str).transpose()?,
    })
}

const PAYMENT_COLUMNS: &str =
    "id, batch_id, payee_id, amount, status, address, error, pending_transfer, created_at";

#[async_trait]
impl StorageApi for SqliteStorage {
    #[instrument(skip_all)]
    async fn write_payee(&self, payee: &NewPayee) -> Result<Payee> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO payees (name, address, amount) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(&payee.name)
        .bind(&payee.address)
        .bind(payee.amount.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(eyre::Error::from)?;

        Ok(Payee {
            id: PayeeId(id),
            name: payee.name.clone(),
            address: payee.address.clone(),
            amount: payee.amount,
        })
    }

    #[instrument(skip_all)]
    async fn read_payees(&self) -> Result<Vec<Payee>> {
        sqlx::query("SELECT id, name, address, amount FROM payees ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(eyre::Error::from)?
            .iter()
            .map(payee_from_row)
            .collect()
    }

    #[instrument(skip_all)]
    async fn create_batch(&self) -> Result<BatchId> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(eyre::Error::from)?;

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO batches (status, created_at) VALUES (?, ?) RETURNING id",
        )
        .bind(RowStatus::Created)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(eyre::Error::from)?;

        sqlx::query(
            r#"
            INSERT INTO payments (batch_id, payee_id, amount, status, address, created_at)
            SELECT ?, id, amount, ?, address, ? FROM payees ORDER BY id
            "#,
        )
        .bind(id)
        .bind(RowStatus::Created)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(eyre::Error::from)?;

        tx.commit().await.map_err(eyre::Error::from)?;

        Ok(BatchId(id))
    }

    #[instrument(skip(self))]
    async fn read_batches_by_status(&self, status: Status) -> Result<Vec<Batch>> {
        sqlx::query("SELECT id, status, created_at FROM batches WHERE status = ? ORDER BY id")
            .bind(RowStatus::from(status))
            .fetch_all(&self.pool)
            .await
            .map_err(eyre::Error::from)?
            .iter()
            .map(batch_from_row)
            .collect()
    }

    #[instrument(skip(self))]
    async fn read_batch(&self, id: BatchId) -> Result<Option<Batch>> {
        sqlx::query("SELECT id, status, created_at FROM batches WHERE id = ?")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(eyre::Error::from)?
            .as_ref()
            .map(batch_from_row)
            .transpose()
    }

    #[instrument(skip(self))]
    async fn read_payments(&self, batch: BatchId) -> Result<Vec<Payment>> {
        sqlx::query(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE batch_id = ? ORDER BY id"
        ))
        .bind(batch.0)
        .fetch_all(&self.pool)
        .await
        .map_err(eyre::Error::from)?
        .iter()
        .map(payment_from_row)
        .collect()
    }

    #[instrument(skip(self))]
    async fn read_outstanding_payments(&self, batch: BatchId) -> Result<Vec<Payment>> {
        sqlx::query(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE batch_id = ? AND status != ? ORDER BY id"
        ))
        .bind(batch.0)
        .bind(RowStatus::Done)
        .fetch_all(&self.pool)
        .await
        .map_err(eyre::Error::from)?
        .iter()
        .map(payment_from_row)
        .collect()
    }

    #[instrument(skip(self))]
    async fn write_batch_status(&self, id: BatchId, status: Status) -> Result<()> {
        self.update_status("batches", id.0, status, StorageError::BatchNotFound(id)).await
    }

    #[instrument(skip(self))]
    async fn write_payment_status(&self, id: PaymentId, status: Status) -> Result<()> {
        self.update_status("payments", id.0, status, StorageError::PaymentNotFound(id)).await
    }

    #[instrument(skip(self))]
    async fn write_payment_error(&self, id: PaymentId, error: Option<&str>) -> Result<()> {
        self.update_payment(
            id,
            sqlx::query("UPDATE payments SET error = ? WHERE id = ?").bind(error).bind(id.0),
        )
        .await
    }

    #[instrument(skip(self, transfer))]
    async fn write_pending_transfer(
        &self,
        id: PaymentId,
        transfer: &PendingTransferRecord,
    ) -> Result<()> {
        self.update_payment(
            id,
            sqlx::query("UPDATE payments SET pending_transfer = ? WHERE id = ?")
                .bind(serde_json::to_string(transfer)?)
                .bind(id.0),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn remove_pending_transfer(&self, id: PaymentId) -> Result<()> {
        self.update_payment(
            id,
            sqlx::query("UPDATE payments SET pending_transfer = NULL WHERE id = ?").bind(id.0),
        )
        .await
    }
}
