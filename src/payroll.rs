//! Payroll runs.
//!
//! A run walks batches and their outstanding payments through `Created -> Processing -> Done`.
//! A payment is marked as processing before anything is sent for it, and the signed transfer is
//! recorded before it is broadcast, so a run interrupted at any point can be resumed with
//! [`Payroll::repay`] without paying anyone twice.

use crate::{
    config::DisbursementConfig,
    error::{PaymentError, PayrollError, StorageError},
    gateway::{LedgerGateway, TransferReceipt},
    lock::RunLock,
    signers::DynSigner,
    storage::{PayrollStorage, StorageApi},
    transactions::{ConfirmationPoller, PayrollMetrics, TransferBuilder, WalletSelector},
    types::{Batch, Payment, PendingTransferRecord, Status},
};
use std::{path::PathBuf, sync::Arc, time::Duration};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Outcome of a [`Payroll::pay`] or [`Payroll::repay`] run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Number of batches visited.
    pub batches: usize,
    /// Number of payments that reached [`Status::Done`].
    pub paid: usize,
    /// Number of payments left in [`Status::Processing`] for a later run.
    pub failed: usize,
    /// Number of payments skipped because of a malformed address.
    pub skipped: usize,
}

impl RunSummary {
    /// Whether every visited payment was paid.
    pub fn is_complete(&self) -> bool {
        self.failed == 0 && self.skipped == 0
    }
}

/// What happened to a single payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Paid,
    Failed,
    Skipped,
}

/// Why a transfer attempt stopped.
#[derive(Debug)]
enum AttemptError {
    Payment(PaymentError),
    Storage(StorageError),
}

impl From<PaymentError> for AttemptError {
    fn from(err: PaymentError) -> Self {
        Self::Payment(err)
    }
}

impl From<StorageError> for AttemptError {
    fn from(err: StorageError) -> Self {
        Self::Storage(err)
    }
}

/// Drives payroll batches to completion.
#[derive(Debug)]
pub struct Payroll {
    storage: PayrollStorage,
    gateway: Arc<dyn LedgerGateway>,
    /// Ordered key pool transfers are funded from.
    signers: Vec<DynSigner>,
    selector: WalletSelector,
    builder: TransferBuilder,
    poller: ConfirmationPoller,
    throttle_window: Duration,
    lock_path: Option<PathBuf>,
    cancel: CancellationToken,
    metrics: PayrollMetrics,
}

impl Payroll {
    /// Creates a new [`Payroll`].
    pub fn new(
        storage: PayrollStorage,
        gateway: Arc<dyn LedgerGateway>,
        signers: Vec<DynSigner>,
        config: &DisbursementConfig,
    ) -> Self {
        Self {
            selector: WalletSelector::new(gateway.clone(), config.token),
            builder: TransferBuilder::new(gateway.clone(), config.token),
            poller: ConfirmationPoller::new(
                gateway.clone(),
                config.poll_interval,
                config.poll_attempts,
            ),
            storage,
            gateway,
            signers,
            throttle_window: config.throttle_window,
            lock_path: None,
            cancel: CancellationToken::new(),
            metrics: PayrollMetrics::default(),
        }
    }

    /// Holds an exclusive lock file at `path` for the duration of every run.
    pub fn with_run_lock(mut self, path: impl Into<PathBuf>) -> Self {
        self.lock_path = Some(path.into());
        self
    }

    /// Uses `cancel` to interrupt runs.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Returns the token cancelling runs of this payroll.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Returns the underlying storage.
    pub fn storage(&self) -> &PayrollStorage {
        &self.storage
    }

    /// Starts a new payroll cycle.
    ///
    /// Creates a batch from the current roster and pays every batch that has not been picked up
    /// yet.
    pub async fn pay(&self) -> Result<RunSummary, PayrollError> {
        let _lock = self.lock()?;

        let batch = self.storage.create_batch().await?;
        info!(%batch, "Created batch");

        let batches = self.storage.read_batches_by_status(Status::Created).await?;
        self.run(batches).await
    }

    /// Resumes every batch that was started but not finished.
    ///
    /// Only payments that are not done are visited, no batch is created.
    pub async fn repay(&self) -> Result<RunSummary, PayrollError> {
        let _lock = self.lock()?;

        let batches = self.storage.read_batches_by_status(Status::Processing).await?;
        self.run(batches).await
    }

    fn lock(&self) -> Result<Option<RunLock>, PayrollError> {
        Ok(self.lock_path.as_ref().map(RunLock::acquire).transpose()?)
    }

    async fn run(&self, batches: Vec<Batch>) -> Result<RunSummary, PayrollError> {
        info!(batches = batches.len(), signers = self.signers.len(), "Starting payroll run");

        let mut summary = RunSummary::default();
        for batch in &batches {
            self.process_batch(batch, &mut summary).await?;
            summary.batches += 1;
        }

        info!(?summary, "Payroll run finished");
        Ok(summary)
    }

    async fn process_batch(
        &self,
        batch: &Batch,
        summary: &mut RunSummary,
    ) -> Result<(), PayrollError> {
        self.storage.write_batch_status(batch.id, Status::Processing).await?;

        let payments = self.storage.read_outstanding_payments(batch.id).await?;
        let delay = throttle_delay(self.throttle_window, payments.len());
        info!(batch = %batch.id, payments = payments.len(), ?delay, "Processing batch");

        let mut errors = 0usize;
        for (idx, payment) in payments.iter().enumerate() {
            if self.cancel.is_cancelled() {
                return Err(PayrollError::Cancelled);
            }

            match self.process_payment(payment).await? {
                Outcome::Paid => summary.paid += 1,
                Outcome::Failed => {
                    errors += 1;
                    summary.failed += 1;
                }
                Outcome::Skipped => {
                    errors += 1;
                    summary.skipped += 1;
                }
            }

            if idx + 1 < payments.len() && !delay.is_zero() {
                tokio::select! {
                    _ = self.cancel.cancelled() => return Err(PayrollError::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }

        if errors == 0 {
            self.storage.write_batch_status(batch.id, Status::Done).await?;
            info!(batch = %batch.id, "Batch done");
        } else {
            warn!(batch = %batch.id, errors, "Batch left for a later repay");
        }

        Ok(())
    }

    async fn process_payment(&self, payment: &Payment) -> Result<Outcome, PayrollError> {
        if let Err(err) = payment.destination() {
            warn!(payment = %payment.id, %err, "Skipping payment");
            self.metrics.skipped.increment(1);
            return Ok(Outcome::Skipped);
        }

        self.storage.write_payment_status(payment.id, Status::Processing).await?;

        match self.settle(payment).await {
            Ok(receipt) => {
                self.storage.write_payment_status(payment.id, Status::Done).await?;
                self.storage.remove_pending_transfer(payment.id).await?;
                if payment.error.is_some() {
                    self.storage.write_payment_error(payment.id, None).await?;
                }
                self.metrics.confirmed.increment(1);
                info!(
                    payment = %payment.id,
                    payee = %payment.payee_id,
                    amount = %payment.amount,
                    tx_hash = %receipt.tx_hash,
                    "Payment done"
                );
                Ok(Outcome::Paid)
            }
            Err(AttemptError::Storage(err)) => Err(err.into()),
            Err(AttemptError::Payment(PaymentError::Cancelled)) => {
                warn!(payment = %payment.id, "Payment interrupted, left for a later repay");
                Err(PayrollError::Cancelled)
            }
            Err(AttemptError::Payment(err)) => {
                error!(payment = %payment.id, %err, "Payment failed");
                self.storage.write_payment_error(payment.id, Some(err.to_string().as_str())).await?;
                self.metrics.failed.increment(1);
                Ok(Outcome::Failed)
            }
        }
    }

    /// Moves the tokens of `payment`, reusing a previously recorded transfer when there is one.
    async fn settle(&self, payment: &Payment) -> Result<TransferReceipt, AttemptError> {
        if let Some(record) = &payment.pending
            && let Some(receipt) = self.resume(payment, record).await?
        {
            return Ok(receipt);
        }

        let selected = self.selector.select(&self.signers, payment.amount, &self.cancel).await?;
        debug!(
            payment = %payment.id,
            signer = %selected.address,
            balance = %selected.balance,
            "Selected funded signer"
        );
        let transfer = self
            .builder
            .build(&selected.signer, &payment.address, payment.amount, &self.cancel)
            .await?;

        self.storage.write_pending_transfer(payment.id, &transfer.record()).await?;

        if let Err(err) = self.builder.submit(&transfer.raw, &self.cancel).await {
            if matches!(err, PaymentError::SubmissionRejected(_)) {
                // never reached a mempool, nothing to resume
                self.storage.remove_pending_transfer(payment.id).await?;
            }
            return Err(err.into());
        }
        self.metrics.sent.increment(1);
        info!(payment = %payment.id, tx_hash = %transfer.tx_hash, signer = %transfer.signer, "Transfer submitted");

        let started = Instant::now();
        let receipt = self.poller.wait(transfer.tx_hash, &self.cancel).await?;
        self.metrics.confirmation_time.record(started.elapsed().as_millis() as f64);

        Ok(receipt)
    }

    /// Resolves a transfer recorded by an earlier run.
    ///
    /// Returns the receipt if the transfer landed, or `None` if it can never land and a new
    /// transfer has to be built. A transfer that may still land is rebroadcast and waited for.
    async fn resume(
        &self,
        payment: &Payment,
        record: &PendingTransferRecord,
    ) -> Result<Option<TransferReceipt>, AttemptError> {
        if self.cancel.is_cancelled() {
            return Err(PaymentError::Cancelled.into());
        }

        // The nonce has to be read before the receipt. Otherwise the transfer could be mined in
        // between and look like it was replaced.
        let mined_nonce =
            self.gateway.mined_nonce(record.signer).await.map_err(PaymentError::from)?;
        let receipt = self.gateway.receipt(record.tx_hash).await.map_err(PaymentError::from)?;

        match receipt {
            Some(receipt) if receipt.success => {
                info!(payment = %payment.id, tx_hash = %record.tx_hash, "Recorded transfer already landed");
                return Ok(Some(receipt));
            }
            Some(_) => {
                info!(payment = %payment.id, tx_hash = %record.tx_hash, "Recorded transfer reverted, sending a new one");
                self.storage.remove_pending_transfer(payment.id).await?;
                return Ok(None);
            }
            None if mined_nonce > record.nonce => {
                info!(
                    payment = %payment.id,
                    tx_hash = %record.tx_hash,
                    nonce = record.nonce,
                    "Recorded transfer was replaced, sending a new one"
                );
                self.storage.remove_pending_transfer(payment.id).await?;
                return Ok(None);
            }
            None => {}
        }

        debug!(payment = %payment.id, tx_hash = %record.tx_hash, "Rebroadcasting recorded transfer");
        match self.builder.submit(&record.raw, &self.cancel).await {
            Ok(()) | Err(PaymentError::SubmissionRejected(_)) => {}
            Err(err) => return Err(err.into()),
        }

        Ok(Some(self.poller.wait(record.tx_hash, &self.cancel).await?))
    }
}

/// Spreads `count` payments over `window`.
pub fn throttle_delay(window: Duration, count: usize) -> Duration {
    match u32::try_from(count) {
        Ok(0) => Duration::ZERO,
        Ok(count) => window / count,
        Err(_) => Duration::ZERO,
    }
}
