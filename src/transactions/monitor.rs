use crate::{
    error::PaymentError,
    gateway::{LedgerGateway, TransferReceipt},
};
use alloy::primitives::B256;
use std::{sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Polls the ledger for the receipt of a submitted transaction.
#[derive(Debug, Clone)]
pub struct ConfirmationPoller {
    gateway: Arc<dyn LedgerGateway>,
    interval: Duration,
    attempts: u32,
}

impl ConfirmationPoller {
    /// Creates a poller performing at most `attempts` receipt lookups, `interval` apart.
    pub fn new(gateway: Arc<dyn LedgerGateway>, interval: Duration, attempts: u32) -> Self {
        Self { gateway, interval, attempts: attempts.max(1) }
    }

    /// Waits until `tx_hash` is included.
    ///
    /// Returns [`PaymentError::LedgerFailureStatus`] as soon as the transaction is mined with a
    /// failure status, and [`PaymentError::ConfirmationTimeout`] if no receipt showed up within
    /// the lookup budget. A timeout says nothing about whether the transaction will still land.
    pub async fn wait(
        &self,
        tx_hash: B256,
        cancel: &CancellationToken,
    ) -> Result<TransferReceipt, PaymentError> {
        for attempt in 1..=self.attempts {
            if cancel.is_cancelled() {
                return Err(PaymentError::Cancelled);
            }

            match self.gateway.receipt(tx_hash).await {
                Ok(Some(receipt)) if !receipt.success => {
                    return Err(PaymentError::LedgerFailureStatus {
                        tx_hash,
                        block_number: receipt.block_number,
                    });
                }
                Ok(Some(receipt)) => {
                    debug!(%tx_hash, block = ?receipt.block_number, attempt, "Transfer confirmed");
                    return Ok(receipt);
                }
                Ok(None) => debug!(%tx_hash, attempt, "Transfer not included yet"),
                Err(err) => warn!(%tx_hash, attempt, %err, "Failed to fetch receipt"),
            }

            if attempt < self.attempts {
                tokio::select! {
                    _ = cancel.cancelled() => return Err(PaymentError::Cancelled),
                    _ = tokio::time::sleep(self.interval) => {}
                }
            }
        }

        Err(PaymentError::ConfirmationTimeout { tx_hash, attempts: self.attempts })
    }
}
