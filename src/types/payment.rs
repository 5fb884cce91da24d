use super::{BatchId, PayeeId, Status};
use crate::error::PaymentError;
use alloy::primitives::{Address, B256, Bytes, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Identifier of a [`Payment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PaymentId(pub i64);

impl fmt::Display for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A disbursement owed to one payee within one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payment {
    /// Id of the payment.
    pub id: PaymentId,
    /// Batch this payment belongs to.
    pub batch_id: BatchId,
    /// Payee this payment is owed to.
    pub payee_id: PayeeId,
    /// Amount in the smallest token unit, fixed when the batch was created.
    pub amount: U256,
    /// Destination address, copied from the roster when the batch was created.
    pub address: String,
    /// Current status.
    pub status: Status,
    /// Last error recorded for this payment, if any.
    pub error: Option<String>,
    /// When the payment was created.
    pub created_at: DateTime<Utc>,
    /// Transfer submitted for this payment that has not been confirmed yet.
    pub pending: Option<PendingTransferRecord>,
}

impl Payment {
    /// Parses the destination address of the payment.
    pub fn destination(&self) -> Result<Address, PaymentError> {
        parse_address(&self.address)
    }
}

/// Durable trace of a signed transfer.
///
/// It is written before the transfer is broadcast, so a later run can tell whether the transfer
/// already landed before building a new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingTransferRecord {
    /// Account the transfer was sent from.
    pub signer: Address,
    /// Nonce the transfer occupies.
    pub nonce: u64,
    /// Hash of the signed transaction.
    pub tx_hash: B256,
    /// EIP-2718 encoded signed transaction, used for rebroadcasting.
    pub raw: Bytes,
}

/// Parses a ledger address, accepting it with or without the `0x` prefix.
///
/// Checksums are not enforced.
pub fn parse_address(s: &str) -> Result<Address, PaymentError> {
    Address::from_str(s).map_err(|_| PaymentError::InvalidAddress(s.to_string()))
}
