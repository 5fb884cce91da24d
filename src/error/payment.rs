use crate::gateway::GatewayError;
use alloy::primitives::{B256, U256};

/// Errors confined to a single payment.
///
/// Apart from [`PaymentError::Cancelled`], none of these abort a run: the payment is left in its
/// current status and picked up again by the next `repay`.
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    /// The destination is not a well-formed ledger address.
    #[error("invalid destination address {0:?}")]
    InvalidAddress(String),
    /// No signer in the pool holds enough tokens.
    #[error("insufficient funds: no signer holds more than {required} (tried {tried} keys)")]
    InsufficientFunds {
        /// Amount that had to be covered.
        required: U256,
        /// Number of keys whose balance was checked.
        tried: usize,
    },
    /// A ledger query failed.
    #[error("ledger gateway unavailable: {0}")]
    GatewayUnavailable(#[source] GatewayError),
    /// Error occurred while signing the transfer.
    #[error("failed to sign transfer: {0}")]
    SigningFailed(#[from] alloy::signers::Error),
    /// The gateway refused the signed transfer.
    #[error("transfer rejected: {0}")]
    SubmissionRejected(String),
    /// The transfer was submitted but no receipt showed up in time.
    #[error("transfer {tx_hash} unconfirmed after {attempts} receipt lookups")]
    ConfirmationTimeout {
        /// Hash of the submitted transfer.
        tx_hash: B256,
        /// Number of receipt lookups performed.
        attempts: u32,
    },
    /// The transfer was mined but reverted.
    #[error("transfer {tx_hash} failed on ledger in block {block_number:?}")]
    LedgerFailureStatus {
        /// Hash of the reverted transfer.
        tx_hash: B256,
        /// Block the transfer was included in.
        block_number: Option<u64>,
    },
    /// The run was cancelled while this payment was in flight.
    #[error("payment interrupted by cancellation")]
    Cancelled,
}

impl From<GatewayError> for PaymentError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Rejected(reason) => Self::SubmissionRejected(reason),
            err => Self::GatewayUnavailable(err),
        }
    }
}
