//! Access to the ledger.
//!
//! The engine never talks to a node directly. Everything it needs from the chain goes through
//! [`LedgerGateway`], which keeps the payment logic testable against a scripted ledger.

mod rpc;
pub use rpc::RpcGateway;

use alloy::{
    primitives::{Address, B256, Bytes, ChainId, U256},
    transports::{RpcError, TransportErrorKind},
};
use async_trait::async_trait;
use std::fmt::Debug;

/// Type alias for `Result<T, GatewayError>`
pub type Result<T> = core::result::Result<T, GatewayError>;

/// Errors returned by a [`LedgerGateway`].
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The node refused a submitted transaction.
    #[error("{0}")]
    Rejected(String),
    /// RPC error.
    #[error(transparent)]
    Rpc(#[from] RpcError<TransportErrorKind>),
    /// The node returned data that could not be decoded.
    #[error(transparent)]
    Abi(#[from] alloy::sol_types::Error),
}

/// Inclusion receipt of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferReceipt {
    /// Hash of the transaction.
    pub tx_hash: B256,
    /// Block the transaction was included in, if reported.
    pub block_number: Option<u64>,
    /// Whether execution succeeded.
    pub success: bool,
}

/// Ledger primitives consumed by the payroll engine.
///
/// Every call may fail, and no call is retried here.
#[async_trait]
pub trait LedgerGateway: Debug + Send + Sync {
    /// Returns the chain id of the network.
    async fn chain_id(&self) -> Result<ChainId>;

    /// Returns the next nonce of `account`, including transactions still in the mempool.
    async fn next_nonce(&self, account: Address) -> Result<u64>;

    /// Returns the number of transactions of `account` that are included in the latest block.
    async fn mined_nonce(&self, account: Address) -> Result<u64>;

    /// Returns the suggested gas price, in wei.
    async fn gas_price(&self) -> Result<u128>;

    /// Reads the `token` balance of `account`.
    async fn token_balance(&self, token: Address, account: Address) -> Result<U256>;

    /// Broadcasts an EIP-2718 encoded signed transaction.
    async fn submit(&self, raw: &Bytes) -> Result<()>;

    /// Returns the receipt of a transaction, if it has been included.
    async fn receipt(&self, tx_hash: B256) -> Result<Option<TransferReceipt>>;
}
