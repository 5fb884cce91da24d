//! [`LedgerGateway`] backed by a JSON-RPC node.

use super::{GatewayError, LedgerGateway, Result, TransferReceipt};
use crate::types::{IERC20, encode_balance_of};
use alloy::{
    network::ReceiptResponse,
    primitives::{Address, B256, Bytes, ChainId, U256},
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::{client::ClientBuilder, types::TransactionRequest},
    sol_types::SolCall,
    transports::{RpcError, layers::RetryBackoffLayer},
};
use async_trait::async_trait;
use tracing::instrument;
use url::Url;

/// [`RetryBackoffLayer`] used for the node connection.
///
/// Only rate-limit responses are retried by this layer, at most 10 times with an 800ms backoff.
/// Everything else is surfaced to the caller.
const RETRY_LAYER: RetryBackoffLayer = RetryBackoffLayer::new(10, 800, u64::MAX);

/// Gateway talking to an Ethereum JSON-RPC endpoint.
#[derive(Debug, Clone)]
pub struct RpcGateway {
    provider: DynProvider,
}

impl RpcGateway {
    /// Creates a gateway from an existing provider.
    pub fn new(provider: DynProvider) -> Self {
        Self { provider }
    }

    /// Connects to the node at `endpoint` over HTTP.
    pub fn connect(endpoint: Url) -> Self {
        let client = ClientBuilder::default().layer(RETRY_LAYER).http(endpoint);
        Self::new(ProviderBuilder::new().connect_client(client).erased())
    }
}

#[async_trait]
impl LedgerGateway for RpcGateway {
    async fn chain_id(&self) -> Result<ChainId> {
        Ok(self.provider.get_chain_id().await?)
    }

    async fn next_nonce(&self, account: Address) -> Result<u64> {
        Ok(self.provider.get_transaction_count(account).pending().await?)
    }

    async fn mined_nonce(&self, account: Address) -> Result<u64> {
        Ok(self.provider.get_transaction_count(account).latest().await?)
    }

    async fn gas_price(&self) -> Result<u128> {
        Ok(self.provider.get_gas_price().await?)
    }

    #[instrument(skip(self))]
    async fn token_balance(&self, token: Address, account: Address) -> Result<U256> {
        let request = TransactionRequest::default().to(token).input(encode_balance_of(account).into());
        let output = self.provider.call(request).await?;
        Ok(IERC20::balanceOfCall::abi_decode_returns(&output)?)
    }

    async fn submit(&self, raw: &Bytes) -> Result<()> {
        match self.provider.send_raw_transaction(raw).await {
            Ok(_) => Ok(()),
            Err(RpcError::ErrorResp(payload)) => Err(GatewayError::Rejected(payload.message.to_string())),
            Err(err) => Err(err.into()),
        }
    }

    async fn receipt(&self, tx_hash: B256) -> Result<Option<TransferReceipt>> {
        let receipt = self.provider.get_transaction_receipt(tx_hash).await?;
        Ok(receipt.map(|receipt| TransferReceipt {
            tx_hash,
            block_number: receipt.block_number(),
            success: receipt.status(),
        }))
    }
}
