use crate::{
    constants::TRANSFER_GAS_LIMIT,
    error::PaymentError,
    gateway::LedgerGateway,
    signers::DynSigner,
    types::{PendingTransferRecord, encode_transfer, parse_address},
};
use alloy::{
    consensus::{TxLegacy, TypedTransaction},
    eips::Encodable2718,
    network::{Ethereum, EthereumWallet, NetworkWallet},
    primitives::{Address, B256, Bytes, TxKind, U256},
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// A signed token transfer ready to be broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransfer {
    /// Account the transfer is sent from.
    pub signer: Address,
    /// Destination of the tokens.
    pub to: Address,
    /// Amount of tokens moved.
    pub amount: U256,
    /// Nonce of the transaction.
    pub nonce: u64,
    /// Hash of the signed transaction.
    pub tx_hash: B256,
    /// EIP-2718 encoded signed transaction.
    pub raw: Bytes,
}

impl SignedTransfer {
    /// Returns the durable record of this transfer.
    pub fn record(&self) -> PendingTransferRecord {
        PendingTransferRecord {
            signer: self.signer,
            nonce: self.nonce,
            tx_hash: self.tx_hash,
            raw: self.raw.clone(),
        }
    }
}

/// Builds, signs and submits ERC-20 transfers.
///
/// Nothing is retried here, retries are driven by the payroll run.
#[derive(Debug, Clone)]
pub struct TransferBuilder {
    gateway: Arc<dyn LedgerGateway>,
    token: Address,
}

impl TransferBuilder {
    /// Creates a builder for transfers of `token`.
    pub fn new(gateway: Arc<dyn LedgerGateway>, token: Address) -> Self {
        Self { gateway, token }
    }

    /// Builds and signs a transfer of `amount` tokens to `destination`.
    ///
    /// Chain id, nonce and gas price are fetched right before building since all of them are
    /// owned by the node.
    pub async fn build(
        &self,
        signer: &DynSigner,
        destination: &str,
        amount: U256,
        cancel: &CancellationToken,
    ) -> Result<SignedTransfer, PaymentError> {
        let to = parse_address(destination)?;
        let from = signer.address();

        if cancel.is_cancelled() {
            return Err(PaymentError::Cancelled);
        }
        let (chain_id, nonce, gas_price) = tokio::try_join!(
            self.gateway.chain_id(),
            self.gateway.next_nonce(from),
            self.gateway.gas_price()
        )?;

        let tx = TxLegacy {
            chain_id: Some(chain_id),
            nonce,
            gas_price,
            gas_limit: TRANSFER_GAS_LIMIT,
            to: TxKind::Call(self.token),
            value: U256::ZERO,
            input: encode_transfer(to, amount),
        };

        let wallet = EthereumWallet::new(signer.0.clone());
        let signed = NetworkWallet::<Ethereum>::sign_transaction_from(
            &wallet,
            from,
            TypedTransaction::Legacy(tx),
        )
        .await?;

        let tx_hash = *signed.tx_hash();
        debug!(signer = %from, %to, %amount, nonce, %tx_hash, chain_id, gas_price, "Signed transfer");

        Ok(SignedTransfer {
            signer: from,
            to,
            amount,
            nonce,
            tx_hash,
            raw: signed.encoded_2718().into(),
        })
    }

    /// Broadcasts a signed transaction.
    pub async fn submit(&self, raw: &Bytes, cancel: &CancellationToken) -> Result<(), PaymentError> {
        if cancel.is_cancelled() {
            return Err(PaymentError::Cancelled);
        }
        Ok(self.gateway.submit(raw).await?)
    }
}
