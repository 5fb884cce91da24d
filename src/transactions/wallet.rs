use crate::{error::PaymentError, gateway::LedgerGateway, signers::DynSigner};
use alloy::primitives::{Address, U256};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// A signer picked to fund a transfer.
#[derive(Debug, Clone)]
pub struct SelectedSigner {
    /// The key to sign with.
    pub signer: DynSigner,
    /// Account the key signs for.
    pub address: Address,
    /// Token balance of the account when it was checked.
    pub balance: U256,
}

/// Picks a funded signer from an ordered key pool.
///
/// Keys are checked strictly in pool order and the first one whose token balance is strictly
/// greater than the required amount wins. Nothing is reserved, so two transfers selected back to
/// back may both pick a signer that can only cover one of them. Transfers are sequential, so the
/// second one simply fails on-chain or at submission.
#[derive(Debug, Clone)]
pub struct WalletSelector {
    gateway: Arc<dyn LedgerGateway>,
    token: Address,
}

impl WalletSelector {
    /// Creates a selector reading balances of `token`.
    pub fn new(gateway: Arc<dyn LedgerGateway>, token: Address) -> Self {
        Self { gateway, token }
    }

    /// Returns the first signer in `pool` holding more than `required` tokens.
    ///
    /// A failing balance query only skips that key.
    pub async fn select(
        &self,
        pool: &[DynSigner],
        required: U256,
        cancel: &CancellationToken,
    ) -> Result<SelectedSigner, PaymentError> {
        for signer in pool {
            if cancel.is_cancelled() {
                return Err(PaymentError::Cancelled);
            }

            let address = signer.address();
            let balance = match self.gateway.token_balance(self.token, address).await {
                Ok(balance) => balance,
                Err(err) => {
                    warn!(signer = %address, %err, "Failed to fetch signer balance");
                    continue;
                }
            };

            if balance > required {
                return Ok(SelectedSigner { signer: signer.clone(), address, balance });
            }

            debug!(signer = %address, %balance, %required, "Signer has insufficient funds");
        }

        Err(PaymentError::InsufficientFunds { required, tried: pool.len() })
    }
}
