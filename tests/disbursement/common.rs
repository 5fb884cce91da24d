//! Scripted ledger and fixtures shared by the payroll tests.

use alloy::{
    consensus::TxEnvelope,
    eips::Decodable2718,
    primitives::{Address, B256, Bytes, ChainId, U256, address},
    sol_types::SolCall,
    transports::TransportErrorKind,
};
use async_trait::async_trait;
use payroll::{
    config::DisbursementConfig,
    gateway::{GatewayError, LedgerGateway, TransferReceipt},
    payroll::Payroll,
    signers::DynSigner,
    storage::{PayrollStorage, StorageApi},
    types::{IERC20, NewPayee, Payment, Status},
};
use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

/// Token every test pays in.
pub const TOKEN: Address = address!("5FbDB2315678afecb367f032d93F642f64180aa3");

/// Well known development keys.
pub const KEYS: [&str; 3] = [
    "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
    "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d",
    "0x5de4111afa1a4b94908f83103eb1f1706367c2e68ca870fc3fb9a804cdab365a",
];

/// How submitted transactions are included.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Mining {
    /// Included as soon as they are submitted.
    #[default]
    Instant,
    /// Included as soon as they are submitted, with a failure status.
    Revert,
    /// Kept in the mempool until [`FakeLedger::mine`] is called.
    Manual,
}

/// A token transfer that was executed by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer {
    pub from: Address,
    pub to: Address,
    pub amount: U256,
    pub tx_hash: B256,
}

#[derive(Debug, Clone)]
struct PendingTx {
    hash: B256,
    from: Address,
    nonce: u64,
    to: Address,
    amount: U256,
}

#[derive(Debug, Default)]
pub struct LedgerState {
    pub mining: Mining,
    pub balances: HashMap<Address, U256>,
    pub mined_nonces: HashMap<Address, u64>,
    pub receipts: HashMap<B256, TransferReceipt>,
    pub transfers: Vec<Transfer>,
    /// Every transaction accepted into the mempool, rebroadcasts included.
    pub accepted: Vec<B256>,
    pub balance_queries: Vec<Address>,
    pub receipt_calls: usize,
    pub reject_submissions: bool,
    pub failing_balances: HashSet<Address>,
    mempool: Vec<PendingTx>,
    block: u64,
}

impl LedgerState {
    pub fn fund(&mut self, account: Address, amount: u64) {
        self.balances.insert(account, U256::from(amount));
    }

    pub fn balance(&self, account: Address) -> U256 {
        self.balances.get(&account).copied().unwrap_or_default()
    }

    pub fn transfers_to(&self, to: Address) -> usize {
        self.transfers.iter().filter(|transfer| transfer.to == to).count()
    }

    pub fn mempool_len(&self) -> usize {
        self.mempool.len()
    }

    /// Forgets every transaction that was not included, as a restarted node would.
    pub fn drop_mempool(&mut self) {
        self.mempool.clear();
    }

    /// Includes every transaction in the mempool whose nonce is next.
    pub fn mine(&mut self, revert: bool) {
        let mempool = std::mem::take(&mut self.mempool);
        for tx in mempool {
            let nonce = self.mined_nonces.entry(tx.from).or_default();
            if tx.nonce != *nonce {
                self.mempool.push(tx);
                continue;
            }
            *nonce += 1;
            self.block += 1;

            let success = !revert && self.balance(tx.from) >= tx.amount;
            if success {
                let from_balance = self.balance(tx.from) - tx.amount;
                let to_balance = self.balance(tx.to) + tx.amount;
                self.balances.insert(tx.from, from_balance);
                self.balances.insert(tx.to, to_balance);
                self.transfers.push(Transfer {
                    from: tx.from,
                    to: tx.to,
                    amount: tx.amount,
                    tx_hash: tx.hash,
                });
            }
            self.receipts.insert(
                tx.hash,
                TransferReceipt { tx_hash: tx.hash, block_number: Some(self.block), success },
            );
        }
    }

    /// Consumes the next nonce of `account` with an unrelated transaction and drops whatever
    /// was waiting in the mempool for it.
    pub fn replace_next(&mut self, account: Address) {
        *self.mined_nonces.entry(account).or_default() += 1;
        self.block += 1;
        self.mempool.retain(|tx| tx.from != account);
    }
}

/// In-process ledger implementing [`LedgerGateway`].
#[derive(Debug, Default)]
pub struct FakeLedger {
    state: Mutex<LedgerState>,
}

impl FakeLedger {
    pub fn new(mining: Mining) -> Arc<Self> {
        Arc::new(Self { state: Mutex::new(LedgerState { mining, ..Default::default() }) })
    }

    pub fn state(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap()
    }
}

fn decode(raw: &Bytes) -> Result<PendingTx, GatewayError> {
    let envelope = TxEnvelope::decode_2718(&mut raw.as_ref())
        .map_err(|err| GatewayError::Rejected(err.to_string()))?;
    let TxEnvelope::Legacy(signed) = envelope else {
        return Err(GatewayError::Rejected("unexpected transaction type".into()));
    };
    let from = signed
        .signature()
        .recover_address_from_prehash(&signed.signature_hash())
        .map_err(|err| GatewayError::Rejected(err.to_string()))?;
    let call = IERC20::transferCall::abi_decode(&signed.tx().input)
        .map_err(|err| GatewayError::Rejected(err.to_string()))?;

    Ok(PendingTx {
        hash: *signed.hash(),
        from,
        nonce: signed.tx().nonce,
        to: call.to,
        amount: call.amount,
    })
}

#[async_trait]
impl LedgerGateway for FakeLedger {
    async fn chain_id(&self) -> Result<ChainId, GatewayError> {
        Ok(31337)
    }

    async fn next_nonce(&self, account: Address) -> Result<u64, GatewayError> {
        let state = self.state();
        let mined = state.mined_nonces.get(&account).copied().unwrap_or_default();
        let pending = state.mempool.iter().filter(|tx| tx.from == account).count() as u64;
        Ok(mined + pending)
    }

    async fn mined_nonce(&self, account: Address) -> Result<u64, GatewayError> {
        Ok(self.state().mined_nonces.get(&account).copied().unwrap_or_default())
    }

    async fn gas_price(&self) -> Result<u128, GatewayError> {
        Ok(1_000_000_000)
    }

    async fn token_balance(&self, token: Address, account: Address) -> Result<U256, GatewayError> {
        assert_eq!(token, TOKEN);
        let mut state = self.state();
        state.balance_queries.push(account);
        if state.failing_balances.contains(&account) {
            return Err(TransportErrorKind::custom_str("connection refused").into());
        }
        Ok(state.balance(account))
    }

    async fn submit(&self, raw: &Bytes) -> Result<(), GatewayError> {
        let tx = decode(raw)?;
        let mut state = self.state();
        if state.reject_submissions {
            return Err(GatewayError::Rejected("insufficient funds for gas * price + value".into()));
        }
        if state.receipts.contains_key(&tx.hash) || state.mempool.iter().any(|p| p.hash == tx.hash)
        {
            return Err(GatewayError::Rejected("already known".into()));
        }
        if tx.nonce < state.mined_nonces.get(&tx.from).copied().unwrap_or_default() {
            return Err(GatewayError::Rejected("nonce too low".into()));
        }

        state.accepted.push(tx.hash);
        state.mempool.push(tx);
        match state.mining {
            Mining::Instant => state.mine(false),
            Mining::Revert => state.mine(true),
            Mining::Manual => {}
        }
        Ok(())
    }

    async fn receipt(&self, tx_hash: B256) -> Result<Option<TransferReceipt>, GatewayError> {
        let mut state = self.state();
        state.receipt_calls += 1;
        Ok(state.receipts.get(&tx_hash).copied())
    }
}

/// Returns the first `n` development keys.
pub fn signers(n: usize) -> Vec<DynSigner> {
    DynSigner::load_all(&KEYS[..n]).unwrap()
}

/// Disbursement settings without any waiting.
pub fn config(poll_attempts: u32) -> DisbursementConfig {
    DisbursementConfig {
        token: TOKEN,
        throttle_window: Duration::ZERO,
        poll_interval: Duration::ZERO,
        poll_attempts,
    }
}

/// Address of the `n`th test payee.
pub fn payee_address(n: u8) -> Address {
    Address::with_last_byte(n)
}

/// Adds payees to the roster.
pub async fn roster(storage: &PayrollStorage, payees: &[(&str, String, u64)]) {
    for (name, address, amount) in payees {
        storage
            .write_payee(&NewPayee {
                name: name.to_string(),
                address: address.clone(),
                amount: U256::from(*amount),
            })
            .await
            .unwrap();
    }
}

/// A payroll over `storage` and `ledger` using the first `keys` development keys.
pub fn new_payroll(storage: &PayrollStorage, ledger: &Arc<FakeLedger>, keys: usize) -> Payroll {
    Payroll::new(storage.clone(), ledger.clone(), signers(keys), &config(3))
}

/// Every payment of every batch, ordered by id.
pub async fn all_payments(storage: &PayrollStorage) -> Vec<Payment> {
    let mut payments = Vec::new();
    for status in [Status::Created, Status::Processing, Status::Done] {
        for batch in storage.read_batches_by_status(status).await.unwrap() {
            payments.extend(storage.read_payments(batch.id).await.unwrap());
        }
    }
    payments.sort_by_key(|payment| payment.id);
    payments
}

/// Number of batches in `status`.
pub async fn batches_in(storage: &PayrollStorage, status: Status) -> usize {
    storage.read_batches_by_status(status).await.unwrap().len()
}
