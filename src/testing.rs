//! Test utilities and fake implementations for bridge flows
//!
//! [`FakeContractCaller`] stands in for the token and bridge contracts and the
//! chain they live on, so the orchestrator can be driven through rejected
//! approvals, reverts, slow fee quotes and pending receipts without a node.
//! [`FakeClock`] records requested sleeps and returns immediately.

use alloy_primitives::{Address, TxHash, U256};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::{BridgeError, Result};
use crate::fee::FeeQuote;
use crate::finality::TxReceipt;
use crate::progress::{ProgressState, ProgressView};
use crate::submit::BridgeRequest;
use crate::traits::{Clock, ContractCaller};

// ============================================================================
// Fake Contract Caller
// ============================================================================

/// The [`ContractCaller`] operations, for configuring failures and counting
/// calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FakeOperation {
    Allowance,
    BalanceOf,
    QuoteFee,
    SubmitApprove,
    SubmitBridge,
    EstimateGas,
    Receipt,
    BlockNumber,
    GasPrice,
}

/// How a configured operation fails before reaching the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeFailure {
    /// Simulation revert with the given reason.
    Revert(String),
    /// Transport or wallet failure, e.g. the user rejecting a signature.
    Provider(String),
}

impl FakeFailure {
    fn to_error(&self) -> BridgeError {
        match self {
            Self::Revert(reason) => BridgeError::ContractRevert {
                reason: reason.clone(),
            },
            Self::Provider(message) => BridgeError::Provider(message.clone()),
        }
    }
}

/// One recorded call, in the order it was made.
///
/// Submissions carry the hash they returned, or `None` if they failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeCall {
    Allowance {
        token: Address,
        owner: Address,
        spender: Address,
    },
    BalanceOf {
        token: Address,
        account: Address,
    },
    QuoteFee {
        bridge: Address,
        request: BridgeRequest,
    },
    SubmitApprove {
        token: Address,
        owner: Address,
        spender: Address,
        amount: U256,
        tx_hash: Option<TxHash>,
    },
    SubmitBridge {
        bridge: Address,
        from: Address,
        request: BridgeRequest,
        native_fee: U256,
        tx_hash: Option<TxHash>,
    },
    EstimateGas {
        bridge: Address,
        from: Address,
    },
    Receipt {
        tx_hash: TxHash,
    },
    BlockNumber,
    GasPrice,
}

impl FakeCall {
    pub fn operation(&self) -> FakeOperation {
        match self {
            Self::Allowance { .. } => FakeOperation::Allowance,
            Self::BalanceOf { .. } => FakeOperation::BalanceOf,
            Self::QuoteFee { .. } => FakeOperation::QuoteFee,
            Self::SubmitApprove { .. } => FakeOperation::SubmitApprove,
            Self::SubmitBridge { .. } => FakeOperation::SubmitBridge,
            Self::EstimateGas { .. } => FakeOperation::EstimateGas,
            Self::Receipt { .. } => FakeOperation::Receipt,
            Self::BlockNumber => FakeOperation::BlockNumber,
            Self::GasPrice => FakeOperation::GasPrice,
        }
    }
}

#[derive(Debug, Clone)]
struct SubmittedTx {
    mined_at: u64,
    success: bool,
    polls: u32,
}

#[derive(Debug)]
struct FakeChain {
    allowances: HashMap<(Address, Address, Address), U256>,
    balances: HashMap<(Address, Address), U256>,
    fee_quote: FeeQuote,
    fee_quotes_by_amount: HashMap<U256, FeeQuote>,
    fee_latency_by_amount: HashMap<U256, Duration>,
    failures: HashMap<FakeOperation, FakeFailure>,
    on_chain_reverts: HashSet<FakeOperation>,
    pending_polls: u32,
    transactions: HashMap<TxHash, SubmittedTx>,
    head: u64,
    blocks_per_poll: u64,
    gas_price: u128,
    bridge_gas: u64,
    next_tx: u64,
    calls: Vec<FakeCall>,
    progress: Option<ProgressView>,
    progress_log: Vec<(FakeOperation, ProgressState)>,
}

impl Default for FakeChain {
    fn default() -> Self {
        Self {
            allowances: HashMap::new(),
            balances: HashMap::new(),
            fee_quote: FeeQuote {
                native_fee: U256::from(500_000_000_000_000u64),
                lz_token_fee: Some(U256::ZERO),
            },
            fee_quotes_by_amount: HashMap::new(),
            fee_latency_by_amount: HashMap::new(),
            failures: HashMap::new(),
            on_chain_reverts: HashSet::new(),
            pending_polls: 0,
            transactions: HashMap::new(),
            head: 1_000,
            blocks_per_poll: 0,
            gas_price: 1_000_000_000,
            bridge_gas: 250_000,
            next_tx: 1,
            calls: Vec::new(),
            progress: None,
            progress_log: Vec::new(),
        }
    }
}

impl FakeChain {
    /// Logs the call and returns the configured failure for `operation`.
    fn enter(&mut self, call: FakeCall) -> Result<()> {
        let operation = call.operation();
        if let Some(view) = &self.progress {
            self.progress_log.push((operation, view.current()));
        }
        self.calls.push(call);
        match self.failures.get(&operation) {
            Some(failure) => Err(failure.to_error()),
            None => Ok(()),
        }
    }

    fn mine(&mut self, operation: FakeOperation) -> TxHash {
        let tx_hash = TxHash::from(U256::from(self.next_tx).to_be_bytes::<32>());
        self.next_tx += 1;
        self.transactions.insert(
            tx_hash,
            SubmittedTx {
                mined_at: self.head,
                success: !self.on_chain_reverts.contains(&operation),
                polls: 0,
            },
        );
        tx_hash
    }

    /// Fills in the hash of the submission logged last.
    fn record_hash(&mut self, hash: TxHash) {
        match self.calls.last_mut() {
            Some(FakeCall::SubmitApprove { tx_hash, .. })
            | Some(FakeCall::SubmitBridge { tx_hash, .. }) => *tx_hash = Some(hash),
            _ => {}
        }
    }
}

/// In-memory token and bridge contracts with a scriptable chain.
///
/// Defaults: zero allowances and balances, a fee quote of 0.0005 native
/// units, receipts available on the first poll, head at block 1000.
///
/// Submitting an approval that is not configured to revert updates the
/// allowance, so a second allowance check sees it.
#[derive(Clone, Debug, Default)]
pub struct FakeContractCaller {
    chain: Arc<Mutex<FakeChain>>,
}

impl FakeContractCaller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_allowance(&self, token: Address, owner: Address, spender: Address, amount: U256) {
        self.chain
            .lock()
            .unwrap()
            .allowances
            .insert((token, owner, spender), amount);
    }

    pub fn set_balance(&self, token: Address, account: Address, amount: U256) {
        self.chain
            .lock()
            .unwrap()
            .balances
            .insert((token, account), amount);
    }

    /// Quote returned for any amount without a specific quote.
    pub fn set_fee_quote(&self, quote: FeeQuote) {
        self.chain.lock().unwrap().fee_quote = quote;
    }

    pub fn set_fee_quote_for(&self, amount: U256, quote: FeeQuote) {
        self.chain
            .lock()
            .unwrap()
            .fee_quotes_by_amount
            .insert(amount, quote);
    }

    /// Delays fee quotes for `amount` by `latency` of tokio time.
    pub fn set_fee_latency_for(&self, amount: U256, latency: Duration) {
        self.chain
            .lock()
            .unwrap()
            .fee_latency_by_amount
            .insert(amount, latency);
    }

    /// Makes every call to `operation` fail until cleared.
    pub fn fail(&self, operation: FakeOperation, failure: FakeFailure) {
        self.chain
            .lock()
            .unwrap()
            .failures
            .insert(operation, failure);
    }

    pub fn clear_failure(&self, operation: FakeOperation) {
        self.chain.lock().unwrap().failures.remove(&operation);
    }

    /// Transactions submitted through `operation` are accepted but mined with
    /// a failed status.
    pub fn revert_on_chain(&self, operation: FakeOperation) {
        self.chain
            .lock()
            .unwrap()
            .on_chain_reverts
            .insert(operation);
    }

    /// Number of receipt polls per transaction that report it as pending.
    pub fn set_pending_polls(&self, polls: u32) {
        self.chain.lock().unwrap().pending_polls = polls;
    }

    /// Advances the chain head on every receipt poll.
    pub fn advance_blocks_per_poll(&self, blocks: u64) {
        self.chain.lock().unwrap().blocks_per_poll = blocks;
    }

    pub fn set_gas_price(&self, gas_price: u128) {
        self.chain.lock().unwrap().gas_price = gas_price;
    }

    pub fn set_bridge_gas(&self, gas: u64) {
        self.chain.lock().unwrap().bridge_gas = gas;
    }

    /// Snapshots `view` whenever a contract operation is called.
    pub fn observe_progress(&self, view: ProgressView) {
        self.chain.lock().unwrap().progress = Some(view);
    }

    /// Progress states seen when `operation` was called, in call order.
    pub fn progress_at(&self, operation: FakeOperation) -> Vec<ProgressState> {
        self.chain
            .lock()
            .unwrap()
            .progress_log
            .iter()
            .filter(|(op, _)| *op == operation)
            .map(|(_, state)| state.clone())
            .collect()
    }

    pub fn calls(&self) -> Vec<FakeCall> {
        self.chain.lock().unwrap().calls.clone()
    }

    pub fn count(&self, operation: FakeOperation) -> usize {
        self.chain
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|call| call.operation() == operation)
            .count()
    }

    /// Count of submissions of any kind.
    pub fn transactions_sent(&self) -> usize {
        self.count(FakeOperation::SubmitApprove) + self.count(FakeOperation::SubmitBridge)
    }
}

#[async_trait]
impl ContractCaller for FakeContractCaller {
    async fn allowance(&self, token: Address, owner: Address, spender: Address) -> Result<U256> {
        let mut chain = self.chain.lock().unwrap();
        chain.enter(FakeCall::Allowance {
            token,
            owner,
            spender,
        })?;
        Ok(chain
            .allowances
            .get(&(token, owner, spender))
            .copied()
            .unwrap_or_default())
    }

    async fn balance_of(&self, token: Address, account: Address) -> Result<U256> {
        let mut chain = self.chain.lock().unwrap();
        chain.enter(FakeCall::BalanceOf { token, account })?;
        Ok(chain
            .balances
            .get(&(token, account))
            .copied()
            .unwrap_or_default())
    }

    async fn quote_fee(&self, bridge: Address, request: &BridgeRequest) -> Result<FeeQuote> {
        let (outcome, latency) = {
            let mut chain = self.chain.lock().unwrap();
            let outcome = chain
                .enter(FakeCall::QuoteFee {
                    bridge,
                    request: request.clone(),
                })
                .map(|()| {
                    chain
                        .fee_quotes_by_amount
                        .get(&request.amount)
                        .copied()
                        .unwrap_or(chain.fee_quote)
                });
            (outcome, chain.fee_latency_by_amount.get(&request.amount).copied())
        };

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        outcome
    }

    async fn submit_approve(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
        amount: U256,
    ) -> Result<TxHash> {
        let mut chain = self.chain.lock().unwrap();
        chain.enter(FakeCall::SubmitApprove {
            token,
            owner,
            spender,
            amount,
            tx_hash: None,
        })?;
        let tx_hash = chain.mine(FakeOperation::SubmitApprove);
        chain.record_hash(tx_hash);
        if !chain.on_chain_reverts.contains(&FakeOperation::SubmitApprove) {
            chain.allowances.insert((token, owner, spender), amount);
        }
        Ok(tx_hash)
    }

    async fn submit_bridge(
        &self,
        bridge: Address,
        from: Address,
        request: &BridgeRequest,
        native_fee: U256,
    ) -> Result<TxHash> {
        let mut chain = self.chain.lock().unwrap();
        chain.enter(FakeCall::SubmitBridge {
            bridge,
            from,
            request: request.clone(),
            native_fee,
            tx_hash: None,
        })?;
        let tx_hash = chain.mine(FakeOperation::SubmitBridge);
        chain.record_hash(tx_hash);
        Ok(tx_hash)
    }

    async fn estimate_bridge_gas(
        &self,
        bridge: Address,
        from: Address,
        _request: &BridgeRequest,
        _native_fee: U256,
    ) -> Result<u64> {
        let mut chain = self.chain.lock().unwrap();
        chain.enter(FakeCall::EstimateGas { bridge, from })?;
        Ok(chain.bridge_gas)
    }

    async fn transaction_receipt(&self, tx_hash: TxHash) -> Result<Option<TxReceipt>> {
        let mut chain = self.chain.lock().unwrap();
        chain.enter(FakeCall::Receipt { tx_hash })?;
        let blocks = chain.blocks_per_poll;
        chain.head += blocks;

        let pending_polls = chain.pending_polls;
        let Some(tx) = chain.transactions.get_mut(&tx_hash) else {
            return Ok(None);
        };
        tx.polls = tx.polls.saturating_add(1);
        if tx.polls <= pending_polls {
            return Ok(None);
        }

        Ok(Some(TxReceipt {
            tx_hash,
            block_number: Some(tx.mined_at),
            success: tx.success,
            gas_used: 21_000,
        }))
    }

    async fn block_number(&self) -> Result<u64> {
        let mut chain = self.chain.lock().unwrap();
        chain.enter(FakeCall::BlockNumber)?;
        Ok(chain.head)
    }

    async fn gas_price(&self) -> Result<u128> {
        let mut chain = self.chain.lock().unwrap();
        chain.enter(FakeCall::GasPrice)?;
        Ok(chain.gas_price)
    }
}

// ============================================================================
// Fake Clock
// ============================================================================

/// A clock that records sleeps and returns immediately.
#[derive(Clone, Debug, Default)]
pub struct FakeClock {
    sleep_log: Arc<Mutex<Vec<Duration>>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the total time "slept" by this clock
    pub fn total_sleep_time(&self) -> Duration {
        self.sleep_log.lock().unwrap().iter().sum()
    }

    /// Get the number of times sleep was called
    pub fn sleep_count(&self) -> usize {
        self.sleep_log.lock().unwrap().len()
    }

    pub fn clear_sleep_log(&self) {
        self.sleep_log.lock().unwrap().clear();
    }
}

#[async_trait]
impl Clock for FakeClock {
    async fn sleep(&self, duration: Duration) {
        self.sleep_log.lock().unwrap().push(duration);
    }
}
