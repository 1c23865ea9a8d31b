//! Core trait abstractions for bridge operations.
//!
//! Every interaction with the chain goes through [`ContractCaller`], and every
//! wait goes through [`Clock`]. The production implementations live in
//! [`crate::providers`]; the fakes in [`crate::testing`] let tests drive the
//! orchestrator through failures, slow confirmations and superseded quotes
//! without a node.
//!
//! Each contract operation has its own typed method instead of a generic
//! `read(contract, function, args)` so that argument lists are checked at
//! compile time.

use alloy_primitives::{Address, TxHash, U256};
use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;
use crate::fee::FeeQuote;
use crate::finality::TxReceipt;
use crate::submit::BridgeRequest;

/// Read and submit access to the token and bridge contracts on the source
/// chain, on behalf of the connected account.
///
/// Submissions return as soon as the network has accepted the signed
/// transaction; use [`crate::await_finality`] to wait for inclusion.
#[async_trait]
pub trait ContractCaller: Send + Sync {
    /// `token.allowance(owner, spender)`
    async fn allowance(&self, token: Address, owner: Address, spender: Address) -> Result<U256>;

    /// `token.balanceOf(account)`
    async fn balance_of(&self, token: Address, account: Address) -> Result<U256>;

    /// `bridge.estimateFees(...)` with native-currency payment.
    async fn quote_fee(&self, bridge: Address, request: &BridgeRequest) -> Result<FeeQuote>;

    /// Signs and broadcasts `token.approve(spender, amount)` from `owner`.
    async fn submit_approve(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
        amount: U256,
    ) -> Result<TxHash>;

    /// Signs and broadcasts `bridge.bridge(...)` from `from` with `native_fee`
    /// attached as call value.
    async fn submit_bridge(
        &self,
        bridge: Address,
        from: Address,
        request: &BridgeRequest,
        native_fee: U256,
    ) -> Result<TxHash>;

    /// Gas the bridge call would use if submitted now.
    async fn estimate_bridge_gas(
        &self,
        bridge: Address,
        from: Address,
        request: &BridgeRequest,
        native_fee: U256,
    ) -> Result<u64>;

    /// Receipt of a mined transaction, `None` while it is still pending.
    async fn transaction_receipt(&self, tx_hash: TxHash) -> Result<Option<TxReceipt>>;

    async fn block_number(&self) -> Result<u64>;

    /// Current gas price in wei.
    async fn gas_price(&self) -> Result<u128>;
}

/// Time source for polling loops.
#[async_trait]
pub trait Clock: Send + Sync {
    async fn sleep(&self, duration: Duration);
}
