//! Cross-chain messaging fee quotes.
//!
//! [`FeeEstimator`] performs a single read of the bridge contract's
//! `estimateFees` for a set of [`FeeInputs`]. Unsupported routes and incomplete
//! inputs are reported as [`FeeEstimate`] variants rather than errors so the
//! display can degrade gracefully.
//!
//! [`FeeBoard`] holds the quote currently shown to the user. Every refresh is
//! tagged with a generation number; a quote that resolves after newer inputs
//! were submitted is discarded.
//!
//! # Example
//!
//! ```rust
//! # async fn example() -> lz_bridge::Result<()> {
//! use alloy_primitives::{Address, Bytes, U256};
//! use lz_bridge::testing::FakeContractCaller;
//! use lz_bridge::{ChainRegistry, FeeBoard, FeeEstimator, FeeInputs};
//!
//! let registry = ChainRegistry::builtin();
//! let caller = FakeContractCaller::new();
//! let options = Bytes::new();
//! let estimator = FeeEstimator::new(&registry, &caller, &options);
//! let board = FeeBoard::new(U256::from(10u64).pow(U256::from(15)));
//!
//! let inputs = FeeInputs::new("bscTestnet", "sepolia")
//!     .with_amount(U256::from(1_000_000u64))
//!     .with_recipient(Address::repeat_byte(0x11));
//! board.refresh(&estimator, inputs).await;
//!
//! assert!(board.displayed_native_fee().is_some());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use alloy_primitives::{Address, Bytes, U256};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn, Instrument};

use crate::chain::ChainRegistry;
use crate::error::{BridgeError, Result};
use crate::spans;
use crate::submit::BridgeRequest;
use crate::traits::ContractCaller;

/// Fee required to deliver the cross-chain message, in wei.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeQuote {
    pub native_fee: U256,
    /// Fee payable in the messaging layer's own token, when quoted.
    pub lz_token_fee: Option<U256>,
}

impl FeeQuote {
    pub fn native(native_fee: U256) -> Self {
        Self {
            native_fee,
            lz_token_fee: None,
        }
    }
}

/// Everything a quote depends on. A change to any field calls for a new quote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeInputs {
    pub source_chain: String,
    pub destination_chain: String,
    pub amount: Option<U256>,
    pub recipient: Option<Address>,
}

impl FeeInputs {
    pub fn new(source_chain: impl Into<String>, destination_chain: impl Into<String>) -> Self {
        Self {
            source_chain: source_chain.into(),
            destination_chain: destination_chain.into(),
            amount: None,
            recipient: None,
        }
    }

    pub fn with_amount(mut self, amount: U256) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_recipient(mut self, recipient: Address) -> Self {
        self.recipient = Some(recipient);
        self
    }

    /// Amount and recipient, if both are usable for a quote.
    fn quotable(&self) -> Option<(U256, Address)> {
        let amount = self.amount.filter(|a| !a.is_zero())?;
        let recipient = self.recipient.filter(|r| !r.is_zero())?;
        Some((amount, recipient))
    }
}

/// Result of a fee estimate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeeEstimate {
    /// Amount or recipient missing; nothing to quote yet.
    NotApplicable,
    /// The route cannot be bridged with the current chain configuration.
    MissingBridgeConfig { reason: String },
    Quoted(FeeQuote),
}

impl FeeEstimate {
    pub fn quote(&self) -> Option<&FeeQuote> {
        match self {
            Self::Quoted(quote) => Some(quote),
            _ => None,
        }
    }
}

/// Gas price adjustment applied to the node's current gas price.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum GasPriceTier {
    Low,
    #[default]
    Medium,
    Fast,
}

impl GasPriceTier {
    pub fn apply(self, gas_price: u128) -> u128 {
        match self {
            Self::Low => gas_price.saturating_mul(9) / 10,
            Self::Medium => gas_price,
            Self::Fast => gas_price.saturating_mul(12) / 10,
        }
    }
}

/// Estimated source-chain gas cost of the bridge call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkFee {
    pub gas: u64,
    /// Tier-adjusted gas price in wei.
    pub gas_price: u128,
    /// `gas * gas_price` in wei.
    pub fee: U256,
}

/// Quotes bridge fees for routes in a [`ChainRegistry`].
#[derive(Debug, Clone, Copy)]
pub struct FeeEstimator<'a, C: ?Sized> {
    registry: &'a ChainRegistry,
    caller: &'a C,
    options: &'a Bytes,
}

impl<'a, C: ContractCaller + ?Sized> FeeEstimator<'a, C> {
    pub fn new(registry: &'a ChainRegistry, caller: &'a C, options: &'a Bytes) -> Self {
        Self {
            registry,
            caller,
            options,
        }
    }

    /// Asks the source bridge for the native fee of delivering `inputs`.
    ///
    /// Makes at most one read-only contract call, and none when the inputs are
    /// incomplete or the route is not configured.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::FeeEstimation`] wrapping the cause when the
    /// contract read fails.
    pub async fn estimate_fee(&self, inputs: &FeeInputs) -> Result<FeeEstimate> {
        let span = spans::estimate_fee(
            &inputs.source_chain,
            &inputs.destination_chain,
            inputs.amount.as_ref(),
        );
        self.quote(inputs).instrument(span).await
    }

    async fn quote(&self, inputs: &FeeInputs) -> Result<FeeEstimate> {
        let Some((amount, recipient)) = inputs.quotable() else {
            debug!(event = "fee_estimate_not_applicable");
            return Ok(FeeEstimate::NotApplicable);
        };

        let route = match self
            .registry
            .resolve_route(&inputs.source_chain, &inputs.destination_chain)
        {
            Ok(route) => route,
            Err(e) => {
                debug!(reason = %e, event = "fee_estimate_route_unsupported");
                return Ok(FeeEstimate::MissingBridgeConfig {
                    reason: e.to_string(),
                });
            }
        };

        let request = BridgeRequest::new(&route, amount, recipient, self.options.clone());
        match self.caller.quote_fee(route.bridge, &request).await {
            Ok(quote) => {
                info!(
                    native_fee = %quote.native_fee,
                    lz_token_fee = ?quote.lz_token_fee,
                    event = "fee_quoted"
                );
                Ok(FeeEstimate::Quoted(quote))
            }
            Err(e) => {
                spans::record_error(&e);
                warn!(error = %e, bridge = %route.bridge, event = "fee_quote_failed");
                Err(BridgeError::fee_estimation(e))
            }
        }
    }

    /// Estimates the gas cost of submitting the bridge call from `from`.
    ///
    /// Returns `Ok(None)` when the inputs are incomplete.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::UnknownChain`] / [`BridgeError::MissingBridgeConfig`] for unsupported routes
    /// - [`BridgeError::FeeEstimation`] if the gas estimate or gas price read fails
    pub async fn estimate_network_fee(
        &self,
        from: Address,
        inputs: &FeeInputs,
        native_fee: U256,
        tier: GasPriceTier,
    ) -> Result<Option<NetworkFee>> {
        let Some((amount, recipient)) = inputs.quotable() else {
            return Ok(None);
        };
        let route = self
            .registry
            .resolve_route(&inputs.source_chain, &inputs.destination_chain)?;
        let request = BridgeRequest::new(&route, amount, recipient, self.options.clone());

        let gas = self
            .caller
            .estimate_bridge_gas(route.bridge, from, &request, native_fee)
            .await
            .map_err(BridgeError::fee_estimation)?;
        let gas_price = tier.apply(
            self.caller
                .gas_price()
                .await
                .map_err(BridgeError::fee_estimation)?,
        );
        let fee = U256::from(gas) * U256::from(gas_price);

        debug!(
            gas = gas,
            gas_price = gas_price,
            fee = %fee,
            tier = ?tier,
            event = "network_fee_estimated"
        );

        Ok(Some(NetworkFee {
            gas,
            gas_price,
            fee,
        }))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeeStatus {
    Idle,
    Loading,
    Ready(FeeEstimate),
    /// The read failed; carries the underlying cause.
    Failed(String),
}

/// What the fee display currently shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeDisplay {
    pub inputs: Option<FeeInputs>,
    pub status: FeeStatus,
    generation: u64,
}

/// Latest-wins holder of the displayed fee quote.
///
/// Clones share the same state.
#[derive(Debug, Clone)]
pub struct FeeBoard {
    state: Arc<watch::Sender<FeeDisplay>>,
    fallback_native_fee: U256,
}

impl FeeBoard {
    pub fn new(fallback_native_fee: U256) -> Self {
        let (sender, _) = watch::channel(FeeDisplay {
            inputs: None,
            status: FeeStatus::Idle,
            generation: 0,
        });
        Self {
            state: Arc::new(sender),
            fallback_native_fee,
        }
    }

    pub fn current(&self) -> FeeDisplay {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FeeDisplay> {
        self.state.subscribe()
    }

    /// Requests a quote for `inputs` and shows it unless a newer refresh was
    /// started in the meantime.
    ///
    /// Returns `true` if this refresh's result was applied.
    pub async fn refresh<C>(&self, estimator: &FeeEstimator<'_, C>, inputs: FeeInputs) -> bool
    where
        C: ContractCaller + ?Sized,
    {
        let mut generation = 0;
        self.state.send_modify(|display| {
            display.generation += 1;
            generation = display.generation;
            display.inputs = Some(inputs.clone());
            display.status = FeeStatus::Loading;
        });

        let status = match estimator.estimate_fee(&inputs).await {
            Ok(estimate) => FeeStatus::Ready(estimate),
            Err(e) => FeeStatus::Failed(e.root_cause().to_string()),
        };

        let applied = self.state.send_if_modified(|display| {
            if display.generation != generation {
                return false;
            }
            display.status = status;
            true
        });

        if !applied {
            debug!(generation = generation, event = "fee_quote_discarded");
        }
        applied
    }

    /// Native fee to show and to offer as the payable amount.
    ///
    /// `None` while a quote is loading or when there is nothing to quote. The
    /// fallback is used when the quote failed or the route is unsupported.
    pub fn displayed_native_fee(&self) -> Option<U256> {
        match &self.state.borrow().status {
            FeeStatus::Loading | FeeStatus::Idle => None,
            FeeStatus::Ready(FeeEstimate::Quoted(quote)) => Some(quote.native_fee),
            FeeStatus::Ready(FeeEstimate::NotApplicable) => None,
            FeeStatus::Ready(FeeEstimate::MissingBridgeConfig { .. }) | FeeStatus::Failed(_) => {
                Some(self.fallback_native_fee)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::addresses::{BSC_TESTNET, POLYGON, SEPOLIA, SEPOLIA_ENDPOINT_ID};
    use crate::testing::{FakeCall, FakeContractCaller, FakeFailure, FakeOperation};
    use rstest::rstest;

    fn inputs() -> FeeInputs {
        FeeInputs::new(BSC_TESTNET, SEPOLIA)
            .with_amount(U256::from(5_000_000u64))
            .with_recipient(Address::repeat_byte(0x22))
    }

    #[rstest]
    #[case(FeeInputs::new(BSC_TESTNET, SEPOLIA).with_recipient(Address::repeat_byte(1)))]
    #[case(FeeInputs::new(BSC_TESTNET, SEPOLIA).with_amount(U256::ZERO).with_recipient(Address::repeat_byte(1)))]
    #[case(FeeInputs::new(BSC_TESTNET, SEPOLIA).with_amount(U256::from(1)))]
    #[case(FeeInputs::new("unknown", SEPOLIA))]
    #[tokio::test]
    async fn test_incomplete_inputs_are_not_applicable(#[case] inputs: FeeInputs) {
        let registry = ChainRegistry::builtin();
        let caller = FakeContractCaller::new();
        let options = Bytes::new();

        let estimate = FeeEstimator::new(&registry, &caller, &options)
            .estimate_fee(&inputs)
            .await
            .unwrap();

        assert_eq!(estimate, FeeEstimate::NotApplicable);
        assert!(caller.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_destination_degrades_without_call() {
        let registry = ChainRegistry::builtin();
        let caller = FakeContractCaller::new();
        let options = Bytes::new();
        let mut inputs = inputs();
        inputs.destination_chain = POLYGON.to_string();

        let estimate = FeeEstimator::new(&registry, &caller, &options)
            .estimate_fee(&inputs)
            .await
            .unwrap();

        assert!(matches!(
            estimate,
            FeeEstimate::MissingBridgeConfig { ref reason } if reason.contains("polygon")
        ));
        assert!(caller.calls().is_empty());
    }

    #[tokio::test]
    async fn test_quote_reads_bridge_with_request() {
        let registry = ChainRegistry::builtin();
        let caller = FakeContractCaller::new();
        let quote = FeeQuote {
            native_fee: U256::from(7_000u64),
            lz_token_fee: Some(U256::ZERO),
        };
        caller.set_fee_quote(quote);
        let options = Bytes::from_static(&[0x00, 0x03]);

        let estimate = FeeEstimator::new(&registry, &caller, &options)
            .estimate_fee(&inputs())
            .await
            .unwrap();

        assert_eq!(estimate.quote(), Some(&quote));
        match caller.calls().as_slice() {
            [FakeCall::QuoteFee { request, .. }] => {
                assert_eq!(request.destination_endpoint_id, SEPOLIA_ENDPOINT_ID);
                assert_eq!(request.amount, U256::from(5_000_000u64));
                assert_eq!(request.options, options);
            }
            other => panic!("unexpected calls {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_read_failure_is_fee_estimation_error() {
        let registry = ChainRegistry::builtin();
        let caller = FakeContractCaller::new();
        caller.fail(
            FakeOperation::QuoteFee,
            FakeFailure::Provider("connection refused".to_string()),
        );
        let options = Bytes::new();

        let err = FeeEstimator::new(&registry, &caller, &options)
            .estimate_fee(&inputs())
            .await
            .unwrap_err();

        assert!(matches!(err, BridgeError::FeeEstimation { .. }));
        assert_eq!(caller.count(FakeOperation::QuoteFee), 1);
    }

    #[rstest]
    #[case(GasPriceTier::Low, 9_000_000_000)]
    #[case(GasPriceTier::Medium, 10_000_000_000)]
    #[case(GasPriceTier::Fast, 12_000_000_000)]
    #[tokio::test]
    async fn test_network_fee_applies_tier(#[case] tier: GasPriceTier, #[case] expected: u128) {
        let registry = ChainRegistry::builtin();
        let caller = FakeContractCaller::new();
        caller.set_gas_price(10_000_000_000);
        caller.set_bridge_gas(300_000);
        let options = Bytes::new();

        let fee = FeeEstimator::new(&registry, &caller, &options)
            .estimate_network_fee(Address::repeat_byte(0x22), &inputs(), U256::from(1), tier)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(fee.gas, 300_000);
        assert_eq!(fee.gas_price, expected);
        assert_eq!(fee.fee, U256::from(300_000u64) * U256::from(expected));
    }

    #[tokio::test]
    async fn test_network_fee_rejects_unsupported_route() {
        let registry = ChainRegistry::builtin();
        let caller = FakeContractCaller::new();
        let options = Bytes::new();
        let mut inputs = inputs();
        inputs.destination_chain = POLYGON.to_string();

        let result = FeeEstimator::new(&registry, &caller, &options)
            .estimate_network_fee(Address::ZERO, &inputs, U256::ZERO, GasPriceTier::Medium)
            .await;

        assert!(matches!(result, Err(BridgeError::MissingBridgeConfig { .. })));
    }

    #[tokio::test]
    async fn test_board_falls_back_when_quote_fails() {
        let registry = ChainRegistry::builtin();
        let caller = FakeContractCaller::new();
        caller.fail(
            FakeOperation::QuoteFee,
            FakeFailure::Revert("paused".to_string()),
        );
        let options = Bytes::new();
        let estimator = FeeEstimator::new(&registry, &caller, &options);
        let board = FeeBoard::new(U256::from(1_000u64));

        assert!(board.refresh(&estimator, inputs()).await);

        assert_eq!(
            board.current().status,
            FeeStatus::Failed("Execution reverted: paused".to_string())
        );
        assert_eq!(board.displayed_native_fee(), Some(U256::from(1_000u64)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_board_discards_superseded_quote() {
        let registry = ChainRegistry::builtin();
        let caller = FakeContractCaller::new();
        let slow = U256::from(1_000_000u64);
        let fast = U256::from(2_000_000u64);
        caller.set_fee_quote_for(slow, FeeQuote::native(U256::from(111u64)));
        caller.set_fee_quote_for(fast, FeeQuote::native(U256::from(222u64)));
        caller.set_fee_latency_for(slow, std::time::Duration::from_millis(500));
        let options = Bytes::new();
        let estimator = FeeEstimator::new(&registry, &caller, &options);
        let board = FeeBoard::new(U256::from(1u64));
        let base = FeeInputs::new(BSC_TESTNET, SEPOLIA).with_recipient(Address::repeat_byte(3));

        let (first, second) = tokio::join!(
            board.refresh(&estimator, base.clone().with_amount(slow)),
            board.refresh(&estimator, base.clone().with_amount(fast)),
        );

        assert!(!first);
        assert!(second);
        assert_eq!(board.current().inputs, Some(base.with_amount(fast)));
        assert_eq!(board.displayed_native_fee(), Some(U256::from(222u64)));
    }
}
