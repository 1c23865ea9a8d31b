// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
//! The end-to-end transfer flow.
//!
//! [`BridgeOrchestrator`] validates a [`TransferRequest`], then runs the two
//! on-chain steps strictly in sequence while driving the shared
//! [`ProgressTracker`]:
//!
//! 1. **Approve**: [`ensure_allowance`] for the bridge contract, waiting for
//!    the approval to be mined when one is needed.
//! 2. **Bridge**: re-quote the messaging fee, submit the bridge call with the
//!    fee attached and wait for it to be mined.
//!
//! A failure marks only the step that was running and is returned as
//! [`TransferOutcome::Failed`]; it is not propagated as an `Err`. Validation
//! and configuration problems are returned as `Err` before any step starts.
//!
//! # Example
//!
//! ```rust
//! # async fn example() -> lz_bridge::Result<()> {
//! use alloy_primitives::Address;
//! use lz_bridge::testing::{FakeClock, FakeContractCaller};
//! use lz_bridge::{BridgeOrchestrator, ChainRegistry, TransferOutcome, TransferRequest};
//!
//! let orchestrator = BridgeOrchestrator::builder()
//!     .registry(ChainRegistry::builtin())
//!     .caller(FakeContractCaller::new())
//!     .clock(FakeClock::new())
//!     .build();
//!
//! let request = TransferRequest::builder()
//!     .account(Address::repeat_byte(0x11))
//!     .source_chain("bscTestnet")
//!     .destination_chain("sepolia")
//!     .amount("100")
//!     .build();
//!
//! let outcome = orchestrator.transfer(&request).await?;
//! assert!(matches!(outcome, TransferOutcome::Completed(_)));
//! assert!(orchestrator.progress().current().is_completed());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use alloy_primitives::{Address, Bytes, TxHash, U256};
use bon::Builder;
use tracing::{error, info, warn, Instrument};

use crate::allowance::{ensure_allowance, AllowanceOutcome};
use crate::amount::parse_token_amount;
use crate::chain::{BridgeRoute, ChainRegistry};
use crate::config::OrchestratorConfig;
use crate::error::{BridgeError, Result};
use crate::fee::{FeeBoard, FeeEstimate, FeeEstimator, FeeInputs, GasPriceTier, NetworkFee};
use crate::finality::{await_finality, TxReceipt};
use crate::progress::{ProgressTracker, ProgressView, Session, StepId, StepStatus, TransferPhase};
use crate::spans;
use crate::submit::TransferSubmitter;
use crate::traits::{Clock, ContractCaller};

/// A transfer as entered by the user.
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
pub struct TransferRequest {
    /// Connected wallet account; `None` when no wallet is connected.
    pub account: Option<Address>,
    #[builder(into)]
    pub source_chain: String,
    #[builder(into)]
    pub destination_chain: String,
    /// Decimal token amount as typed, e.g. `"12.5"`.
    #[builder(into)]
    pub amount: String,
    /// Defaults to `account`.
    pub recipient: Option<Address>,
    /// Native fee the user agreed to pay, usually the displayed quote.
    pub payable_native_amount: Option<U256>,
}

/// A validated transfer, ready to execute.
///
/// Only [`BridgeOrchestrator::prepare`] builds one, so the route, amount and
/// recipient always agree with the chain registry they were checked against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferIntent {
    account: Address,
    source_chain: String,
    destination_chain: String,
    amount: U256,
    recipient: Address,
    payable_native_amount: Option<U256>,
    route: BridgeRoute,
}

impl TransferIntent {
    pub fn account(&self) -> Address {
        self.account
    }

    pub fn source_chain(&self) -> &str {
        &self.source_chain
    }

    pub fn destination_chain(&self) -> &str {
        &self.destination_chain
    }

    /// Token base units.
    pub fn amount(&self) -> U256 {
        self.amount
    }

    pub fn recipient(&self) -> Address {
        self.recipient
    }

    pub fn payable_native_amount(&self) -> Option<U256> {
        self.payable_native_amount
    }

    pub fn route(&self) -> &BridgeRoute {
        &self.route
    }

    /// Sets the native fee the user agreed to pay, e.g. a quote shown after
    /// the intent was prepared.
    pub fn with_payable_native_amount(mut self, amount: U256) -> Self {
        self.payable_native_amount = Some(amount);
        self
    }
}

/// Details of a transfer whose bridge transaction was mined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    pub approval: AllowanceOutcome,
    pub bridge_tx: TxHash,
    /// Native fee attached to the bridge call.
    pub native_fee: U256,
    pub receipt: TxReceipt,
}

#[derive(Debug)]
pub enum TransferOutcome {
    Completed(TransferReceipt),
    /// `step` was marked as failed with the root cause of `error`.
    Failed { step: StepId, error: BridgeError },
    /// The progress display was closed or reset while `step` was running.
    /// Nothing further was submitted after that point.
    Detached { step: StepId },
}

impl TransferOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

/// Runs bridge transfers from one source chain.
///
/// `caller` must be connected to the source chain of the transfers it runs.
#[derive(Debug, Builder)]
pub struct BridgeOrchestrator<C, K> {
    #[builder(into)]
    registry: Arc<ChainRegistry>,
    caller: C,
    clock: K,
    #[builder(default)]
    config: OrchestratorConfig,
    #[builder(default)]
    tracker: ProgressTracker,
}

impl<C, K> BridgeOrchestrator<C, K>
where
    C: ContractCaller,
    K: Clock,
{
    pub fn registry(&self) -> &ChainRegistry {
        &self.registry
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn caller(&self) -> &C {
        &self.caller
    }

    /// Read-only view of the transfer progress.
    pub fn progress(&self) -> ProgressView {
        self.tracker.subscribe()
    }

    pub fn tracker(&self) -> &ProgressTracker {
        &self.tracker
    }

    pub fn phase(&self) -> TransferPhase {
        self.tracker.snapshot().phase
    }

    pub fn open(&self) {
        self.tracker.open();
    }

    /// Hides the progress and returns to `Idle`. Transactions already
    /// broadcast are not affected.
    pub fn close(&self) {
        self.tracker.close();
    }

    pub fn reset(&self) {
        self.tracker.reset();
    }

    fn message_options(&self) -> Bytes {
        self.config.lz_receive.encode()
    }

    /// Validates a request without touching the network or the progress.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::InvalidIntent`] for a missing account, a malformed or non-positive amount, identical chains or a zero recipient
    /// - [`BridgeError::UnknownChain`] / [`BridgeError::MissingBridgeConfig`] for unsupported routes
    pub fn prepare(&self, request: &TransferRequest) -> Result<TransferIntent> {
        let account = request
            .account
            .ok_or_else(|| BridgeError::InvalidIntent("no connected account".to_string()))?;
        let amount = parse_token_amount(&request.amount, self.config.token_decimals)?;

        if request.source_chain == request.destination_chain {
            return Err(BridgeError::InvalidIntent(format!(
                "source and destination are both {}",
                request.source_chain
            )));
        }

        let route = self
            .registry
            .resolve_route(&request.source_chain, &request.destination_chain)?;

        let recipient = request.recipient.unwrap_or(account);
        if recipient.is_zero() {
            return Err(BridgeError::InvalidIntent(
                "recipient is the zero address".to_string(),
            ));
        }

        Ok(TransferIntent {
            account,
            source_chain: request.source_chain.clone(),
            destination_chain: request.destination_chain.clone(),
            amount,
            recipient,
            payable_native_amount: request.payable_native_amount,
            route,
        })
    }

    /// Validates and runs a transfer.
    ///
    /// See [`Self::prepare`] and [`Self::execute`] for the errors returned.
    pub async fn transfer(&self, request: &TransferRequest) -> Result<TransferOutcome> {
        let intent = self.prepare(request)?;
        self.execute(&intent).await
    }

    /// Resets a failed run and runs `request` again from the approval step.
    ///
    /// An allowance granted by the failed run is detected and not requested
    /// again.
    pub async fn retry(&self, request: &TransferRequest) -> Result<TransferOutcome> {
        match self.phase() {
            TransferPhase::Errored | TransferPhase::Idle => {}
            phase => return Err(BridgeError::NotIdle { phase }),
        }
        let intent = self.prepare(request)?;
        self.tracker.reset();
        self.execute(&intent).await
    }

    /// Runs the approve and bridge steps for a validated intent.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::NotIdle`] if another run is in progress or the
    /// previous one has not been reset. Step failures are reported through
    /// [`TransferOutcome::Failed`].
    pub async fn execute(&self, intent: &TransferIntent) -> Result<TransferOutcome> {
        let session = self.tracker.begin()?;
        let span = spans::transfer(
            &intent.account,
            &intent.source_chain,
            &intent.destination_chain,
            &intent.amount,
            &intent.recipient,
        );
        self.run(session, intent).instrument(span).await
    }

    async fn run(&self, session: Session, intent: &TransferIntent) -> Result<TransferOutcome> {
        let route = &intent.route;

        // begin() has already put the approval step in progress
        let approval = match ensure_allowance(
            &self.caller,
            &self.clock,
            &self.config.polling,
            route.token,
            route.bridge,
            intent.account,
            intent.amount,
        )
        .await
        {
            Ok(approval) => approval,
            Err(e) => return self.fail(session, StepId::Approve, e),
        };
        if !self.advance(session, StepId::Approve, StepStatus::Completed)? {
            return Ok(detached(StepId::Approve));
        }

        if !self.advance(session, StepId::Bridge, StepStatus::InProgress)? {
            return Ok(detached(StepId::Bridge));
        }
        let native_fee = self.payable_native_fee(intent).await;
        let options = self.message_options();
        let submitted = TransferSubmitter::new(&self.registry, &self.caller, &options)
            .submit_route(
                intent.account,
                &intent.source_chain,
                &intent.destination_chain,
                route,
                intent.amount,
                intent.recipient,
                native_fee,
            )
            .await;
        let bridge_tx = match submitted {
            Ok(tx_hash) => tx_hash,
            Err(e) => return self.fail(session, StepId::Bridge, e),
        };
        let receipt =
            match await_finality(&self.caller, &self.clock, bridge_tx, &self.config.polling).await
            {
                Ok(receipt) => receipt,
                Err(e) => {
                    return self.fail(session, StepId::Bridge, BridgeError::transfer_submission(e))
                }
            };

        if !self.advance(session, StepId::Bridge, StepStatus::Completed)?
            || !self.advance(session, StepId::Done, StepStatus::Completed)?
        {
            return Ok(detached(StepId::Bridge));
        }

        info!(
            bridge_tx = %bridge_tx,
            native_fee = %native_fee,
            approval_tx = ?approval.approval_tx(),
            event = "transfer_completed"
        );

        Ok(TransferOutcome::Completed(TransferReceipt {
            approval,
            bridge_tx,
            native_fee,
            receipt,
        }))
    }

    fn advance(&self, session: Session, step: StepId, status: StepStatus) -> Result<bool> {
        self.tracker.update(session, step, status, None)
    }

    fn fail(&self, session: Session, step: StepId, error: BridgeError) -> Result<TransferOutcome> {
        spans::record_error(&error);
        error!(step = %step, error = %error, event = "transfer_step_failed");

        let message = error.root_cause().to_string();
        if !self
            .tracker
            .update(session, step, StepStatus::Error, Some(message))?
        {
            return Ok(detached(step));
        }
        Ok(TransferOutcome::Failed { step, error })
    }

    /// Fee attached to the bridge call: the fresh quote, raised to what the
    /// user agreed to pay. Without a quote, the agreed amount or the fallback.
    async fn payable_native_fee(&self, intent: &TransferIntent) -> U256 {
        let inputs = FeeInputs::new(&intent.source_chain, &intent.destination_chain)
            .with_amount(intent.amount)
            .with_recipient(intent.recipient);

        match self.estimate_fee(&inputs).await {
            Ok(FeeEstimate::Quoted(quote)) => intent
                .payable_native_amount
                .map_or(quote.native_fee, |agreed| agreed.max(quote.native_fee)),
            other => {
                let fee = intent
                    .payable_native_amount
                    .unwrap_or(self.config.fallback_native_fee);
                warn!(
                    estimate = ?other,
                    native_fee = %fee,
                    event = "fresh_fee_quote_unavailable"
                );
                fee
            }
        }
    }

    /// Quotes the messaging fee for `inputs`. See [`FeeEstimator::estimate_fee`].
    pub async fn estimate_fee(&self, inputs: &FeeInputs) -> Result<FeeEstimate> {
        let options = self.message_options();
        FeeEstimator::new(&self.registry, &self.caller, &options)
            .estimate_fee(inputs)
            .await
    }

    /// An empty fee display using the configured fallback fee.
    pub fn fee_board(&self) -> FeeBoard {
        FeeBoard::new(self.config.fallback_native_fee)
    }

    /// Refreshes `board` for new inputs. See [`FeeBoard::refresh`].
    pub async fn refresh_fee(&self, board: &FeeBoard, inputs: FeeInputs) -> bool {
        let options = self.message_options();
        let estimator = FeeEstimator::new(&self.registry, &self.caller, &options);
        board.refresh(&estimator, inputs).await
    }

    /// Estimated gas cost of the bridge call.
    /// See [`FeeEstimator::estimate_network_fee`].
    pub async fn network_fee(
        &self,
        account: Address,
        inputs: &FeeInputs,
        native_fee: U256,
        tier: GasPriceTier,
    ) -> Result<Option<NetworkFee>> {
        let options = self.message_options();
        FeeEstimator::new(&self.registry, &self.caller, &options)
            .estimate_network_fee(account, inputs, native_fee, tier)
            .await
    }

    /// Token balance of `owner` on `chain`.
    pub async fn source_balance(&self, owner: Address, chain: &str) -> Result<U256> {
        let token = self.registry.lookup(chain)?.require_token()?;
        self.caller.balance_of(token, owner).await
    }
}

fn detached(step: StepId) -> TransferOutcome {
    spans::record_error_with_context(
        "TransferDetached",
        "progress closed or reset during the run",
        Some(step.title()),
    );
    warn!(step = %step, event = "transfer_detached");
    TransferOutcome::Detached { step }
}
