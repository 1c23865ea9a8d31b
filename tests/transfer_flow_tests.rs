//! Integration tests for the transfer flow using fake implementations
//!
//! Every test drives [`BridgeOrchestrator`] against [`FakeContractCaller`] and
//! checks both the returned outcome and what an observer of the progress saw
//! while each contract call was being made.

use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{address, Address, U256};
use async_trait::async_trait;
use lz_bridge::addresses::{
    BSC_TESTNET, BSC_TESTNET_BRIDGE_ADDRESS, BSC_TESTNET_USDT_ADDRESS, SEPOLIA,
};
use lz_bridge::testing::{FakeCall, FakeClock, FakeContractCaller, FakeFailure, FakeOperation};
use lz_bridge::{
    BridgeError, BridgeOrchestrator, ChainRegistry, Clock, FeeInputs, FeeQuote, FeeStatus,
    OrchestratorConfig, PollingConfig, ProgressState, ProgressTracker, StepId, StepStatus,
    TransferOutcome, TransferPhase, TransferRequest, DEFAULT_FALLBACK_NATIVE_FEE,
};
use tracing_subscriber::EnvFilter;

const ACCOUNT: Address = address!("742d35Cc6634C0532925a3b844Bc9e7595f8fA0d");

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Orchestrator over the built-in chains whose progress is recorded by the
/// fake on every contract call.
fn create_test_orchestrator(
    caller: FakeContractCaller,
) -> BridgeOrchestrator<FakeContractCaller, FakeClock> {
    init_tracing();
    let orchestrator = BridgeOrchestrator::builder()
        .registry(ChainRegistry::builtin())
        .caller(caller.clone())
        .clock(FakeClock::new())
        .build();
    caller.observe_progress(orchestrator.progress());
    orchestrator
}

fn request(amount: &str) -> TransferRequest {
    TransferRequest::builder()
        .account(ACCOUNT)
        .source_chain(BSC_TESTNET)
        .destination_chain(SEPOLIA)
        .amount(amount)
        .build()
}

fn statuses(state: &ProgressState) -> [StepStatus; 3] {
    state.steps.clone().map(|step| step.status)
}

fn approve_allowance(caller: &FakeContractCaller, amount: U256) {
    caller.set_allowance(
        BSC_TESTNET_USDT_ADDRESS,
        ACCOUNT,
        BSC_TESTNET_BRIDGE_ADDRESS,
        amount,
    );
}

fn position(calls: &[FakeCall], operation: FakeOperation) -> usize {
    calls
        .iter()
        .position(|call| call.operation() == operation)
        .unwrap_or_else(|| panic!("{operation:?} was never called"))
}

#[tokio::test]
async fn test_transfer_without_allowance_approves_then_bridges() {
    let caller = FakeContractCaller::new();
    let orchestrator = create_test_orchestrator(caller.clone());

    let outcome = orchestrator.transfer(&request("100")).await.unwrap();

    let receipt = match outcome {
        TransferOutcome::Completed(receipt) => receipt,
        other => panic!("expected completed transfer, got {other:?}"),
    };
    assert!(receipt.approval.approval_tx().is_some());
    assert!(receipt.receipt.success);

    assert_eq!(caller.count(FakeOperation::SubmitApprove), 1);
    assert_eq!(caller.count(FakeOperation::SubmitBridge), 1);
    let approvals: Vec<_> = caller
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            FakeCall::SubmitApprove {
                spender, amount, ..
            } => Some((spender, amount)),
            _ => None,
        })
        .collect();
    assert_eq!(
        approvals,
        vec![(BSC_TESTNET_BRIDGE_ADDRESS, U256::from(100_000_000u64))]
    );

    let at_approve = caller.progress_at(FakeOperation::SubmitApprove);
    assert_eq!(
        statuses(&at_approve[0]),
        [
            StepStatus::InProgress,
            StepStatus::Pending,
            StepStatus::Pending
        ]
    );
    let at_bridge = caller.progress_at(FakeOperation::SubmitBridge);
    assert_eq!(
        statuses(&at_bridge[0]),
        [
            StepStatus::Completed,
            StepStatus::InProgress,
            StepStatus::Pending
        ]
    );

    let state = orchestrator.progress().current();
    assert!(state.is_completed());
    assert_eq!(state.phase, TransferPhase::Completed);
}

#[tokio::test]
async fn test_sufficient_allowance_skips_approval() {
    let caller = FakeContractCaller::new();
    approve_allowance(&caller, U256::from(1_000_000_000u64));
    let orchestrator = create_test_orchestrator(caller.clone());

    let outcome = orchestrator.transfer(&request("100")).await.unwrap();

    assert!(outcome.is_completed());
    assert_eq!(caller.count(FakeOperation::Allowance), 1);
    assert_eq!(caller.count(FakeOperation::SubmitApprove), 0);
    assert_eq!(caller.count(FakeOperation::SubmitBridge), 1);
    assert!(orchestrator.progress().current().is_completed());
}

#[tokio::test]
async fn test_bridge_revert_marks_only_bridge_step() {
    let caller = FakeContractCaller::new();
    caller.fail(
        FakeOperation::SubmitBridge,
        FakeFailure::Revert("LZ_InsufficientFee".to_string()),
    );
    let orchestrator = create_test_orchestrator(caller.clone());

    let outcome = orchestrator.transfer(&request("100")).await.unwrap();

    match outcome {
        TransferOutcome::Failed { step, error } => {
            assert_eq!(step, StepId::Bridge);
            assert!(matches!(error, BridgeError::TransferSubmission { .. }));
        }
        other => panic!("expected failed transfer, got {other:?}"),
    }

    let state = orchestrator.progress().current();
    assert_eq!(state.phase, TransferPhase::Errored);
    assert_eq!(
        statuses(&state),
        [StepStatus::Completed, StepStatus::Error, StepStatus::Pending]
    );
    assert_eq!(
        state.step(StepId::Bridge).error.as_deref(),
        Some("Execution reverted: LZ_InsufficientFee")
    );
}

#[tokio::test]
async fn test_retry_after_bridge_failure_does_not_reapprove() {
    let caller = FakeContractCaller::new();
    caller.fail(
        FakeOperation::SubmitBridge,
        FakeFailure::Provider("nonce too low".to_string()),
    );
    let orchestrator = create_test_orchestrator(caller.clone());
    let request = request("100");

    let first = orchestrator.transfer(&request).await.unwrap();
    assert!(matches!(first, TransferOutcome::Failed { step: StepId::Bridge, .. }));

    caller.clear_failure(FakeOperation::SubmitBridge);
    let second = orchestrator.retry(&request).await.unwrap();

    assert!(second.is_completed());
    assert_eq!(caller.count(FakeOperation::Allowance), 2);
    assert_eq!(caller.count(FakeOperation::SubmitApprove), 1);
    assert_eq!(caller.count(FakeOperation::SubmitBridge), 2);
    assert!(orchestrator.progress().current().is_completed());
}

#[tokio::test]
async fn test_missing_endpoint_id_fails_before_any_call() {
    let caller = FakeContractCaller::new();
    let registry = ChainRegistry::from_json(
        r#"{
            "bscTestnet": {
                "chainId": 97,
                "usdt": "0x340Ab63e032C9354fD8d18f97833A1aB75AC1Ff7",
                "bridge": "0xe71a0009716752E1d32eaE3089F4152bc5F1ebA6",
                "dstEid": 40102
            },
            "sepolia": {
                "chainId": 11155111,
                "usdt": "0x2B6069650B78b10fab9D54c9A6B6AD84b045a1CA",
                "bridge": "0x212Fbda4a5B034700E1C6422880b13C9f41180FB",
                "dstEid": null
            }
        }"#,
    )
    .unwrap();
    let orchestrator = BridgeOrchestrator::builder()
        .registry(registry)
        .caller(caller.clone())
        .clock(FakeClock::new())
        .build();

    let result = orchestrator.transfer(&request("100")).await;

    assert!(matches!(
        result,
        Err(BridgeError::MissingBridgeConfig { ref chain, .. }) if chain == SEPOLIA
    ));
    assert!(caller.calls().is_empty());
    assert_eq!(orchestrator.phase(), TransferPhase::Idle);
    assert_eq!(
        statuses(&orchestrator.progress().current()),
        [StepStatus::Pending; 3]
    );
}

#[tokio::test(start_paused = true)]
async fn test_only_latest_fee_quote_is_displayed() {
    let caller = FakeContractCaller::new();
    let amounts = [1_000_000u64, 2_000_000, 3_000_000].map(U256::from);
    let latencies = [300, 200, 100].map(Duration::from_millis);
    for (i, (amount, latency)) in amounts.iter().zip(latencies).enumerate() {
        caller.set_fee_quote_for(*amount, FeeQuote::native(U256::from(i as u64 + 1)));
        caller.set_fee_latency_for(*amount, latency);
    }
    let orchestrator = create_test_orchestrator(caller.clone());
    let board = orchestrator.fee_board();
    let inputs = |amount: U256| {
        FeeInputs::new(BSC_TESTNET, SEPOLIA)
            .with_amount(amount)
            .with_recipient(ACCOUNT)
    };

    let applied = tokio::join!(
        orchestrator.refresh_fee(&board, inputs(amounts[0])),
        orchestrator.refresh_fee(&board, inputs(amounts[1])),
        orchestrator.refresh_fee(&board, inputs(amounts[2])),
    );

    assert_eq!(applied, (false, false, true));
    assert_eq!(caller.count(FakeOperation::QuoteFee), 3);
    let display = board.current();
    assert_eq!(display.inputs, Some(inputs(amounts[2])));
    assert!(matches!(display.status, FeeStatus::Ready(_)));
    assert_eq!(board.displayed_native_fee(), Some(U256::from(3u64)));
}

#[tokio::test(start_paused = true)]
async fn test_slow_latest_quote_is_not_overwritten_by_earlier_ones() {
    let caller = FakeContractCaller::new();
    let early = U256::from(1_000_000u64);
    let latest = U256::from(2_000_000u64);
    caller.set_fee_quote_for(early, FeeQuote::native(U256::from(10u64)));
    caller.set_fee_quote_for(latest, FeeQuote::native(U256::from(20u64)));
    caller.set_fee_latency_for(early, Duration::from_millis(10));
    caller.set_fee_latency_for(latest, Duration::from_millis(500));
    let orchestrator = create_test_orchestrator(caller);
    let board = orchestrator.fee_board();
    let base = FeeInputs::new(BSC_TESTNET, SEPOLIA).with_recipient(ACCOUNT);

    let board_view = board.clone();
    let (first, second, loading_fee) = tokio::join!(
        orchestrator.refresh_fee(&board, base.clone().with_amount(early)),
        orchestrator.refresh_fee(&board, base.clone().with_amount(latest)),
        async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            board_view.displayed_native_fee()
        },
    );

    assert!(!first);
    assert!(second);
    assert_eq!(loading_fee, None);
    assert_eq!(board.displayed_native_fee(), Some(U256::from(20u64)));
}

#[tokio::test]
async fn test_failed_quote_falls_back_and_does_not_block() {
    let caller = FakeContractCaller::new();
    caller.fail(
        FakeOperation::QuoteFee,
        FakeFailure::Provider("rate limited".to_string()),
    );
    let orchestrator = create_test_orchestrator(caller.clone());

    let outcome = orchestrator.transfer(&request("5")).await.unwrap();

    assert!(outcome.is_completed());
    let fees: Vec<_> = caller
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            FakeCall::SubmitBridge { native_fee, .. } => Some(native_fee),
            _ => None,
        })
        .collect();
    assert_eq!(fees, vec![DEFAULT_FALLBACK_NATIVE_FEE]);
}

#[tokio::test]
async fn test_rejected_approval_stops_before_bridge() {
    let caller = FakeContractCaller::new();
    caller.fail(
        FakeOperation::SubmitApprove,
        FakeFailure::Provider("User rejected the request.".to_string()),
    );
    let orchestrator = create_test_orchestrator(caller.clone());

    let outcome = orchestrator.transfer(&request("1")).await.unwrap();

    assert!(matches!(
        outcome,
        TransferOutcome::Failed {
            step: StepId::Approve,
            error: BridgeError::Allowance { .. }
        }
    ));
    assert_eq!(caller.count(FakeOperation::SubmitBridge), 0);
    let state = orchestrator.progress().current();
    assert_eq!(
        statuses(&state),
        [StepStatus::Error, StepStatus::Pending, StepStatus::Pending]
    );
    assert_eq!(
        state.step(StepId::Approve).error.as_deref(),
        Some("Provider error: User rejected the request.")
    );
}

#[tokio::test]
async fn test_bridge_reverted_on_chain_is_reported() {
    let caller = FakeContractCaller::new();
    caller.revert_on_chain(FakeOperation::SubmitBridge);
    let orchestrator = create_test_orchestrator(caller.clone());

    let outcome = orchestrator.transfer(&request("1")).await.unwrap();

    let TransferOutcome::Failed { step, error } = outcome else {
        panic!("expected failed transfer");
    };
    assert_eq!(step, StepId::Bridge);
    assert!(matches!(
        error.root_cause(),
        BridgeError::TransactionFailed { .. }
    ));
    assert_eq!(
        statuses(&orchestrator.progress().current()),
        [StepStatus::Completed, StepStatus::Error, StepStatus::Pending]
    );
}

#[tokio::test]
async fn test_approval_timeout_uses_configured_polling() {
    init_tracing();
    let caller = FakeContractCaller::new();
    let clock = FakeClock::new();
    caller.set_pending_polls(u32::MAX);
    let config = OrchestratorConfig::builder()
        .polling(
            PollingConfig::default()
                .with_max_attempts(3)
                .with_poll_interval_secs(5),
        )
        .build();
    let orchestrator = BridgeOrchestrator::builder()
        .registry(ChainRegistry::builtin())
        .caller(caller.clone())
        .clock(clock.clone())
        .config(config)
        .build();

    let outcome = orchestrator.transfer(&request("1")).await.unwrap();

    assert!(matches!(
        outcome,
        TransferOutcome::Failed {
            step: StepId::Approve,
            ..
        }
    ));
    assert_eq!(clock.sleep_count(), 3);
    assert_eq!(clock.total_sleep_time(), Duration::from_secs(15));
    assert_eq!(caller.count(FakeOperation::SubmitBridge), 0);
}

#[tokio::test]
async fn test_no_connected_account_is_rejected_up_front() {
    let caller = FakeContractCaller::new();
    let orchestrator = create_test_orchestrator(caller.clone());
    let request = TransferRequest {
        account: None,
        ..request("100")
    };

    let result = orchestrator.transfer(&request).await;

    assert!(matches!(result, Err(BridgeError::InvalidIntent(_))));
    assert!(caller.calls().is_empty());
    assert!(!orchestrator.progress().current().is_open);
}

/// Closes the progress display on the first wait.
#[derive(Debug, Clone)]
struct ClosingClock {
    tracker: ProgressTracker,
}

#[async_trait]
impl Clock for ClosingClock {
    async fn sleep(&self, _duration: Duration) {
        self.tracker.close();
    }
}

#[tokio::test]
async fn test_closing_during_approval_never_submits_bridge() {
    init_tracing();
    let caller = FakeContractCaller::new();
    caller.set_pending_polls(1);
    let tracker = ProgressTracker::new();
    let orchestrator = BridgeOrchestrator::builder()
        .registry(Arc::new(ChainRegistry::builtin()))
        .caller(caller.clone())
        .clock(ClosingClock {
            tracker: tracker.clone(),
        })
        .tracker(tracker)
        .build();

    let outcome = orchestrator.transfer(&request("1")).await.unwrap();

    assert!(matches!(
        outcome,
        TransferOutcome::Detached {
            step: StepId::Approve
        }
    ));
    assert_eq!(caller.count(FakeOperation::SubmitApprove), 1);
    assert_eq!(caller.count(FakeOperation::SubmitBridge), 0);
    let state = orchestrator.progress().current();
    assert!(!state.is_open);
    assert_eq!(state.phase, TransferPhase::Idle);
    assert_eq!(statuses(&state), [StepStatus::Pending; 3]);
}

#[tokio::test]
async fn test_observed_progress_never_has_two_steps_in_progress() {
    let caller = FakeContractCaller::new();
    caller.set_pending_polls(2);
    let orchestrator = create_test_orchestrator(caller.clone());

    orchestrator.transfer(&request("42.5")).await.unwrap();

    let calls = caller.calls();
    assert!(
        position(&calls, FakeOperation::SubmitApprove)
            < position(&calls, FakeOperation::SubmitBridge)
    );

    for operation in [
        FakeOperation::Allowance,
        FakeOperation::SubmitApprove,
        FakeOperation::Receipt,
        FakeOperation::QuoteFee,
        FakeOperation::SubmitBridge,
    ] {
        for state in caller.progress_at(operation) {
            let in_progress = state
                .steps
                .iter()
                .filter(|step| step.status == StepStatus::InProgress)
                .count();
            assert!(in_progress <= 1, "{operation:?} saw {state:?}");
            if state.step(StepId::Bridge).status == StepStatus::Completed {
                assert_eq!(state.step(StepId::Approve).status, StepStatus::Completed);
            }
        }
    }
}
