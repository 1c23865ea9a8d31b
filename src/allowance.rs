//! Making sure the bridge may move the user's tokens

use alloy_primitives::{Address, TxHash, U256};
use tracing::{error, info, Instrument};

use crate::config::PollingConfig;
use crate::error::{BridgeError, Result};
use crate::finality::await_finality;
use crate::spans;
use crate::traits::{Clock, ContractCaller};

/// What [`ensure_allowance`] had to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowanceOutcome {
    /// The existing allowance already covered the amount; nothing was sent.
    AlreadySufficient { allowance: U256 },
    /// An approval for exactly the requested amount was mined.
    Approved {
        tx_hash: TxHash,
        previous_allowance: U256,
    },
}

impl AllowanceOutcome {
    pub fn approval_tx(&self) -> Option<TxHash> {
        match self {
            Self::Approved { tx_hash, .. } => Some(*tx_hash),
            Self::AlreadySufficient { .. } => None,
        }
    }
}

/// Guarantees `token.allowance(owner, spender) >= amount`.
///
/// Reads the current allowance and, only if it is short, submits an approval
/// for exactly `amount` and waits for it to be mined. Calling this again after
/// it succeeded makes no further transactions.
///
/// # Errors
///
/// Returns [`BridgeError::Allowance`] wrapping the read, submission or
/// confirmation failure.
pub async fn ensure_allowance<C, K>(
    caller: &C,
    clock: &K,
    polling: &PollingConfig,
    token: Address,
    spender: Address,
    owner: Address,
    amount: U256,
) -> Result<AllowanceOutcome>
where
    C: ContractCaller + ?Sized,
    K: Clock + ?Sized,
{
    let span = spans::ensure_allowance(&token, &owner, &spender, &amount);
    let outcome = approve_if_short(caller, clock, polling, token, spender, owner, amount)
        .instrument(span.clone())
        .await;

    if let Err(e) = &outcome {
        let _guard = span.enter();
        spans::record_error(e);
        error!(error = %e, token = %token, spender = %spender, event = "allowance_failed");
    }
    outcome.map_err(BridgeError::allowance)
}

async fn approve_if_short<C, K>(
    caller: &C,
    clock: &K,
    polling: &PollingConfig,
    token: Address,
    spender: Address,
    owner: Address,
    amount: U256,
) -> Result<AllowanceOutcome>
where
    C: ContractCaller + ?Sized,
    K: Clock + ?Sized,
{
    let current = caller.allowance(token, owner, spender).await?;
    if current >= amount {
        info!(
            allowance = %current,
            amount = %amount,
            event = "allowance_sufficient"
        );
        return Ok(AllowanceOutcome::AlreadySufficient { allowance: current });
    }

    let tx_hash = caller.submit_approve(token, owner, spender, amount).await?;
    info!(
        tx_hash = %tx_hash,
        previous_allowance = %current,
        amount = %amount,
        event = "approval_submitted"
    );

    await_finality(caller, clock, tx_hash, polling).await?;
    info!(tx_hash = %tx_hash, event = "approval_confirmed");

    Ok(AllowanceOutcome::Approved {
        tx_hash,
        previous_allowance: current,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeCall, FakeClock, FakeContractCaller, FakeFailure, FakeOperation};
    use alloy_primitives::address;

    const TOKEN: Address = address!("00000000000000000000000000000000000000a1");
    const BRIDGE: Address = address!("00000000000000000000000000000000000000b2");
    const OWNER: Address = address!("00000000000000000000000000000000000000c3");

    async fn ensure(caller: &FakeContractCaller, amount: u64) -> Result<AllowanceOutcome> {
        ensure_allowance(
            caller,
            &FakeClock::new(),
            &PollingConfig::default(),
            TOKEN,
            BRIDGE,
            OWNER,
            U256::from(amount),
        )
        .await
    }

    #[tokio::test]
    async fn test_sufficient_allowance_sends_nothing() {
        let caller = FakeContractCaller::new();
        caller.set_allowance(TOKEN, OWNER, BRIDGE, U256::from(1_000u64));

        let outcome = ensure(&caller, 1_000).await.unwrap();

        assert_eq!(
            outcome,
            AllowanceOutcome::AlreadySufficient {
                allowance: U256::from(1_000u64)
            }
        );
        assert_eq!(caller.count(FakeOperation::SubmitApprove), 0);
    }

    #[tokio::test]
    async fn test_short_allowance_approves_exact_amount() {
        let caller = FakeContractCaller::new();
        caller.set_allowance(TOKEN, OWNER, BRIDGE, U256::from(10u64));

        let outcome = ensure(&caller, 500).await.unwrap();

        assert!(outcome.approval_tx().is_some());
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
        assert_eq!(approvals, vec![(BRIDGE, U256::from(500u64))]);
        assert_eq!(
            caller.allowance(TOKEN, OWNER, BRIDGE).await.unwrap(),
            U256::from(500u64)
        );
    }

    #[tokio::test]
    async fn test_second_run_is_a_no_op() {
        let caller = FakeContractCaller::new();

        ensure(&caller, 250).await.unwrap();
        let second = ensure(&caller, 250).await.unwrap();

        assert!(matches!(second, AllowanceOutcome::AlreadySufficient { .. }));
        assert_eq!(caller.count(FakeOperation::SubmitApprove), 1);
    }

    #[tokio::test]
    async fn test_smaller_amount_after_approval_is_a_no_op() {
        let caller = FakeContractCaller::new();

        ensure(&caller, 250).await.unwrap();
        let second = ensure(&caller, 100).await.unwrap();

        assert_eq!(
            second,
            AllowanceOutcome::AlreadySufficient {
                allowance: U256::from(250u64)
            }
        );
        assert_eq!(caller.count(FakeOperation::SubmitApprove), 1);
    }

    #[tokio::test]
    async fn test_rejected_approval_is_wrapped() {
        let caller = FakeContractCaller::new();
        caller.fail(
            FakeOperation::SubmitApprove,
            FakeFailure::Provider("user rejected the request".to_string()),
        );

        let err = ensure(&caller, 1).await.unwrap_err();

        assert!(matches!(err, BridgeError::Allowance { .. }));
        assert_eq!(
            err.root_cause().to_string(),
            "Provider error: user rejected the request"
        );
    }

    #[tokio::test]
    async fn test_approval_reverted_on_chain() {
        let caller = FakeContractCaller::new();
        caller.revert_on_chain(FakeOperation::SubmitApprove);

        let err = ensure(&caller, 1).await.unwrap_err();

        assert!(matches!(
            err.root_cause(),
            BridgeError::TransactionFailed { .. }
        ));
        assert_eq!(
            caller.allowance(TOKEN, OWNER, BRIDGE).await.unwrap(),
            U256::ZERO
        );
    }
}
