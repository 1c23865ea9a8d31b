//! Waiting for submitted transactions to be mined

use alloy_primitives::TxHash;
use std::time::Duration;
use tracing::{debug, error, info, Instrument};

use crate::config::PollingConfig;
use crate::error::{BridgeError, Result};
use crate::spans;
use crate::traits::{Clock, ContractCaller};

/// The parts of a transaction receipt the bridge flow cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    /// `false` if the transaction was mined but reverted.
    pub success: bool,
    pub gas_used: u64,
}

/// Polls until `tx_hash` is mined with `config.required_confirmations`.
///
/// # Errors
///
/// - [`BridgeError::TransactionFailed`] if the transaction was mined but reverted
/// - [`BridgeError::FinalityTimeout`] if it is still pending after `config.max_attempts` polls
/// - any error from the receipt or block number reads
pub async fn await_finality<C, K>(
    caller: &C,
    clock: &K,
    tx_hash: TxHash,
    config: &PollingConfig,
) -> Result<TxReceipt>
where
    C: ContractCaller + ?Sized,
    K: Clock + ?Sized,
{
    let span = spans::await_finality(tx_hash, config.required_confirmations, config.max_attempts);
    poll_until_final(caller, clock, tx_hash, config)
        .instrument(span)
        .await
}

async fn poll_until_final<C, K>(
    caller: &C,
    clock: &K,
    tx_hash: TxHash,
    config: &PollingConfig,
) -> Result<TxReceipt>
where
    C: ContractCaller + ?Sized,
    K: Clock + ?Sized,
{
    for attempt in 1..=config.max_attempts {
        if let Some(receipt) = caller.transaction_receipt(tx_hash).await? {
            if !receipt.success {
                let err = BridgeError::TransactionFailed {
                    tx_hash,
                    reason: "transaction reverted".to_string(),
                };
                spans::record_error(&err);
                error!(
                    tx_hash = %tx_hash,
                    block_number = ?receipt.block_number,
                    event = "transaction_reverted"
                );
                return Err(err);
            }

            if confirmations(caller, &receipt).await? >= config.required_confirmations {
                info!(
                    tx_hash = %tx_hash,
                    block_number = ?receipt.block_number,
                    gas_used = receipt.gas_used,
                    attempt = attempt,
                    event = "transaction_final"
                );
                return Ok(receipt);
            }
        }

        debug!(
            tx_hash = %tx_hash,
            attempt = attempt,
            max_attempts = config.max_attempts,
            event = "transaction_pending"
        );
        clock
            .sleep(Duration::from_secs(config.poll_interval_secs))
            .await;
    }

    let err = BridgeError::FinalityTimeout {
        tx_hash,
        attempts: config.max_attempts,
    };
    spans::record_error(&err);
    error!(tx_hash = %tx_hash, event = "finality_timeout");
    Err(err)
}

async fn confirmations<C>(caller: &C, receipt: &TxReceipt) -> Result<u64>
where
    C: ContractCaller + ?Sized,
{
    // a receipt alone is one confirmation; deeper checks need the chain head
    let Some(mined_at) = receipt.block_number else {
        return Ok(1);
    };
    let head = caller.block_number().await?;
    Ok(head.saturating_sub(mined_at) + 1)
}
