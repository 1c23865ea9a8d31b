//! Alloy-based contract caller implementation.

use alloy_network::{Ethereum, ReceiptResponse};
use alloy_primitives::{Address, TxHash, U256};
use alloy_provider::Provider;
use alloy_rpc_types::{TransactionReceipt, TransactionRequest};
use alloy_transport::TransportError;
use async_trait::async_trait;
use tracing::{debug, instrument, trace, warn};

use crate::contracts::bridge::BridgeContract;
use crate::contracts::erc20::Erc20Contract;
use crate::error::{BridgeError, Result};
use crate::fee::FeeQuote;
use crate::finality::TxReceipt;
use crate::submit::BridgeRequest;
use crate::traits::ContractCaller;

/// Production [`ContractCaller`] wrapping an Alloy [`Provider`].
///
/// The provider must be able to sign for the accounts it submits from,
/// typically through a wallet filler. Every submission is simulated with
/// `eth_call` first so a revert is reported with its reason before the
/// transaction is signed.
///
/// # Examples
///
/// ```rust,no_run
/// use lz_bridge::providers::AlloyContractCaller;
/// use alloy_provider::ProviderBuilder;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let provider = ProviderBuilder::new()
///     .connect("https://ethereum-sepolia-rpc.publicnode.com")
///     .await?;
///
/// let caller = AlloyContractCaller::new(provider);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct AlloyContractCaller<P> {
    provider: P,
}

impl<P> AlloyContractCaller<P>
where
    P: Provider<Ethereum> + Clone,
{
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Returns a reference to the underlying Alloy provider.
    pub fn inner(&self) -> &P {
        &self.provider
    }

    async fn simulate_and_send(&self, tx: TransactionRequest) -> Result<TxHash> {
        if let Err(e) = self.provider.call(tx.clone()).await {
            warn!(error = %e, event = "simulation_failed");
            return Err(simulation_error(e));
        }

        let pending = self.provider.send_transaction(tx).await?;
        let tx_hash = *pending.tx_hash();
        debug!(tx_hash = %tx_hash, event = "transaction_broadcast");
        Ok(tx_hash)
    }
}

/// Reverts reported by the node become [`BridgeError::ContractRevert`];
/// transport failures stay RPC errors.
fn simulation_error(error: TransportError) -> BridgeError {
    let Some(payload) = error.as_error_resp() else {
        return BridgeError::Rpc(error);
    };
    let reason = payload
        .message
        .trim_start_matches("execution reverted")
        .trim_start_matches(':')
        .trim();
    BridgeError::ContractRevert {
        reason: if reason.is_empty() {
            payload.message.to_string()
        } else {
            reason.to_string()
        },
    }
}

fn contract_error(error: alloy_contract::Error) -> BridgeError {
    match error {
        alloy_contract::Error::TransportError(e) => BridgeError::Rpc(e),
        other => BridgeError::ContractCall(other.to_string()),
    }
}

impl From<TransactionReceipt> for TxReceipt {
    fn from(receipt: TransactionReceipt) -> Self {
        Self {
            tx_hash: receipt.transaction_hash,
            block_number: receipt.block_number,
            success: ReceiptResponse::status(&receipt),
            gas_used: receipt.gas_used,
        }
    }
}

#[async_trait]
impl<P> ContractCaller for AlloyContractCaller<P>
where
    P: Provider<Ethereum> + Clone + Send + Sync,
{
    #[instrument(skip(self))]
    async fn allowance(&self, token: Address, owner: Address, spender: Address) -> Result<U256> {
        Erc20Contract::new(token, self.provider.clone())
            .allowance(owner, spender)
            .await
            .map_err(contract_error)
    }

    #[instrument(skip(self))]
    async fn balance_of(&self, token: Address, account: Address) -> Result<U256> {
        Erc20Contract::new(token, self.provider.clone())
            .balance_of(account)
            .await
            .map_err(contract_error)
    }

    #[instrument(skip(self, request))]
    async fn quote_fee(&self, bridge: Address, request: &BridgeRequest) -> Result<FeeQuote> {
        BridgeContract::new(bridge, self.provider.clone())
            .estimate_fees(request)
            .await
            .map_err(contract_error)
    }

    #[instrument(skip(self))]
    async fn submit_approve(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
        amount: U256,
    ) -> Result<TxHash> {
        let tx = Erc20Contract::new(token, self.provider.clone())
            .approve_transaction(owner, spender, amount);
        self.simulate_and_send(tx).await
    }

    #[instrument(skip(self, request))]
    async fn submit_bridge(
        &self,
        bridge: Address,
        from: Address,
        request: &BridgeRequest,
        native_fee: U256,
    ) -> Result<TxHash> {
        let tx = BridgeContract::new(bridge, self.provider.clone())
            .bridge_transaction(from, request, native_fee);
        self.simulate_and_send(tx).await
    }

    #[instrument(skip(self, request))]
    async fn estimate_bridge_gas(
        &self,
        bridge: Address,
        from: Address,
        request: &BridgeRequest,
        native_fee: U256,
    ) -> Result<u64> {
        let tx = BridgeContract::new(bridge, self.provider.clone())
            .bridge_transaction(from, request, native_fee);
        Ok(self.provider.estimate_gas(tx).await?)
    }

    #[instrument(skip(self), fields(tx_hash = %tx_hash))]
    async fn transaction_receipt(&self, tx_hash: TxHash) -> Result<Option<TxReceipt>> {
        trace!("Fetching transaction receipt");
        let receipt = self.provider.get_transaction_receipt(tx_hash).await?;

        if receipt.is_some() {
            debug!("Transaction receipt found");
        } else {
            debug!("Transaction receipt not found");
        }

        Ok(receipt.map(TxReceipt::from))
    }

    #[instrument(skip(self))]
    async fn block_number(&self) -> Result<u64> {
        trace!("Fetching current block number");
        let block_number = self.provider.get_block_number().await?;

        debug!(
            block_number = block_number,
            "Current block number retrieved"
        );
        Ok(block_number)
    }

    async fn gas_price(&self) -> Result<u128> {
        Ok(self.provider.get_gas_price().await?)
    }
}
