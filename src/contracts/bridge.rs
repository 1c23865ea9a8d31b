//! Bridge contract bindings and wrapper
//!
//! The bridge locks or burns tokens on the source chain and sends a LayerZero
//! message to its peer on the destination chain. Sending requires a native
//! fee, quoted by `estimateFees`, attached as the call value of `bridge`.

use alloy_network::Ethereum;
use alloy_primitives::{Address, U256};
use alloy_provider::Provider;
use alloy_rpc_types::TransactionRequest;
use alloy_sol_types::sol;
use tracing::{debug, info};

use crate::fee::FeeQuote;
use crate::submit::BridgeRequest;
use OftBridge::OftBridgeInstance;

/// Wrapper around a deployed bridge contract.
pub struct BridgeContract<P: Provider<Ethereum>> {
    instance: OftBridgeInstance<P>,
}

impl<P: Provider<Ethereum>> BridgeContract<P> {
    pub fn new(address: Address, provider: P) -> Self {
        debug!(
            contract_address = %address,
            event = "bridge_contract_initialized"
        );
        Self {
            instance: OftBridgeInstance::new(address, provider),
        }
    }

    /// Quotes the messaging fee for `request`, paid in the native currency.
    pub async fn estimate_fees(
        &self,
        request: &BridgeRequest,
    ) -> Result<FeeQuote, alloy_contract::Error> {
        debug!(
            destination_eid = request.destination_endpoint_id,
            token = %request.token,
            amount = %request.amount,
            recipient = %request.recipient,
            contract_address = %self.instance.address(),
            event = "estimating_fees"
        );

        let fee = self
            .instance
            .estimateFees(
                request.destination_endpoint_id,
                request.token,
                request.amount,
                request.recipient,
                request.options.clone(),
                false,
            )
            .call()
            .await?;

        let quote = FeeQuote {
            native_fee: fee.nativeFee,
            lz_token_fee: Some(fee.lzTokenFee),
        };

        info!(
            native_fee = %quote.native_fee,
            lz_token_fee = ?quote.lz_token_fee,
            contract_address = %self.instance.address(),
            event = "fees_estimated"
        );

        Ok(quote)
    }

    /// Create the transaction request for the `bridge` function with
    /// `native_fee` attached as call value.
    pub fn bridge_transaction(
        &self,
        from: Address,
        request: &BridgeRequest,
        native_fee: U256,
    ) -> TransactionRequest {
        info!(
            from = %from,
            destination_eid = request.destination_endpoint_id,
            token = %request.token,
            amount = %request.amount,
            recipient = %request.recipient,
            native_fee = %native_fee,
            contract_address = %self.instance.address(),
            event = "bridge_transaction_created"
        );

        self.instance
            .bridge(
                request.destination_endpoint_id,
                request.token,
                request.amount,
                request.recipient,
                request.options.clone(),
            )
            .from(from)
            .value(native_fee)
            .into_transaction_request()
    }

    pub fn address(&self) -> Address {
        *self.instance.address()
    }
}

sol!(
    #[allow(missing_docs)]
    #[sol(rpc)]
    contract OftBridge {
        struct MessagingFee {
            uint256 nativeFee;
            uint256 lzTokenFee;
        }

        function estimateFees(
            uint32 _dstEid,
            address _token,
            uint256 _amount,
            address _to,
            bytes _options,
            bool _payInLzToken
        ) external view returns (MessagingFee memory fee);

        function bridge(
            uint32 _dstEid,
            address _token,
            uint256 _amount,
            address _to,
            bytes _options
        ) external payable;
    }
);
