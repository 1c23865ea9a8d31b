//! Building and broadcasting the bridge call

use alloy_primitives::{Address, Bytes, TxHash, U256};
use tracing::{error, info, Instrument};

use crate::chain::{BridgeRoute, ChainRegistry};
use crate::error::{BridgeError, Result};
use crate::spans;
use crate::traits::ContractCaller;

/// Arguments shared by `estimateFees` and `bridge`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeRequest {
    pub destination_endpoint_id: u32,
    pub token: Address,
    /// Token base units.
    pub amount: U256,
    pub recipient: Address,
    /// Encoded message options, opaque at this level.
    pub options: Bytes,
}

impl BridgeRequest {
    pub fn new(route: &BridgeRoute, amount: U256, recipient: Address, options: Bytes) -> Self {
        Self {
            destination_endpoint_id: route.destination_endpoint_id,
            token: route.token,
            amount,
            recipient,
            options,
        }
    }
}

/// Submits bridge transfers for routes in a [`ChainRegistry`].
#[derive(Debug, Clone, Copy)]
pub struct TransferSubmitter<'a, C: ?Sized> {
    registry: &'a ChainRegistry,
    caller: &'a C,
    options: &'a Bytes,
}

impl<'a, C: ContractCaller + ?Sized> TransferSubmitter<'a, C> {
    pub fn new(registry: &'a ChainRegistry, caller: &'a C, options: &'a Bytes) -> Self {
        Self {
            registry,
            caller,
            options,
        }
    }

    /// Broadcasts the bridge call and returns its hash without waiting for
    /// it to be mined.
    ///
    /// `payable_native_amount` is attached as call value and pays the
    /// cross-chain messaging fee.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::UnknownChain`] / [`BridgeError::MissingBridgeConfig`] before any network call
    /// - [`BridgeError::InvalidIntent`] for a zero amount or recipient, also before any call
    /// - [`BridgeError::TransferSubmission`] wrapping the cause if the call could not be broadcast
    pub async fn submit_bridge(
        &self,
        from: Address,
        source_chain: &str,
        destination_chain: &str,
        amount: U256,
        recipient: Address,
        payable_native_amount: U256,
    ) -> Result<TxHash> {
        let route = self
            .registry
            .resolve_route(source_chain, destination_chain)?;
        self.submit_route(
            from,
            source_chain,
            destination_chain,
            &route,
            amount,
            recipient,
            payable_native_amount,
        )
        .await
    }

    /// Like [`Self::submit_bridge`], for a route resolved earlier.
    ///
    /// The chain keys only label the logs; `route` decides which bridge is
    /// called and which token is moved.
    #[allow(clippy::too_many_arguments)]
    pub async fn submit_route(
        &self,
        from: Address,
        source_chain: &str,
        destination_chain: &str,
        route: &BridgeRoute,
        amount: U256,
        recipient: Address,
        payable_native_amount: U256,
    ) -> Result<TxHash> {
        if amount.is_zero() {
            return Err(BridgeError::InvalidIntent("amount is zero".to_string()));
        }
        if recipient.is_zero() {
            return Err(BridgeError::InvalidIntent(
                "recipient is the zero address".to_string(),
            ));
        }
        let request = BridgeRequest::new(route, amount, recipient, self.options.clone());

        let span = spans::submit_bridge(
            &from,
            source_chain,
            destination_chain,
            &request,
            &payable_native_amount,
        );

        let submitted = self
            .caller
            .submit_bridge(route.bridge, from, &request, payable_native_amount)
            .instrument(span.clone())
            .await;

        let _guard = span.enter();
        match submitted {
            Ok(tx_hash) => {
                info!(
                    tx_hash = %tx_hash,
                    bridge = %route.bridge,
                    native_fee = %payable_native_amount,
                    event = "bridge_submitted"
                );
                Ok(tx_hash)
            }
            Err(e) => {
                spans::record_error(&e);
                error!(
                    error = %e,
                    bridge = %route.bridge,
                    event = "bridge_submission_failed"
                );
                Err(BridgeError::transfer_submission(e))
            }
        }
    }
}
