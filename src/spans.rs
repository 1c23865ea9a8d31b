//! OpenTelemetry-style span helpers for bridge operations
//!
//! Span names are static and every attribute is structured, so traces can be
//! aggregated per operation regardless of chain or account.
//!
//! The helpers are used internally by [`crate::BridgeOrchestrator`] and its
//! collaborators, and are public for callers wrapping their own steps.
//!
//! # Example
//!
//! ```rust
//! use lz_bridge::spans;
//! use alloy_primitives::{Address, U256};
//!
//! let span = spans::ensure_allowance(
//!     &Address::ZERO,
//!     &Address::ZERO,
//!     &Address::ZERO,
//!     &U256::from(1_000_000u64),
//! );
//! let _guard = span.enter();
//! ```

use alloy_primitives::{Address, TxHash, U256};
use tracing::Span;

use crate::submit::BridgeRequest;

/// Create span for a complete transfer run.
///
/// Parent: None (root of a user action)
/// Children: lz_bridge.ensure_allowance, lz_bridge.submit_bridge, lz_bridge.await_finality
#[inline]
pub fn transfer(
    account: &Address,
    source_chain: &str,
    destination_chain: &str,
    amount: &U256,
    recipient: &Address,
) -> Span {
    tracing::info_span!(
        "lz_bridge.transfer",
        account = %account,
        source_chain = source_chain,
        destination_chain = destination_chain,
        amount = %amount,
        recipient = %recipient,
        error.type = tracing::field::Empty,
        error.message = tracing::field::Empty,
        error.source = tracing::field::Empty,
        error.context = tracing::field::Empty,
        otel.status_code = "OK",
    )
}

/// Create span for a fee quote read.
///
/// Parent: lz_bridge.transfer, or none when refreshing the display
#[inline]
pub fn estimate_fee(source_chain: &str, destination_chain: &str, amount: Option<&U256>) -> Span {
    tracing::debug_span!(
        "lz_bridge.estimate_fee",
        source_chain = source_chain,
        destination_chain = destination_chain,
        amount = amount.map(tracing::field::display),
        error.type = tracing::field::Empty,
        error.message = tracing::field::Empty,
        error.source = tracing::field::Empty,
        otel.status_code = "OK",
    )
}

/// Create span for the allowance check and optional approval.
///
/// Parent: lz_bridge.transfer
/// Children: lz_bridge.await_finality
#[inline]
pub fn ensure_allowance(token: &Address, owner: &Address, spender: &Address, amount: &U256) -> Span {
    tracing::info_span!(
        "lz_bridge.ensure_allowance",
        token = %token,
        owner = %owner,
        spender = %spender,
        amount = %amount,
        error.type = tracing::field::Empty,
        error.message = tracing::field::Empty,
        error.source = tracing::field::Empty,
        otel.status_code = "OK",
    )
}

/// Create span for broadcasting the bridge call.
#[inline]
pub fn submit_bridge(
    from: &Address,
    source_chain: &str,
    destination_chain: &str,
    request: &BridgeRequest,
    native_fee: &U256,
) -> Span {
    tracing::info_span!(
        "lz_bridge.submit_bridge",
        from = %from,
        source_chain = source_chain,
        destination_chain = destination_chain,
        destination_endpoint_id = request.destination_endpoint_id,
        token = %request.token,
        amount = %request.amount,
        recipient = %request.recipient,
        native_fee = %native_fee,
        error.type = tracing::field::Empty,
        error.message = tracing::field::Empty,
        error.source = tracing::field::Empty,
        error.context = tracing::field::Empty,
        otel.status_code = "OK",
    )
}

/// Create span for waiting on a transaction receipt.
///
/// Parent: lz_bridge.ensure_allowance or lz_bridge.transfer
/// Children: Provider RPC calls (polling)
#[inline]
pub fn await_finality(tx_hash: TxHash, required_confirmations: u64, max_attempts: u32) -> Span {
    tracing::debug_span!(
        "lz_bridge.await_finality",
        tx_hash = %tx_hash,
        required_confirmations = required_confirmations,
        max_attempts = max_attempts,
        error.type = tracing::field::Empty,
        error.message = tracing::field::Empty,
        error.source = tracing::field::Empty,
        otel.status_code = "OK",
    )
}

/// Record error attributes on the current span.
///
/// - error.type: the leading segment of the error message
/// - error.message: the full message
/// - error.source: the wrapped cause, if any
pub fn record_error<E: std::error::Error>(error: &E) {
    let current_span = tracing::Span::current();
    let message = error.to_string();
    current_span.record(
        "error.type",
        message.split(':').next().unwrap_or("Unknown"),
    );
    current_span.record("error.message", message.as_str());
    current_span.record("otel.status_code", "ERROR");

    if let Some(source) = error.source() {
        current_span.record("error.source", source.to_string());
    }
}

/// Record error attributes with custom context on the current span.
///
/// ```rust
/// use lz_bridge::spans;
///
/// let span = tracing::info_span!("lz_bridge.operation", error.context = tracing::field::Empty);
/// let _guard = span.enter();
///
/// spans::record_error_with_context(
///     "TransferDetached",
///     "progress closed before broadcast",
///     Some("bridge call was not submitted"),
/// );
/// ```
pub fn record_error_with_context(
    error_type: &str,
    error_message: &str,
    additional_context: Option<&str>,
) {
    let current_span = tracing::Span::current();
    current_span.record("error.type", error_type);
    current_span.record("error.message", error_message);
    current_span.record("otel.status_code", "ERROR");

    if let Some(context) = additional_context {
        current_span.record("error.context", context);
    }
}
