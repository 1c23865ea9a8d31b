//! Conversion of user-entered decimal amounts to token base units
//!
//! Amounts are always rounded down. Rounding up could produce a base-unit
//! amount larger than the wallet balance the user was looking at.

use alloy_primitives::U256;

use crate::error::{BridgeError, Result};

/// Parses a decimal string such as `"12.5"` into base units for a token with
/// `decimals` decimals, discarding any digits past the token's precision.
///
/// # Errors
///
/// Returns [`BridgeError::InvalidIntent`] if the input is not a plain
/// non-negative decimal number, or if it is zero after truncation.
///
/// # Example
///
/// ```rust
/// use alloy_primitives::U256;
/// use lz_bridge::parse_token_amount;
///
/// assert_eq!(parse_token_amount("100", 6).unwrap(), U256::from(100_000_000u64));
/// assert_eq!(parse_token_amount("0.1234567", 6).unwrap(), U256::from(123_456u64));
/// ```
pub fn parse_token_amount(input: &str, decimals: u8) -> Result<U256> {
    let trimmed = input.trim();
    let invalid = || BridgeError::InvalidIntent(format!("amount {input:?} is not a number"));

    let (whole, fraction) = match trimmed.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (trimmed, ""),
    };

    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid());
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !fraction.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(invalid());
    }

    let precision = usize::from(decimals);
    let kept = &fraction[..fraction.len().min(precision)];
    let digits = format!("{whole}{kept:0<precision$}");
    let digits = digits.trim_start_matches('0');

    let amount = if digits.is_empty() {
        U256::ZERO
    } else {
        digits.parse::<U256>().map_err(|_| {
            BridgeError::InvalidIntent(format!("amount {input:?} is out of range"))
        })?
    };

    if amount.is_zero() {
        return Err(BridgeError::InvalidIntent(format!(
            "amount {input:?} must be greater than zero"
        )));
    }

    Ok(amount)
}
