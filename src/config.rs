//! Tunables for the transfer flow

use alloy_primitives::U256;
use bon::Builder;

use crate::options::LzReceiveOption;

/// Decimals of the bridged stable-coin.
pub const USDT_DECIMALS: u8 = 6;

/// Native fee attached to a bridge call when no quote could be obtained
/// (0.001 of the native currency).
pub const DEFAULT_FALLBACK_NATIVE_FEE: U256 = U256::from_limbs([1_000_000_000_000_000, 0, 0, 0]);

/// Configuration for transaction confirmation polling.
///
/// # Examples
///
/// ```rust
/// use lz_bridge::PollingConfig;
///
/// // Use defaults (60 attempts, 3 second intervals, 1 confirmation)
/// let config = PollingConfig::default();
///
/// let config = PollingConfig::default()
///     .with_max_attempts(20)
///     .with_poll_interval_secs(12)
///     .with_required_confirmations(2);
/// assert_eq!(config.total_timeout_secs(), 240);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingConfig {
    /// Maximum number of receipt polls before giving up.
    pub max_attempts: u32,
    /// Seconds to wait between polls.
    pub poll_interval_secs: u64,
    /// Blocks (including the one holding the transaction) before it counts as final.
    pub required_confirmations: u64,
}

impl Default for PollingConfig {
    /// One confirmation, polled every 3 seconds for up to 3 minutes.
    fn default() -> Self {
        Self {
            max_attempts: 60,
            poll_interval_secs: 3,
            required_confirmations: 1,
        }
    }
}

impl PollingConfig {
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_poll_interval_secs(mut self, secs: u64) -> Self {
        self.poll_interval_secs = secs;
        self
    }

    pub fn with_required_confirmations(mut self, confirmations: u64) -> Self {
        self.required_confirmations = confirmations.max(1);
        self
    }

    /// `max_attempts * poll_interval_secs`
    pub fn total_timeout_secs(&self) -> u64 {
        self.max_attempts as u64 * self.poll_interval_secs
    }
}

/// Settings of a [`BridgeOrchestrator`](crate::BridgeOrchestrator).
///
/// ```rust
/// use lz_bridge::{LzReceiveOption, OrchestratorConfig};
///
/// let config = OrchestratorConfig::builder()
///     .lz_receive(LzReceiveOption::with_gas(300_000))
///     .build();
/// assert_eq!(config.token_decimals, 6);
/// ```
#[derive(Debug, Clone, Builder)]
pub struct OrchestratorConfig {
    #[builder(default = USDT_DECIMALS)]
    pub token_decimals: u8,

    /// Used only when a fresh fee quote is unavailable.
    #[builder(default = DEFAULT_FALLBACK_NATIVE_FEE)]
    pub fallback_native_fee: U256,

    /// Destination gas policy encoded into the message options.
    #[builder(default)]
    pub lz_receive: LzReceiveOption,

    #[builder(default)]
    pub polling: PollingConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}
