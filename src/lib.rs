//! # lz-bridge
//!
//! Source-chain orchestration for stable-coin transfers over a LayerZero
//! bridge contract pair.
//!
//! A transfer is two on-chain steps run strictly in sequence: granting the
//! bridge an allowance on the token (skipped when the existing allowance is
//! enough), then calling the bridge with the cross-chain messaging fee
//! attached. [`BridgeOrchestrator`] runs both and reports progress through an
//! observable three-step [`ProgressState`] (Approve, Bridge, Done).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lz_bridge::providers::{AlloyContractCaller, TokioClock};
//! use lz_bridge::{BridgeOrchestrator, ChainRegistry, TransferRequest};
//! use alloy_provider::ProviderBuilder;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = ProviderBuilder::new()
//!     .connect("https://bsc-testnet-rpc.publicnode.com")
//!     .await?;
//!
//! let orchestrator = BridgeOrchestrator::builder()
//!     .registry(ChainRegistry::builtin())
//!     .caller(AlloyContractCaller::new(provider))
//!     .clock(TokioClock::new())
//!     .build();
//!
//! let mut progress = orchestrator.progress();
//! tokio::spawn(async move {
//!     while let Some(state) = progress.changed().await {
//!         println!("{:?}", state.phase);
//!     }
//! });
//!
//! let request = TransferRequest::builder()
//!     .account("0x742d35Cc6634C0532925a3b844Bc9e7595f8fA0d".parse()?)
//!     .source_chain("bscTestnet")
//!     .destination_chain("sepolia")
//!     .amount("25.5")
//!     .build();
//!
//! let outcome = orchestrator.transfer(&request).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Fee display
//!
//! [`FeeBoard`] keeps the quote shown to the user in step with the latest
//! inputs; results of superseded quotes are discarded.
//!
//! ## Public API
//!
//! - [`BridgeOrchestrator`], [`TransferRequest`], [`TransferOutcome`]: the transfer flow
//! - [`ProgressTracker`] and [`ProgressView`]: observable step state
//! - [`FeeEstimator`] and [`FeeBoard`]: fee quotes
//! - [`ensure_allowance`], [`TransferSubmitter`], [`await_finality`]: the individual steps
//! - [`ChainRegistry`]: chain key to deployment lookup
//! - [`ContractCaller`] and [`Clock`]: seams for providers and tests
//! - [`BridgeError`] and [`Result`]

mod allowance;
mod amount;
mod chain;
mod config;
mod error;
mod fee;
mod finality;
mod options;
mod orchestrator;
mod progress;
mod submit;
mod traits;

pub mod contracts;
pub mod providers;
pub mod testing;

// Public module for advanced users who need custom instrumentation
pub mod spans;

pub use allowance::{ensure_allowance, AllowanceOutcome};
pub use amount::parse_token_amount;
pub use chain::addresses;
pub use chain::{BridgeRoute, ChainEntry, ChainRegistry};
pub use config::{OrchestratorConfig, PollingConfig, DEFAULT_FALLBACK_NATIVE_FEE, USDT_DECIMALS};
pub use contracts::{bridge::BridgeContract, erc20::Erc20Contract};
pub use error::{BridgeError, Result};
pub use fee::{
    FeeBoard, FeeDisplay, FeeEstimate, FeeEstimator, FeeInputs, FeeQuote, FeeStatus,
    GasPriceTier, NetworkFee,
};
pub use finality::{await_finality, TxReceipt};
pub use options::{LzReceiveOption, DEFAULT_LZ_RECEIVE_GAS};
pub use orchestrator::{
    BridgeOrchestrator, TransferIntent, TransferOutcome, TransferReceipt, TransferRequest,
};
pub use progress::{
    ProgressState, ProgressTracker, ProgressView, Step, StepId, StepStatus, TransferPhase,
};
pub use submit::{BridgeRequest, TransferSubmitter};
pub use traits::{Clock, ContractCaller};
