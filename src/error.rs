use alloy_primitives::TxHash;
use thiserror::Error;

use crate::progress::{StepId, StepStatus, TransferPhase};

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Unknown chain: {chain}")]
    UnknownChain { chain: String },

    #[error("Bridge not configured on {chain}: missing {field}")]
    MissingBridgeConfig { chain: String, field: &'static str },

    #[error("Invalid transfer intent: {0}")]
    InvalidIntent(String),

    #[error("Allowance check failed: {source}")]
    Allowance {
        #[source]
        source: Box<BridgeError>,
    },

    #[error("Bridge transfer failed: {source}")]
    TransferSubmission {
        #[source]
        source: Box<BridgeError>,
    },

    #[error("Fee estimation failed: {source}")]
    FeeEstimation {
        #[source]
        source: Box<BridgeError>,
    },

    #[error("A new transfer cannot start while the flow is {phase}")]
    NotIdle { phase: TransferPhase },

    #[error("Step {step} cannot move to {status}")]
    InvalidStepTransition { step: StepId, status: StepStatus },

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Contract call failed: {0}")]
    ContractCall(String),

    #[error("Execution reverted: {reason}")]
    ContractRevert { reason: String },

    #[error("Transaction {tx_hash} failed: {reason}")]
    TransactionFailed { tx_hash: TxHash, reason: String },

    #[error("Transaction {tx_hash} not final after {attempts} attempts")]
    FinalityTimeout { tx_hash: TxHash, attempts: u32 },

    #[error("RPC error: {0}")]
    Rpc(#[from] alloy_json_rpc::RpcError<alloy_transport::TransportErrorKind>),

    #[error("ABI encoding/decoding error: {0}")]
    Abi(#[from] alloy_sol_types::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BridgeError {
    /// Wraps a failure from the approval step.
    pub fn allowance(source: BridgeError) -> Self {
        Self::Allowance {
            source: Box::new(source),
        }
    }

    /// Wraps a failure from the bridge submission step.
    pub fn transfer_submission(source: BridgeError) -> Self {
        Self::TransferSubmission {
            source: Box::new(source),
        }
    }

    /// Wraps a failure from a fee quote read.
    pub fn fee_estimation(source: BridgeError) -> Self {
        Self::FeeEstimation {
            source: Box::new(source),
        }
    }

    /// The innermost cause, used as the user-facing step error text.
    pub fn root_cause(&self) -> &BridgeError {
        match self {
            Self::Allowance { source }
            | Self::TransferSubmission { source }
            | Self::FeeEstimation { source } => source.root_cause(),
            other => other,
        }
    }

    /// Returns true for errors raised before any network call is made.
    pub fn is_preflight(&self) -> bool {
        matches!(
            self,
            Self::UnknownChain { .. } | Self::MissingBridgeConfig { .. } | Self::InvalidIntent(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
