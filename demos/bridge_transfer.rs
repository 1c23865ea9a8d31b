// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
//! Testnet USDT transfer from BSC testnet to Sepolia
//!
//! Prerequisites:
//! - BSC testnet BNB for gas and the messaging fee
//! - Test USDT on BSC testnet
//!
//! Environment variables (set these in .env file):
//! - PRIVATE_KEY: Your wallet private key (must start with 0x)
//! - RPC_URL: (optional) BSC testnet RPC endpoint
//! - AMOUNT: (optional) Amount of USDT to bridge, defaults to 1
//! - RUST_LOG: (optional) tracing filter, e.g. `lz_bridge=debug`
//!
//! Run with: `cargo run --example bridge_transfer`

use alloy_network::EthereumWallet;
use alloy_provider::ProviderBuilder;
use alloy_signer_local::PrivateKeySigner;
use dotenvy::dotenv;
use lz_bridge::addresses::{BSC_TESTNET, SEPOLIA};
use lz_bridge::providers::{AlloyContractCaller, TokioClock};
use lz_bridge::{
    BridgeOrchestrator, ChainRegistry, FeeInputs, GasPriceTier, TransferOutcome, TransferRequest,
};
use tracing_subscriber::EnvFilter;

const DEFAULT_RPC_URL: &str = "https://bsc-testnet-rpc.publicnode.com";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lz_bridge=info")),
        )
        .init();

    let signer: PrivateKeySigner = std::env::var("PRIVATE_KEY")?.parse()?;
    let account = signer.address();
    let rpc_url = std::env::var("RPC_URL").unwrap_or_else(|_| DEFAULT_RPC_URL.to_string());
    let amount = std::env::var("AMOUNT").unwrap_or_else(|_| "1".to_string());

    println!("Bridging {amount} USDT: {BSC_TESTNET} -> {SEPOLIA}");
    println!("   Wallet: {account}");
    println!("   RPC: {rpc_url}\n");

    let provider = ProviderBuilder::new()
        .wallet(EthereumWallet::from(signer))
        .connect_http(rpc_url.parse()?);

    let orchestrator = BridgeOrchestrator::builder()
        .registry(ChainRegistry::builtin())
        .caller(AlloyContractCaller::new(provider))
        .clock(TokioClock::new())
        .build();

    let balance = orchestrator.source_balance(account, BSC_TESTNET).await?;
    println!("USDT balance (base units): {balance}");

    let intent = orchestrator.prepare(
        &TransferRequest::builder()
            .account(account)
            .source_chain(BSC_TESTNET)
            .destination_chain(SEPOLIA)
            .amount(amount.as_str())
            .build(),
    )?;

    let board = orchestrator.fee_board();
    let inputs = FeeInputs::new(BSC_TESTNET, SEPOLIA)
        .with_amount(intent.amount())
        .with_recipient(intent.recipient());
    orchestrator.refresh_fee(&board, inputs.clone()).await;
    let native_fee = board.displayed_native_fee().unwrap_or_default();
    println!("Messaging fee (wei): {native_fee}");

    match orchestrator
        .network_fee(account, &inputs, native_fee, GasPriceTier::Medium)
        .await
    {
        Ok(Some(network)) => println!("Estimated gas cost (wei): {}\n", network.fee),
        Ok(None) => {}
        Err(e) => println!("Gas estimate unavailable: {e}\n"),
    }

    let mut progress = orchestrator.progress();
    let printer = tokio::spawn(async move {
        while let Some(state) = progress.changed().await {
            let steps: Vec<_> = state
                .steps
                .iter()
                .map(|step| format!("{}={}", step.title, step.status))
                .collect();
            println!("   [{}] {}", state.phase, steps.join(" "));
        }
    });

    let intent = intent.with_payable_native_amount(native_fee);
    match orchestrator.execute(&intent).await? {
        TransferOutcome::Completed(receipt) => {
            println!("\nBridge transaction: {}", receipt.bridge_tx);
            println!("Fee paid (wei): {}", receipt.native_fee);
        }
        TransferOutcome::Failed { step, error } => {
            println!("\n{step} failed: {}", error.root_cause());
        }
        TransferOutcome::Detached { step } => {
            println!("\nProgress closed during {step}");
        }
    }

    drop(orchestrator);
    printer.await?;
    Ok(())
}
