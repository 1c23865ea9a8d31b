// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
//! Deployed bridge and stable-coin addresses for the built-in networks
//!
//! Only the testnet deployments carry a bridge. `mainnet` and `polygon` are
//! listed in the registry without addresses, which marks them unsupported.

use alloy_primitives::{address, Address};

// Chain keys

pub const MAINNET: &str = "mainnet";
pub const POLYGON: &str = "polygon";
pub const BSC_TESTNET: &str = "bscTestnet";
pub const SEPOLIA: &str = "sepolia";

// LayerZero V2 endpoint ids

/// <https://docs.layerzero.network/v2/deployments/deployed-contracts?chains=bsc-testnet>
pub const BSC_TESTNET_ENDPOINT_ID: u32 = 40102;

/// <https://docs.layerzero.network/v2/deployments/deployed-contracts?chains=sepolia>
pub const SEPOLIA_ENDPOINT_ID: u32 = 40161;

// Stable-coin (6 decimals) token addresses

/// <https://testnet.bscscan.com/address/0x340Ab63e032C9354fD8d18f97833A1aB75AC1Ff7>
pub const BSC_TESTNET_USDT_ADDRESS: Address =
    address!("340Ab63e032C9354fD8d18f97833A1aB75AC1Ff7");

/// <https://sepolia.etherscan.io/address/0x2B6069650B78b10fab9D54c9A6B6AD84b045a1CA>
pub const SEPOLIA_USDT_ADDRESS: Address = address!("2B6069650B78b10fab9D54c9A6B6AD84b045a1CA");

// Bridge contract addresses

/// <https://testnet.bscscan.com/address/0xe71a0009716752E1d32eaE3089F4152bc5F1ebA6>
pub const BSC_TESTNET_BRIDGE_ADDRESS: Address =
    address!("e71a0009716752E1d32eaE3089F4152bc5F1ebA6");

/// <https://sepolia.etherscan.io/address/0x212Fbda4a5B034700E1C6422880b13C9f41180FB>
pub const SEPOLIA_BRIDGE_ADDRESS: Address = address!("212Fbda4a5B034700E1C6422880b13C9f41180FB");
