//! Bridge and token contract bindings
//!
//! Alloy-generated bindings with thin wrappers that log each read and build
//! unsigned transaction requests for submissions:
//!
//! - [`Erc20Contract`](erc20::Erc20Contract): allowance, approve, balance
//! - [`BridgeContract`](bridge::BridgeContract): `estimateFees` and `bridge`

pub mod bridge;
pub mod erc20;
