//! Chain configuration and contract addresses
//!
//! This module contains the static chain registry: numeric chain ids, token and
//! bridge contract addresses, and LayerZero endpoint ids for every configured
//! network.

pub mod addresses;
mod registry;

pub use registry::{BridgeRoute, ChainEntry, ChainRegistry};
