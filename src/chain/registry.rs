//! Static lookup from chain key to bridge deployment

use std::collections::BTreeMap;

use alloy_chains::{Chain, NamedChain};
use alloy_primitives::Address;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::addresses::*;
use crate::error::{BridgeError, Result};

/// Deployment details of one network.
///
/// A `None` field means the bridge is not available on this network for the
/// role that field is needed in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainEntry {
    pub key: String,
    pub chain: Chain,
    pub token_address: Option<Address>,
    pub bridge_address: Option<Address>,
    pub destination_endpoint_id: Option<u32>,
    pub rpc_url: Option<Url>,
}

impl ChainEntry {
    /// The EVM chain id
    pub fn numeric_id(&self) -> u64 {
        self.chain.id()
    }

    pub fn is_testnet(&self) -> bool {
        self.chain.named().is_some_and(|named| named.is_testnet())
    }

    /// Token address, required when this chain is the transfer source.
    pub fn require_token(&self) -> Result<Address> {
        self.token_address.ok_or_else(|| self.missing("token address"))
    }

    /// Bridge address, required when this chain is the transfer source.
    pub fn require_bridge(&self) -> Result<Address> {
        self.bridge_address
            .ok_or_else(|| self.missing("bridge address"))
    }

    /// Endpoint id, required when this chain is the transfer destination.
    pub fn require_endpoint_id(&self) -> Result<u32> {
        self.destination_endpoint_id
            .ok_or_else(|| self.missing("destination endpoint id"))
    }

    fn missing(&self, field: &'static str) -> BridgeError {
        BridgeError::MissingBridgeConfig {
            chain: self.key.clone(),
            field,
        }
    }
}

/// Everything needed to move tokens from one chain to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeRoute {
    pub source_chain_id: u64,
    pub token: Address,
    pub bridge: Address,
    pub destination_endpoint_id: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawChainEntry {
    chain_id: u64,
    #[serde(default)]
    usdt: Option<Address>,
    #[serde(default)]
    bridge: Option<Address>,
    #[serde(default)]
    dst_eid: Option<u32>,
    #[serde(default)]
    rpc_url: Option<Url>,
}

/// Immutable chain key → [`ChainEntry`] mapping, loaded once at start-up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainRegistry {
    entries: BTreeMap<String, ChainEntry>,
}

impl ChainRegistry {
    /// The networks the bridge UI ships with.
    pub fn builtin() -> Self {
        let entry = |key: &str,
                     chain: NamedChain,
                     token: Option<Address>,
                     bridge: Option<Address>,
                     eid: Option<u32>| ChainEntry {
            key: key.to_string(),
            chain: Chain::from_named(chain),
            token_address: token,
            bridge_address: bridge,
            destination_endpoint_id: eid,
            rpc_url: None,
        };

        Self::from_entries([
            entry(MAINNET, NamedChain::Mainnet, None, None, None),
            entry(POLYGON, NamedChain::Polygon, None, None, None),
            entry(
                BSC_TESTNET,
                NamedChain::BinanceSmartChainTestnet,
                Some(BSC_TESTNET_USDT_ADDRESS),
                Some(BSC_TESTNET_BRIDGE_ADDRESS),
                Some(BSC_TESTNET_ENDPOINT_ID),
            ),
            entry(
                SEPOLIA,
                NamedChain::Sepolia,
                Some(SEPOLIA_USDT_ADDRESS),
                Some(SEPOLIA_BRIDGE_ADDRESS),
                Some(SEPOLIA_ENDPOINT_ID),
            ),
        ])
    }

    pub fn from_entries(entries: impl IntoIterator<Item = ChainEntry>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|entry| (entry.key.clone(), entry))
                .collect(),
        }
    }

    /// Parses the external chain configuration.
    ///
    /// ```rust
    /// use lz_bridge::ChainRegistry;
    ///
    /// let registry = ChainRegistry::from_json(r#"{
    ///     "sepolia": {
    ///         "chainId": 11155111,
    ///         "usdt": "0x2B6069650B78b10fab9D54c9A6B6AD84b045a1CA",
    ///         "bridge": "0x212Fbda4a5B034700E1C6422880b13C9f41180FB",
    ///         "dstEid": 40161
    ///     },
    ///     "mainnet": { "chainId": 1, "usdt": null, "bridge": null, "dstEid": null }
    /// }"#).unwrap();
    ///
    /// assert_eq!(registry.lookup("sepolia").unwrap().numeric_id(), 11155111);
    /// assert!(registry.lookup("mainnet").unwrap().bridge_address.is_none());
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: BTreeMap<String, RawChainEntry> = serde_json::from_str(json)?;

        let registry = Self::from_entries(raw.into_iter().map(|(key, raw)| ChainEntry {
            key,
            chain: Chain::from_id(raw.chain_id),
            token_address: raw.usdt,
            bridge_address: raw.bridge,
            destination_endpoint_id: raw.dst_eid,
            rpc_url: raw.rpc_url,
        }));

        debug!(
            chains = registry.entries.len(),
            event = "chain_registry_loaded"
        );

        Ok(registry)
    }

    /// Looks up a chain by key.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::UnknownChain`] if the key is not configured.
    pub fn lookup(&self, chain_key: &str) -> Result<&ChainEntry> {
        self.entries
            .get(chain_key)
            .ok_or_else(|| BridgeError::UnknownChain {
                chain: chain_key.to_string(),
            })
    }

    /// Resolves the addresses for a transfer between two chains.
    ///
    /// The source must have a token and bridge address; the destination must
    /// have an endpoint id. No network access is involved.
    pub fn resolve_route(&self, source_chain: &str, destination_chain: &str) -> Result<BridgeRoute> {
        let source = self.lookup(source_chain)?;
        let destination = self.lookup(destination_chain)?;

        Ok(BridgeRoute {
            source_chain_id: source.numeric_id(),
            token: source.require_token()?,
            bridge: source.require_bridge()?,
            destination_endpoint_id: destination.require_endpoint_id()?,
        })
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
