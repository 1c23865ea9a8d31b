//! LayerZero message options
//!
//! The bridge contract forwards an options blob to the LayerZero endpoint,
//! telling the destination executor how much gas to spend on `lzReceive`.
//! The rest of the crate treats the encoded bytes as opaque.

use alloy_primitives::Bytes;

/// Options format marker.
const TYPE_3: u16 = 3;
/// Worker id of the executor.
const EXECUTOR_WORKER_ID: u8 = 1;
/// Executor option carrying `lzReceive` gas (and optional native value).
const OPTION_TYPE_LZRECEIVE: u8 = 1;

/// Gas used on the destination chain when nothing else is configured.
pub const DEFAULT_LZ_RECEIVE_GAS: u128 = 200_000;

/// A single executor `lzReceive` option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LzReceiveOption {
    pub gas: u128,
    /// Native value forwarded to the receiver; zero is omitted from the encoding.
    pub value: u128,
}

impl Default for LzReceiveOption {
    fn default() -> Self {
        Self::with_gas(DEFAULT_LZ_RECEIVE_GAS)
    }
}

impl LzReceiveOption {
    pub const fn with_gas(gas: u128) -> Self {
        Self { gas, value: 0 }
    }

    /// Encodes as type-3 options:
    /// `uint16(3) | uint8(worker) | uint16(size) | uint8(type) | uint128(gas) [| uint128(value)]`
    pub fn encode(&self) -> Bytes {
        let mut option = Vec::with_capacity(32);
        option.extend_from_slice(&self.gas.to_be_bytes());
        if self.value != 0 {
            option.extend_from_slice(&self.value.to_be_bytes());
        }

        // option type byte is counted in the size
        let size = (option.len() + 1) as u16;

        let mut encoded = Vec::with_capacity(6 + option.len());
        encoded.extend_from_slice(&TYPE_3.to_be_bytes());
        encoded.push(EXECUTOR_WORKER_ID);
        encoded.extend_from_slice(&size.to_be_bytes());
        encoded.push(OPTION_TYPE_LZRECEIVE);
        encoded.extend_from_slice(&option);

        encoded.into()
    }
}
