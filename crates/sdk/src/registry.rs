//! Per-chain bootstrap records for the CREATE2 singleton factory.

use std::collections::HashMap;

use bytes::Bytes;
use ethereum_types::{Address, H160, U256};
use hex_literal::hex;

/// Address the keyless bootstrap transaction deploys the factory to, on
/// every chain that accepts replay-protection-free legacy transactions.
pub const KEYLESS_FACTORY_ADDRESS: Address =
    H160(hex!("4e59b44847b379578588920ca78fbf26c0b4956c"));

/// One-shot sender of the keyless bootstrap transaction. Its address is
/// recovered from the fixed signature, so it is the same everywhere; it
/// only ever needs exactly `gas_price * gas_limit` wei.
pub const KEYLESS_SIGNER_ADDRESS: Address =
    H160(hex!("3fab184622dc19b6109349b94811493bf2a45362"));

/// The pre-signed factory deployment transaction: legacy format, no chain
/// id, `v = 27` and `r = s = 0x2222…22`, 100 gwei gas price, 100k gas.
/// Changing any fee parameter would invalidate the signature, which is why
/// the descriptor carries them alongside the raw bytes.
const KEYLESS_RAW_TRANSACTION: [u8; 167] = hex!(
    "f8a58085174876e800830186a08080b853604580600e600039806000f350fe7fffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffe03601600081602082378035828234f58015156039578182fd5b8082525050506014600cf31ba02222222222222222222222222222222222222222222222222222222222222222a02222222222222222222222222222222222222222222222222222222222222222"
);

const KEYLESS_GAS_PRICE: u64 = 100_000_000_000; // 100 gwei
const KEYLESS_GAS_LIMIT: u64 = 100_000;

/// How to bring the singleton factory up on a chain that doesn't have it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapDescriptor {
    /// Account that must hold the funding before the raw transaction is
    /// broadcast.
    pub signer_address: Address,
    /// Pre-signed transaction deploying the factory. Its signature is
    /// fixed at creation time and cannot be re-negotiated.
    pub raw_transaction: Bytes,
    pub gas_price: U256,
    pub gas_limit: u64,
    /// Where the factory ends up, identical on all chains supporting this
    /// bootstrap method.
    pub factory_address: Address,
}

impl BootstrapDescriptor {
    /// The well-known keyless-deployment descriptor.
    pub fn keyless() -> Self {
        BootstrapDescriptor {
            signer_address: KEYLESS_SIGNER_ADDRESS,
            raw_transaction: Bytes::from_static(&KEYLESS_RAW_TRANSACTION),
            gas_price: U256::from(KEYLESS_GAS_PRICE),
            gas_limit: KEYLESS_GAS_LIMIT,
            factory_address: KEYLESS_FACTORY_ADDRESS,
        }
    }

    /// Exactly `gas_price * gas_limit`: the signer must hold this much or
    /// the bootstrap transaction fails with an insufficient balance.
    pub fn funding_required(&self) -> U256 {
        self.gas_price * self.gas_limit
    }
}

/// Immutable chain-id → descriptor table, injected into the deployer at
/// construction time. Build test registries with [`with_descriptor`].
///
/// [`with_descriptor`]: DeploymentRegistry::with_descriptor
#[derive(Debug, Clone, Default)]
pub struct DeploymentRegistry {
    descriptors: HashMap<u64, BootstrapDescriptor>,
}

impl DeploymentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry covering the networks the keyless bootstrap is known to
    /// work on.
    pub fn standard() -> Self {
        const CHAIN_IDS: [u64; 7] = [
            1,        // mainnet
            11155111, // sepolia
            17000,    // holesky
            10,       // op mainnet
            42161,    // arbitrum one
            1337,     // local devnets
            31337,    // anvil / hardhat
        ];
        let mut registry = Self::new();
        for chain_id in CHAIN_IDS {
            registry = registry.with_descriptor(chain_id, BootstrapDescriptor::keyless());
        }
        registry
    }

    pub fn with_descriptor(mut self, chain_id: u64, descriptor: BootstrapDescriptor) -> Self {
        self.descriptors.insert(chain_id, descriptor);
        self
    }

    pub fn get(&self, chain_id: u64) -> Option<&BootstrapDescriptor> {
        self.descriptors.get(&chain_id)
    }
}
