//! CREATE2 address arithmetic (EIP-1014) and EIP-55 checksum formatting.

use ethereum_types::{Address, H256};
use stamp_rpc::crypto::keccak;

/// `keccak256(0xff ++ deployer ++ salt ++ keccak256(init_code))[12..]`.
///
/// Pure and chain-independent: the factory sits at the same address on
/// every supported chain, so the result only depends on the inputs.
pub fn calculate_create2_address(factory: Address, salt: H256, init_code: &[u8]) -> Address {
    let init_code_hash = keccak(init_code);
    let mut preimage = Vec::with_capacity(1 + 20 + 32 + 32);
    preimage.push(0xff);
    preimage.extend_from_slice(factory.as_bytes());
    preimage.extend_from_slice(salt.as_bytes());
    preimage.extend_from_slice(init_code_hash.as_bytes());
    Address::from_slice(&keccak(&preimage)[12..])
}

/// EIP-55 mixed-case checksum encoding of an address.
pub fn to_checksum(address: Address) -> String {
    let lower = hex::encode(address.as_bytes());
    let digest = keccak(lower.as_bytes());
    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let nibble = digest[i / 2] >> (if i % 2 == 0 { 4 } else { 0 }) & 0x0f;
        if nibble >= 8 {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}
