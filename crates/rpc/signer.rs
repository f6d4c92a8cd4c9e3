use bytes::Bytes;
use ethereum_types::{Address, U256};
use secp256k1::{Message, PublicKey, SECP256K1, SecretKey};

use crate::crypto::keccak;
use crate::types::LegacyTransaction;

#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    #[error("Failed to sign transaction: {0}")]
    SigningError(#[from] secp256k1::Error),
}

/// Something that can turn a transaction into raw signed bytes. Today that
/// is always a local private key; the enum leaves room for remote signers.
#[derive(Debug, Clone)]
pub enum Signer {
    Local(LocalSigner),
}

impl Signer {
    pub fn address(&self) -> Address {
        match self {
            Signer::Local(signer) => signer.address,
        }
    }

    pub fn sign_transaction(
        &self,
        tx: &LegacyTransaction,
        chain_id: u64,
    ) -> Result<Bytes, SignerError> {
        match self {
            Signer::Local(signer) => signer.sign_transaction(tx, chain_id),
        }
    }
}

impl From<LocalSigner> for Signer {
    fn from(signer: LocalSigner) -> Self {
        Signer::Local(signer)
    }
}

#[derive(Debug, Clone)]
pub struct LocalSigner {
    secret_key: SecretKey,
    pub address: Address,
}

impl LocalSigner {
    pub fn new(secret_key: SecretKey) -> Self {
        let public_key = secret_key.public_key(SECP256K1);
        LocalSigner {
            secret_key,
            address: public_key_to_address(&public_key),
        }
    }

    /// Produces the EIP-155 signed RLP encoding, ready for broadcast.
    fn sign_transaction(
        &self,
        tx: &LegacyTransaction,
        chain_id: u64,
    ) -> Result<Bytes, SignerError> {
        let hash = tx.signing_hash(chain_id);
        let message = Message::from_digest(hash.to_fixed_bytes());
        let signature = SECP256K1.sign_ecdsa_recoverable(&message, &self.secret_key);
        let (recovery_id, signature_bytes) = signature.serialize_compact();

        let r = U256::from_big_endian(&signature_bytes[..32]);
        let s = U256::from_big_endian(&signature_bytes[32..]);
        let v = 35 + 2 * chain_id + i32::from(recovery_id) as u64;
        Ok(tx.encode_signed(v, r, s))
    }
}

/// Ethereum address: low 20 bytes of the keccak hash of the uncompressed
/// public key (without the 0x04 prefix byte).
pub fn public_key_to_address(public_key: &PublicKey) -> Address {
    let uncompressed = public_key.serialize_uncompressed();
    Address::from_slice(&keccak(&uncompressed[1..])[12..])
}
