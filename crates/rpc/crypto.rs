use ethereum_types::H256;
use sha3::{Digest, Keccak256};

/// Keccak-256 as used everywhere in Ethereum (not the NIST SHA-3 variant).
pub fn keccak(data: impl AsRef<[u8]>) -> H256 {
    H256(Keccak256::digest(data.as_ref()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn keccak_empty_input() {
        assert_eq!(
            keccak([]),
            H256(hex!(
                "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
            ))
        );
    }

    #[test]
    fn keccak_known_vector() {
        // keccak256("abc")
        assert_eq!(
            keccak(b"abc"),
            H256(hex!(
                "4e03657aea45a94fc7d47ba826c8d667c0d1e6e33a64a036ec44f58fa12d6c45"
            ))
        );
    }
}
