use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use rlp::RlpStream;

use crate::crypto::keccak;

/// A pre-EIP-2718 transaction. Deployment and funding transactions are sent
/// in this format because the singleton-factory bootstrap transaction is a
/// legacy transaction by construction, and every EVM chain accepts it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacyTransaction {
    pub nonce: u64,
    pub gas_price: U256,
    pub gas_limit: u64,
    pub to: Option<Address>,
    pub value: U256,
    pub data: Bytes,
}

impl LegacyTransaction {
    /// EIP-155 signing hash: `keccak(rlp([nonce, gasPrice, gas, to, value,
    /// data, chainId, 0, 0]))`.
    pub fn signing_hash(&self, chain_id: u64) -> H256 {
        let mut stream = RlpStream::new_list(9);
        self.rlp_append_unsigned(&mut stream);
        stream.append(&chain_id);
        stream.append(&0u8);
        stream.append(&0u8);
        keccak(stream.out())
    }

    /// RLP encoding of the signed transaction, ready for
    /// `eth_sendRawTransaction`.
    pub fn encode_signed(&self, v: u64, r: U256, s: U256) -> Bytes {
        let mut stream = RlpStream::new_list(9);
        self.rlp_append_unsigned(&mut stream);
        stream.append(&v);
        stream.append(&r);
        stream.append(&s);
        Bytes::from(stream.out().to_vec())
    }

    fn rlp_append_unsigned(&self, stream: &mut RlpStream) {
        stream.append(&self.nonce);
        stream.append(&self.gas_price);
        stream.append(&self.gas_limit);
        match &self.to {
            Some(address) => stream.append(address),
            None => stream.append_empty_data(),
        };
        stream.append(&self.value);
        stream.append(&self.data.to_vec());
    }
}

/// Parameters for `eth_estimateGas`.
#[derive(Debug, Clone, Default)]
pub struct TransactionRequest {
    pub from: Address,
    pub to: Option<Address>,
    pub value: U256,
    pub data: Bytes,
}

impl TransactionRequest {
    pub fn as_param(&self) -> serde_json::Value {
        let mut object = serde_json::Map::new();
        object.insert("from".into(), format!("{:#x}", self.from).into());
        if let Some(to) = self.to {
            object.insert("to".into(), format!("{to:#x}").into());
        }
        object.insert("value".into(), format!("0x{:x}", self.value).into());
        object.insert(
            "data".into(),
            format!("0x{}", hex::encode(&self.data)).into(),
        );
        serde_json::Value::Object(object)
    }
}
