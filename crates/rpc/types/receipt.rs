use ethereum_types::{Address, H256};
use serde_json::Value;

use crate::clients::eth::errors::EthClientError;

/// Subset of the `eth_getTransactionReceipt` response the deployment
/// tooling cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcReceipt {
    pub tx_hash: H256,
    pub block_number: u64,
    pub status: bool,
    pub gas_used: u64,
    pub contract_address: Option<Address>,
}

impl RpcReceipt {
    pub fn from_rpc_value(value: &Value) -> Result<Self, EthClientError> {
        Ok(RpcReceipt {
            tx_hash: parse_h256(required(value, "transactionHash")?)?,
            block_number: parse_u64(required(value, "blockNumber")?)?,
            status: parse_u64(required(value, "status")?)? == 1,
            gas_used: parse_u64(required(value, "gasUsed")?)?,
            contract_address: value
                .get("contractAddress")
                .filter(|v| !v.is_null())
                .map(parse_address)
                .transpose()?,
        })
    }
}

fn required<'a>(value: &'a Value, field: &str) -> Result<&'a Value, EthClientError> {
    value.get(field).ok_or_else(|| {
        EthClientError::UnexpectedResponse(format!("receipt is missing field `{field}`"))
    })
}

fn parse_u64(value: &Value) -> Result<u64, EthClientError> {
    let s = value
        .as_str()
        .ok_or_else(|| EthClientError::UnexpectedResponse("expected hex string".to_owned()))?;
    u64::from_str_radix(s.trim_start_matches("0x"), 16)
        .map_err(|e| EthClientError::UnexpectedResponse(format!("invalid hex quantity: {e}")))
}

fn parse_h256(value: &Value) -> Result<H256, EthClientError> {
    let bytes = parse_hex_bytes(value)?;
    if bytes.len() != 32 {
        return Err(EthClientError::UnexpectedResponse(format!(
            "expected 32 bytes, got {}",
            bytes.len()
        )));
    }
    Ok(H256::from_slice(&bytes))
}

fn parse_address(value: &Value) -> Result<Address, EthClientError> {
    let bytes = parse_hex_bytes(value)?;
    if bytes.len() != 20 {
        return Err(EthClientError::UnexpectedResponse(format!(
            "expected 20 bytes, got {}",
            bytes.len()
        )));
    }
    Ok(Address::from_slice(&bytes))
}

pub(crate) fn parse_hex_bytes(value: &Value) -> Result<Vec<u8>, EthClientError> {
    let s = value
        .as_str()
        .ok_or_else(|| EthClientError::UnexpectedResponse("expected hex string".to_owned()))?;
    hex::decode(s.trim_start_matches("0x"))
        .map_err(|e| EthClientError::UnexpectedResponse(format!("invalid hex bytes: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_successful_receipt() {
        let value = json!({
            "transactionHash": "0x00000000000000000000000000000000000000000000000000000000000000aa",
            "blockNumber": "0x10",
            "status": "0x1",
            "gasUsed": "0x5208",
            "contractAddress": null,
        });
        let receipt = RpcReceipt::from_rpc_value(&value).unwrap();
        assert!(receipt.status);
        assert_eq!(receipt.block_number, 16);
        assert_eq!(receipt.gas_used, 21000);
        assert!(receipt.contract_address.is_none());
    }

    #[test]
    fn parses_failed_receipt_with_contract_address() {
        let value = json!({
            "transactionHash": "0x00000000000000000000000000000000000000000000000000000000000000aa",
            "blockNumber": "0xa",
            "status": "0x0",
            "gasUsed": "0x0",
            "contractAddress": "0x0000000000000000000000000000000000000042",
        });
        let receipt = RpcReceipt::from_rpc_value(&value).unwrap();
        assert!(!receipt.status);
        assert_eq!(
            receipt.contract_address,
            Some(Address::from_low_u64_be(0x42))
        );
    }

    #[test]
    fn missing_field_is_an_error() {
        let value = json!({ "status": "0x1" });
        assert!(RpcReceipt::from_rpc_value(&value).is_err());
    }
}
