//! Async JSON-RPC client for Ethereum execution nodes.
//!
//! Transport-level failures (connection refused, timeouts) are retried with
//! bounded exponential backoff across the configured endpoints. JSON-RPC
//! protocol errors are surfaced immediately; classifying them is the
//! caller's business.

pub mod errors;

use std::time::Duration;

use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use serde_json::{Value, json};
use tracing::warn;
use url::Url;

use crate::types::{
    BlockIdentifier, RpcReceipt, TransactionRequest, receipt::parse_hex_bytes,
};
use errors::{EthClientError, RpcRequestError};

const DEFAULT_MAX_NUMBER_OF_RETRIES: u64 = 10;
const DEFAULT_BACKOFF_FACTOR: u64 = 2;
// Both in milliseconds.
const DEFAULT_MIN_RETRY_DELAY: u64 = 96;
const DEFAULT_MAX_RETRY_DELAY: u64 = 1800;

const RECEIPT_POLL_INTERVAL_MS: u64 = 1000;

#[derive(Debug, Clone)]
pub struct EthClient {
    client: reqwest::Client,
    urls: Vec<Url>,
    max_number_of_retries: u64,
    backoff_factor: u64,
    min_retry_delay: u64,
    max_retry_delay: u64,
}

impl EthClient {
    pub fn new(url: &str) -> Result<EthClient, EthClientError> {
        let url = Url::parse(url)
            .map_err(|e| EthClientError::InternalError(format!("invalid RPC url: {e}")))?;
        Self::new_with_config(
            vec![url],
            DEFAULT_MAX_NUMBER_OF_RETRIES,
            DEFAULT_BACKOFF_FACTOR,
            DEFAULT_MIN_RETRY_DELAY,
            DEFAULT_MAX_RETRY_DELAY,
        )
    }

    pub fn new_with_config(
        urls: Vec<Url>,
        max_number_of_retries: u64,
        backoff_factor: u64,
        min_retry_delay: u64,
        max_retry_delay: u64,
    ) -> Result<EthClient, EthClientError> {
        if urls.is_empty() {
            return Err(EthClientError::InternalError(
                "at least one RPC url is required".to_owned(),
            ));
        }
        Ok(EthClient {
            client: reqwest::Client::new(),
            urls,
            max_number_of_retries,
            backoff_factor,
            min_retry_delay,
            max_retry_delay,
        })
    }

    pub async fn get_block_number(&self) -> Result<u64, EthClientError> {
        let result = self.request("eth_blockNumber", json!([])).await?;
        parse_quantity(&result)
    }

    pub async fn get_chain_id(&self) -> Result<u64, EthClientError> {
        let result = self.request("eth_chainId", json!([])).await?;
        parse_quantity(&result)
    }

    pub async fn get_code(
        &self,
        address: Address,
        block: BlockIdentifier,
    ) -> Result<Bytes, EthClientError> {
        let result = self
            .request(
                "eth_getCode",
                json!([format!("{address:#x}"), block.as_param()]),
            )
            .await?;
        Ok(Bytes::from(parse_hex_bytes(&result)?))
    }

    pub async fn get_balance(
        &self,
        address: Address,
        block: BlockIdentifier,
    ) -> Result<U256, EthClientError> {
        let result = self
            .request(
                "eth_getBalance",
                json!([format!("{address:#x}"), block.as_param()]),
            )
            .await?;
        parse_u256(&result)
    }

    pub async fn get_nonce(
        &self,
        address: Address,
        block: BlockIdentifier,
    ) -> Result<u64, EthClientError> {
        let result = self
            .request(
                "eth_getTransactionCount",
                json!([format!("{address:#x}"), block.as_param()]),
            )
            .await?;
        parse_quantity(&result)
    }

    pub async fn get_gas_price(&self) -> Result<U256, EthClientError> {
        let result = self.request("eth_gasPrice", json!([])).await?;
        parse_u256(&result)
    }

    /// Gas price bumped by `extra` percent, to outbid the base-fee drift
    /// between quoting and inclusion.
    pub async fn get_gas_price_with_extra(&self, extra: u64) -> Result<U256, EthClientError> {
        let gas_price = self.get_gas_price().await?;
        Ok(gas_price * (100 + extra) / 100)
    }

    pub async fn estimate_gas(
        &self,
        request: &TransactionRequest,
    ) -> Result<u64, EthClientError> {
        let result = self
            .request("eth_estimateGas", json!([request.as_param()]))
            .await?;
        parse_quantity(&result)
    }

    pub async fn send_raw_transaction(&self, data: &[u8]) -> Result<H256, EthClientError> {
        let result = self
            .request(
                "eth_sendRawTransaction",
                json!([format!("0x{}", hex::encode(data))]),
            )
            .await?;
        let bytes = parse_hex_bytes(&result)?;
        if bytes.len() != 32 {
            return Err(EthClientError::UnexpectedResponse(format!(
                "expected a 32-byte transaction hash, got {} bytes",
                bytes.len()
            )));
        }
        Ok(H256::from_slice(&bytes))
    }

    pub async fn get_transaction_receipt(
        &self,
        tx_hash: H256,
    ) -> Result<Option<RpcReceipt>, EthClientError> {
        let result = self
            .request(
                "eth_getTransactionReceipt",
                json!([format!("{tx_hash:#x}")]),
            )
            .await?;
        if result.is_null() {
            return Ok(None);
        }
        RpcReceipt::from_rpc_value(&result).map(Some)
    }

    /// Polls for the receipt of `tx_hash`, giving up after `max_retries`
    /// rounds.
    pub async fn wait_for_transaction_receipt(
        &self,
        tx_hash: H256,
        max_retries: u64,
    ) -> Result<RpcReceipt, EthClientError> {
        let mut retries = 0;
        while retries < max_retries {
            if let Some(receipt) = self.get_transaction_receipt(tx_hash).await? {
                return Ok(receipt);
            }
            retries += 1;
            tokio::time::sleep(Duration::from_millis(RECEIPT_POLL_INTERVAL_MS)).await;
        }
        Err(EthClientError::ReceiptTimeout(tx_hash))
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, EthClientError> {
        let body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1,
        });

        let mut delay = self.min_retry_delay;
        let mut attempt = 0;
        loop {
            match self.request_once(&body).await {
                Ok(result) => return Ok(result),
                Err(error) if error.is_transport() && attempt < self.max_number_of_retries => {
                    attempt += 1;
                    warn!(
                        method,
                        attempt,
                        delay_ms = delay,
                        %error,
                        "RPC request failed, retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    delay = (delay * self.backoff_factor).min(self.max_retry_delay);
                }
                Err(error) => return Err(error),
            }
        }
    }

    /// One round over all configured endpoints; the last transport error
    /// wins if none answers.
    async fn request_once(&self, body: &Value) -> Result<Value, EthClientError> {
        let mut last_transport_error = None;
        for url in &self.urls {
            let response = match self.client.post(url.clone()).json(body).send().await {
                Ok(response) => response,
                Err(e) => {
                    last_transport_error = Some(EthClientError::from(e));
                    continue;
                }
            };
            let payload: Value = response.json().await?;
            if let Some(error) = payload.get("error") {
                return Err(RpcRequestError {
                    code: error.get("code").and_then(Value::as_i64).unwrap_or(-1),
                    message: error
                        .get("message")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown")
                        .to_owned(),
                }
                .into());
            }
            return payload.get("result").cloned().ok_or_else(|| {
                EthClientError::UnexpectedResponse("missing result field".to_owned())
            });
        }
        Err(last_transport_error.unwrap_or_else(|| {
            EthClientError::InternalError("no RPC endpoints configured".to_owned())
        }))
    }
}

fn parse_quantity(value: &Value) -> Result<u64, EthClientError> {
    let s = value
        .as_str()
        .ok_or_else(|| EthClientError::UnexpectedResponse("expected hex string".to_owned()))?;
    u64::from_str_radix(s.trim_start_matches("0x"), 16)
        .map_err(|e| EthClientError::UnexpectedResponse(format!("invalid hex quantity: {e}")))
}

fn parse_u256(value: &Value) -> Result<U256, EthClientError> {
    let s = value
        .as_str()
        .ok_or_else(|| EthClientError::UnexpectedResponse("expected hex string".to_owned()))?;
    U256::from_str_radix(s.trim_start_matches("0x"), 16)
        .map_err(|e| EthClientError::UnexpectedResponse(format!("invalid hex quantity: {e}")))
}
