//! The slice of the Ethereum JSON-RPC surface the deployer consumes.
//!
//! Behind a trait so the deployment state machine can be driven by a fake
//! chain in tests; production code uses [`stamp_rpc::EthClient`].

use async_trait::async_trait;
use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use stamp_rpc::types::{BlockIdentifier, BlockTag, RpcReceipt, TransactionRequest};
use stamp_rpc::{EthClient, EthClientError};

/// How many receipt-poll rounds before giving up on a confirmation.
const RECEIPT_MAX_RETRIES: u64 = 100;

#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn chain_id(&self) -> Result<u64, EthClientError>;
    async fn get_code(
        &self,
        address: Address,
        block: BlockIdentifier,
    ) -> Result<Bytes, EthClientError>;
    async fn get_balance(&self, address: Address) -> Result<U256, EthClientError>;
    /// Next usable nonce for `address` (pending state).
    async fn get_nonce(&self, address: Address) -> Result<u64, EthClientError>;
    async fn gas_price(&self) -> Result<U256, EthClientError>;
    async fn estimate_gas(&self, request: &TransactionRequest) -> Result<u64, EthClientError>;
    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<H256, EthClientError>;
    /// Blocks until the transaction is included and its receipt available.
    async fn wait_for_receipt(&self, tx_hash: H256) -> Result<RpcReceipt, EthClientError>;
}

#[async_trait]
impl ChainClient for EthClient {
    async fn chain_id(&self) -> Result<u64, EthClientError> {
        self.get_chain_id().await
    }

    async fn get_code(
        &self,
        address: Address,
        block: BlockIdentifier,
    ) -> Result<Bytes, EthClientError> {
        EthClient::get_code(self, address, block).await
    }

    async fn get_balance(&self, address: Address) -> Result<U256, EthClientError> {
        EthClient::get_balance(self, address, BlockIdentifier::Tag(BlockTag::Latest)).await
    }

    async fn get_nonce(&self, address: Address) -> Result<u64, EthClientError> {
        EthClient::get_nonce(self, address, BlockIdentifier::Tag(BlockTag::Pending)).await
    }

    async fn gas_price(&self) -> Result<U256, EthClientError> {
        self.get_gas_price_with_extra(20).await
    }

    async fn estimate_gas(&self, request: &TransactionRequest) -> Result<u64, EthClientError> {
        EthClient::estimate_gas(self, request).await
    }

    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<H256, EthClientError> {
        EthClient::send_raw_transaction(self, raw).await
    }

    async fn wait_for_receipt(&self, tx_hash: H256) -> Result<RpcReceipt, EthClientError> {
        self.wait_for_transaction_receipt(tx_hash, RECEIPT_MAX_RETRIES)
            .await
    }
}
