use ethereum_types::H256;

/// Error payload returned by the node for a well-formed JSON-RPC request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} (code: {code})")]
pub struct RpcRequestError {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum EthClientError {
    #[error("Failed to serialize request body: {0}")]
    FailedToSerializeRequestBody(String),
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("RPC request error: {0}")]
    RpcRequestError(#[from] RpcRequestError),
    #[error("Unexpected RPC response: {0}")]
    UnexpectedResponse(String),
    #[error("Timed out waiting for receipt of transaction {0:#x}")]
    ReceiptTimeout(H256),
    #[error("Internal error: {0}")]
    InternalError(String),
}

// Message fragments emitted by geth, erigon and reth for the two error
// classes the deployer distinguishes. Everything else fails immediately.
const NONCE_RACE_FRAGMENTS: [&str; 5] = [
    "nonce too low",
    "invalid nonce",
    "already known",
    "replacement transaction underpriced",
    "nonce expired",
];

const INSUFFICIENT_FUNDS_FRAGMENTS: [&str; 2] =
    ["insufficient funds", "insufficient balance"];

impl EthClientError {
    /// Whether a request failed before reaching the node and can be resent
    /// as-is.
    pub fn is_transport(&self) -> bool {
        matches!(self, EthClientError::Transport(_))
    }

    /// Whether the node rejected a transaction because its nonce was taken
    /// by a competing transaction from the same account.
    pub fn is_nonce_race(&self) -> bool {
        self.rpc_message()
            .is_some_and(|msg| NONCE_RACE_FRAGMENTS.iter().any(|f| msg.contains(f)))
    }

    /// Whether the node rejected a transaction because the sender cannot
    /// cover `gas * price + value`.
    pub fn is_insufficient_funds(&self) -> bool {
        self.rpc_message()
            .is_some_and(|msg| INSUFFICIENT_FUNDS_FRAGMENTS.iter().any(|f| msg.contains(f)))
    }

    fn rpc_message(&self) -> Option<String> {
        match self {
            EthClientError::RpcRequestError(err) => Some(err.message.to_lowercase()),
            _ => None,
        }
    }
}
