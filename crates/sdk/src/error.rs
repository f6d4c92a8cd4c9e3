use ethereum_types::{Address, H256, U256};
use stamp_rpc::EthClientError;
use stamp_rpc::signer::SignerError;

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("Contract {name} is not deployed at its deterministic address {address:#x}")]
    NotDeployed { name: String, address: Address },
    #[error(
        "No bootstrap descriptor registered for chain id {chain_id}; \
         consult the deployment registry for the supported networks"
    )]
    UnsupportedChain { chain_id: u64 },
    #[error(
        "Bootstrap transaction was broadcast but no code exists at factory \
         {factory:#x}; the chain likely rejects replay-protection-free legacy transactions"
    )]
    BootstrapFailed { factory: Address },
    #[error(
        "Insufficient funds: deployment needs about {req} ETH but signer \
         {signer:#x} holds {avail} ETH (short {shortfall} ETH)",
        req = format_ether(.required),
        avail = format_ether(.available),
        shortfall = format_shortfall(.required, .available),
    )]
    InsufficientFunds {
        required: U256,
        available: U256,
        signer: Address,
    },
    #[error(
        "Transaction {tx_hash:#x} confirmed in block {block_number} but no code \
         exists at {address:#x}; the factory's inner CREATE2 must have reverted"
    )]
    DeploymentVerification {
        address: Address,
        tx_hash: H256,
        block_number: u64,
    },
    #[error("Transaction {0:#x} reverted")]
    TransactionFailed(H256),
    #[error(transparent)]
    Client(#[from] EthClientError),
    #[error(transparent)]
    Signer(#[from] SignerError),
}

impl DeployError {
    /// The only transient class: a competing transaction took our nonce.
    pub(crate) fn is_nonce_race(&self) -> bool {
        matches!(self, DeployError::Client(e) if e.is_nonce_race())
    }
}

fn format_shortfall(required: &U256, available: &U256) -> String {
    format_ether(&required.saturating_sub(*available))
}

/// Renders a wei amount as a decimal ETH string, trimming trailing zeros.
pub fn format_ether(wei: &U256) -> String {
    let ether = U256::exp10(18);
    let whole = *wei / ether;
    let frac = *wei % ether;
    if frac.is_zero() {
        return whole.to_string();
    }
    let frac = format!("{frac:018}");
    format!("{whole}.{}", frac.trim_end_matches('0'))
}
