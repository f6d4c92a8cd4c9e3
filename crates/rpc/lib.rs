pub mod clients;
pub mod crypto;
pub mod signer;
pub mod types;

pub use clients::eth::EthClient;
pub use clients::eth::errors::{EthClientError, RpcRequestError};
