pub mod eth;

pub use eth::EthClient;
pub use eth::errors::{EthClientError, RpcRequestError};
