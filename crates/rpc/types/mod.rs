pub mod block_identifier;
pub mod receipt;
pub mod transaction;

pub use block_identifier::{BlockIdentifier, BlockTag};
pub use receipt::RpcReceipt;
pub use transaction::{LegacyTransaction, TransactionRequest};
