//! Deterministic contract deployment over a shared CREATE2 singleton
//! factory.
//!
//! The same (init code, salt) pair lands at the same address on every
//! chain, no matter which account pays for the deployment. The
//! [`Deployer`] takes care of bootstrapping the factory itself on chains
//! that don't have it yet, using a pre-signed keyless transaction.

pub mod client;
pub mod create2;
pub mod deployer;
pub mod error;
pub mod identity;
pub mod registry;
pub mod retry;
pub mod viewer;

pub use client::ChainClient;
pub use create2::{calculate_create2_address, to_checksum};
pub use deployer::Deployer;
pub use error::DeployError;
pub use identity::ContractIdentity;
pub use registry::{BootstrapDescriptor, DeploymentRegistry, KEYLESS_FACTORY_ADDRESS};
pub use viewer::{DeployedContract, DeploymentViewer};
