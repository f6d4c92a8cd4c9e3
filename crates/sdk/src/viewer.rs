//! Read-only access to deterministically deployed contracts.

use ethereum_types::{Address, H256};
use stamp_rpc::types::{BlockIdentifier, BlockTag};

use crate::client::ChainClient;
use crate::create2::calculate_create2_address;
use crate::error::DeployError;
use crate::identity::ContractIdentity;

/// Handle to a contract at its deterministic address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployedContract {
    pub name: String,
    pub address: Address,
}

impl DeployedContract {
    pub(crate) fn new(name: impl Into<String>, address: Address) -> Self {
        DeployedContract {
            name: name.into(),
            address,
        }
    }
}

/// Read-only queries against one (client, factory) pair. No operation here
/// ever sends a transaction.
#[derive(Debug, Clone)]
pub struct DeploymentViewer<C> {
    pub(crate) client: C,
    pub(crate) factory_address: Address,
}

impl<C: ChainClient> DeploymentViewer<C> {
    pub fn new(client: C, factory_address: Address) -> Self {
        DeploymentViewer {
            client,
            factory_address,
        }
    }

    pub fn factory_address(&self) -> Address {
        self.factory_address
    }

    /// The address `identity` would land at, computed offline.
    pub fn calculate_address(&self, identity: &ContractIdentity, salt: H256) -> Address {
        calculate_create2_address(self.factory_address, salt, &identity.init_code())
    }

    /// One `eth_getCode` round-trip.
    pub async fn is_deployed(
        &self,
        identity: &ContractIdentity,
        salt: H256,
    ) -> Result<bool, DeployError> {
        let address = self.calculate_address(identity, salt);
        self.has_code(address, BlockIdentifier::Tag(BlockTag::Latest))
            .await
    }

    /// Handle without any chain read; the caller vouches the contract is
    /// there. Useful when existence was already checked in a batch.
    pub fn connect_assume(&self, identity: &ContractIdentity, salt: H256) -> DeployedContract {
        DeployedContract::new(identity.name.clone(), self.calculate_address(identity, salt))
    }

    /// `None` when nothing is deployed; never an error for that case.
    pub async fn connect_if_deployed(
        &self,
        identity: &ContractIdentity,
        salt: H256,
    ) -> Result<Option<DeployedContract>, DeployError> {
        if self.is_deployed(identity, salt).await? {
            Ok(Some(self.connect_assume(identity, salt)))
        } else {
            Ok(None)
        }
    }

    /// Like [`connect_if_deployed`], but the absent case is an error
    /// carrying the contract name and its computed address.
    ///
    /// [`connect_if_deployed`]: DeploymentViewer::connect_if_deployed
    pub async fn connect_or_err(
        &self,
        identity: &ContractIdentity,
        salt: H256,
    ) -> Result<DeployedContract, DeployError> {
        self.connect_if_deployed(identity, salt)
            .await?
            .ok_or_else(|| DeployError::NotDeployed {
                name: identity.name.clone(),
                address: self.calculate_address(identity, salt),
            })
    }

    pub(crate) async fn has_code(
        &self,
        address: Address,
        block: BlockIdentifier,
    ) -> Result<bool, DeployError> {
        let code = self.client.get_code(address, block).await?;
        Ok(!code.is_empty())
    }
}
