//! Deterministic deployment through the CREATE2 singleton factory.
//!
//! `connect_or_deploy` is the workhorse: it checks whether the contract is
//! already there, bootstraps the factory if the chain lacks it, and only
//! then spends gas. Deployment transactions race against other users of the
//! signing account, so submission goes through a bounded nonce retry.

use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use stamp_rpc::signer::Signer;
use stamp_rpc::types::{BlockIdentifier, BlockTag, LegacyTransaction, RpcReceipt, TransactionRequest};
use tracing::{debug, info};

use crate::client::ChainClient;
use crate::error::DeployError;
use crate::identity::ContractIdentity;
use crate::registry::{DeploymentRegistry, KEYLESS_FACTORY_ADDRESS};
use crate::retry::run_with_retries;
use crate::viewer::{DeployedContract, DeploymentViewer};

/// Nonce races resolve within a block or two; three rounds is plenty.
const MAX_DEPLOY_ATTEMPTS: u32 = 3;

/// Plain value transfer, used to top up the bootstrap signer.
const FUNDING_GAS_LIMIT: u64 = 21_000;

/// Deploys contracts to their deterministic addresses, paying with the
/// configured signer. All reads go through the embedded
/// [`DeploymentViewer`].
#[derive(Debug)]
pub struct Deployer<C> {
    viewer: DeploymentViewer<C>,
    signer: Signer,
    chain_id: u64,
    registry: DeploymentRegistry,
}

impl<C: ChainClient> Deployer<C> {
    /// Binds the deployer to the chain the client is talking to. The
    /// factory address comes from the registry entry for that chain when
    /// one exists; the keyless factory address is used otherwise so that
    /// address calculation works even on chains the registry doesn't know,
    /// where only bootstrapping is refused.
    pub async fn connect(
        client: C,
        signer: Signer,
        registry: DeploymentRegistry,
    ) -> Result<Self, DeployError> {
        let chain_id = client.chain_id().await?;
        let factory_address = registry
            .get(chain_id)
            .map(|descriptor| descriptor.factory_address)
            .unwrap_or(KEYLESS_FACTORY_ADDRESS);
        Ok(Deployer {
            viewer: DeploymentViewer::new(client, factory_address),
            signer,
            chain_id,
            registry,
        })
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn signer_address(&self) -> Address {
        self.signer.address()
    }

    pub fn viewer(&self) -> &DeploymentViewer<C> {
        &self.viewer
    }

    pub fn calculate_address(&self, identity: &ContractIdentity, salt: H256) -> Address {
        self.viewer.calculate_address(identity, salt)
    }

    /// Returns a handle to the contract, deploying it first if necessary.
    ///
    /// The happy path when the contract already exists costs one
    /// `eth_getCode` and sends nothing. Otherwise the factory is
    /// bootstrapped if absent, the signer's balance is checked against the
    /// estimated cost up front, and the deployment transaction is submitted
    /// with a bounded retry against nonce races. The resulting code is
    /// verified at the inclusion block before the handle is returned.
    pub async fn connect_or_deploy(
        &self,
        identity: &ContractIdentity,
        salt: H256,
    ) -> Result<DeployedContract, DeployError> {
        let address = self.viewer.calculate_address(identity, salt);
        if self
            .viewer
            .has_code(address, BlockIdentifier::Tag(BlockTag::Latest))
            .await?
        {
            info!(contract = %identity.name, %address, "already deployed, skipping");
            return Ok(DeployedContract::new(identity.name.clone(), address));
        }

        self.ensure_factory().await?;

        // The factory ABI is the calldata itself: 32 salt bytes followed by
        // the init code, no selector.
        let mut calldata = Vec::with_capacity(32 + identity.init_code().len());
        calldata.extend_from_slice(salt.as_bytes());
        calldata.extend_from_slice(&identity.init_code());
        let calldata = Bytes::from(calldata);

        let signer_address = self.signer.address();
        let factory = self.viewer.factory_address;
        let gas_limit = self
            .viewer
            .client
            .estimate_gas(&TransactionRequest {
                from: signer_address,
                to: Some(factory),
                value: U256::zero(),
                data: calldata.clone(),
            })
            .await?;
        let gas_price = self.viewer.client.gas_price().await?;
        let required = gas_price * gas_limit;
        let available = self.viewer.client.get_balance(signer_address).await?;
        if available < required {
            return Err(DeployError::InsufficientFunds {
                required,
                available,
                signer: signer_address,
            });
        }

        info!(
            contract = %identity.name,
            %address,
            gas_limit,
            cost = %crate::error::format_ether(&required),
            "deploying"
        );
        let receipt = run_with_retries(
            MAX_DEPLOY_ATTEMPTS,
            DeployError::is_nonce_race,
            |attempt| self.send_deploy_attempt(factory, gas_limit, gas_price, &calldata, required, attempt),
        )
        .await?;

        // The factory swallows inner CREATE2 reverts, so a successful
        // receipt alone proves nothing. Read the code back at the inclusion
        // block.
        if !self
            .viewer
            .has_code(address, BlockIdentifier::Number(receipt.block_number))
            .await?
        {
            return Err(DeployError::DeploymentVerification {
                address,
                tx_hash: receipt.tx_hash,
                block_number: receipt.block_number,
            });
        }

        info!(contract = %identity.name, %address, tx_hash = %receipt.tx_hash, "deployed");
        Ok(DeployedContract::new(identity.name.clone(), address))
    }

    /// Makes sure the singleton factory exists, deploying it via the
    /// pre-signed bootstrap transaction when it doesn't.
    async fn ensure_factory(&self) -> Result<(), DeployError> {
        let factory = self.viewer.factory_address;
        if self
            .viewer
            .has_code(factory, BlockIdentifier::Tag(BlockTag::Latest))
            .await?
        {
            return Ok(());
        }

        let descriptor = self
            .registry
            .get(self.chain_id)
            .ok_or(DeployError::UnsupportedChain {
                chain_id: self.chain_id,
            })?
            .clone();

        // Only cover the deficit: the bootstrap signer may hold leftover
        // funds from an earlier interrupted run.
        let funding = descriptor.funding_required();
        let balance = self
            .viewer
            .client
            .get_balance(descriptor.signer_address)
            .await?;
        if balance < funding {
            self.fund(descriptor.signer_address, funding - balance)
                .await?;
        }

        info!(%factory, "bootstrapping singleton factory");
        let tx_hash = self
            .viewer
            .client
            .send_raw_transaction(&descriptor.raw_transaction)
            .await?;
        let receipt = self.viewer.client.wait_for_receipt(tx_hash).await?;
        let deployed = receipt.status
            && self
                .viewer
                .has_code(factory, BlockIdentifier::Number(receipt.block_number))
                .await?;
        if !deployed {
            return Err(DeployError::BootstrapFailed { factory });
        }
        info!(%factory, %tx_hash, "singleton factory bootstrapped");
        Ok(())
    }

    /// Sends `amount` wei to the bootstrap signer.
    async fn fund(&self, recipient: Address, amount: U256) -> Result<(), DeployError> {
        let signer_address = self.signer.address();
        let gas_price = self.viewer.client.gas_price().await?;
        let required = amount + gas_price * FUNDING_GAS_LIMIT;
        let available = self.viewer.client.get_balance(signer_address).await?;
        if available < required {
            return Err(DeployError::InsufficientFunds {
                required,
                available,
                signer: signer_address,
            });
        }

        debug!(%recipient, amount = %crate::error::format_ether(&amount), "funding bootstrap signer");
        let nonce = self.viewer.client.get_nonce(signer_address).await?;
        let tx = LegacyTransaction {
            nonce,
            gas_price,
            gas_limit: FUNDING_GAS_LIMIT,
            to: Some(recipient),
            value: amount,
            data: Bytes::new(),
        };
        let raw = self.signer.sign_transaction(&tx, self.chain_id)?;
        let tx_hash = self.viewer.client.send_raw_transaction(&raw).await?;
        let receipt = self.viewer.client.wait_for_receipt(tx_hash).await?;
        if !receipt.status {
            return Err(DeployError::TransactionFailed(tx_hash));
        }
        Ok(())
    }

    /// One submission round: refetch the pending nonce, sign, broadcast and
    /// wait for inclusion. Insufficient-funds rejections are mapped here so
    /// they bypass the nonce-race retry.
    async fn send_deploy_attempt(
        &self,
        factory: Address,
        gas_limit: u64,
        gas_price: U256,
        calldata: &Bytes,
        required: U256,
        attempt: u32,
    ) -> Result<RpcReceipt, DeployError> {
        let signer_address = self.signer.address();
        let nonce = self.viewer.client.get_nonce(signer_address).await?;
        let tx = LegacyTransaction {
            nonce,
            gas_price,
            gas_limit,
            to: Some(factory),
            value: U256::zero(),
            data: calldata.clone(),
        };
        let raw = self.signer.sign_transaction(&tx, self.chain_id)?;

        debug!(attempt, nonce, "broadcasting deployment transaction");
        let tx_hash = match self.viewer.client.send_raw_transaction(&raw).await {
            Ok(hash) => hash,
            Err(error) if error.is_insufficient_funds() => {
                let available = self.viewer.client.get_balance(signer_address).await?;
                return Err(DeployError::InsufficientFunds {
                    required,
                    available,
                    signer: signer_address,
                });
            }
            Err(error) => return Err(error.into()),
        };

        let receipt = self.viewer.client.wait_for_receipt(tx_hash).await?;
        if !receipt.status {
            return Err(DeployError::TransactionFailed(tx_hash));
        }
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use hex_literal::hex;
    use secp256k1::SecretKey;
    use stamp_rpc::signer::LocalSigner;
    use stamp_rpc::{EthClientError, RpcRequestError};

    use crate::registry::{BootstrapDescriptor, KEYLESS_SIGNER_ADDRESS};

    /// What a successful broadcast does to the fake chain.
    #[derive(Debug, Clone)]
    enum Effect {
        Nothing,
        SetCode(Address, &'static [u8]),
    }

    #[derive(Debug)]
    struct SendOutcome {
        result: Result<Effect, EthClientError>,
        receipt_status: bool,
    }

    impl SendOutcome {
        fn ok(effect: Effect) -> Self {
            SendOutcome {
                result: Ok(effect),
                receipt_status: true,
            }
        }

        fn rejected(message: &str) -> Self {
            SendOutcome {
                result: Err(EthClientError::RpcRequestError(RpcRequestError {
                    code: -32000,
                    message: message.to_owned(),
                })),
                receipt_status: true,
            }
        }

        fn reverted(effect: Effect) -> Self {
            SendOutcome {
                result: Ok(effect),
                receipt_status: false,
            }
        }
    }

    #[derive(Debug, Default)]
    struct MockState {
        chain_id: u64,
        code: HashMap<Address, Bytes>,
        balances: HashMap<Address, U256>,
        nonce: u64,
        block_number: u64,
        outcomes: VecDeque<SendOutcome>,
        sends: u64,
        receipt_statuses: VecDeque<bool>,
    }

    /// Shared-state fake chain. Broadcast outcomes are scripted per test;
    /// an empty queue means plain success with no side effect.
    #[derive(Debug, Clone, Default)]
    struct MockChain {
        state: Arc<Mutex<MockState>>,
    }

    impl MockChain {
        fn new(chain_id: u64) -> Self {
            let chain = MockChain::default();
            chain.state.lock().unwrap().chain_id = chain_id;
            chain
        }

        fn set_code(&self, address: Address, code: &'static [u8]) {
            self.state
                .lock()
                .unwrap()
                .code
                .insert(address, Bytes::from_static(code));
        }

        fn set_balance(&self, address: Address, balance: U256) {
            self.state.lock().unwrap().balances.insert(address, balance);
        }

        fn script(&self, outcome: SendOutcome) {
            self.state.lock().unwrap().outcomes.push_back(outcome);
        }

        fn sends(&self) -> u64 {
            self.state.lock().unwrap().sends
        }
    }

    #[async_trait]
    impl ChainClient for MockChain {
        async fn chain_id(&self) -> Result<u64, EthClientError> {
            Ok(self.state.lock().unwrap().chain_id)
        }

        async fn get_code(
            &self,
            address: Address,
            _block: BlockIdentifier,
        ) -> Result<Bytes, EthClientError> {
            Ok(self
                .state
                .lock()
                .unwrap()
                .code
                .get(&address)
                .cloned()
                .unwrap_or_default())
        }

        async fn get_balance(&self, address: Address) -> Result<U256, EthClientError> {
            Ok(self
                .state
                .lock()
                .unwrap()
                .balances
                .get(&address)
                .copied()
                .unwrap_or_default())
        }

        async fn get_nonce(&self, _address: Address) -> Result<u64, EthClientError> {
            Ok(self.state.lock().unwrap().nonce)
        }

        async fn gas_price(&self) -> Result<U256, EthClientError> {
            Ok(U256::from(1_000_000_000u64)) // 1 gwei
        }

        async fn estimate_gas(
            &self,
            _request: &TransactionRequest,
        ) -> Result<u64, EthClientError> {
            Ok(100_000)
        }

        async fn send_raw_transaction(&self, _raw: &[u8]) -> Result<H256, EthClientError> {
            let mut state = self.state.lock().unwrap();
            state.sends += 1;
            let outcome = state
                .outcomes
                .pop_front()
                .unwrap_or_else(|| SendOutcome::ok(Effect::Nothing));
            match outcome.result {
                Ok(effect) => {
                    if let Effect::SetCode(address, code) = effect {
                        state.code.insert(address, Bytes::from_static(code));
                    }
                    state.nonce += 1;
                    state.receipt_statuses.push_back(outcome.receipt_status);
                    Ok(H256::from_low_u64_be(state.sends))
                }
                Err(error) => Err(error),
            }
        }

        async fn wait_for_receipt(&self, tx_hash: H256) -> Result<RpcReceipt, EthClientError> {
            let mut state = self.state.lock().unwrap();
            state.block_number += 1;
            let status = state.receipt_statuses.pop_front().unwrap_or(true);
            Ok(RpcReceipt {
                tx_hash,
                block_number: state.block_number,
                status,
                gas_used: 50_000,
                contract_address: None,
            })
        }
    }

    const COUNTER_CODE: &[u8] = &hex!("6080604052");
    const FACTORY_RUNTIME: &[u8] = &hex!("60003681823780368234f58015156014578182fd5b80825250506014600cf3");

    fn test_signer() -> Signer {
        let mut key = [0u8; 32];
        key[31] = 1;
        LocalSigner::new(SecretKey::from_slice(&key).unwrap()).into()
    }

    fn counter() -> ContractIdentity {
        ContractIdentity::new("Counter", COUNTER_CODE.to_vec())
    }

    fn salt() -> H256 {
        H256::from_low_u64_be(42)
    }

    fn one_ether() -> U256 {
        U256::exp10(18)
    }

    async fn deployer_on(chain: &MockChain, registry: DeploymentRegistry) -> Deployer<MockChain> {
        Deployer::connect(chain.clone(), test_signer(), registry)
            .await
            .unwrap()
    }

    /// Chain 31337 with the factory already in place and a funded signer.
    async fn ready_chain() -> (MockChain, Deployer<MockChain>) {
        let chain = MockChain::new(31337);
        chain.set_code(KEYLESS_FACTORY_ADDRESS, FACTORY_RUNTIME);
        chain.set_balance(test_signer().address(), one_ether());
        let deployer = deployer_on(&chain, DeploymentRegistry::standard()).await;
        (chain, deployer)
    }

    #[tokio::test]
    async fn existing_contract_sends_nothing() {
        let (chain, deployer) = ready_chain().await;
        let address = deployer.calculate_address(&counter(), salt());
        chain.set_code(address, COUNTER_CODE);

        let contract = deployer.connect_or_deploy(&counter(), salt()).await.unwrap();
        assert_eq!(contract.address, address);
        assert_eq!(contract.name, "Counter");
        assert_eq!(chain.sends(), 0);
    }

    #[tokio::test]
    async fn unknown_chain_is_refused_before_spending() {
        let chain = MockChain::new(424242);
        chain.set_balance(test_signer().address(), one_ether());
        let deployer = deployer_on(&chain, DeploymentRegistry::standard()).await;

        let error = deployer
            .connect_or_deploy(&counter(), salt())
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            DeployError::UnsupportedChain { chain_id: 424242 }
        ));
        assert_eq!(chain.sends(), 0);
    }

    #[tokio::test]
    async fn bootstraps_the_factory_when_absent() {
        let chain = MockChain::new(31337);
        chain.set_balance(test_signer().address(), one_ether());
        let target = {
            let deployer = deployer_on(&chain, DeploymentRegistry::standard()).await;
            deployer.calculate_address(&counter(), salt())
        };
        // funding transfer, bootstrap, deployment
        chain.script(SendOutcome::ok(Effect::Nothing));
        chain.script(SendOutcome::ok(Effect::SetCode(
            KEYLESS_FACTORY_ADDRESS,
            FACTORY_RUNTIME,
        )));
        chain.script(SendOutcome::ok(Effect::SetCode(target, COUNTER_CODE)));

        let deployer = deployer_on(&chain, DeploymentRegistry::standard()).await;
        let contract = deployer.connect_or_deploy(&counter(), salt()).await.unwrap();
        assert_eq!(contract.address, target);
        assert_eq!(chain.sends(), 3);
    }

    #[tokio::test]
    async fn skips_funding_when_bootstrap_signer_already_holds_enough() {
        let chain = MockChain::new(31337);
        chain.set_balance(test_signer().address(), one_ether());
        chain.set_balance(
            KEYLESS_SIGNER_ADDRESS,
            BootstrapDescriptor::keyless().funding_required(),
        );
        let target = {
            let deployer = deployer_on(&chain, DeploymentRegistry::standard()).await;
            deployer.calculate_address(&counter(), salt())
        };
        // bootstrap, deployment; no funding transfer
        chain.script(SendOutcome::ok(Effect::SetCode(
            KEYLESS_FACTORY_ADDRESS,
            FACTORY_RUNTIME,
        )));
        chain.script(SendOutcome::ok(Effect::SetCode(target, COUNTER_CODE)));

        let deployer = deployer_on(&chain, DeploymentRegistry::standard()).await;
        deployer.connect_or_deploy(&counter(), salt()).await.unwrap();
        assert_eq!(chain.sends(), 2);
    }

    #[tokio::test]
    async fn failed_bootstrap_is_reported() {
        let chain = MockChain::new(31337);
        chain.set_balance(test_signer().address(), one_ether());
        // funding succeeds, bootstrap lands but leaves no code
        chain.script(SendOutcome::ok(Effect::Nothing));
        chain.script(SendOutcome::ok(Effect::Nothing));

        let deployer = deployer_on(&chain, DeploymentRegistry::standard()).await;
        let error = deployer
            .connect_or_deploy(&counter(), salt())
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            DeployError::BootstrapFailed { factory } if factory == KEYLESS_FACTORY_ADDRESS
        ));
    }

    #[tokio::test]
    async fn nonce_races_are_retried_within_the_bound() {
        let (chain, deployer) = ready_chain().await;
        let target = deployer.calculate_address(&counter(), salt());
        chain.script(SendOutcome::rejected("nonce too low"));
        chain.script(SendOutcome::rejected("already known"));
        chain.script(SendOutcome::ok(Effect::SetCode(target, COUNTER_CODE)));

        let contract = deployer.connect_or_deploy(&counter(), salt()).await.unwrap();
        assert_eq!(contract.address, target);
        assert_eq!(chain.sends(), 3);
    }

    #[tokio::test]
    async fn persistent_nonce_race_surfaces_after_three_attempts() {
        let (chain, deployer) = ready_chain().await;
        for _ in 0..4 {
            chain.script(SendOutcome::rejected("nonce too low"));
        }

        let error = deployer
            .connect_or_deploy(&counter(), salt())
            .await
            .unwrap_err();
        assert!(error.is_nonce_race());
        assert_eq!(chain.sends(), 3);
    }

    #[tokio::test]
    async fn underfunded_signer_fails_before_sending() {
        let chain = MockChain::new(31337);
        chain.set_code(KEYLESS_FACTORY_ADDRESS, FACTORY_RUNTIME);
        // 100k gas at 1 gwei needs 1e14 wei; give half that
        chain.set_balance(test_signer().address(), U256::from(50_000_000_000_000u64));

        let deployer = deployer_on(&chain, DeploymentRegistry::standard()).await;
        let error = deployer
            .connect_or_deploy(&counter(), salt())
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            DeployError::InsufficientFunds { required, available, .. }
                if required == U256::from(100_000_000_000_000u64)
                    && available == U256::from(50_000_000_000_000u64)
        ));
        assert_eq!(chain.sends(), 0);
    }

    #[tokio::test]
    async fn insufficient_funds_rejection_is_not_retried() {
        let (chain, deployer) = ready_chain().await;
        chain.script(SendOutcome::rejected(
            "insufficient funds for gas * price + value",
        ));

        let error = deployer
            .connect_or_deploy(&counter(), salt())
            .await
            .unwrap_err();
        assert!(matches!(error, DeployError::InsufficientFunds { .. }));
        assert_eq!(chain.sends(), 1);
    }

    #[tokio::test]
    async fn reverted_deployment_transaction_fails() {
        let (chain, deployer) = ready_chain().await;
        chain.script(SendOutcome::reverted(Effect::Nothing));

        let error = deployer
            .connect_or_deploy(&counter(), salt())
            .await
            .unwrap_err();
        assert!(matches!(error, DeployError::TransactionFailed(_)));
        assert_eq!(chain.sends(), 1);
    }

    #[tokio::test]
    async fn missing_code_after_inclusion_is_a_verification_error() {
        let (chain, deployer) = ready_chain().await;
        // send succeeds but the inner CREATE2 silently reverted
        chain.script(SendOutcome::ok(Effect::Nothing));

        let error = deployer
            .connect_or_deploy(&counter(), salt())
            .await
            .unwrap_err();
        assert!(matches!(error, DeployError::DeploymentVerification { .. }));
        assert_eq!(chain.sends(), 1);
    }
}
