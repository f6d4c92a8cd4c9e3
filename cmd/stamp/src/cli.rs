use bytes::Bytes;
use clap::{Parser, Subcommand};
use ethereum_types::{Address, H256};
use hex::FromHexError;
use stamp_rpc::EthClient;
use stamp_sdk::{
    ContractIdentity, Deployer, DeploymentRegistry, DeploymentViewer, calculate_create2_address,
    to_checksum,
};
use tracing::Level;
use url::Url;

use crate::keys::SignerOpts;

#[derive(Parser)]
#[command(
    name = "stamp",
    version,
    about = "Deterministic contract deployment via the CREATE2 singleton factory"
)]
pub struct CLI {
    #[command(flatten)]
    pub opts: Options,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Parser)]
pub struct Options {
    #[arg(
        long = "rpc-url",
        value_name = "RPC_URL",
        env = "STAMP_RPC_URL",
        default_value = "http://localhost:8545",
        help_heading = "Node options"
    )]
    pub rpc_url: Url,
    #[arg(
        long,
        default_value = "10",
        value_name = "UINT64",
        env = "STAMP_MAX_NUMBER_OF_RETRIES",
        help_heading = "Node options"
    )]
    pub max_number_of_retries: u64,
    #[arg(
        long,
        default_value = "2",
        value_name = "UINT64",
        env = "STAMP_BACKOFF_FACTOR",
        help_heading = "Node options"
    )]
    pub backoff_factor: u64,
    #[arg(
        long,
        default_value = "96",
        value_name = "MILLIS",
        env = "STAMP_MIN_RETRY_DELAY",
        help_heading = "Node options"
    )]
    pub min_retry_delay: u64,
    #[arg(
        long,
        default_value = "1800",
        value_name = "MILLIS",
        env = "STAMP_MAX_RETRY_DELAY",
        help_heading = "Node options"
    )]
    pub max_retry_delay: u64,
    #[arg(long, default_value = "info", value_name = "LEVEL", env = "STAMP_LOG_LEVEL")]
    pub log_level: Level,
}

impl Options {
    fn client(&self) -> eyre::Result<EthClient> {
        Ok(EthClient::new_with_config(
            vec![self.rpc_url.clone()],
            self.max_number_of_retries,
            self.backoff_factor,
            self.min_retry_delay,
            self.max_retry_delay,
        )?)
    }
}

/// The contract being addressed, shared by every subcommand.
#[derive(Parser)]
pub struct ContractOpts {
    #[arg(
        long,
        value_name = "NAME",
        default_value = "Contract",
        help_heading = "Contract options"
    )]
    pub name: String,
    #[arg(
        long,
        value_name = "HEX",
        value_parser = parse_hex,
        help_heading = "Contract options",
        help = "Creation bytecode of the contract."
    )]
    pub bytecode: Bytes,
    #[arg(
        long = "constructor-args",
        value_name = "HEX",
        value_parser = parse_hex,
        default_value = "0x",
        help_heading = "Contract options",
        help = "ABI-encoded constructor arguments, appended to the bytecode."
    )]
    pub constructor_args: Bytes,
    #[arg(
        long,
        value_name = "HEX32",
        value_parser = parse_salt,
        default_value = "0",
        help_heading = "Contract options",
        help = "32-byte salt; shorter values are left-padded with zeros."
    )]
    pub salt: H256,
    #[arg(
        long,
        value_name = "ADDRESS",
        value_parser = parse_address,
        default_value = "0x4e59b44847b379578588920ca78fbf26c0b4956c",
        help_heading = "Contract options",
        help = "CREATE2 factory the address is derived from."
    )]
    pub factory: Address,
}

impl ContractOpts {
    fn identity(&self) -> ContractIdentity {
        ContractIdentity::new(self.name.clone(), self.bytecode.clone())
            .with_constructor_args(self.constructor_args.clone())
    }
}

#[derive(Subcommand)]
pub enum Command {
    #[command(about = "Print the deterministic address, without touching any node.")]
    Address {
        #[command(flatten)]
        contract: ContractOpts,
    },
    #[command(about = "Check whether the contract exists at its deterministic address.")]
    Check {
        #[command(flatten)]
        contract: ContractOpts,
    },
    #[command(about = "Deploy the contract unless it is already there.")]
    Deploy {
        #[command(flatten)]
        contract: ContractOpts,
        #[command(flatten)]
        signer: SignerOpts,
    },
}

impl Command {
    pub async fn run(self, opts: &Options) -> eyre::Result<()> {
        match self {
            Command::Address { contract } => {
                let address = calculate_create2_address(
                    contract.factory,
                    contract.salt,
                    &contract.identity().init_code(),
                );
                println!("{}", to_checksum(address));
            }
            Command::Check { contract } => {
                let viewer = DeploymentViewer::new(opts.client()?, contract.factory);
                match viewer
                    .connect_if_deployed(&contract.identity(), contract.salt)
                    .await?
                {
                    Some(deployed) => {
                        println!("{} is deployed at {}", deployed.name, to_checksum(deployed.address));
                    }
                    None => {
                        let address = viewer.calculate_address(&contract.identity(), contract.salt);
                        println!(
                            "{} is not deployed (would live at {})",
                            contract.name,
                            to_checksum(address)
                        );
                        std::process::exit(1);
                    }
                }
            }
            Command::Deploy { contract, signer } => {
                let deployer = Deployer::connect(
                    opts.client()?,
                    signer.signer()?,
                    DeploymentRegistry::standard(),
                )
                .await?;
                let deployed = deployer
                    .connect_or_deploy(&contract.identity(), contract.salt)
                    .await?;
                println!("deployed {} to {}", deployed.name, to_checksum(deployed.address));
            }
        }
        Ok(())
    }
}

pub fn parse_hex(s: &str) -> eyre::Result<Bytes, FromHexError> {
    match s.strip_prefix("0x") {
        Some(s) => hex::decode(s).map(Into::into),
        None => hex::decode(s).map(Into::into),
    }
}

pub fn parse_address(s: &str) -> eyre::Result<Address> {
    let bytes = parse_hex(s)?;
    if bytes.len() != 20 {
        eyre::bail!("expected 20 bytes, got {}", bytes.len());
    }
    Ok(Address::from_slice(&bytes))
}

/// Up to 32 bytes of hex, left-padded with zeros.
pub fn parse_salt(s: &str) -> eyre::Result<H256> {
    let stripped = s.strip_prefix("0x").unwrap_or(s);
    let padded = if stripped.len() % 2 == 1 {
        format!("0{stripped}")
    } else {
        stripped.to_owned()
    };
    let bytes = hex::decode(&padded)?;
    if bytes.len() > 32 {
        eyre::bail!("salt is longer than 32 bytes");
    }
    let mut salt = [0u8; 32];
    salt[32 - bytes.len()..].copy_from_slice(&bytes);
    Ok(H256(salt))
}
