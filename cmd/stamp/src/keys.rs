use clap::Parser;
use coins_bip39::{English, Mnemonic};
use secp256k1::SecretKey;
use stamp_rpc::signer::{LocalSigner, Signer};

use crate::cli::parse_hex;

/// Standard Ethereum account path; the first account of every wallet.
const DERIVATION_PATH: &str = "m/44'/60'/0'/0/0";

#[derive(Parser)]
pub struct SignerOpts {
    #[arg(
        long,
        value_name = "PRIVATE_KEY",
        env = "STAMP_PRIVATE_KEY",
        value_parser = parse_private_key,
        conflicts_with = "mnemonic",
        help_heading = "Signer options",
        help = "Private key of a funded account that pays for the deployment."
    )]
    pub private_key: Option<SecretKey>,
    #[arg(
        long,
        value_name = "PHRASE",
        env = "STAMP_MNEMONIC",
        help_heading = "Signer options",
        help = "BIP-39 mnemonic; the key at m/44'/60'/0'/0/0 is used."
    )]
    pub mnemonic: Option<String>,
}

impl SignerOpts {
    pub fn signer(&self) -> eyre::Result<Signer> {
        let secret_key = match (&self.private_key, &self.mnemonic) {
            (Some(key), _) => *key,
            (None, Some(phrase)) => derive_from_mnemonic(phrase)?,
            (None, None) => eyre::bail!("either --private-key or --mnemonic is required"),
        };
        Ok(LocalSigner::new(secret_key).into())
    }
}

fn derive_from_mnemonic(phrase: &str) -> eyre::Result<SecretKey> {
    let mnemonic = Mnemonic::<English>::new_from_phrase(phrase)?;
    let derived = mnemonic.derive_key(DERIVATION_PATH, None)?;
    let signing_key: &k256::ecdsa::SigningKey = derived.as_ref();
    Ok(SecretKey::from_slice(&signing_key.to_bytes())?)
}

pub fn parse_private_key(s: &str) -> eyre::Result<SecretKey> {
    Ok(SecretKey::from_slice(&parse_hex(s)?)?)
}
