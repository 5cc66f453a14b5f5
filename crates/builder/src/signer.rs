//! Signers of smart account owners
//!
//! The pipeline only depends on the [`AccountSigner`] capability trait. [`LocalSigner`] keeps an
//! ethers wallet in memory; custody backends plug in by implementing the trait.

use crate::error::SignerError;
use async_trait::async_trait;
use ethers::{
    prelude::{k256::ecdsa::SigningKey, rand},
    signers::{coins_bip39::English, LocalWallet, MnemonicBuilder, Signer},
    types::{Address, Bytes, H256},
    utils::hex,
};
use expanded_pathbuf::ExpandedPathBuf;
use std::{fmt::Debug, fs};
use strum_macros::Display;
use tokio::sync::watch;
use tracing::debug;

/// Connection state of a signer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum SignerStatus {
    Connecting,
    Authenticating,
    Connected,
    Disconnected,
}

/// Signing capability of an account owner
#[async_trait]
pub trait AccountSigner: Send + Sync + Debug {
    /// Address of the owner
    fn address(&self) -> Address;

    /// Signs the 32-byte hash as is (no message prefix)
    async fn sign_hash(&self, hash: H256) -> Result<Bytes, SignerError>;

    /// Signs the message as an EIP-191 personal message
    async fn sign_message(&self, message: &[u8]) -> Result<Bytes, SignerError>;

    /// Makes sure the signer is ready to sign, returns the owner address
    async fn authenticate(&self) -> Result<Address, SignerError>;

    /// Exports the key material (mnemonic phrase or private key)
    async fn export_wallet(&self) -> Result<String, SignerError>;

    /// Status updates, the current status is observed immediately
    fn status(&self) -> watch::Receiver<SignerStatus>;
}

/// In-memory signer backed by an ethers wallet
#[derive(Debug)]
pub struct LocalSigner {
    wallet: LocalWallet,
    phrase: Option<String>,
    status: watch::Sender<SignerStatus>,
}

fn wallet_error(err: impl ToString) -> SignerError {
    SignerError::Wallet { inner: err.to_string() }
}

fn derivation_path(index: u32) -> String {
    format!("m/44'/60'/0'/0/{index}")
}

impl LocalSigner {
    pub fn new(wallet: LocalWallet) -> Self {
        let (status, _) = watch::channel(SignerStatus::Connected);
        Self { wallet, phrase: None, status }
    }

    /// Signer with a randomly generated key
    pub fn random() -> Self {
        Self::new(LocalWallet::new(&mut rand::thread_rng()))
    }

    /// Signer derived from the mnemonic phrase (`m/44'/60'/0'/0/{index}`)
    pub fn from_phrase(phrase: &str, index: u32) -> Result<Self, SignerError> {
        let wallet = MnemonicBuilder::<English>::default()
            .phrase(phrase)
            .derivation_path(&derivation_path(index))
            .map_err(wallet_error)?
            .build()
            .map_err(wallet_error)?;
        Ok(Self { phrase: Some(phrase.to_string()), ..Self::new(wallet) })
    }

    /// Signer derived from the mnemonic phrase stored in the file
    pub fn from_file(path: ExpandedPathBuf, index: u32) -> Result<Self, SignerError> {
        let phrase = fs::read_to_string(path.to_path_buf()).map_err(wallet_error)?;
        Self::from_phrase(phrase.trim(), index)
    }

    /// Generates a new mnemonic, writes it into the directory and derives the first key
    pub fn build_random(path: ExpandedPathBuf) -> Result<Self, SignerError> {
        fs::create_dir_all(&path).map_err(wallet_error)?;

        let wallet = MnemonicBuilder::<English>::default()
            .write_to(path.to_path_buf())
            .derivation_path(&derivation_path(0))
            .map_err(wallet_error)?
            .build_random(&mut rand::thread_rng())
            .map_err(wallet_error)?;
        debug!("Mnemonic of {:?} written to {path:?}", wallet.address());
        Ok(Self::new(wallet))
    }

    pub fn signing_key(&self) -> &SigningKey {
        self.wallet.signer()
    }

    /// Marks the signer as disconnected (it refuses to sign until authenticated again)
    pub fn disconnect(&self) {
        self.status.send_replace(SignerStatus::Disconnected);
    }

    fn ensure_connected(&self) -> Result<(), SignerError> {
        match *self.status.borrow() {
            SignerStatus::Connected => Ok(()),
            _ => Err(SignerError::Disconnected),
        }
    }
}

#[async_trait]
impl AccountSigner for LocalSigner {
    fn address(&self) -> Address {
        self.wallet.address()
    }

    async fn sign_hash(&self, hash: H256) -> Result<Bytes, SignerError> {
        self.ensure_connected()?;
        let signature = self.wallet.sign_hash(hash).map_err(wallet_error)?;
        Ok(signature.to_vec().into())
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Bytes, SignerError> {
        self.ensure_connected()?;
        let signature = self.wallet.sign_message(message).await.map_err(wallet_error)?;
        Ok(signature.to_vec().into())
    }

    async fn authenticate(&self) -> Result<Address, SignerError> {
        self.status.send_replace(SignerStatus::Authenticating);
        self.status.send_replace(SignerStatus::Connected);
        Ok(self.address())
    }

    async fn export_wallet(&self) -> Result<String, SignerError> {
        Ok(match &self.phrase {
            Some(phrase) => phrase.clone(),
            None => format!("0x{}", hex::encode(self.wallet.signer().to_bytes())),
        })
    }

    fn status(&self) -> watch::Receiver<SignerStatus> {
        self.status.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::{types::Signature, utils::hash_message};

    const PHRASE: &str = "test test test test test test test test test test test junk";

    #[tokio::test]
    async fn derives_from_phrase() {
        let signer = LocalSigner::from_phrase(PHRASE, 0).unwrap();
        assert_eq!(
            signer.address(),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266".parse::<Address>().unwrap()
        );
        assert_eq!(signer.export_wallet().await.unwrap(), PHRASE);

        let second = LocalSigner::from_phrase(PHRASE, 1).unwrap();
        assert_eq!(
            second.address(),
            "0x70997970C51812dc3A010C7d01b50e0d17dc79C8".parse::<Address>().unwrap()
        );
    }

    #[tokio::test]
    async fn signatures_recover_to_owner() {
        let signer = LocalSigner::random();
        let hash = H256::random();

        let raw = Signature::try_from(signer.sign_hash(hash).await.unwrap().as_ref()).unwrap();
        assert_eq!(raw.recover(hash).unwrap(), signer.address());

        let personal = signer.sign_message(b"hello").await.unwrap();
        let personal = Signature::try_from(personal.as_ref()).unwrap();
        assert_eq!(personal.recover(hash_message(b"hello")).unwrap(), signer.address());
    }

    #[tokio::test]
    async fn status_updates() {
        let signer = LocalSigner::random();
        let mut status = signer.status();
        assert_eq!(*status.borrow(), SignerStatus::Connected);

        signer.disconnect();
        status.changed().await.unwrap();
        assert_eq!(*status.borrow(), SignerStatus::Disconnected);
        // late subscribers observe the current status
        assert_eq!(*signer.status().borrow(), SignerStatus::Disconnected);
        assert_eq!(signer.sign_hash(H256::zero()).await, Err(SignerError::Disconnected));

        signer.authenticate().await.unwrap();
        assert_eq!(*signer.status().borrow(), SignerStatus::Connected);
        assert!(signer.export_wallet().await.unwrap().starts_with("0x"));
    }
}
