// src/signing/mod.rs
use async_trait::async_trait;
use solana_sdk::{pubkey::Pubkey, signature::Signature, transaction::Transaction};
use thiserror::Error;

pub mod software;

pub use software::SoftwareProvider;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{0} wallet is not connected")]
    NotConnected(String),
    #[error("User rejected the request")]
    Rejected,
    #[error("Signing failed: {0}")]
    Signing(String),
    #[error("Failed to send transaction: {0}")]
    Send(String),
    #[error("{0} does not support signAndSendTransaction")]
    Unsupported(String),
}

/// Wallet capability the rewards flow signs through.
///
/// Stands in for the injected browser provider: anything that can report a
/// public key and sign-and-submit a transaction.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Display name of the wallet (Phantom, Solflare, ...)
    fn name(&self) -> String;

    /// Public key if the provider is currently connected
    fn public_key(&self) -> Option<Pubkey>;

    /// Whether `sign_and_send_transaction` is usable
    fn supports_sign_and_send(&self) -> bool {
        true
    }

    async fn connect(&self) -> Result<Pubkey, ProviderError>;

    async fn disconnect(&self) -> Result<(), ProviderError>;

    /// Sign with the wallet key and submit; returns the transaction signature
    async fn sign_and_send_transaction(
        &self,
        transaction: Transaction,
    ) -> Result<Signature, ProviderError>;
}
