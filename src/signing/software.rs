// src/signing/software.rs
use async_trait::async_trait;
use solana_sdk::{pubkey::Pubkey, signature::Signature, transaction::Transaction};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::rpc::RpcClient;
use crate::signing::{ProviderError, WalletProvider};
use crate::wallet::Wallet;

/// Keypair-backed provider that signs locally and submits over RPC
pub struct SoftwareProvider {
    wallet: Wallet,
    rpc: Arc<RpcClient>,
    connected: AtomicBool,
}

impl SoftwareProvider {
    pub fn new(wallet: Wallet, rpc: Arc<RpcClient>) -> Self {
        Self {
            wallet,
            rpc,
            connected: AtomicBool::new(false),
        }
    }
}

/// Sign the message with `wallet`, placing the signature in the wallet's signer slot.
/// Signatures already present in other slots are preserved.
pub fn sign_transaction(wallet: &Wallet, mut transaction: Transaction) -> Result<Transaction, ProviderError> {
    let owner = wallet.pubkey();
    let required = transaction.message.header.num_required_signatures as usize;

    let slot = transaction
        .message
        .account_keys
        .iter()
        .take(required)
        .position(|key| *key == owner)
        .ok_or_else(|| {
            ProviderError::Signing(format!("{} is not a required signer of this transaction", owner))
        })?;

    if transaction.signatures.len() != required {
        transaction.signatures.resize(required, Signature::default());
    }

    let message_bytes = transaction.message.serialize();
    let signature_bytes = wallet.sign_message(&message_bytes).to_bytes();
    transaction.signatures[slot] = Signature::from(signature_bytes);

    Ok(transaction)
}

#[async_trait]
impl WalletProvider for SoftwareProvider {
    fn name(&self) -> String {
        format!("Software Wallet: {}", self.wallet.name)
    }

    fn public_key(&self) -> Option<Pubkey> {
        self.connected
            .load(Ordering::SeqCst)
            .then(|| self.wallet.pubkey())
    }

    async fn connect(&self) -> Result<Pubkey, ProviderError> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(self.wallet.pubkey())
    }

    async fn disconnect(&self) -> Result<(), ProviderError> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn sign_and_send_transaction(
        &self,
        transaction: Transaction,
    ) -> Result<Signature, ProviderError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(ProviderError::NotConnected(self.name()));
        }

        let signed = sign_transaction(&self.wallet, transaction)?;
        log::info!("Submitting transaction via {}", self.rpc.url());
        self.rpc
            .send_transaction(&signed)
            .await
            .map_err(|e| ProviderError::Send(e.to_string()))
    }
}
