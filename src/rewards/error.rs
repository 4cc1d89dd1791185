// src/rewards/error.rs
use thiserror::Error;

use crate::rpc::RpcError;
use crate::signing::ProviderError;

#[derive(Debug, Error)]
pub enum RewardsError {
    #[error("Wallet not connected")]
    WalletNotConnected,
    #[error("Invalid {0} amount")]
    InvalidAmount(String),
    #[error("{0}")]
    TransactionBuildFailed(String),
    #[error("Solana wallet provider not found")]
    ProviderUnavailable,
    #[error("Transaction confirmation failed: {0}")]
    ConfirmationFailed(String),
    #[error("Another reward action is already in flight")]
    ActionInProgress,
    #[error("{0}")]
    StateFetchFailed(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Rpc(RpcError),
    #[error("Failed to decode transaction: {0}")]
    TransactionDecode(String),
    #[error("{0}")]
    InvalidMint(String),
    #[error("Invalid staking view field: {0}")]
    InvalidView(String),
    #[error("Failed to decode account: {0}")]
    AccountDecode(String),
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl From<RpcError> for RewardsError {
    fn from(e: RpcError) -> Self {
        match e {
            RpcError::TransactionFailed { .. } | RpcError::Timeout(_) => {
                RewardsError::ConfirmationFailed(e.to_string())
            }
            other => RewardsError::Rpc(other),
        }
    }
}
