// src/config/mod.rs
//! Runtime configuration for the CLOUT rewards client

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use std::time::Duration;

/// Placeholder mint used when no CLOUT staking mint is configured
pub const DEFAULT_CLOUT_MINT: &str = "7CLOutToKen1111111111111111111111111111111";

/// Public devnet RPC endpoint
pub const DEFAULT_RPC_URL: &str = "https://api.devnet.solana.com";

/// Local NFTSol API server
pub const DEFAULT_API_URL: &str = "http://localhost:5000";

/// clout_staking program (devnet deployment)
pub const DEFAULT_STAKING_PROGRAM_ID: &str = "4mUWjVdfVWP9TT5wT9x2P2Uhd8NQgzWXXMGKM8xxmM9E";

pub const DEFAULT_CONFIRM_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_CONFIRM_POLL_MS: u64 = 500;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RewardsConfig {
    /// Base URL of the transaction-building API
    pub api_url: String,
    /// Solana JSON-RPC endpoint
    pub rpc_url: String,
    /// Mint of the staked CLOUT token (base58)
    pub clout_mint: String,
    /// clout_staking program id (base58)
    pub staking_program_id: String,
    /// Optional bearer token forwarded to the API
    pub auth_token: Option<String>,
    pub confirm_timeout_secs: u64,
    pub confirm_poll_ms: u64,
}

impl Default for RewardsConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            rpc_url: DEFAULT_RPC_URL.to_string(),
            clout_mint: DEFAULT_CLOUT_MINT.to_string(),
            staking_program_id: DEFAULT_STAKING_PROGRAM_ID.to_string(),
            auth_token: None,
            confirm_timeout_secs: DEFAULT_CONFIRM_TIMEOUT_SECS,
            confirm_poll_ms: DEFAULT_CONFIRM_POLL_MS,
        }
    }
}

impl RewardsConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        Self {
            api_url: get("NFTSOL_API_URL").unwrap_or(defaults.api_url),
            rpc_url: get("VITE_SOLANA_RPC_URL").unwrap_or(defaults.rpc_url),
            clout_mint: get("VITE_CLOUT_STAKING_MINT").unwrap_or(defaults.clout_mint),
            staking_program_id: get("NFTSOL_STAKING_PROGRAM_ID")
                .unwrap_or(defaults.staking_program_id),
            auth_token: get("NFTSOL_AUTH_TOKEN"),
            confirm_timeout_secs: get("NFTSOL_CONFIRM_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.confirm_timeout_secs),
            confirm_poll_ms: get("NFTSOL_CONFIRM_POLL_MS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.confirm_poll_ms),
        }
    }

    /// Parse the configured CLOUT mint
    pub fn clout_mint_pubkey(&self) -> Result<Pubkey, String> {
        Pubkey::from_str(&self.clout_mint)
            .map_err(|e| format!("Invalid CLOUT mint {}: {}", self.clout_mint, e))
    }

    /// Parse the configured staking program id
    pub fn staking_program_pubkey(&self) -> Result<Pubkey, String> {
        Pubkey::from_str(&self.staking_program_id)
            .map_err(|e| format!("Invalid staking program id {}: {}", self.staking_program_id, e))
    }

    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_secs(self.confirm_timeout_secs)
    }

    pub fn confirm_poll_interval(&self) -> Duration {
        Duration::from_millis(self.confirm_poll_ms.max(1))
    }
}
