// src/rpc.rs
//! Minimal Solana JSON-RPC client used by the rewards flow

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use solana_sdk::{pubkey::Pubkey, signature::Signature, transaction::Transaction};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

use crate::config::{DEFAULT_CONFIRM_POLL_MS, DEFAULT_CONFIRM_TIMEOUT_SECS};

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("Failed to send request: {0}")]
    Http(#[from] reqwest::Error),
    #[error("RPC error: {0}")]
    Rpc(String),
    #[error("Failed to parse response: {0}")]
    Decode(String),
    #[error("Transaction {signature} failed: {reason}")]
    TransactionFailed { signature: String, reason: String },
    #[error("Transaction {0} was not confirmed before the timeout")]
    Timeout(String),
}

/// Solana confirmation depth
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Commitment {
    Processed,
    Confirmed,
    Finalized,
}

impl Commitment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Commitment::Processed => "processed",
            Commitment::Confirmed => "confirmed",
            Commitment::Finalized => "finalized",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "processed" => Some(Commitment::Processed),
            "confirmed" => Some(Commitment::Confirmed),
            "finalized" => Some(Commitment::Finalized),
            _ => None,
        }
    }
}

/// Entry of a `getSignatureStatuses` response
#[derive(Debug, Clone, Deserialize)]
pub struct SignatureStatus {
    pub slot: u64,
    #[serde(default)]
    pub confirmations: Option<u64>,
    #[serde(default)]
    pub err: Option<Value>,
    #[serde(rename = "confirmationStatus", default)]
    pub confirmation_status: Option<String>,
}

/// Outcome of inspecting a signature status against a target commitment
#[derive(Debug, Clone, PartialEq)]
pub enum StatusCheck {
    Pending,
    Reached,
    Failed(String),
}

pub fn evaluate_status(status: Option<&SignatureStatus>, target: Commitment) -> StatusCheck {
    let Some(status) = status else {
        return StatusCheck::Pending;
    };
    if let Some(err) = &status.err {
        if !err.is_null() {
            return StatusCheck::Failed(err.to_string());
        }
    }
    match status.confirmation_status.as_deref().and_then(Commitment::parse) {
        Some(level) if level >= target => StatusCheck::Reached,
        Some(_) => StatusCheck::Pending,
        // Older nodes omit confirmationStatus; a null confirmations count means rooted.
        None if status.confirmations.is_none() => StatusCheck::Reached,
        None => StatusCheck::Pending,
    }
}

/// Waits for a submitted signature to reach a commitment level
#[async_trait]
pub trait SignatureConfirmer: Send + Sync {
    async fn confirm_transaction(
        &self,
        signature: &Signature,
        commitment: Commitment,
    ) -> Result<(), RpcError>;
}

pub struct RpcClient {
    client: Client,
    rpc_url: String,
    confirm_timeout: Duration,
    poll_interval: Duration,
}

impl RpcClient {
    pub fn new(rpc_url: &str) -> Self {
        Self {
            client: Client::new(),
            rpc_url: rpc_url.to_string(),
            confirm_timeout: Duration::from_secs(DEFAULT_CONFIRM_TIMEOUT_SECS),
            poll_interval: Duration::from_millis(DEFAULT_CONFIRM_POLL_MS),
        }
    }

    pub fn with_confirm_policy(mut self, timeout: Duration, poll_interval: Duration) -> Self {
        self.confirm_timeout = timeout;
        self.poll_interval = poll_interval;
        self
    }

    pub fn url(&self) -> &str {
        &self.rpc_url
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response = self.client.post(&self.rpc_url).json(&request).send().await?;

        if !response.status().is_success() {
            return Err(RpcError::Rpc(format!("{} returned {}", method, response.status())));
        }

        let json: Value = response.json().await?;
        log::debug!("{} response: {:?}", method, json);

        if let Some(error) = json.get("error") {
            return Err(RpcError::Rpc(error.to_string()));
        }

        json.get("result")
            .cloned()
            .ok_or_else(|| RpcError::Decode(format!("missing result in {:?}", json)))
    }

    /// Submit a fully signed transaction
    pub async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature, RpcError> {
        let serialized =
            bincode::serialize(transaction).map_err(|e| RpcError::Decode(e.to_string()))?;
        let encoded = STANDARD.encode(serialized);

        let result = self
            .call(
                "sendTransaction",
                json!([
                    encoded,
                    {
                        "encoding": "base64",
                        "skipPreflight": false,
                        "preflightCommitment": Commitment::Confirmed.as_str()
                    }
                ]),
            )
            .await?;

        let signature = result
            .as_str()
            .ok_or_else(|| RpcError::Decode(format!("unexpected sendTransaction result {:?}", result)))?;
        Signature::from_str(signature).map_err(|e| RpcError::Decode(e.to_string()))
    }

    /// Fetch the status of a single signature
    pub async fn get_signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<SignatureStatus>, RpcError> {
        let result = self
            .call("getSignatureStatuses", json!([[signature.to_string()]]))
            .await?;

        let entry = result["value"].get(0).cloned().unwrap_or(Value::Null);
        if entry.is_null() {
            return Ok(None);
        }
        serde_json::from_value(entry)
            .map(Some)
            .map_err(|e| RpcError::Decode(e.to_string()))
    }

    /// Raw account data, or `None` when the account does not exist
    pub async fn get_account_data(&self, pubkey: &Pubkey) -> Result<Option<Vec<u8>>, RpcError> {
        let result = self
            .call(
                "getAccountInfo",
                json!([pubkey.to_string(), { "encoding": "base64", "commitment": "confirmed" }]),
            )
            .await?;

        if result["value"].is_null() {
            return Ok(None);
        }
        let data = result["value"]["data"][0]
            .as_str()
            .ok_or_else(|| RpcError::Decode(format!("no account data for {}", pubkey)))?;
        STANDARD
            .decode(data)
            .map(Some)
            .map_err(|e| RpcError::Decode(e.to_string()))
    }
}

#[async_trait]
impl SignatureConfirmer for RpcClient {
    async fn confirm_transaction(
        &self,
        signature: &Signature,
        commitment: Commitment,
    ) -> Result<(), RpcError> {
        let deadline = Instant::now() + self.confirm_timeout;

        loop {
            let status = self.get_signature_status(signature).await?;
            match evaluate_status(status.as_ref(), commitment) {
                StatusCheck::Reached => {
                    log::info!("{} reached {}", signature, commitment.as_str());
                    return Ok(());
                }
                StatusCheck::Failed(reason) => {
                    return Err(RpcError::TransactionFailed {
                        signature: signature.to_string(),
                        reason,
                    });
                }
                StatusCheck::Pending => {}
            }

            if Instant::now() >= deadline {
                return Err(RpcError::Timeout(signature.to_string()));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
