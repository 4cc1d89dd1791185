// src/rewards/api.rs
//! HTTP client for the NFTSol transaction-building endpoints

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::Serialize;
use serde_json::Value;
use solana_sdk::pubkey::Pubkey;

use crate::rewards::error::RewardsError;
use crate::rewards::types::{
    HarvestRequest, RewardAction, StakeRequest, StakingState, TransactionResponse, UnstakeRequest,
};

type Result<T> = std::result::Result<T, RewardsError>;

/// Server side of the rewards flow: state reads and unsigned transaction builds
#[async_trait]
pub trait RewardsBackend: Send + Sync {
    async fn fetch_state(&self, clout_mint: &Pubkey, owner: &Pubkey) -> Result<StakingState>;

    async fn build_stake(&self, request: &StakeRequest) -> Result<TransactionResponse>;

    async fn build_unstake(&self, request: &UnstakeRequest) -> Result<TransactionResponse>;

    async fn build_harvest(&self, request: &HarvestRequest) -> Result<TransactionResponse>;
}

/// Pull the server's `error` field out of a failed response body
pub fn error_message_from_body(body: &str, fallback: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|json| json.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| fallback.to_string())
}

pub struct RewardsApi {
    http_client: HttpClient,
    base_url: String,
    auth_token: Option<String>,
}

impl RewardsApi {
    pub fn new(base_url: &str, auth_token: Option<String>) -> Self {
        Self {
            http_client: HttpClient::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn with_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn post_transaction<B: Serialize + Sync>(
        &self,
        action: RewardAction,
        body: &B,
    ) -> Result<TransactionResponse> {
        let request = self.http_client.post(self.url(&action.endpoint())).json(body);
        let response = self.with_auth(request).send().await?;
        let status = response.status();

        if !status.is_success() {
            // A body that fails to read counts as "no error field"
            let text = response.text().await.unwrap_or_default();
            let message = error_message_from_body(&text, &action.build_fallback());
            log::warn!("{} build failed ({}): {}", action, status, message);
            return Err(RewardsError::TransactionBuildFailed(message));
        }

        let payload: TransactionResponse = response.json().await?;
        log::debug!(
            "{} transaction built ({} base64 chars, partial signers {:?})",
            action,
            payload.transaction.len(),
            payload.partial_signers
        );
        Ok(payload)
    }
}

#[async_trait]
impl RewardsBackend for RewardsApi {
    async fn fetch_state(&self, clout_mint: &Pubkey, owner: &Pubkey) -> Result<StakingState> {
        let url = self.url(&format!("/api/solana/rewards/staking/{}", clout_mint));
        let request = self
            .http_client
            .get(url)
            .query(&[("owner", owner.to_string())]);
        let response = self.with_auth(request).send().await?;

        if !response.status().is_success() {
            return Err(RewardsError::StateFetchFailed(format!(
                "Failed to fetch staking state ({})",
                response.status().as_u16()
            )));
        }

        Ok(response.json().await?)
    }

    async fn build_stake(&self, request: &StakeRequest) -> Result<TransactionResponse> {
        self.post_transaction(RewardAction::Stake, request).await
    }

    async fn build_unstake(&self, request: &UnstakeRequest) -> Result<TransactionResponse> {
        self.post_transaction(RewardAction::Unstake, request).await
    }

    async fn build_harvest(&self, request: &HarvestRequest) -> Result<TransactionResponse> {
        self.post_transaction(RewardAction::Harvest, request).await
    }
}
