// src/rewards/types.rs
//! View models and wire types for CLOUT staking

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::fmt;
use std::str::FromStr;

use crate::rewards::error::RewardsError;

fn parse_field<T: FromStr>(name: &str, value: &str) -> Result<T, RewardsError> {
    value
        .parse::<T>()
        .map_err(|_| RewardsError::InvalidView(format!("{}={:?}", name, value)))
}

/// Snapshot of the on-chain staking pool, numbers kept as decimal strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StakingPoolView {
    pub authority: String,
    pub reward_vault: String,
    pub reward_mint: String,
    pub clout_mint: String,
    pub reward_rate: String,
    pub total_staked: String,
    pub reward_per_token_stored: String,
    pub last_update_ts: String,
}

impl StakingPoolView {
    pub fn reward_rate(&self) -> Result<u64, RewardsError> {
        parse_field("rewardRate", &self.reward_rate)
    }

    pub fn total_staked(&self) -> Result<u64, RewardsError> {
        parse_field("totalStaked", &self.total_staked)
    }

    pub fn reward_per_token_stored(&self) -> Result<u128, RewardsError> {
        parse_field("rewardPerTokenStored", &self.reward_per_token_stored)
    }

    pub fn last_update_ts(&self) -> Result<i64, RewardsError> {
        parse_field("lastUpdateTs", &self.last_update_ts)
    }

    pub fn reward_mint(&self) -> Result<Pubkey, RewardsError> {
        parse_field("rewardMint", &self.reward_mint)
    }
}

/// A wallet's stake in a pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StakePositionView {
    pub owner: String,
    pub pool: String,
    pub amount: String,
    pub reward_per_token_paid: String,
    pub pending_rewards: String,
    pub last_stake_ts: String,
}

impl StakePositionView {
    pub fn amount(&self) -> Result<u64, RewardsError> {
        parse_field("amount", &self.amount)
    }

    pub fn reward_per_token_paid(&self) -> Result<u128, RewardsError> {
        parse_field("rewardPerTokenPaid", &self.reward_per_token_paid)
    }

    pub fn pending_rewards(&self) -> Result<u64, RewardsError> {
        parse_field("pendingRewards", &self.pending_rewards)
    }

    pub fn last_stake_ts(&self) -> Result<i64, RewardsError> {
        parse_field("lastStakeTs", &self.last_stake_ts)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedAddressesView {
    pub pool: String,
    pub pool_vault: String,
    pub pool_signer: String,
    #[serde(default)]
    pub position: Option<String>,
}

/// Response of `GET /api/solana/rewards/staking/{mint}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakingState {
    pub pool: StakingPoolView,
    #[serde(default)]
    pub position: Option<StakePositionView>,
    #[serde(default)]
    pub derived: Option<DerivedAddressesView>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StakeRequest {
    pub clout_mint: String,
    pub staker: String,
    pub amount: String,
    pub staker_token_account: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnstakeRequest {
    pub clout_mint: String,
    pub staker: String,
    pub amount: String,
    pub destination_token_account: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HarvestRequest {
    pub clout_mint: String,
    pub staker: String,
}

/// Unsigned transaction returned by the builder endpoints
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    pub transaction: String,
    #[serde(default)]
    pub partial_signers: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewardAction {
    Stake,
    Unstake,
    Harvest,
}

impl RewardAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RewardAction::Stake => "stake",
            RewardAction::Unstake => "unstake",
            RewardAction::Harvest => "harvest",
        }
    }

    pub fn endpoint(&self) -> String {
        format!("/api/solana/rewards/staking/transactions/{}", self.as_str())
    }

    /// Message used when the server gives no error text
    pub fn build_fallback(&self) -> String {
        format!("Failed to build {} transaction", self.as_str())
    }

    pub fn notification_title(&self) -> &'static str {
        match self {
            RewardAction::Stake => "Stake submitted",
            RewardAction::Unstake => "Unstake submitted",
            RewardAction::Harvest => "Harvest submitted",
        }
    }
}

impl fmt::Display for RewardAction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress of the current reward action. Lives only in memory.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ActionStatus {
    #[default]
    Idle,
    Building(RewardAction),
    AwaitingSignature(RewardAction),
    Submitted { action: RewardAction, signature: String },
    Confirmed { action: RewardAction, signature: String },
    Failed { action: RewardAction, reason: String },
}

impl ActionStatus {
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            ActionStatus::Building(_) | ActionStatus::AwaitingSignature(_) | ActionStatus::Submitted { .. }
        )
    }
}

/// What a UI renders: latest views plus load status
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewardsSnapshot {
    pub pool: Option<StakingPoolView>,
    pub position: Option<StakePositionView>,
    pub loading: bool,
    pub error: Option<String>,
}
