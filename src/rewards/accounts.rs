// src/rewards/accounts.rs
//! On-chain account layouts of the clout_staking program and the
//! reward accrual math it applies on every interaction.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_sdk::hash::hashv;
use solana_sdk::pubkey::Pubkey;

use crate::rewards::error::RewardsError;
use crate::rewards::types::{StakePositionView, StakingPoolView};

/// Fixed-point scale of `reward_per_token_stored`
pub const REWARD_SCALE: u128 = 1_000_000_000;

const DISCRIMINATOR_LEN: usize = 8;

/// Anchor account discriminator: first 8 bytes of sha256("account:<Name>")
pub fn account_discriminator(name: &str) -> [u8; 8] {
    let hash = hashv(&[format!("account:{}", name).as_bytes()]);
    let mut out = [0u8; 8];
    out.copy_from_slice(&hash.to_bytes()[..DISCRIMINATOR_LEN]);
    out
}

fn decode_anchor<T: BorshDeserialize>(name: &str, data: &[u8]) -> Result<T, RewardsError> {
    if data.len() < DISCRIMINATOR_LEN {
        return Err(RewardsError::AccountDecode(format!("{} data too short", name)));
    }
    if data[..DISCRIMINATOR_LEN] != account_discriminator(name) {
        return Err(RewardsError::AccountDecode(format!("not a {} account", name)));
    }
    let mut body = &data[DISCRIMINATOR_LEN..];
    T::deserialize(&mut body).map_err(|e| RewardsError::AccountDecode(format!("{}: {}", name, e)))
}

#[derive(Clone, Debug, BorshSerialize, BorshDeserialize, PartialEq, Eq)]
pub struct StakingPoolAccount {
    pub bump: u8,
    pub vault_bump: u8,
    pub signer_bump: u8,
    pub authority: Pubkey,
    pub reward_vault: Pubkey,
    pub reward_mint: Pubkey,
    pub clout_mint: Pubkey,
    pub reward_rate: u64,
    pub total_staked: u64,
    pub reward_per_token_stored: u128,
    pub last_update_ts: i64,
}

impl StakingPoolAccount {
    pub const NAME: &'static str = "StakingPool";

    /// Deserialize from account data (checks the 8-byte discriminator)
    pub fn from_account_data(data: &[u8]) -> Result<Self, RewardsError> {
        decode_anchor(Self::NAME, data)
    }

    /// Advance the reward accumulator to `now`
    pub fn accrue(&mut self, now: i64) -> Result<(), RewardsError> {
        if now <= self.last_update_ts {
            return Ok(());
        }
        if self.total_staked == 0 || self.reward_rate == 0 {
            self.last_update_ts = now;
            return Ok(());
        }

        let elapsed = now.checked_sub(self.last_update_ts).ok_or_else(overflow)? as u128;
        let increment = elapsed
            .checked_mul(self.reward_rate as u128)
            .and_then(|v| v.checked_mul(REWARD_SCALE))
            .and_then(|v| v.checked_div(self.total_staked as u128))
            .ok_or_else(overflow)?;
        self.reward_per_token_stored = self
            .reward_per_token_stored
            .checked_add(increment)
            .ok_or_else(overflow)?;
        self.last_update_ts = now;
        Ok(())
    }
}

#[derive(Clone, Debug, BorshSerialize, BorshDeserialize, PartialEq, Eq)]
pub struct StakePositionAccount {
    pub bump: u8,
    pub owner: Pubkey,
    pub pool: Pubkey,
    pub amount: u64,
    pub reward_per_token_paid: u128,
    pub pending_rewards: u64,
    pub last_stake_ts: i64,
}

impl StakePositionAccount {
    pub const NAME: &'static str = "StakePosition";

    pub fn from_account_data(data: &[u8]) -> Result<Self, RewardsError> {
        decode_anchor(Self::NAME, data)
    }

    /// Settle rewards earned since the last checkpoint against `pool`
    pub fn accrue(&mut self, pool: &StakingPoolAccount) -> Result<(), RewardsError> {
        if self.amount == 0 || pool.reward_per_token_stored < self.reward_per_token_paid {
            self.reward_per_token_paid = pool.reward_per_token_stored;
            return Ok(());
        }

        let delta = pool.reward_per_token_stored - self.reward_per_token_paid;
        if delta == 0 {
            return Ok(());
        }

        let accrued = (self.amount as u128)
            .checked_mul(delta)
            .map(|v| v / REWARD_SCALE)
            .ok_or_else(overflow)?;
        if accrued > 0 {
            let pending = (self.pending_rewards as u128)
                .checked_add(accrued)
                .ok_or_else(overflow)?;
            self.pending_rewards = u64::try_from(pending).map_err(|_| overflow())?;
        }
        self.reward_per_token_paid = pool.reward_per_token_stored;
        Ok(())
    }
}

fn overflow() -> RewardsError {
    RewardsError::AccountDecode("reward math overflow".to_string())
}

/// Pending rewards the position would hold if the pool were touched at `now`
pub fn project_pending_rewards(
    pool: &StakingPoolAccount,
    position: &StakePositionAccount,
    now: i64,
) -> Result<u64, RewardsError> {
    let mut pool = pool.clone();
    let mut position = position.clone();
    pool.accrue(now)?;
    position.accrue(&pool)?;
    Ok(position.pending_rewards)
}

/// Same projection, starting from the string views the API returns
pub fn project_pending_from_views(
    pool: &StakingPoolView,
    position: &StakePositionView,
    now: i64,
) -> Result<u64, RewardsError> {
    let pool = StakingPoolAccount {
        bump: 0,
        vault_bump: 0,
        signer_bump: 0,
        authority: Pubkey::default(),
        reward_vault: Pubkey::default(),
        reward_mint: Pubkey::default(),
        clout_mint: Pubkey::default(),
        reward_rate: pool.reward_rate()?,
        total_staked: pool.total_staked()?,
        reward_per_token_stored: pool.reward_per_token_stored()?,
        last_update_ts: pool.last_update_ts()?,
    };
    let position = StakePositionAccount {
        bump: 0,
        owner: Pubkey::default(),
        pool: Pubkey::default(),
        amount: position.amount()?,
        reward_per_token_paid: position.reward_per_token_paid()?,
        pending_rewards: position.pending_rewards()?,
        last_stake_ts: position.last_stake_ts()?,
    };
    project_pending_rewards(&pool, &position, now)
}

impl From<&StakingPoolAccount> for StakingPoolView {
    fn from(pool: &StakingPoolAccount) -> Self {
        Self {
            authority: pool.authority.to_string(),
            reward_vault: pool.reward_vault.to_string(),
            reward_mint: pool.reward_mint.to_string(),
            clout_mint: pool.clout_mint.to_string(),
            reward_rate: pool.reward_rate.to_string(),
            total_staked: pool.total_staked.to_string(),
            reward_per_token_stored: pool.reward_per_token_stored.to_string(),
            last_update_ts: pool.last_update_ts.to_string(),
        }
    }
}

impl From<&StakePositionAccount> for StakePositionView {
    fn from(position: &StakePositionAccount) -> Self {
        Self {
            owner: position.owner.to_string(),
            pool: position.pool.to_string(),
            amount: position.amount.to_string(),
            reward_per_token_paid: position.reward_per_token_paid.to_string(),
            pending_rewards: position.pending_rewards.to_string(),
            last_stake_ts: position.last_stake_ts.to_string(),
        }
    }
}
