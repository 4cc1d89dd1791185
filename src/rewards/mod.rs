// src/rewards/mod.rs
//! CLOUT staking rewards: server-built transactions, wallet signing and
//! confirmation, plus read-side helpers for the on-chain program.

pub mod accounts;
pub mod api;
pub mod client;
pub mod error;
pub mod pda;
pub mod types;

pub use api::{RewardsApi, RewardsBackend};
pub use client::RewardsClient;
pub use error::RewardsError;
pub use pda::StakingAddresses;
pub use types::{
    ActionStatus, RewardAction, RewardsSnapshot, StakePositionView, StakingPoolView, StakingState,
};
