// src/rewards/pda.rs
//! Address derivation for the clout_staking program

use solana_sdk::pubkey::Pubkey;

pub const POOL_SEED: &[u8] = b"pool";
pub const POOL_VAULT_SEED: &[u8] = b"pool-vault";
pub const POOL_SIGNER_SEED: &[u8] = b"pool-signer";
pub const POSITION_SEED: &[u8] = b"position";

/// Owner's associated token account for `mint` (classic SPL Token program)
pub fn associated_token_address(owner: &Pubkey, mint: &Pubkey) -> Pubkey {
    spl_associated_token_account::get_associated_token_address(owner, mint)
}

pub fn find_pool(program_id: &Pubkey, clout_mint: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[POOL_SEED, clout_mint.as_ref()], program_id)
}

pub fn find_pool_vault(program_id: &Pubkey, clout_mint: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[POOL_VAULT_SEED, clout_mint.as_ref()], program_id)
}

pub fn find_pool_signer(program_id: &Pubkey, clout_mint: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[POOL_SIGNER_SEED, clout_mint.as_ref()], program_id)
}

pub fn find_position(program_id: &Pubkey, pool: &Pubkey, owner: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[POSITION_SEED, pool.as_ref(), owner.as_ref()], program_id)
}

/// Every address the staking flow touches for one mint (and optionally one owner)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StakingAddresses {
    pub pool: Pubkey,
    pub pool_vault: Pubkey,
    pub pool_signer: Pubkey,
    pub position: Option<Pubkey>,
}

impl StakingAddresses {
    pub fn derive(program_id: &Pubkey, clout_mint: &Pubkey, owner: Option<&Pubkey>) -> Self {
        let (pool, _) = find_pool(program_id, clout_mint);
        let (pool_vault, _) = find_pool_vault(program_id, clout_mint);
        let (pool_signer, _) = find_pool_signer(program_id, clout_mint);
        let position = owner.map(|owner| find_position(program_id, &pool, owner).0);

        Self {
            pool,
            pool_vault,
            pool_signer,
            position,
        }
    }
}
