// src/rewards/client.rs
//! CLOUT staking client: turns stake / unstake / harvest intents into
//! signed, submitted and confirmed transactions.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    message::Message,
    pubkey::Pubkey,
    signature::Signature,
    transaction::Transaction,
};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::RewardsConfig;
use crate::connector::WalletConnector;
use crate::notify::{truncate_signature, LogNotifier, Notification, Notifier};
use crate::rewards::accounts::{project_pending_from_views, StakePositionAccount, StakingPoolAccount};
use crate::rewards::api::{RewardsApi, RewardsBackend};
use crate::rewards::error::RewardsError;
use crate::rewards::pda::{associated_token_address, StakingAddresses};
use crate::rewards::types::{
    ActionStatus, HarvestRequest, RewardAction, RewardsSnapshot, StakeRequest, StakingState,
    TransactionResponse, UnstakeRequest,
};
use crate::rpc::{Commitment, RpcClient, SignatureConfirmer};

type Result<T> = std::result::Result<T, RewardsError>;

enum BuildRequest {
    Stake(StakeRequest),
    Unstake(UnstakeRequest),
    Harvest(HarvestRequest),
}

/// Validate a user-entered amount and floor it to whole base units
pub fn validate_amount(amount: f64, action: RewardAction) -> Result<u64> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(RewardsError::InvalidAmount(action.to_string()));
    }
    let floored = amount.floor();
    // u64::MAX as f64 rounds up to 2^64
    if floored < 1.0 || floored >= u64::MAX as f64 {
        return Err(RewardsError::InvalidAmount(action.to_string()));
    }
    Ok(floored as u64)
}

/// Decode the builder's base64 payload into a legacy transaction
pub fn decode_transaction(encoded: &str) -> Result<Transaction> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| RewardsError::TransactionDecode(e.to_string()))?;
    bincode::deserialize(&bytes).map_err(|e| RewardsError::TransactionDecode(e.to_string()))
}

fn decompile_instructions(message: &Message) -> Result<Vec<Instruction>> {
    let header = &message.header;
    let keys = &message.account_keys;
    let num_signed = header.num_required_signatures as usize;
    let writable_signed = num_signed.saturating_sub(header.num_readonly_signed_accounts as usize);
    let num_unsigned = keys.len().saturating_sub(num_signed);
    let writable_unsigned = num_unsigned.saturating_sub(header.num_readonly_unsigned_accounts as usize);

    let key_at = |index: u8| {
        keys.get(index as usize)
            .copied()
            .ok_or_else(|| RewardsError::TransactionDecode(format!("account index {} out of range", index)))
    };

    message
        .instructions
        .iter()
        .map(|compiled| {
            let program_id = key_at(compiled.program_id_index)?;
            let accounts = compiled
                .accounts
                .iter()
                .map(|&index| {
                    let pubkey = key_at(index)?;
                    let i = index as usize;
                    let is_signer = i < num_signed;
                    let is_writable = if is_signer {
                        i < writable_signed
                    } else {
                        i - num_signed < writable_unsigned
                    };
                    Ok(if is_writable {
                        AccountMeta::new(pubkey, is_signer)
                    } else {
                        AccountMeta::new_readonly(pubkey, is_signer)
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(Instruction {
                program_id,
                accounts,
                data: compiled.data.clone(),
            })
        })
        .collect()
}

/// Make `payer` the fee payer.
///
/// A transaction that already names `payer` first is returned untouched so
/// server partial signatures stay valid. Otherwise it is recompiled, which is
/// only possible while nothing has signed it yet.
pub fn assign_fee_payer(transaction: Transaction, payer: &Pubkey) -> Result<Transaction> {
    if transaction.message.account_keys.first() == Some(payer) {
        return Ok(transaction);
    }

    if transaction.signatures.iter().any(|s| *s != Signature::default()) {
        return Err(RewardsError::TransactionDecode(format!(
            "transaction is already signed with a fee payer other than {}",
            payer
        )));
    }

    let instructions = decompile_instructions(&transaction.message)?;
    let message = Message::new_with_blockhash(
        &instructions,
        Some(payer),
        &transaction.message.recent_blockhash,
    );
    Ok(Transaction::new_unsigned(message))
}

pub struct RewardsClient {
    clout_mint: Pubkey,
    staking_program: Pubkey,
    backend: Arc<dyn RewardsBackend>,
    connector: Arc<WalletConnector>,
    confirmer: Arc<dyn SignatureConfirmer>,
    notifier: Arc<dyn Notifier>,
    rpc: Arc<RpcClient>,
    snapshot: Mutex<RewardsSnapshot>,
    status: Mutex<ActionStatus>,
}

impl RewardsClient {
    /// Wire the HTTP backend, RPC confirmer and log notifier from config
    pub fn new(config: &RewardsConfig, connector: Arc<WalletConnector>) -> Result<Self> {
        let clout_mint = config.clout_mint_pubkey().map_err(RewardsError::InvalidMint)?;
        let staking_program = config
            .staking_program_pubkey()
            .map_err(RewardsError::InvalidMint)?;
        let rpc = Arc::new(
            RpcClient::new(&config.rpc_url)
                .with_confirm_policy(config.confirm_timeout(), config.confirm_poll_interval()),
        );

        Ok(Self {
            clout_mint,
            staking_program,
            backend: Arc::new(RewardsApi::new(&config.api_url, config.auth_token.clone())),
            connector,
            confirmer: rpc.clone(),
            notifier: Arc::new(LogNotifier),
            rpc,
            snapshot: Mutex::new(RewardsSnapshot::default()),
            status: Mutex::new(ActionStatus::Idle),
        })
    }

    pub fn with_backend(mut self, backend: Arc<dyn RewardsBackend>) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_confirmer(mut self, confirmer: Arc<dyn SignatureConfirmer>) -> Self {
        self.confirmer = confirmer;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn clout_mint(&self) -> &Pubkey {
        &self.clout_mint
    }

    pub fn connector(&self) -> &Arc<WalletConnector> {
        &self.connector
    }

    fn lock_snapshot(&self) -> MutexGuard<'_, RewardsSnapshot> {
        self.snapshot.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn lock_status(&self) -> MutexGuard<'_, ActionStatus> {
        self.status.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn snapshot(&self) -> RewardsSnapshot {
        self.lock_snapshot().clone()
    }

    pub fn action_status(&self) -> ActionStatus {
        self.lock_status().clone()
    }

    fn set_status(&self, status: ActionStatus) {
        log::debug!("reward action status: {:?}", status);
        *self.lock_status() = status;
    }

    fn owner(&self) -> Result<Pubkey> {
        self.connector
            .current_wallet()
            .map(|w| w.public_key)
            .ok_or(RewardsError::WalletNotConnected)
    }

    /// Pending rewards implied by the current snapshot at unix time `now`
    pub fn projected_pending_rewards(&self, now: i64) -> Option<Result<u64>> {
        let snapshot = self.snapshot();
        let pool = snapshot.pool?;
        let position = snapshot.position?;
        Some(project_pending_from_views(&pool, &position, now))
    }

    /// Fetch pool and position for the connected wallet
    pub async fn fetch_state(&self) -> Result<StakingState> {
        let owner = self.owner()?;
        self.backend.fetch_state(&self.clout_mint, &owner).await
    }

    /// Read pool and position straight from chain, bypassing the API
    pub async fn fetch_onchain_state(&self) -> Result<StakingState> {
        let owner = self.owner()?;
        let addresses = StakingAddresses::derive(&self.staking_program, &self.clout_mint, Some(&owner));

        let pool_data = self
            .rpc
            .get_account_data(&addresses.pool)
            .await?
            .ok_or_else(|| RewardsError::AccountDecode(format!("staking pool {} not found", addresses.pool)))?;
        let pool = StakingPoolAccount::from_account_data(&pool_data)?;

        let position = match addresses.position {
            Some(position_address) => match self.rpc.get_account_data(&position_address).await? {
                Some(data) => Some(StakePositionAccount::from_account_data(&data)?),
                None => None,
            },
            None => None,
        };

        Ok(StakingState {
            pool: (&pool).into(),
            position: position.as_ref().map(Into::into),
            derived: None,
        })
    }

    /// Reload pool and position into the snapshot. Failures are recorded, not returned.
    pub async fn refresh(&self) {
        let Ok(owner) = self.owner() else {
            let mut snapshot = self.lock_snapshot();
            snapshot.pool = None;
            snapshot.position = None;
            return;
        };

        {
            let mut snapshot = self.lock_snapshot();
            snapshot.loading = true;
            snapshot.error = None;
        }

        let result = self.backend.fetch_state(&self.clout_mint, &owner).await;

        let mut snapshot = self.lock_snapshot();
        match result {
            Ok(state) => {
                snapshot.pool = Some(state.pool);
                snapshot.position = state.position;
            }
            Err(e) => {
                log::warn!("staking state fetch failed: {}", e);
                snapshot.error = Some(e.to_string());
            }
        }
        snapshot.loading = false;
    }

    pub async fn request_stake(&self, amount: f64) -> Result<Signature> {
        let owner = self.owner()?;
        let raw_amount = validate_amount(amount, RewardAction::Stake)?;
        let token_account = associated_token_address(&owner, &self.clout_mint);

        let request = BuildRequest::Stake(StakeRequest {
            clout_mint: self.clout_mint.to_string(),
            staker: owner.to_string(),
            amount: raw_amount.to_string(),
            staker_token_account: token_account.to_string(),
        });
        self.run_action(RewardAction::Stake, owner, request).await
    }

    pub async fn request_unstake(&self, amount: f64) -> Result<Signature> {
        let owner = self.owner()?;
        let raw_amount = validate_amount(amount, RewardAction::Unstake)?;
        let token_account = associated_token_address(&owner, &self.clout_mint);

        let request = BuildRequest::Unstake(UnstakeRequest {
            clout_mint: self.clout_mint.to_string(),
            staker: owner.to_string(),
            amount: raw_amount.to_string(),
            destination_token_account: token_account.to_string(),
        });
        self.run_action(RewardAction::Unstake, owner, request).await
    }

    pub async fn request_harvest(&self) -> Result<Signature> {
        let owner = self.owner()?;

        let request = BuildRequest::Harvest(HarvestRequest {
            clout_mint: self.clout_mint.to_string(),
            staker: owner.to_string(),
        });
        self.run_action(RewardAction::Harvest, owner, request).await
    }

    async fn run_action(&self, action: RewardAction, owner: Pubkey, request: BuildRequest) -> Result<Signature> {
        {
            let mut status = self.lock_status();
            if status.is_in_flight() {
                return Err(RewardsError::ActionInProgress);
            }
            *status = ActionStatus::Building(action);
        }
        log::info!("{} requested by {}", action, owner);

        let result = self.execute(action, owner, &request).await;
        if let Err(e) = &result {
            log::warn!("{} failed: {}", action, e);
            self.set_status(ActionStatus::Failed {
                action,
                reason: e.to_string(),
            });
        }
        result
    }

    async fn build(&self, request: &BuildRequest) -> Result<TransactionResponse> {
        match request {
            BuildRequest::Stake(r) => self.backend.build_stake(r).await,
            BuildRequest::Unstake(r) => self.backend.build_unstake(r).await,
            BuildRequest::Harvest(r) => self.backend.build_harvest(r).await,
        }
    }

    async fn execute(&self, action: RewardAction, owner: Pubkey, request: &BuildRequest) -> Result<Signature> {
        let payload = self.build(request).await?;
        let transaction = assign_fee_payer(decode_transaction(&payload.transaction)?, &owner)?;

        let provider = self
            .connector
            .active_provider()
            .filter(|p| p.supports_sign_and_send())
            .ok_or(RewardsError::ProviderUnavailable)?;

        self.set_status(ActionStatus::AwaitingSignature(action));
        let signature = provider.sign_and_send_transaction(transaction).await?;
        let signature_str = signature.to_string();
        self.set_status(ActionStatus::Submitted {
            action,
            signature: signature_str.clone(),
        });

        self.confirmer
            .confirm_transaction(&signature, Commitment::Confirmed)
            .await
            .map_err(|e| RewardsError::ConfirmationFailed(e.to_string()))?;

        self.set_status(ActionStatus::Confirmed {
            action,
            signature: signature_str.clone(),
        });
        log::info!("{} confirmed: {}", action, signature_str);

        self.notifier.notify(Notification {
            title: action.notification_title().to_string(),
            description: format!("Signature {}", truncate_signature(&signature_str)),
        });

        self.refresh().await;
        Ok(signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::RpcError;
    use crate::signing::software::sign_transaction;
    use crate::signing::{ProviderError, WalletProvider};
    use crate::wallet::Wallet;
    use async_trait::async_trait;
    use serde_json::json;
    use solana_sdk::hash::Hash;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    fn unsigned_transaction(payer: &Pubkey, extra_signer: Option<&Pubkey>) -> Transaction {
        let mut accounts = vec![
            AccountMeta::new(*payer, true),
            AccountMeta::new(Pubkey::new_unique(), false),
            AccountMeta::new_readonly(Pubkey::new_unique(), false),
        ];
        if let Some(signer) = extra_signer {
            accounts.push(AccountMeta::new_readonly(*signer, true));
        }
        let ix = Instruction::new_with_bytes(Pubkey::new_unique(), &[1, 2, 3], accounts);
        let message = Message::new_with_blockhash(&[ix], Some(payer), &Hash::new_unique());
        Transaction::new_unsigned(message)
    }

    fn encode(transaction: &Transaction) -> String {
        STANDARD.encode(bincode::serialize(transaction).unwrap())
    }

    fn pool_state() -> StakingState {
        serde_json::from_value(json!({
            "pool": {
                "authority": "auth", "rewardVault": "vault", "rewardMint": "reward", "cloutMint": "clout",
                "rewardRate": "10", "totalStaked": "1000", "rewardPerTokenStored": "0", "lastUpdateTs": "100"
            },
            "position": {
                "owner": "me", "pool": "pool", "amount": "500", "rewardPerTokenPaid": "0",
                "pendingRewards": "0", "lastStakeTs": "90"
            }
        }))
        .unwrap()
    }

    #[derive(Default)]
    struct FakeBackend {
        transaction: String,
        build_error: Option<String>,
        fail_fetch: bool,
        gate: Option<(Arc<Notify>, Arc<Notify>)>,
        fetch_calls: AtomicUsize,
        build_calls: AtomicUsize,
        last_stake: Mutex<Option<StakeRequest>>,
        last_unstake: Mutex<Option<UnstakeRequest>>,
    }

    impl FakeBackend {
        async fn built(&self) -> Result<TransactionResponse> {
            self.build_calls.fetch_add(1, Ordering::SeqCst);
            if let Some((started, release)) = &self.gate {
                started.notify_one();
                release.notified().await;
            }
            match &self.build_error {
                Some(message) => Err(RewardsError::TransactionBuildFailed(message.clone())),
                None => Ok(TransactionResponse {
                    transaction: self.transaction.clone(),
                    partial_signers: Vec::new(),
                }),
            }
        }
    }

    #[async_trait]
    impl RewardsBackend for FakeBackend {
        async fn fetch_state(&self, _mint: &Pubkey, _owner: &Pubkey) -> Result<StakingState> {
            self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_fetch {
                return Err(RewardsError::StateFetchFailed("Failed to fetch staking state (500)".into()));
            }
            Ok(pool_state())
        }

        async fn build_stake(&self, request: &StakeRequest) -> Result<TransactionResponse> {
            *self.last_stake.lock().unwrap() = Some(request.clone());
            self.built().await
        }

        async fn build_unstake(&self, request: &UnstakeRequest) -> Result<TransactionResponse> {
            *self.last_unstake.lock().unwrap() = Some(request.clone());
            self.built().await
        }

        async fn build_harvest(&self, _request: &HarvestRequest) -> Result<TransactionResponse> {
            self.built().await
        }
    }

    /// Signs locally and "sends" by returning the payer signature
    struct FakeProvider {
        wallet: Wallet,
        can_send: bool,
        sent: AtomicUsize,
    }

    #[async_trait]
    impl WalletProvider for FakeProvider {
        fn name(&self) -> String {
            "Phantom".to_string()
        }

        fn public_key(&self) -> Option<Pubkey> {
            Some(self.wallet.pubkey())
        }

        fn supports_sign_and_send(&self) -> bool {
            self.can_send
        }

        async fn connect(&self) -> std::result::Result<Pubkey, ProviderError> {
            Ok(self.wallet.pubkey())
        }

        async fn disconnect(&self) -> std::result::Result<(), ProviderError> {
            Ok(())
        }

        async fn sign_and_send_transaction(
            &self,
            transaction: Transaction,
        ) -> std::result::Result<Signature, ProviderError> {
            self.sent.fetch_add(1, Ordering::SeqCst);
            let signed = sign_transaction(&self.wallet, transaction)?;
            Ok(signed.signatures[0])
        }
    }

    #[derive(Default)]
    struct FakeConfirmer {
        fail: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SignatureConfirmer for FakeConfirmer {
        async fn confirm_transaction(
            &self,
            signature: &Signature,
            _commitment: Commitment,
        ) -> std::result::Result<(), RpcError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(RpcError::TransactionFailed {
                    signature: signature.to_string(),
                    reason: "InstructionError".into(),
                });
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        seen: Mutex<Vec<Notification>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, notification: Notification) {
            self.seen.lock().unwrap().push(notification);
        }
    }

    struct Harness {
        client: RewardsClient,
        backend: Arc<FakeBackend>,
        provider: Arc<FakeProvider>,
        confirmer: Arc<FakeConfirmer>,
        notifier: Arc<RecordingNotifier>,
    }

    fn harness(configure: impl FnOnce(&Pubkey, &mut FakeBackend), can_send: bool, confirm_fails: bool) -> Harness {
        let wallet = Wallet::new("tester".to_string());
        let owner = wallet.pubkey();

        let mut backend = FakeBackend {
            transaction: encode(&unsigned_transaction(&owner, None)),
            ..FakeBackend::default()
        };
        configure(&owner, &mut backend);
        let backend = Arc::new(backend);

        let provider = Arc::new(FakeProvider {
            wallet,
            can_send,
            sent: AtomicUsize::new(0),
        });
        let confirmer = Arc::new(FakeConfirmer {
            fail: confirm_fails,
            ..FakeConfirmer::default()
        });
        let notifier = Arc::new(RecordingNotifier::default());

        let config = RewardsConfig {
            clout_mint: Pubkey::new_unique().to_string(),
            ..RewardsConfig::default()
        };
        let connector = Arc::new(WalletConnector::new(vec![provider.clone() as Arc<dyn WalletProvider>]));
        let client = RewardsClient::new(&config, connector)
            .unwrap()
            .with_backend(backend.clone())
            .with_confirmer(confirmer.clone())
            .with_notifier(notifier.clone());

        Harness {
            client,
            backend,
            provider,
            confirmer,
            notifier,
        }
    }

    fn default_harness() -> Harness {
        harness(|_, _| {}, true, false)
    }

    #[test]
    fn test_validate_amount() {
        assert_eq!(validate_amount(12.9, RewardAction::Stake).unwrap(), 12);
        assert_eq!(validate_amount(1.0, RewardAction::Stake).unwrap(), 1);
        for bad in [0.0, -3.0, f64::NAN, f64::INFINITY, f64::NEG_INFINITY, 0.5, 18446744073709551616.0, 1e30] {
            assert!(
                matches!(validate_amount(bad, RewardAction::Unstake), Err(RewardsError::InvalidAmount(_))),
                "{} should be rejected",
                bad
            );
        }
    }

    #[tokio::test]
    async fn test_invalid_amount_makes_no_calls() {
        let h = default_harness();
        h.client.connector().connect_wallet().await.unwrap();

        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(h.client.request_stake(bad).await, Err(RewardsError::InvalidAmount(_))));
            assert!(matches!(h.client.request_unstake(bad).await, Err(RewardsError::InvalidAmount(_))));
        }
        assert_eq!(h.backend.build_calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.backend.fetch_calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.client.action_status(), ActionStatus::Idle);
    }

    #[tokio::test]
    async fn test_wallet_not_connected() {
        let h = default_harness();

        assert!(matches!(h.client.request_stake(5.0).await, Err(RewardsError::WalletNotConnected)));
        assert!(matches!(h.client.request_unstake(5.0).await, Err(RewardsError::WalletNotConnected)));
        assert!(matches!(h.client.request_harvest().await, Err(RewardsError::WalletNotConnected)));
        assert_eq!(h.backend.build_calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.backend.fetch_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_successful_stake_refreshes_once() {
        let h = default_harness();
        let owner = h.client.connector().connect_wallet().await.unwrap().public_key;

        let signature = h.client.request_stake(12.9).await.unwrap();

        assert_eq!(h.backend.fetch_calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.confirmer.calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.provider.sent.load(Ordering::SeqCst), 1);

        let request = h.backend.last_stake.lock().unwrap().clone().unwrap();
        assert_eq!(request.amount, "12");
        assert_eq!(request.staker, owner.to_string());
        assert_eq!(
            request.staker_token_account,
            associated_token_address(&owner, h.client.clout_mint()).to_string()
        );

        let seen = h.notifier.seen.lock().unwrap().clone();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].title, "Stake submitted");
        assert_eq!(
            seen[0].description,
            format!("Signature {}", truncate_signature(&signature.to_string()))
        );

        assert_eq!(
            h.client.action_status(),
            ActionStatus::Confirmed {
                action: RewardAction::Stake,
                signature: signature.to_string()
            }
        );
        let snapshot = h.client.snapshot();
        assert_eq!(snapshot.pool.unwrap().total_staked, "1000");
        assert!(!snapshot.loading);
        assert_eq!(h.client.projected_pending_rewards(110).unwrap().unwrap(), 50);
    }

    #[tokio::test]
    async fn test_unstake_and_harvest_titles() {
        let h = default_harness();
        let owner = h.client.connector().connect_wallet().await.unwrap().public_key;

        h.client.request_unstake(3.0).await.unwrap();
        h.client.request_harvest().await.unwrap();

        let request = h.backend.last_unstake.lock().unwrap().clone().unwrap();
        assert_eq!(
            request.destination_token_account,
            associated_token_address(&owner, h.client.clout_mint()).to_string()
        );
        let titles: Vec<String> = h.notifier.seen.lock().unwrap().iter().map(|n| n.title.clone()).collect();
        assert_eq!(titles, vec!["Unstake submitted", "Harvest submitted"]);
        assert_eq!(h.backend.fetch_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_build_failure_surfaces_server_message() {
        let h = harness(|_, b| b.build_error = Some("Insufficient staked balance.".into()), true, false);
        h.client.connector().connect_wallet().await.unwrap();

        let err = h.client.request_unstake(10.0).await.unwrap_err();
        assert_eq!(err.to_string(), "Insufficient staked balance.");
        assert_eq!(h.provider.sent.load(Ordering::SeqCst), 0);
        assert_eq!(h.backend.fetch_calls.load(Ordering::SeqCst), 0);
        assert!(matches!(h.client.action_status(), ActionStatus::Failed { action: RewardAction::Unstake, .. }));
    }

    #[tokio::test]
    async fn test_provider_without_sign_and_send() {
        let h = harness(|_, _| {}, false, false);
        h.client.connector().connect_wallet().await.unwrap();

        let err = h.client.request_harvest().await.unwrap_err();
        assert!(matches!(err, RewardsError::ProviderUnavailable));
        assert_eq!(err.to_string(), "Solana wallet provider not found");
        assert_eq!(h.confirmer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_confirmation_failure_skips_refresh() {
        let h = harness(|_, _| {}, true, true);
        h.client.connector().connect_wallet().await.unwrap();

        let err = h.client.request_stake(1.0).await.unwrap_err();
        assert!(matches!(err, RewardsError::ConfirmationFailed(_)));
        assert_eq!(h.backend.fetch_calls.load(Ordering::SeqCst), 0);
        assert!(h.notifier.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_garbage_transaction_payload() {
        let h = harness(|_, b| b.transaction = "not base64 !!".into(), true, false);
        h.client.connector().connect_wallet().await.unwrap();

        assert!(matches!(
            h.client.request_stake(1.0).await,
            Err(RewardsError::TransactionDecode(_))
        ));
    }

    #[tokio::test]
    async fn test_overlapping_action_is_rejected() {
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let gate = (started.clone(), release.clone());
        let h = harness(move |_, b| b.gate = Some(gate), true, false);
        h.client.connector().connect_wallet().await.unwrap();

        let client = Arc::new(h.client);
        let first = {
            let client = client.clone();
            tokio::spawn(async move { client.request_stake(2.0).await })
        };
        started.notified().await;

        assert!(matches!(client.request_harvest().await, Err(RewardsError::ActionInProgress)));

        release.notify_one();
        assert!(first.await.unwrap().is_ok());
        assert_eq!(h.backend.build_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_refresh_records_errors_and_clears_without_wallet() {
        let h = harness(|_, b| b.fail_fetch = true, true, false);

        h.client.refresh().await;
        assert_eq!(h.backend.fetch_calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.client.snapshot(), RewardsSnapshot::default());

        h.client.connector().connect_wallet().await.unwrap();
        h.client.refresh().await;
        let snapshot = h.client.snapshot();
        assert_eq!(snapshot.error.as_deref(), Some("Failed to fetch staking state (500)"));
        assert!(!snapshot.loading);
        assert!(snapshot.pool.is_none());
    }

    #[test]
    fn test_fee_payer_kept_when_already_owner() {
        let owner = Pubkey::new_unique();
        let authority = Wallet::new("authority".to_string());
        let mut tx = unsigned_transaction(&owner, Some(&authority.pubkey()));
        tx.signatures[1] = Signature::from(authority.sign_message(&tx.message.serialize()).to_bytes());

        let kept = assign_fee_payer(tx.clone(), &owner).unwrap();
        assert_eq!(kept, tx);
    }

    #[test]
    fn test_fee_payer_recompiled_for_unsigned() {
        let server_payer = Pubkey::new_unique();
        let owner = Pubkey::new_unique();
        let tx = unsigned_transaction(&server_payer, None);
        let original_ix = decompile_instructions(&tx.message).unwrap();

        let rebuilt = assign_fee_payer(tx.clone(), &owner).unwrap();
        assert_eq!(rebuilt.message.account_keys[0], owner);
        assert_eq!(rebuilt.message.recent_blockhash, tx.message.recent_blockhash);

        let rebuilt_ix = decompile_instructions(&rebuilt.message).unwrap();
        assert_eq!(rebuilt_ix.len(), 1);
        assert_eq!(rebuilt_ix[0].program_id, original_ix[0].program_id);
        assert_eq!(rebuilt_ix[0].data, vec![1, 2, 3]);
        assert_eq!(rebuilt_ix[0].accounts, original_ix[0].accounts);
    }

    #[test]
    fn test_fee_payer_refused_for_signed_foreign_payer() {
        let server = Wallet::new("server".to_string());
        let tx = sign_transaction(&server, unsigned_transaction(&server.pubkey(), None)).unwrap();
        assert!(matches!(
            assign_fee_payer(tx, &Pubkey::new_unique()),
            Err(RewardsError::TransactionDecode(_))
        ));
    }

    #[tokio::test]
    async fn test_onchain_state_without_position_account() {
        use crate::rewards::accounts::account_discriminator;
        use crate::test_support::serve_json_rpc;

        let wallet = Wallet::new("onchain".to_string());
        let owner = wallet.pubkey();
        let mint = Pubkey::new_unique();
        let config = RewardsConfig {
            clout_mint: mint.to_string(),
            ..RewardsConfig::default()
        };
        let program = config.staking_program_pubkey().unwrap();
        let addresses = StakingAddresses::derive(&program, &mint, Some(&owner));

        let pool = StakingPoolAccount {
            bump: 255,
            vault_bump: 254,
            signer_bump: 253,
            authority: Pubkey::new_unique(),
            reward_vault: addresses.pool_vault,
            reward_mint: Pubkey::new_unique(),
            clout_mint: mint,
            reward_rate: 10,
            total_staked: 0,
            reward_per_token_stored: 0,
            last_update_ts: 1_700_000_000,
        };
        let mut data = account_discriminator(StakingPoolAccount::NAME).to_vec();
        data.extend(borsh::to_vec(&pool).unwrap());
        let encoded = STANDARD.encode(&data);

        let pool_address = addresses.pool.to_string();
        let (url, server) = serve_json_rpc(move |request| {
            if request.contains(&pool_address) {
                json!({
                    "context": { "slot": 1 },
                    "value": { "data": [encoded.clone(), "base64"], "lamports": 1, "owner": "11111111111111111111111111111111" }
                })
            } else {
                json!({ "context": { "slot": 1 }, "value": null })
            }
        })
        .await;

        let provider = Arc::new(FakeProvider {
            wallet,
            can_send: true,
            sent: AtomicUsize::new(0),
        });
        let connector = Arc::new(WalletConnector::new(vec![provider as Arc<dyn WalletProvider>]));
        let client = RewardsClient::new(
            &RewardsConfig {
                rpc_url: url,
                ..config
            },
            connector,
        )
        .unwrap();

        assert!(matches!(client.fetch_onchain_state().await, Err(RewardsError::WalletNotConnected)));

        client.connector().connect_wallet().await.unwrap();
        let state = client.fetch_onchain_state().await.unwrap();
        server.abort();

        assert!(state.position.is_none());
        assert_eq!(state.pool.clout_mint, mint.to_string());
        assert_eq!(state.pool.reward_rate, "10");
        assert_eq!(state.pool.last_update_ts, "1700000000");
    }

    #[tokio::test]
    async fn test_onchain_state_missing_pool() {
        use crate::test_support::serve_json_rpc;

        let (url, server) = serve_json_rpc(|_| json!({ "context": { "slot": 1 }, "value": null })).await;
        let wallet = Wallet::new("nopool".to_string());
        let provider = Arc::new(FakeProvider {
            wallet,
            can_send: true,
            sent: AtomicUsize::new(0),
        });
        let connector = Arc::new(WalletConnector::new(vec![provider as Arc<dyn WalletProvider>]));
        let config = RewardsConfig {
            clout_mint: Pubkey::new_unique().to_string(),
            rpc_url: url,
            ..RewardsConfig::default()
        };
        let client = RewardsClient::new(&config, connector).unwrap();
        client.connector().connect_wallet().await.unwrap();

        let err = client.fetch_onchain_state().await.unwrap_err();
        server.abort();
        assert!(matches!(err, RewardsError::AccountDecode(_)));
    }
}
