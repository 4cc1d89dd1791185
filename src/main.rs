// src/main.rs
use anyhow::{format_err, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use nftsol_rewards::config::RewardsConfig;
use nftsol_rewards::connector::WalletConnector;
use nftsol_rewards::nft_utils::{search_nfts, PublicNft};
use nftsol_rewards::rewards::RewardsClient;
use nftsol_rewards::rpc::RpcClient;
use nftsol_rewards::signing::{SoftwareProvider, WalletProvider};
use nftsol_rewards::wallet::Wallet;

#[derive(Debug, Parser)]
#[command(name = "nftsol-rewards", about = "Stake CLOUT and harvest NFTSol rewards")]
pub struct Opts {
    /// Solana CLI keypair used as the wallet (defaults to ~/.config/solana/id.json)
    #[arg(long, global = true)]
    pub keypair: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show pool and position for the wallet
    Status {
        /// Read accounts from chain instead of the API
        #[arg(long)]
        onchain: bool,
    },
    /// Stake CLOUT (base units, fractions are floored)
    Stake { amount: f64 },
    /// Withdraw staked CLOUT
    Unstake { amount: f64 },
    /// Claim pending rewards
    Harvest,
    /// Search a JSON file of NFT listings
    Search { file: PathBuf, query: String },
}

fn default_keypair_path() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME is not set, pass --keypair")?;
    Ok(PathBuf::from(home).join(".config/solana/id.json"))
}

fn load_wallet(path: Option<PathBuf>) -> Result<Wallet> {
    let path = match path {
        Some(path) => path,
        None => default_keypair_path()?,
    };
    Wallet::from_keypair_file(&path).map_err(|e| format_err!(e))
}

async fn build_client(config: &RewardsConfig, keypair: Option<PathBuf>) -> Result<RewardsClient> {
    let wallet = load_wallet(keypair)?;
    let rpc = Arc::new(
        RpcClient::new(&config.rpc_url)
            .with_confirm_policy(config.confirm_timeout(), config.confirm_poll_interval()),
    );
    let provider: Arc<dyn WalletProvider> = Arc::new(SoftwareProvider::new(wallet, rpc));
    let connector = Arc::new(WalletConnector::new(vec![provider]));

    let connected = connector.connect_wallet().await?;
    log::info!("Using wallet {} ({})", connected.public_key, connected.name);

    Ok(RewardsClient::new(config, connector)?)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(opts: Opts) -> Result<()> {
    let config = RewardsConfig::from_env();
    log::debug!("config: api={} rpc={} mint={}", config.api_url, config.rpc_url, config.clout_mint);

    match opts.command {
        Command::Search { file, query } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let nfts: Vec<PublicNft> = serde_json::from_str(&raw)
                .with_context(|| format!("failed to parse {}", file.display()))?;
            print_json(&search_nfts(&nfts, &query))?;
        }
        Command::Status { onchain } => {
            let client = build_client(&config, opts.keypair).await?;
            let state = if onchain {
                client.fetch_onchain_state().await?
            } else {
                client.fetch_state().await?
            };
            print_json(&state)?;

            if let Some(position) = &state.position {
                let pending = nftsol_rewards::rewards::accounts::project_pending_from_views(
                    &state.pool,
                    position,
                    Utc::now().timestamp(),
                )?;
                println!("Projected pending rewards: {}", pending);
            }
        }
        Command::Stake { amount } => {
            let client = build_client(&config, opts.keypair).await?;
            let signature = client.request_stake(amount).await?;
            println!("Staked: {}", signature);
        }
        Command::Unstake { amount } => {
            let client = build_client(&config, opts.keypair).await?;
            let signature = client.request_unstake(amount).await?;
            println!("Unstaked: {}", signature);
        }
        Command::Harvest => {
            let client = build_client(&config, opts.keypair).await?;
            let signature = client.request_harvest().await?;
            println!("Harvested: {}", signature);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    solana_logger::setup_with_default("info");
    run(Opts::parse()).await
}
