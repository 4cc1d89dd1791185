// src/connector.rs
//! Wallet connector: tries registered providers in order and publishes
//! connection changes to subscribers.

use chrono::{DateTime, Duration, Utc};
use solana_sdk::pubkey::Pubkey;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::broadcast;

use crate::signing::WalletProvider;

/// How long a redirect-based connection attempt stays eligible for pickup
pub const RECONNECT_WINDOW_SECS: i64 = 300;

const EVENT_CAPACITY: usize = 16;

#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("No wallet found. Please install Phantom, Solflare, or Backpack wallet.")]
    NoWalletFound,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConnectedWallet {
    pub public_key: Pubkey,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WalletEvent {
    Connected(ConnectedWallet),
    Disconnected,
}

struct Session {
    wallet: ConnectedWallet,
    provider: Arc<dyn WalletProvider>,
}

#[derive(Default)]
struct ConnectorState {
    session: Option<Session>,
    pending_attempt: Option<DateTime<Utc>>,
}

pub struct WalletConnector {
    providers: Vec<Arc<dyn WalletProvider>>,
    state: Mutex<ConnectorState>,
    events: broadcast::Sender<WalletEvent>,
}

impl WalletConnector {
    /// Providers are tried in the given order
    pub fn new(providers: Vec<Arc<dyn WalletProvider>>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            providers,
            state: Mutex::new(ConnectorState::default()),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.events.subscribe()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ConnectorState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(&self, event: WalletEvent) {
        // No receivers is fine
        let _ = self.events.send(event);
    }

    pub fn current_wallet(&self) -> Option<ConnectedWallet> {
        self.lock().session.as_ref().map(|s| s.wallet.clone())
    }

    pub fn active_provider(&self) -> Option<Arc<dyn WalletProvider>> {
        self.lock().session.as_ref().map(|s| Arc::clone(&s.provider))
    }

    fn adopt(&self, provider: Arc<dyn WalletProvider>, wallet: ConnectedWallet) {
        {
            let mut state = self.lock();
            state.session = Some(Session {
                wallet: wallet.clone(),
                provider,
            });
            state.pending_attempt = None;
        }
        log::info!("Connected {} ({})", wallet.name, wallet.public_key);
        self.emit(WalletEvent::Connected(wallet));
    }

    /// Connect the first provider that accepts
    pub async fn connect_wallet(&self) -> Result<ConnectedWallet, ConnectorError> {
        for provider in &self.providers {
            match provider.connect().await {
                Ok(public_key) => {
                    let wallet = ConnectedWallet {
                        public_key,
                        name: provider.name(),
                    };
                    self.adopt(Arc::clone(provider), wallet.clone());
                    return Ok(wallet);
                }
                Err(e) => {
                    log::warn!("{} connection failed: {}", provider.name(), e);
                    continue;
                }
            }
        }

        Err(ConnectorError::NoWalletFound)
    }

    pub async fn disconnect(&self) {
        let provider = {
            let mut state = self.lock();
            state.pending_attempt = None;
            state.session.take().map(|s| s.provider)
        };

        if let Some(provider) = provider {
            if let Err(e) = provider.disconnect().await {
                log::warn!("Wallet disconnect error: {}", e);
            }
        }

        self.emit(WalletEvent::Disconnected);
    }

    /// Remember that a connection was handed off to an external wallet app
    pub fn record_connection_attempt(&self, at: DateTime<Utc>) {
        self.lock().pending_attempt = Some(at);
    }

    pub fn has_pending_attempt(&self) -> bool {
        self.lock().pending_attempt.is_some()
    }

    /// Pick up a wallet that finished connecting outside this process.
    /// Returns the adopted wallet, if any.
    pub fn check_for_reconnection(&self, now: DateTime<Utc>) -> Option<ConnectedWallet> {
        let attempt = self.lock().pending_attempt?;

        if now - attempt > Duration::seconds(RECONNECT_WINDOW_SECS) {
            self.lock().pending_attempt = None;
            return None;
        }

        for provider in &self.providers {
            if let Some(public_key) = provider.public_key() {
                let wallet = ConnectedWallet {
                    public_key,
                    name: "Mobile Wallet".to_string(),
                };
                self.adopt(Arc::clone(provider), wallet.clone());
                return Some(wallet);
            }
        }

        None
    }
}
