use std::sync::Arc;

use alloy::primitives::U256;
use serde_json::json;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

use super::contract::ContractBinding;
use super::events::{DomainEvent, EventBus};
use super::provider::{InjectedProvider, ProviderAvailability, ProviderHost, ProviderSignal};
use super::{utils, CallResult};
use crate::config::BridgeConfig;
use crate::error::BridgeError;

/// Wallet connection state. Never `Connected` with an empty account string.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Uninitialized,
    Disconnected,
    Connected(String),
    /// The provider switched chains. The contract binding has been
    /// invalidated; the session must re-initialize to resume contract calls.
    NetworkChanged,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected(_))
    }

    pub fn account(&self) -> Option<&str> {
        match self {
            ConnectionState::Connected(account) => Some(account),
            _ => None,
        }
    }
}

/// Single source of truth for "is a wallet available, and which account is
/// active". Owns the account cache and the contract binding, and forwards
/// provider signals to the UI as domain events.
pub struct ProviderConnection {
    availability: ProviderAvailability,
    provider: Option<Arc<dyn InjectedProvider>>,
    binding: RwLock<Option<ContractBinding>>,
    accounts: RwLock<Vec<String>>,
    state: RwLock<ConnectionState>,
    events: EventBus,
}

impl ProviderConnection {
    /// Probes for a wallet provider, constructs the contract binding when
    /// the configuration allows, and starts listening for provider signals.
    ///
    /// Never requests account access here: prompting the user is reserved
    /// for an explicit [`connect_wallet`](Self::connect_wallet) call.
    pub async fn initialize(
        host: &ProviderHost,
        config: &BridgeConfig,
        events: EventBus,
    ) -> Arc<Self> {
        let (availability, provider) = host.detect();

        let binding = match availability {
            ProviderAvailability::ModernPresent => {
                match ContractBinding::from_config(&config.contract).await {
                    Ok(Some(binding)) => {
                        info!(address = ?binding.address(), "carpool contract binding constructed");
                        Some(binding)
                    }
                    Ok(None) => {
                        warn!("contract address or ABI not provided, contract calls disabled");
                        None
                    }
                    Err(e) => {
                        warn!("failed to construct contract binding: {e:#}");
                        None
                    }
                }
            }
            ProviderAvailability::LegacyPresent => {
                warn!("legacy provider does not support the contract binding");
                None
            }
            ProviderAvailability::Absent => None,
        };

        let state = if provider.is_some() {
            ConnectionState::Disconnected
        } else {
            ConnectionState::Uninitialized
        };

        let connection = Arc::new(Self {
            availability,
            provider: provider.clone(),
            binding: RwLock::new(binding),
            accounts: RwLock::new(Vec::new()),
            state: RwLock::new(state),
            events,
        });

        match &provider {
            Some(provider) => connection.spawn_signal_listener(provider.signals()),
            None => {
                warn!("no wallet provider detected");
                connection.events.emit(DomainEvent::NoProvider);
            }
        }

        connection
    }

    fn spawn_signal_listener(self: &Arc<Self>, mut signals: broadcast::Receiver<ProviderSignal>) {
        let weak = Arc::downgrade(self);
        tokio::spawn(async move {
            loop {
                match signals.recv().await {
                    Ok(signal) => {
                        let Some(connection) = weak.upgrade() else {
                            break;
                        };
                        connection.handle_signal(signal).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "provider signal listener lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    pub(crate) async fn handle_signal(&self, signal: ProviderSignal) {
        match signal {
            ProviderSignal::AccountsChanged(accounts) => {
                let active = accounts.first().filter(|a| !a.is_empty()).cloned();
                info!(account = ?active, "provider account set changed");

                *self.accounts.write().await = accounts;
                *self.state.write().await = match &active {
                    Some(account) => ConnectionState::Connected(account.clone()),
                    None => ConnectionState::Disconnected,
                };
                self.events.emit(DomainEvent::AccountChanged { account: active });
            }
            ProviderSignal::ChainChanged(chain_id) => {
                // The contract address and ABI are network-scoped, so the
                // binding cannot survive a chain switch.
                warn!(%chain_id, "network changed, contract binding invalidated");

                *self.binding.write().await = None;
                self.accounts.write().await.clear();
                *self.state.write().await = ConnectionState::NetworkChanged;
                self.events.emit(DomainEvent::NetworkChanged { chain_id });
            }
        }
    }

    /// Explicit, user-triggered account access request.
    ///
    /// Success caches the returned account set wholesale and transitions to
    /// `Connected`; rejection leaves previously cached state untouched.
    pub async fn connect_wallet(&self) -> CallResult<String> {
        let Some(provider) = &self.provider else {
            return BridgeError::ProviderUnavailable.into();
        };

        match provider.request("eth_requestAccounts", json!([])).await {
            Ok(value) => {
                let accounts: Vec<String> = match serde_json::from_value(value) {
                    Ok(accounts) => accounts,
                    Err(e) => {
                        return CallResult::failure(format!(
                            "malformed account list from provider: {e}"
                        ))
                    }
                };

                let Some(account) = accounts.first().filter(|a| !a.is_empty()).cloned() else {
                    return CallResult::failure("provider returned no accounts");
                };

                *self.accounts.write().await = accounts;
                *self.state.write().await = ConnectionState::Connected(account.clone());

                info!(%account, "wallet connected");
                self.events.emit(DomainEvent::WalletConnected {
                    account: account.clone(),
                });
                CallResult::Success(account)
            }
            Err(e) => CallResult::failure(utils::classify_provider_error(&e.to_string())),
        }
    }

    /// The active account: the cached first entry when present, otherwise a
    /// passive query that never prompts the user. Errors degrade to absence.
    pub async fn get_account(&self) -> Option<String> {
        let provider = self.provider.as_ref()?;

        if let Some(account) = self.accounts.read().await.first().filter(|a| !a.is_empty()) {
            return Some(account.clone());
        }

        match provider.request("eth_accounts", json!([])).await {
            Ok(value) => {
                let accounts: Vec<String> = serde_json::from_value(value).ok()?;
                let account = accounts.first().filter(|a| !a.is_empty()).cloned();
                *self.accounts.write().await = accounts;
                account
            }
            Err(e) => {
                debug!("passive account query failed: {e}");
                None
            }
        }
    }

    /// Native-currency balance for an address, in display-form ether.
    /// Absence on any error.
    pub async fn get_balance(&self, address: &str) -> Option<String> {
        let provider = self.provider.as_ref()?;
        let address = utils::validate_address(address).ok()?;

        let params = json!([format!("{address:?}"), "latest"]);
        match provider.request("eth_getBalance", params).await {
            Ok(value) => {
                let hex_balance = value.as_str()?;
                let wei = U256::from_str_radix(hex_balance.trim_start_matches("0x"), 16).ok()?;
                Some(utils::from_wei(wei))
            }
            Err(e) => {
                debug!("balance query failed for {address:?}: {e}");
                None
            }
        }
    }

    pub fn availability(&self) -> ProviderAvailability {
        self.availability
    }

    pub async fn state(&self) -> ConnectionState {
        self.state.read().await.clone()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub(crate) fn provider(&self) -> Option<Arc<dyn InjectedProvider>> {
        self.provider.clone()
    }

    pub(crate) async fn binding(&self) -> Option<ContractBinding> {
        self.binding.read().await.clone()
    }
}
