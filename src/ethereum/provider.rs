use std::borrow::Cow;
use std::sync::Arc;

use alloy::{
    providers::{Provider, ProviderBuilder, RootProvider},
    transports::http::{Client, Http},
};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::warn;

/// Provider-originated signals, normalized from the wallet's own
/// subscription mechanism.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderSignal {
    AccountsChanged(Vec<String>),
    ChainChanged(String),
}

/// Outcome of the provider probe. Immutable once determined; only a full
/// re-initialization re-evaluates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderAvailability {
    Absent,
    LegacyPresent,
    ModernPresent,
}

/// The capability surface of an injected wallet provider: arbitrary RPC
/// requests plus a subscription stream for account and chain signals.
#[async_trait]
pub trait InjectedProvider: Send + Sync {
    async fn request(&self, method: &str, params: Value) -> Result<Value>;

    fn signals(&self) -> broadcast::Receiver<ProviderSignal>;
}

/// Dependency-injected pair of candidate providers. The modern provider is
/// probed first, the legacy accessor is the fallback.
#[derive(Clone, Default)]
pub struct ProviderHost {
    modern: Option<Arc<dyn InjectedProvider>>,
    legacy: Option<Arc<dyn InjectedProvider>>,
}

impl ProviderHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_modern(mut self, provider: Arc<dyn InjectedProvider>) -> Self {
        self.modern = Some(provider);
        self
    }

    pub fn with_legacy(mut self, provider: Arc<dyn InjectedProvider>) -> Self {
        self.legacy = Some(provider);
        self
    }

    pub(crate) fn detect(&self) -> (ProviderAvailability, Option<Arc<dyn InjectedProvider>>) {
        if let Some(provider) = &self.modern {
            (ProviderAvailability::ModernPresent, Some(provider.clone()))
        } else if let Some(provider) = &self.legacy {
            warn!("legacy wallet provider detected, consider upgrading");
            (ProviderAvailability::LegacyPresent, Some(provider.clone()))
        } else {
            (ProviderAvailability::Absent, None)
        }
    }
}

/// JSON-RPC-over-HTTP provider implementation.
///
/// An HTTP endpoint has no push channel of its own, so the embedding host
/// surfaces account and chain changes through [`HttpWalletProvider::notify`].
pub struct HttpWalletProvider {
    inner: RootProvider<Http<Client>>,
    signals: broadcast::Sender<ProviderSignal>,
}

impl HttpWalletProvider {
    pub fn connect(rpc_url: &str) -> Result<Self> {
        let inner = ProviderBuilder::new().on_http(rpc_url.parse()?);
        let (signals, _) = broadcast::channel(16);
        Ok(Self { inner, signals })
    }

    pub fn notify(&self, signal: ProviderSignal) {
        let _ = self.signals.send(signal);
    }
}

#[async_trait]
impl InjectedProvider for HttpWalletProvider {
    async fn request(&self, method: &str, params: Value) -> Result<Value> {
        let result = self
            .inner
            .raw_request(Cow::Owned(method.to_owned()), params)
            .await?;
        Ok(result)
    }

    fn signals(&self) -> broadcast::Receiver<ProviderSignal> {
        self.signals.subscribe()
    }
}


#[cfg(test)]
mod tests {
    use super::mock::MockProvider;
    use super::*;
    use serde_json::json;

    #[test]
    fn detect_prefers_modern_provider() {
        let modern = Arc::new(MockProvider::new());
        let legacy = Arc::new(MockProvider::new());

        let host = ProviderHost::new()
            .with_modern(modern)
            .with_legacy(legacy);
        let (availability, provider) = host.detect();
        assert_eq!(availability, ProviderAvailability::ModernPresent);
        assert!(provider.is_some());
    }

    #[test]
    fn detect_falls_back_to_legacy_then_absent() {
        let legacy = Arc::new(MockProvider::new());
        let host = ProviderHost::new().with_legacy(legacy);
        let (availability, provider) = host.detect();
        assert_eq!(availability, ProviderAvailability::LegacyPresent);
        assert!(provider.is_some());

        let (availability, provider) = ProviderHost::new().detect();
        assert_eq!(availability, ProviderAvailability::Absent);
        assert!(provider.is_none());
    }

    #[tokio::test]
    async fn mock_provider_replays_scripted_responses() {
        let provider = MockProvider::new();
        provider.expect("eth_accounts", Ok(json!(["0xabc"])));
        provider.expect("eth_accounts", Err("gone"));

        assert_eq!(
            provider.request("eth_accounts", json!([])).await.unwrap(),
            json!(["0xabc"])
        );
        assert!(provider.request("eth_accounts", json!([])).await.is_err());
        assert!(provider.request("eth_chainId", json!([])).await.is_err());
        assert_eq!(provider.call_count("eth_accounts"), 2);
    }
}
