//! Strategy resolution for a partner's credentials

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use fhirbridge_domain::{FhirError, Partner, Result, Strategy, TokenSet};
use tracing::debug;

use super::exchange::{ClientCredentialsExchange, TokenExchange};
use crate::transport::Transport;

/// Resolves access tokens for one partner across its declared strategies.
///
/// An unsupported strategy resolves to "no token" rather than an error:
/// callers proceed unauthenticated and expect a later 401. A strategy the
/// partner declares but that has no registered exchange is a configuration
/// bug and fails with `StrategyNotFound`.
#[derive(Clone)]
pub struct CredentialResolver {
    partner: Arc<Partner>,
    exchanges: HashMap<Strategy, Arc<dyn TokenExchange>>,
}

impl CredentialResolver {
    /// Build a resolver with the default exchanges registered
    /// (machine-to-machine today).
    pub fn new(partner: Arc<Partner>) -> Self {
        let mut exchanges: HashMap<Strategy, Arc<dyn TokenExchange>> = HashMap::new();
        exchanges.insert(Strategy::MachineToMachine, Arc::new(ClientCredentialsExchange));
        Self { partner, exchanges }
    }

    /// Build a resolver with no exchanges registered.
    pub fn bare(partner: Arc<Partner>) -> Self {
        Self { partner, exchanges: HashMap::new() }
    }

    /// Replace or add the exchange for one strategy.
    #[must_use]
    pub fn with_exchange(mut self, strategy: Strategy, exchange: Arc<dyn TokenExchange>) -> Self {
        self.exchanges.insert(strategy, exchange);
        self
    }

    pub fn partner(&self) -> &Arc<Partner> {
        &self.partner
    }

    /// Resolve an access token for `strategy`.
    ///
    /// Returns `Ok(None)` when the partner does not support the strategy.
    pub async fn resolve(
        &self,
        strategy: Strategy,
        transport: &Transport,
        params: &BTreeMap<String, String>,
    ) -> Result<Option<TokenSet>> {
        if !self.partner.supports(strategy) {
            debug!(partner = %self.partner.name, %strategy, "strategy not supported, proceeding unauthenticated");
            return Ok(None);
        }
        let exchange = self.exchange_for(strategy)?;
        exchange.fetch_access_token(transport, &self.partner, params).await.map(Some)
    }

    /// Trade a refresh token through the exchange registered for `strategy`.
    pub async fn refresh(
        &self,
        strategy: Strategy,
        transport: &Transport,
        refresh_token: &str,
    ) -> Result<TokenSet> {
        let exchange = self.exchange_for(strategy)?;
        exchange.refresh_access_token(transport, &self.partner, refresh_token).await
    }

    fn exchange_for(&self, strategy: Strategy) -> Result<&Arc<dyn TokenExchange>> {
        self.exchanges.get(&strategy).ok_or_else(|| {
            FhirError::StrategyNotFound(format!(
                "partner '{}' declares '{strategy}' but no exchange is registered for it",
                self.partner.name
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    fn m2m_partner() -> Arc<Partner> {
        Arc::new(Partner::new("Acme Health", BTreeSet::from([Strategy::MachineToMachine])))
    }

    #[tokio::test]
    async fn unsupported_strategy_resolves_to_no_token() {
        let partner = Arc::new(Partner::new("Acme Health", BTreeSet::new()));
        let resolver = CredentialResolver::new(partner);
        let transport = Transport::builder().build().unwrap();

        let resolved = resolver
            .resolve(Strategy::MachineToMachine, &transport, &BTreeMap::new())
            .await
            .unwrap();
        assert!(resolved.is_none());
    }

    #[tokio::test]
    async fn declared_strategy_without_exchange_is_a_config_error() {
        let resolver = CredentialResolver::bare(m2m_partner());
        let transport = Transport::builder().build().unwrap();

        let result = resolver
            .resolve(Strategy::MachineToMachine, &transport, &BTreeMap::new())
            .await;
        assert!(matches!(result, Err(FhirError::StrategyNotFound(_))));
    }
}
