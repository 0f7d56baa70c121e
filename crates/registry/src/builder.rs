//! Registration builder

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use fhirbridge_client::{RecordAdapter, TokenExchange};
use fhirbridge_domain::{FhirError, Organization, Partner, Result, Strategy};
use futures::future::BoxFuture;

/// Source of the target server's bearer token: a literal value, or a
/// zero-argument async resolver awaited once at registration time.
pub enum TargetAuth {
    Bearer(String),
    Resolver(Box<dyn Fn() -> BoxFuture<'static, Result<String>> + Send + Sync>),
}

impl TargetAuth {
    /// Wrap an async callable resolved at registration time.
    pub fn resolver<F, Fut>(resolve: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String>> + Send + 'static,
    {
        Self::Resolver(Box::new(move || Box::pin(resolve())))
    }

    pub(crate) async fn resolve(&self) -> Result<String> {
        match self {
            Self::Bearer(token) => Ok(token.clone()),
            Self::Resolver(resolve) => resolve().await,
        }
    }
}

impl From<String> for TargetAuth {
    fn from(token: String) -> Self {
        Self::Bearer(token)
    }
}

impl From<&str> for TargetAuth {
    fn from(token: &str) -> Self {
        Self::Bearer(token.to_string())
    }
}

/// Fluent registration: partner, strategy, tenant scope, per-resource-type
/// adapter overrides and the target server's auth source.
#[derive(Default)]
pub struct SessionBuilder {
    pub(crate) partner: Option<Arc<Partner>>,
    pub(crate) strategy: Option<Strategy>,
    pub(crate) organization: Option<Organization>,
    pub(crate) adapters: HashMap<String, RecordAdapter>,
    pub(crate) target_auth: Option<TargetAuth>,
    pub(crate) exchanges: Vec<(Strategy, Arc<dyn TokenExchange>)>,
}

impl SessionBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn for_partner(mut self, partner: Partner) -> Self {
        self.partner = Some(Arc::new(partner));
        self
    }

    #[must_use]
    pub fn for_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Attach a tenant scope. The organization slug becomes the tenant key.
    #[must_use]
    pub fn for_organization(mut self, organization: Organization) -> Self {
        self.organization = Some(organization);
        self
    }

    /// Register a result adapter for one resource type, scoped to this
    /// registration's tenant key.
    ///
    /// # Errors
    /// `InvalidInput` when no partner was registered first.
    pub fn register_adapter(
        mut self,
        resource_type: impl Into<String>,
        adapter: RecordAdapter,
    ) -> Result<Self> {
        if self.partner.is_none() {
            return Err(FhirError::InvalidInput("no partner registered".into()));
        }
        self.adapters.insert(resource_type.into(), adapter);
        Ok(self)
    }

    /// Seed the target session's bearer token.
    #[must_use]
    pub fn target_auth(mut self, auth: impl Into<TargetAuth>) -> Self {
        self.target_auth = Some(auth.into());
        self
    }

    /// Replace or add the token exchange for one strategy.
    #[must_use]
    pub fn with_exchange(mut self, strategy: Strategy, exchange: Arc<dyn TokenExchange>) -> Self {
        self.exchanges.push((strategy, exchange));
        self
    }
}
