//! Tenant registry
//!
//! Maps a tenant key to a pair of request contexts: a source context
//! pointed at the partner's server and a target context pointed at this
//! application's own server partition for that tenant.

use std::collections::HashMap;
use std::sync::Arc;

use fhirbridge_client::{
    replicate, CredentialResolver, FhirSession, TenantRequester, Transport,
};
use fhirbridge_domain::{
    tenant_key, FhirError, ResourceRecord, Result, TargetUrlStrategy,
};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::builder::SessionBuilder;

const OWN_FHIR_URL_ENV: &str = "OWN_FHIR_URL";
const DEFAULT_OWN_FHIR_URL: &str = "http://localhost:8080/fhir";

/// One tenant's pair of request contexts.
pub struct TenantEntry {
    /// Context pointed at the partner's server.
    pub source: TenantRequester,
    /// Context pointed at this application's own server partition.
    pub target: TenantRequester,
}

/// Application-owned registry of tenants.
///
/// Exactly one source and one target session exist per tenant key at any
/// time; re-registering a key replaces its entry.
pub struct TenantRegistry {
    own_fhir_url: String,
    transport: Transport,
    entries: RwLock<HashMap<String, Arc<TenantEntry>>>,
}

impl TenantRegistry {
    /// Build a registry whose own-server URL comes from the
    /// `OWN_FHIR_URL` environment variable, with a localhost default.
    #[must_use]
    pub fn new(transport: Transport) -> Self {
        let own_fhir_url = std::env::var(OWN_FHIR_URL_ENV)
            .unwrap_or_else(|_| DEFAULT_OWN_FHIR_URL.to_string());
        Self::with_own_fhir_url(own_fhir_url, transport)
    }

    /// Build a registry against an explicit own-server URL.
    #[must_use]
    pub fn with_own_fhir_url(own_fhir_url: impl Into<String>, transport: Transport) -> Self {
        Self {
            own_fhir_url: own_fhir_url.into(),
            transport,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn own_fhir_url(&self) -> &str {
        &self.own_fhir_url
    }

    /// Register a tenant: build the source session from the partner's
    /// credentials, derive the tenant key, build the target session
    /// against this application's partition for that tenant.
    ///
    /// The initial token fetch is attempted here; on failure the source
    /// session stays unauthenticated and a retry happens at first call.
    ///
    /// Returns the tenant key the entry was registered under.
    pub async fn register(&self, builder: SessionBuilder) -> Result<String> {
        let SessionBuilder { partner, strategy, organization, adapters, target_auth, exchanges } =
            builder;

        let partner =
            partner.ok_or_else(|| FhirError::InvalidInput("no partner registered".into()))?;
        let fhir_url = partner
            .fhir_url
            .clone()
            .ok_or_else(|| FhirError::InvalidInput("partner has no fhir url".into()))?;

        let mut resolver = CredentialResolver::new(partner.clone());
        for (strategy, exchange) in exchanges {
            resolver = resolver.with_exchange(strategy, exchange);
        }

        let mut source_builder = FhirSession::builder(fhir_url, self.transport.clone());
        if let Some(strategy) = strategy {
            let scope_params = organization
                .as_ref()
                .map(|organization| organization.strategy_params.clone())
                .unwrap_or_default();
            source_builder = source_builder.credentials(resolver, strategy).scope_params(scope_params);
        }
        let source_session = source_builder.build();

        match source_session.authenticate().await {
            Ok(true) => info!(partner = %partner.name, "successfully initialized partner client"),
            Ok(false) => {
                warn!(partner = %partner.name, "client starts unauthenticated, a retry will be performed at first call");
            }
            Err(err) => {
                warn!(partner = %partner.name, error = %err, "unable to initialize client, a retry will be performed at first call");
            }
        }

        let tenant_key = tenant_key(&partner, organization.as_ref());
        let target_url = self.target_url(&partner.name, organization.as_ref());

        let mut target_builder = FhirSession::builder(target_url, self.transport.clone());
        if let Some(target_auth) = target_auth {
            target_builder = target_builder.bearer(target_auth.resolve().await?);
        }
        let target_session = target_builder.build();

        let entry = TenantEntry {
            source: TenantRequester::new(Arc::new(source_session), adapters.clone()),
            target: TenantRequester::new(Arc::new(target_session), adapters),
        };

        self.entries.write().await.insert(tenant_key.clone(), Arc::new(entry));
        info!(%tenant_key, "registered tenant");
        Ok(tenant_key)
    }

    /// Look up a tenant. A miss warns and returns absent; callers must
    /// null-check.
    pub async fn get(&self, tenant_key: &str) -> Option<Arc<TenantEntry>> {
        let entries = self.entries.read().await;
        match entries.get(tenant_key) {
            Some(entry) => Some(entry.clone()),
            None => {
                warn!(%tenant_key, "tenant is not registered, did you register it?");
                None
            }
        }
    }

    /// Replicate a source-side record onto the tenant's target context.
    pub async fn replicate_to_target(
        &self,
        tenant_key: &str,
        source: &ResourceRecord,
        identifier_url: Option<&str>,
    ) -> Result<ResourceRecord> {
        let entry = self.get(tenant_key).await.ok_or_else(|| {
            FhirError::InvalidInput(format!("tenant '{tenant_key}' is not registered"))
        })?;
        replicate(source, &entry.target, identifier_url).await
    }

    /// Target partition URL: own URL plus the suffix selected by the
    /// tenant scope's URL-partitioning policy (partner when no scope is
    /// attached). The suffix is always a slug so names with spaces or
    /// slashes survive the round trip through URL parsing unchanged.
    fn target_url(
        &self,
        partner_name: &str,
        organization: Option<&fhirbridge_domain::Organization>,
    ) -> String {
        let strategy = organization
            .map(|organization| organization.target_url_strategy)
            .unwrap_or_default();
        let suffix = match strategy {
            TargetUrlStrategy::None => String::new(),
            TargetUrlStrategy::Partner => fhirbridge_domain::slugify(partner_name),
            TargetUrlStrategy::OrganizationName => {
                organization.map(fhirbridge_domain::Organization::slug).unwrap_or_default()
            }
        };
        if suffix.is_empty() {
            self.own_fhir_url.clone()
        } else {
            format!("{}/{suffix}", self.own_fhir_url.trim_end_matches('/'))
        }
    }
}
