//! Tenant scopes and tenant key derivation

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::partner::Partner;

/// How the target server URL is partitioned per tenant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetUrlStrategy {
    /// No partitioning, every tenant writes to the bare own-server URL.
    None,
    /// Partition by partner name.
    #[default]
    Partner,
    /// Partition by organization slug.
    OrganizationName,
}

/// Optional finer-grained identity within a [`Partner`].
///
/// One partner may serve several organizations (e.g. hospitals behind a
/// shared gateway); each gets its own tenant key and its own
/// strategy-specific parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub name: String,
    pub target_url_strategy: TargetUrlStrategy,
    /// Extra parameters forwarded to the credential exchange (scopes,
    /// audience, tenant hints).
    pub strategy_params: BTreeMap<String, String>,
}

impl Organization {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target_url_strategy: TargetUrlStrategy::default(),
            strategy_params: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_target_url_strategy(mut self, strategy: TargetUrlStrategy) -> Self {
        self.target_url_strategy = strategy;
        self
    }

    #[must_use]
    pub fn with_strategy_param(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.strategy_params.insert(name.into(), value.into());
        self
    }

    /// Slug used as tenant key and URL segment.
    ///
    /// `"Acme Health / West"` becomes `"ACME-HEALTH-WEST"`.
    #[must_use]
    pub fn slug(&self) -> String {
        slugify(&self.name)
    }
}

/// Turn a display name into a URL-safe segment: uppercased, slashes
/// stripped, whitespace runs collapsed to a single hyphen.
#[must_use]
pub fn slugify(name: &str) -> String {
    name.replace('/', " ")
        .split_whitespace()
        .map(str::to_uppercase)
        .collect::<Vec<_>>()
        .join("-")
}

/// Derive the tenant key for a registration: organization slug when a scope
/// is present, partner name otherwise. Deterministic.
#[must_use]
pub fn tenant_key(partner: &Partner, organization: Option<&Organization>) -> String {
    match organization {
        Some(organization) => organization.slug(),
        None => partner.name.clone(),
    }
}
