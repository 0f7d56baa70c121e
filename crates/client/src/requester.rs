//! Per-tenant request surface: proxies and reference resolution

use std::collections::HashMap;
use std::sync::Arc;

use fhirbridge_domain::{FhirError, ResourceRecord, ResourceReference, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::proxy::{RecordAdapter, ResourceProxy};
use crate::session::FhirSession;

/// One tenant-direction's request surface: a session plus the adapter
/// overrides registered for that tenant key.
#[derive(Clone)]
pub struct TenantRequester {
    session: Arc<FhirSession>,
    adapters: HashMap<String, RecordAdapter>,
}

impl TenantRequester {
    #[must_use]
    pub fn new(session: Arc<FhirSession>, adapters: HashMap<String, RecordAdapter>) -> Self {
        Self { session, adapters }
    }

    pub fn session(&self) -> &Arc<FhirSession> {
        &self.session
    }

    /// Proxy for one resource type, with this tenant's adapter attached
    /// when one is registered.
    #[must_use]
    pub fn resource(&self, resource_type: &str) -> ResourceProxy {
        ResourceProxy::new(
            self.session.clone(),
            resource_type,
            self.adapters.get(resource_type).cloned(),
        )
    }

    /// Resolve a reference to a record.
    ///
    /// `None` input returns absent unless `raise_if_none` is set, in which
    /// case it fails with `InvalidInput` — callers that need a resource
    /// must opt into strict mode explicitly.
    pub async fn resolve_ref(
        &self,
        reference: Option<&ResourceReference>,
        raise_if_none: bool,
    ) -> Result<Option<ResourceRecord>> {
        match self.resolve_ref_value(reference, raise_if_none).await? {
            Some((resource_type, value)) => {
                let record = ResourceRecord::from_value(value)?;
                let adapted = match self.adapters.get(&resource_type) {
                    Some(adapter) => adapter(record),
                    None => record,
                };
                Ok(Some(adapted))
            }
            None => Ok(None),
        }
    }

    /// Resolve a reference and deserialize the raw field map directly
    /// into `T`.
    pub async fn resolve_ref_as<T: DeserializeOwned>(
        &self,
        reference: Option<&ResourceReference>,
        raise_if_none: bool,
    ) -> Result<Option<T>> {
        match self.resolve_ref_value(reference, raise_if_none).await? {
            Some((_, value)) => serde_json::from_value(value)
                .map(Some)
                .map_err(|err| FhirError::Decode(err.to_string())),
            None => Ok(None),
        }
    }

    async fn resolve_ref_value(
        &self,
        reference: Option<&ResourceReference>,
        raise_if_none: bool,
    ) -> Result<Option<(String, Value)>> {
        let Some(reference) = reference else {
            if raise_if_none {
                return Err(FhirError::InvalidInput("reference is none".into()));
            }
            return Ok(None);
        };

        // Identifier path: no literal reference, but a (type, business
        // identifier) pair.
        if reference.reference.is_none() {
            let (Some(resource_type), Some(identifier)) =
                (&reference.resource_type, &reference.identifier)
            else {
                return Err(FhirError::InvalidInput(
                    "reference carries neither a literal path nor a (type, identifier) pair"
                        .into(),
                ));
            };
            let found = self
                .search(resource_type)
                .filter("identifier", identifier.value.clone())
                .first_value()
                .await?;
            return Ok(found.map(|value| (resource_type.clone(), value)));
        }

        // Literal path: must address a resource on this server.
        let (resource_type, id) = reference.local_parts().ok_or_else(|| {
            FhirError::NotFound("can not resolve non-local reference".into())
        })?;
        let found = self
            .search(resource_type)
            .filter("_id", id)
            .first_value()
            .await?
            .ok_or_else(|| {
                FhirError::NotFound(format!("{resource_type}/{id} did not resolve"))
            })?;
        Ok(Some((resource_type.to_string(), found)))
    }

    fn search(&self, resource_type: &str) -> crate::search::SearchBuilder {
        self.resource(resource_type).search()
    }
}
