//! Lazy, chainable search over one resource type
//!
//! Nothing hits the wire until a terminal operation (`fetch`, `fetch_raw`,
//! `first` or their typed variants) runs.

use std::sync::Arc;

use fhirbridge_domain::{FhirError, ResourceRecord, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::proxy::RecordAdapter;
use crate::session::FhirSession;

/// Chainable query builder for one resource type.
#[derive(Clone)]
pub struct SearchBuilder {
    session: Arc<FhirSession>,
    resource_type: String,
    params: Vec<(String, String)>,
    adapter: Option<RecordAdapter>,
}

impl SearchBuilder {
    pub(crate) fn new(
        session: Arc<FhirSession>,
        resource_type: impl Into<String>,
        adapter: Option<RecordAdapter>,
    ) -> Self {
        Self { session, resource_type: resource_type.into(), params: Vec::new(), adapter }
    }

    /// Add a search filter, e.g. `filter("identifier", "MRN-42")`.
    #[must_use]
    pub fn filter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn limit(self, count: usize) -> Self {
        self.filter("_count", count.to_string())
    }

    #[must_use]
    pub fn sort(self, value: impl Into<String>) -> Self {
        self.filter("_sort", value.into())
    }

    #[must_use]
    pub fn include(self, value: impl Into<String>) -> Self {
        self.filter("_include", value.into())
    }

    #[must_use]
    pub fn revinclude(self, value: impl Into<String>) -> Self {
        self.filter("_revinclude", value.into())
    }

    /// Execute and return the raw result bundle as a record.
    pub async fn fetch_raw(&self) -> Result<ResourceRecord> {
        let bundle = self.session.get(&self.resource_type, &self.params).await?;
        ResourceRecord::from_value(bundle)
    }

    /// Execute and deserialize the raw result bundle into `T`.
    pub async fn fetch_raw_as<T: DeserializeOwned>(&self) -> Result<T> {
        let bundle = self.session.get(&self.resource_type, &self.params).await?;
        serde_json::from_value(bundle).map_err(|err| FhirError::Decode(err.to_string()))
    }

    /// Execute and return every matched resource.
    pub async fn fetch(&self) -> Result<Vec<ResourceRecord>> {
        self.fetch_values()
            .await?
            .into_iter()
            .map(|value| ResourceRecord::from_value(value).map(|record| self.adapt(record)))
            .collect()
    }

    /// Execute and return the first match, if any.
    pub async fn first(&self) -> Result<Option<ResourceRecord>> {
        match self.first_value().await? {
            Some(value) => {
                let record = ResourceRecord::from_value(value)?;
                Ok(Some(self.adapt(record)))
            }
            None => Ok(None),
        }
    }

    /// Execute and deserialize every matched raw field map into `T`,
    /// bypassing the record wrapper.
    pub async fn fetch_as<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        self.fetch_values()
            .await?
            .into_iter()
            .map(|value| {
                serde_json::from_value(value).map_err(|err| FhirError::Decode(err.to_string()))
            })
            .collect()
    }

    /// Execute and deserialize the first match into `T`, if any.
    pub async fn first_as<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        match self.first_value().await? {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|err| FhirError::Decode(err.to_string())),
            None => Ok(None),
        }
    }

    pub(crate) async fn first_value(&self) -> Result<Option<Value>> {
        let query = self.clone().limit(1);
        Ok(query.fetch_values().await?.into_iter().next())
    }

    async fn fetch_values(&self) -> Result<Vec<Value>> {
        let bundle = self.session.get(&self.resource_type, &self.params).await?;
        Ok(bundle_resources(bundle))
    }

    fn adapt(&self, record: ResourceRecord) -> ResourceRecord {
        match &self.adapter {
            Some(adapter) => adapter(record),
            None => record,
        }
    }
}

/// Pull the entry resources out of a search result bundle. A response that
/// is not a bundle (or has no entries) yields an empty list.
fn bundle_resources(bundle: Value) -> Vec<Value> {
    let Value::Object(mut fields) = bundle else {
        return Vec::new();
    };
    let Some(Value::Array(entries)) = fields.remove("entry") else {
        return Vec::new();
    };
    entries
        .into_iter()
        .filter_map(|mut entry| entry.get_mut("resource").map(Value::take))
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn bundle_resources_extracts_entries() {
        let bundle = json!({
            "resourceType": "Bundle",
            "entry": [
                {"resource": {"resourceType": "Patient", "id": "p1"}},
                {"resource": {"resourceType": "Patient", "id": "p2"}},
                {"fullUrl": "urn:no-resource-here"}
            ]
        });
        let resources = bundle_resources(bundle);
        assert_eq!(resources.len(), 2);
        assert_eq!(resources[0]["id"], "p1");
    }

    #[test]
    fn empty_or_missing_entry_yields_no_resources() {
        assert!(bundle_resources(json!({"resourceType": "Bundle"})).is_empty());
        assert!(bundle_resources(json!({"resourceType": "Bundle", "entry": []})).is_empty());
        assert!(bundle_resources(json!(null)).is_empty());
    }
}
