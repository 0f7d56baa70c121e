//! Per-resource-type persistence façade

use std::sync::Arc;

use fhirbridge_domain::{FhirError, ResourceRecord, Result};
use serde_json::Value;
use tracing::debug;

use crate::search::SearchBuilder;
use crate::session::FhirSession;

/// Per-tenant, per-resource-type conversion hook applied when wrapping
/// results. The Rust rendition of a per-tenant resource class registry.
pub type RecordAdapter = Arc<dyn Fn(ResourceRecord) -> ResourceRecord + Send + Sync>;

/// Externally supplied resource, normalized once at the API boundary.
///
/// `Native` is a raw field map coming straight from a resource-library
/// object; it must carry a `resourceType` field.
pub enum ResourceInput {
    Record(ResourceRecord),
    Native(Value),
}

impl ResourceInput {
    pub fn into_record(self) -> Result<ResourceRecord> {
        match self {
            Self::Record(record) => Ok(record),
            Self::Native(value) => ResourceRecord::from_value(value),
        }
    }
}

impl From<ResourceRecord> for ResourceInput {
    fn from(record: ResourceRecord) -> Self {
        Self::Record(record)
    }
}

impl From<Value> for ResourceInput {
    fn from(value: Value) -> Self {
        Self::Native(value)
    }
}

/// Search, save, update and delete for one resource type against one
/// session. Persistence failures are not retried here; auth retry belongs
/// to the session.
#[derive(Clone)]
pub struct ResourceProxy {
    session: Arc<FhirSession>,
    resource_type: String,
    adapter: Option<RecordAdapter>,
}

impl ResourceProxy {
    pub(crate) fn new(
        session: Arc<FhirSession>,
        resource_type: impl Into<String>,
        adapter: Option<RecordAdapter>,
    ) -> Self {
        Self { session, resource_type: resource_type.into(), adapter }
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    /// Start a lazy search over this resource type.
    #[must_use]
    pub fn search(&self) -> SearchBuilder {
        SearchBuilder::new(self.session.clone(), self.resource_type.clone(), self.adapter.clone())
    }

    /// Persist a resource: POST without an id (create), PUT with one
    /// (update).
    pub async fn save(&self, input: impl Into<ResourceInput>) -> Result<ResourceRecord> {
        let record = self.normalized(input)?;
        let value = match record.id() {
            Some(id) => {
                let path = format!("{}/{id}", self.resource_type);
                self.session.put(&path, &record.to_value()).await?
            }
            None => self.session.post(&self.resource_type, &record.to_value()).await?,
        };
        self.returned_record(record, value)
    }

    /// Update an existing resource. Requires a server-assigned id.
    pub async fn update(&self, input: impl Into<ResourceInput>) -> Result<ResourceRecord> {
        let record = self.normalized(input)?;
        let id = record
            .id()
            .ok_or_else(|| FhirError::InvalidInput("update requires a resource id".into()))?;
        let path = format!("{}/{id}", self.resource_type);
        let value = self.session.put(&path, &record.to_value()).await?;
        self.returned_record(record, value)
    }

    /// Delete an existing resource. Requires a server-assigned id.
    pub async fn delete(&self, input: impl Into<ResourceInput>) -> Result<()> {
        let record = self.normalized(input)?;
        let id = record
            .id()
            .ok_or_else(|| FhirError::InvalidInput("delete requires a resource id".into()))?;
        let path = format!("{}/{id}", self.resource_type);
        self.session.delete(&path).await?;
        debug!(resource_type = %self.resource_type, %id, "deleted resource");
        Ok(())
    }

    fn normalized(&self, input: impl Into<ResourceInput>) -> Result<ResourceRecord> {
        let record = input.into().into_record()?;
        if record.resource_type() != self.resource_type {
            return Err(FhirError::InvalidInput(format!(
                "resource type '{}' does not match proxy type '{}'",
                record.resource_type(),
                self.resource_type
            )));
        }
        Ok(record)
    }

    /// Wrap the server's echo of the resource; servers answering with an
    /// empty body fall back to the record we sent.
    fn returned_record(&self, sent: ResourceRecord, value: Value) -> Result<ResourceRecord> {
        let record =
            if value.is_null() { sent } else { ResourceRecord::from_value(value)? };
        Ok(self.adapt(record))
    }

    fn adapt(&self, record: ResourceRecord) -> ResourceRecord {
        match &self.adapter {
            Some(adapter) => adapter(record),
            None => record,
        }
    }
}
