//! Mapping-shaped resource records

use serde_json::{Map, Value};

use crate::errors::{FhirError, Result};

/// A resource as a typed tag plus a raw field map.
///
/// Produced either from raw HTTP JSON or from a native resource-library
/// object serialized to JSON. The record holds plain data only; it never
/// carries session or registry references, so it can cross server
/// boundaries as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRecord {
    resource_type: String,
    fields: Map<String, Value>,
}

impl ResourceRecord {
    /// Create an empty record of the given type.
    #[must_use]
    pub fn new(resource_type: impl Into<String>) -> Self {
        let resource_type = resource_type.into();
        let mut fields = Map::new();
        fields.insert("resourceType".to_string(), Value::String(resource_type.clone()));
        Self { resource_type, fields }
    }

    /// Build a record from a JSON value.
    ///
    /// # Errors
    /// `InvalidInput` when the value is not an object or lacks a string
    /// `resourceType` field.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(fields) = value else {
            return Err(FhirError::InvalidInput("resource must be a JSON object".into()));
        };
        let resource_type = fields
            .get("resourceType")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                FhirError::InvalidInput("resource is missing a resourceType field".into())
            })?
            .to_string();
        Ok(Self { resource_type, fields })
    }

    #[must_use]
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    /// Server-assigned id, if any.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.fields.get("id").and_then(Value::as_str)
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.fields.insert("id".to_string(), Value::String(id.into()));
    }

    pub fn clear_id(&mut self) {
        self.fields.remove("id");
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn set(&mut self, field: impl Into<String>, value: Value) {
        self.fields.insert(field.into(), value);
    }

    /// Extract the business-identifier value whose `system` matches
    /// `system_url` from the record's `identifier` list.
    #[must_use]
    pub fn identifier_value(&self, system_url: &str) -> Option<String> {
        let identifiers = self.fields.get("identifier")?.as_array()?;
        identifiers.iter().find_map(|entry| {
            let system = entry.get("system").and_then(Value::as_str)?;
            if system != system_url {
                return None;
            }
            entry.get("value").and_then(Value::as_str).map(str::to_string)
        })
    }

    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }

    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn patient() -> ResourceRecord {
        ResourceRecord::from_value(json!({
            "resourceType": "Patient",
            "id": "p1",
            "identifier": [
                {"system": "http://acme.test/mrn", "value": "MRN-42"},
                {"system": "http://other.test/ids", "value": "X-1"}
            ],
        }))
        .unwrap()
    }

    #[test]
    fn from_value_requires_resource_type() {
        let err = ResourceRecord::from_value(json!({"id": "p1"})).unwrap_err();
        assert!(matches!(err, FhirError::InvalidInput(_)));

        let err = ResourceRecord::from_value(json!(["not", "an", "object"])).unwrap_err();
        assert!(matches!(err, FhirError::InvalidInput(_)));
    }

    #[test]
    fn identifier_lookup_matches_on_system() {
        let record = patient();
        assert_eq!(record.identifier_value("http://acme.test/mrn").as_deref(), Some("MRN-42"));
        assert_eq!(record.identifier_value("http://unknown.test"), None);
    }

    #[test]
    fn id_can_be_overwritten_and_cleared() {
        let mut record = patient();
        assert_eq!(record.id(), Some("p1"));

        record.set_id("target-9");
        assert_eq!(record.id(), Some("target-9"));

        record.clear_id();
        assert_eq!(record.id(), None);
        assert!(!record.to_value().as_object().unwrap().contains_key("id"));
    }

    #[test]
    fn round_trips_through_value() {
        let record = patient();
        let again = ResourceRecord::from_value(record.to_value()).unwrap();
        assert_eq!(record, again);
    }
}
