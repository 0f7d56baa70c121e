//! FHIR-style resource references

use serde::{Deserialize, Serialize};

use crate::errors::{FhirError, Result};

/// A business identifier: a domain-specific external id, distinct from the
/// server-assigned resource id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identifier {
    #[serde(default)]
    pub system: Option<String>,
    pub value: String,
}

impl Identifier {
    #[must_use]
    pub fn new(system: Option<String>, value: impl Into<String>) -> Self {
        Self { system, value: value.into() }
    }
}

/// A reference to another resource, either by literal path
/// (`"Patient/p1"`) or by (resource type, business identifier) pair.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResourceReference {
    /// Literal reference path.
    #[serde(default)]
    pub reference: Option<String>,
    /// Target resource type, used together with `identifier`.
    #[serde(rename = "type", default)]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub identifier: Option<Identifier>,
}

impl ResourceReference {
    /// Build a literal local reference from a resource type and id.
    ///
    /// # Errors
    /// `InvalidInput` when either part is empty.
    pub fn local(resource_type: &str, id: &str) -> Result<Self> {
        if resource_type.is_empty() || id.is_empty() {
            return Err(FhirError::InvalidInput(
                "arguments `resource_type` and `id` or `reference` are required".into(),
            ));
        }
        Ok(Self {
            reference: Some(format!("{resource_type}/{id}")),
            resource_type: Some(resource_type.to_string()),
            identifier: None,
        })
    }

    /// Build a reference from a literal path.
    #[must_use]
    pub fn literal(reference: impl Into<String>) -> Self {
        Self { reference: Some(reference.into()), resource_type: None, identifier: None }
    }

    /// Build an identifier-based reference.
    #[must_use]
    pub fn by_identifier(resource_type: impl Into<String>, identifier: Identifier) -> Self {
        Self {
            reference: None,
            resource_type: Some(resource_type.into()),
            identifier: Some(identifier),
        }
    }

    /// Whether the literal path addresses a resource on the same server
    /// (`Type/id`, no scheme, no absolute URL).
    #[must_use]
    pub fn is_local(&self) -> bool {
        self.local_parts().is_some()
    }

    /// Split a local literal path into (resource type, id).
    #[must_use]
    pub fn local_parts(&self) -> Option<(&str, &str)> {
        let reference = self.reference.as_deref()?;
        if reference.contains("://") {
            return None;
        }
        let mut parts = reference.splitn(2, '/');
        let resource_type = parts.next().filter(|part| !part.is_empty())?;
        let id = parts.next().filter(|part| !part.is_empty() && !part.contains('/'))?;
        Some((resource_type, id))
    }
}
