//! # fhirbridge Registry
//!
//! Multi-tenant registry over the client layer.
//!
//! This crate contains:
//! - The registration builder (partner, strategy, tenant scope, adapter
//!   overrides, target-server auth)
//! - The tenant registry mapping tenant keys to a source/target pair of
//!   request contexts
//!
//! ## Architecture Principles
//! - Registrations are explicit map entries keyed by tenant key, never
//!   dynamically synthesized fields
//! - Exactly one source and one target session exist per tenant key
//! - Lookup misses warn and return absent; they never fail the call

pub mod builder;
pub mod registry;

pub use builder::{SessionBuilder, TargetAuth};
pub use registry::{TenantEntry, TenantRegistry};
