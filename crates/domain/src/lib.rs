//! # fhirbridge Domain
//!
//! Business domain types and models for fhirbridge.
//!
//! This crate contains:
//! - Partner and organization configuration types
//! - Resource records, references and identifiers
//! - Token types for the credential exchange wire format
//! - Domain error types and Result definitions
//!
//! ## Architecture
//! - No dependencies on other fhirbridge crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod errors;
pub mod types;

// Re-export commonly used items
pub use errors::*;
pub use types::*;
