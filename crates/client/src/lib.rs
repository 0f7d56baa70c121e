//! # fhirbridge Client
//!
//! Authenticated request layer for FHIR-style resource servers.
//!
//! This crate contains:
//! - A shared HTTP transport with explicit lifecycle
//! - Credential strategy resolution and the machine-to-machine exchange
//! - The authenticated session state machine (bootstrap, refresh, bounded
//!   retry on authorization failures)
//! - Per-resource-type proxies with lazy search builders
//! - Reference resolution and cross-server replication
//!
//! ## Architecture Principles
//! - Depends only on `fhirbridge-domain`
//! - Token exchange is a port (trait); the session never knows grant details
//! - Only the 401/403 path is retried, bounded to three attempts

pub mod auth;
pub mod proxy;
pub mod replicate;
pub mod requester;
pub mod search;
pub mod session;
pub mod transport;

pub use auth::{
    check_id_token, ClientCredentialsExchange, CredentialResolver, IdTokenKey, TokenExchange,
};
pub use proxy::{RecordAdapter, ResourceInput, ResourceProxy};
pub use replicate::replicate;
pub use requester::TenantRequester;
pub use search::SearchBuilder;
pub use session::FhirSession;
pub use transport::{Transport, TransportBuilder};
