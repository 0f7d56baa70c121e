//! Credential strategies and token verification
//!
//! The session never performs grant flows itself: it resolves tokens
//! through a [`CredentialResolver`], which dispatches to a pluggable
//! [`TokenExchange`] per strategy. Machine-to-machine (client credentials)
//! is the one exchange shipped here.

pub mod exchange;
pub mod resolver;
pub mod verify;

pub use exchange::{ClientCredentialsExchange, TokenExchange};
pub use resolver::CredentialResolver;
pub use verify::{check_id_token, IdTokenKey};
