//! Partner configuration and credential strategies

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Credential-exchange mechanism used to obtain an access token.
///
/// This is a closed enumeration: adding a kind is a code change, not
/// configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Strategy {
    /// Machine-to-machine credential exchange (client credentials grant).
    MachineToMachine,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MachineToMachine => write!(f, "machine-to-machine"),
        }
    }
}

/// Immutable configuration for one external data-providing organization.
///
/// One instance per partner, owned by the application and long-lived. The
/// mutable per-tenant token state lives in the session, never here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Partner {
    /// Partner display name, also the default tenant key.
    pub name: String,
    /// Strategies this partner supports. Requesting any other strategy
    /// yields "no token" rather than an error.
    pub supported_strategies: BTreeSet<Strategy>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub token_url: Option<String>,
    pub authorize_url: Option<String>,
    /// Base URL of the partner's resource server.
    pub fhir_url: Option<String>,
}

impl Partner {
    /// Create a partner supporting the given strategies.
    #[must_use]
    pub fn new(name: impl Into<String>, supported_strategies: BTreeSet<Strategy>) -> Self {
        Self {
            name: name.into(),
            supported_strategies,
            client_id: None,
            client_secret: None,
            token_url: None,
            authorize_url: None,
            fhir_url: None,
        }
    }

    /// Whether this partner declares support for `strategy`.
    #[must_use]
    pub fn supports(&self, strategy: Strategy) -> bool {
        self.supported_strategies.contains(&strategy)
    }
}
