//! Shared HTTP transport
//!
//! One connection pool is reused across every tenant's sessions. Components
//! receive a [`Transport`] explicitly at construction; [`Transport::shared`]
//! provides the process-wide instance for top-level convenience.

use std::time::Duration;

use fhirbridge_domain::{FhirError, Result};
use once_cell::sync::OnceCell;
use reqwest::Client;

static SHARED: OnceCell<Transport> = OnceCell::new();

/// Cheap-to-clone handle over a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct Transport {
    client: Client,
}

impl Transport {
    /// Start building a transport.
    pub fn builder() -> TransportBuilder {
        TransportBuilder::default()
    }

    /// Process-wide transport, initialized lazily on first use.
    ///
    /// The underlying pool is torn down when the last handle drops at
    /// process shutdown.
    pub fn shared() -> Self {
        SHARED
            .get_or_init(|| {
                Self::builder().build().unwrap_or_else(|_| Self { client: Client::new() })
            })
            .clone()
    }

    /// Access the underlying reqwest client.
    pub fn client(&self) -> &Client {
        &self.client
    }
}

/// Builder for [`Transport`].
#[derive(Debug)]
pub struct TransportBuilder {
    timeout: Duration,
    user_agent: Option<String>,
    no_proxy: bool,
}

impl Default for TransportBuilder {
    fn default() -> Self {
        Self { timeout: Duration::from_secs(30), user_agent: None, no_proxy: false }
    }
}

impl TransportBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn no_proxy(mut self, enabled: bool) -> Self {
        self.no_proxy = enabled;
        self
    }

    pub fn build(self) -> Result<Transport> {
        let mut builder = Client::builder().timeout(self.timeout);

        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        if self.no_proxy {
            builder = builder.no_proxy();
        }

        let client = builder.build().map_err(|err| FhirError::Network(err.to_string()))?;
        Ok(Transport { client })
    }
}
