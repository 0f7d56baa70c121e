//! Token exchange port and the machine-to-machine implementation

use std::collections::BTreeMap;

use async_trait::async_trait;
use fhirbridge_domain::{FhirError, Partner, Result, TokenResponse, TokenSet};
use tracing::debug;

use crate::transport::Transport;

/// Port for strategy-specific token exchanges.
///
/// Both calls hit an external authorization server; this layer treats the
/// grant details as opaque and only consumes the resulting token pair.
#[async_trait]
pub trait TokenExchange: Send + Sync {
    /// Obtain a fresh token pair for the partner.
    ///
    /// `params` carries strategy-specific parameters from the tenant scope
    /// (scopes, audience, tenant hints); empty when no scope is attached.
    async fn fetch_access_token(
        &self,
        transport: &Transport,
        partner: &Partner,
        params: &BTreeMap<String, String>,
    ) -> Result<TokenSet>;

    /// Trade a refresh token for a new token pair.
    async fn refresh_access_token(
        &self,
        transport: &Transport,
        partner: &Partner,
        refresh_token: &str,
    ) -> Result<TokenSet>;
}

/// Machine-to-machine exchange: OAuth client credentials against the
/// partner's token endpoint.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClientCredentialsExchange;

impl ClientCredentialsExchange {
    async fn post_token_request(
        transport: &Transport,
        partner: &Partner,
        form: &[(String, String)],
    ) -> Result<TokenSet> {
        let token_url = partner
            .token_url
            .as_deref()
            .ok_or_else(|| FhirError::InvalidInput("partner has no token url".into()))?;

        let response = transport
            .client()
            .post(token_url)
            .form(form)
            .send()
            .await
            .map_err(|err| FhirError::Network(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(%status, partner = %partner.name, "token endpoint refused the exchange");
            return Err(FhirError::Unauthorized(format!(
                "token endpoint answered {status}: {body}"
            )));
        }

        let parsed: TokenResponse =
            response.json().await.map_err(|err| FhirError::Decode(err.to_string()))?;
        Ok(TokenSet::from(parsed))
    }

    fn credential_form(partner: &Partner, grant_type: &str) -> Vec<(String, String)> {
        let mut form = vec![("grant_type".to_string(), grant_type.to_string())];
        if let Some(client_id) = &partner.client_id {
            form.push(("client_id".to_string(), client_id.clone()));
        }
        if let Some(client_secret) = &partner.client_secret {
            form.push(("client_secret".to_string(), client_secret.clone()));
        }
        form
    }
}

#[async_trait]
impl TokenExchange for ClientCredentialsExchange {
    async fn fetch_access_token(
        &self,
        transport: &Transport,
        partner: &Partner,
        params: &BTreeMap<String, String>,
    ) -> Result<TokenSet> {
        let mut form = Self::credential_form(partner, "client_credentials");
        form.extend(params.iter().map(|(name, value)| (name.clone(), value.clone())));
        Self::post_token_request(transport, partner, &form).await
    }

    async fn refresh_access_token(
        &self,
        transport: &Transport,
        partner: &Partner,
        refresh_token: &str,
    ) -> Result<TokenSet> {
        let mut form = Self::credential_form(partner, "refresh_token");
        form.push(("refresh_token".to_string(), refresh_token.to_string()));
        Self::post_token_request(transport, partner, &form).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_form_includes_configured_credentials() {
        let mut partner = Partner::new("Acme Health", std::collections::BTreeSet::new());
        partner.client_id = Some("cid".into());
        partner.client_secret = Some("secret".into());

        let form = ClientCredentialsExchange::credential_form(&partner, "client_credentials");
        assert!(form.contains(&("grant_type".to_string(), "client_credentials".to_string())));
        assert!(form.contains(&("client_id".to_string(), "cid".to_string())));
        assert!(form.contains(&("client_secret".to_string(), "secret".to_string())));
    }

    #[tokio::test]
    async fn missing_token_url_is_a_configuration_error() {
        let partner = Partner::new("Acme Health", std::collections::BTreeSet::new());
        let transport = Transport::builder().build().unwrap();

        let result = ClientCredentialsExchange
            .fetch_access_token(&transport, &partner, &BTreeMap::new())
            .await;
        assert!(matches!(result, Err(FhirError::InvalidInput(_))));
    }
}
