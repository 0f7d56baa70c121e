//! Authenticated session state machine
//!
//! One session per (tenant key, direction). Holds the mutable bearer and
//! refresh tokens for that tenant-direction and owns the only retry loop in
//! the system: 401/403 → refresh-token exchange → retry, bounded to three
//! total attempts. Everything else propagates unchanged.

use std::collections::BTreeMap;

use fhirbridge_domain::{FhirError, Result, Strategy, TokenSet};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::auth::CredentialResolver;
use crate::transport::Transport;

/// Total HTTP attempts per call. The bound exists because a refresh token
/// can itself be stale; unbounded retry would loop forever against a
/// permanently revoked credential.
const MAX_ATTEMPTS: usize = 3;

#[derive(Debug, Default)]
struct TokenState {
    bearer: Option<String>,
    refresh: Option<String>,
}

/// Authenticated request client bound to one base URL.
///
/// Token fields are mutated in place during refresh. Scheduling is
/// cooperative and the refresh-then-retry sequence is uninterrupted per
/// call, so concurrent calls on the same session never observe a partial
/// token update; the internal mutex covers the thread-parallel case.
pub struct FhirSession {
    base_url: String,
    transport: Transport,
    credentials: Option<CredentialResolver>,
    strategy: Option<Strategy>,
    scope_params: BTreeMap<String, String>,
    state: Mutex<TokenState>,
}

impl FhirSession {
    /// Start building a session for `base_url`.
    pub fn builder(base_url: impl Into<String>, transport: Transport) -> FhirSessionBuilder {
        FhirSessionBuilder {
            base_url: base_url.into(),
            transport,
            credentials: None,
            strategy: None,
            scope_params: BTreeMap::new(),
            bearer: None,
            refresh: None,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Partner name behind this session's credentials, if any.
    pub fn partner_name(&self) -> Option<&str> {
        self.credentials.as_ref().map(|resolver| resolver.partner().name.as_str())
    }

    pub async fn bearer_token(&self) -> Option<String> {
        self.state.lock().await.bearer.clone()
    }

    pub async fn refresh_token(&self) -> Option<String> {
        self.state.lock().await.refresh.clone()
    }

    /// Bootstrap a token if none is held.
    ///
    /// Returns whether the session holds a bearer token afterwards. An
    /// unsupported strategy (or no credentials at all) leaves the session
    /// unauthenticated without error; exchange failures are normalized to
    /// `Unauthorized` and leave the session unauthenticated so the next
    /// call retries the bootstrap.
    pub async fn authenticate(&self) -> Result<bool> {
        let mut state = self.state.lock().await;
        if state.bearer.is_some() {
            return Ok(true);
        }

        let (Some(credentials), Some(strategy)) = (&self.credentials, self.strategy) else {
            return Ok(false);
        };

        debug!(partner = %credentials.partner().name, "trying to fetch access token");
        match credentials.resolve(strategy, &self.transport, &self.scope_params).await {
            Ok(Some(tokens)) => {
                state.bearer = Some(tokens.access_token);
                state.refresh = tokens.refresh_token;
                Ok(true)
            }
            Ok(None) => Ok(false),
            Err(err) => {
                warn!(partner = %credentials.partner().name, error = %err, "unable to fetch access token");
                Err(FhirError::Unauthorized("Can not get access token".into()))
            }
        }
    }

    /// Trade the held refresh token for a fresh pair, replacing both
    /// tokens in place.
    async fn refresh_tokens(&self) -> Result<()> {
        let refresh = { self.state.lock().await.refresh.clone() };
        let refresh = refresh
            .ok_or_else(|| FhirError::Unauthorized("no refresh token available".into()))?;

        let (Some(credentials), Some(strategy)) = (&self.credentials, self.strategy) else {
            return Err(FhirError::Unauthorized("no credential strategy configured".into()));
        };

        let tokens: TokenSet = credentials
            .refresh(strategy, &self.transport, &refresh)
            .await
            .map_err(|err| match err {
                err @ FhirError::StrategyNotFound(_) => err,
                other => FhirError::Unauthorized(format!("refresh token exchange failed: {other}")),
            })?;

        let mut state = self.state.lock().await;
        state.bearer = Some(tokens.access_token);
        state.refresh = tokens.refresh_token;
        Ok(())
    }

    /// Perform an authenticated request against `{base_url}/{path}`.
    ///
    /// Classification: 2xx parses the JSON body (empty body → `Null`),
    /// 404/410 → `NotFound`, 401/403 refreshes and retries up to
    /// [`MAX_ATTEMPTS`], anything else → `OperationOutcome`.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        params: &[(String, String)],
    ) -> Result<Value> {
        let url = self.url_for(path);

        for attempt in 1..=MAX_ATTEMPTS {
            self.authenticate().await?;
            let bearer = self.bearer_token().await;

            let mut request = self.transport.client().request(method.clone(), &url);
            if !params.is_empty() {
                request = request.query(params);
            }
            if let Some(bearer) = &bearer {
                request = request.bearer_auth(bearer);
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            debug!(%method, %url, attempt, "sending request");
            let response =
                request.send().await.map_err(|err| FhirError::Network(err.to_string()))?;
            let status = response.status();
            debug!(%method, %url, %status, attempt, "received response");

            if status.is_success() {
                let text =
                    response.text().await.map_err(|err| FhirError::Network(err.to_string()))?;
                if text.trim().is_empty() {
                    return Ok(Value::Null);
                }
                return serde_json::from_str(&text)
                    .map_err(|err| FhirError::Decode(err.to_string()));
            }

            if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
                let text = response.text().await.unwrap_or_default();
                return Err(FhirError::NotFound(text));
            }

            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                if attempt == MAX_ATTEMPTS {
                    return Err(FhirError::Unauthorized(format!(
                        "authorization failed after {MAX_ATTEMPTS} attempts"
                    )));
                }
                self.refresh_tokens().await?;
                continue;
            }

            let text = response.text().await.unwrap_or_default();
            return Err(FhirError::outcome_from_body(&text));
        }

        Err(FhirError::Internal("request loop ended without a result".into()))
    }

    pub async fn get(&self, path: &str, params: &[(String, String)]) -> Result<Value> {
        self.request(Method::GET, path, None, params).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        self.request(Method::POST, path, Some(body), &[]).await
    }

    pub async fn put(&self, path: &str, body: &Value) -> Result<Value> {
        self.request(Method::PUT, path, Some(body), &[]).await
    }

    pub async fn delete(&self, path: &str) -> Result<Value> {
        self.request(Method::DELETE, path, None, &[]).await
    }

    fn url_for(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        if path.is_empty() {
            base.to_string()
        } else {
            format!("{base}/{path}")
        }
    }
}

impl std::fmt::Debug for FhirSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FhirSession")
            .field("base_url", &self.base_url)
            .field("strategy", &self.strategy)
            .finish_non_exhaustive()
    }
}

/// Builder for [`FhirSession`].
pub struct FhirSessionBuilder {
    base_url: String,
    transport: Transport,
    credentials: Option<CredentialResolver>,
    strategy: Option<Strategy>,
    scope_params: BTreeMap<String, String>,
    bearer: Option<String>,
    refresh: Option<String>,
}

impl FhirSessionBuilder {
    /// Attach a credential resolver and the strategy to resolve with.
    #[must_use]
    pub fn credentials(mut self, resolver: CredentialResolver, strategy: Strategy) -> Self {
        self.credentials = Some(resolver);
        self.strategy = Some(strategy);
        self
    }

    /// Forward tenant-scope parameters to the credential exchange.
    #[must_use]
    pub fn scope_params(mut self, params: BTreeMap<String, String>) -> Self {
        self.scope_params = params;
        self
    }

    /// Seed the bearer token (target sessions, pre-issued tokens).
    #[must_use]
    pub fn bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    /// Seed the refresh token.
    #[must_use]
    pub fn refresh(mut self, token: impl Into<String>) -> Self {
        self.refresh = Some(token.into());
        self
    }

    pub fn build(self) -> FhirSession {
        FhirSession {
            base_url: self.base_url,
            transport: self.transport,
            credentials: self.credentials,
            strategy: self.strategy,
            scope_params: self.scope_params,
            state: Mutex::new(TokenState { bearer: self.bearer, refresh: self.refresh }),
        }
    }
}
