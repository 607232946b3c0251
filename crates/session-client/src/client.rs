//! `SessionClient` facade
//!
//! Wires the credential store, transport, auth service, refresh coordinator
//! and dispatcher for one session. Everything is injectable through
//! `SessionClientBuilder`; only the base URL is needed for the HTTP defaults.

use std::sync::Arc;
use std::time::Duration;

use common::Secret;
use serde::de::DeserializeOwned;
use session_auth::{
    Credential, CredentialStore, DEFAULT_REFRESH_TIMEOUT_SECS, DEFAULT_REQUEST_TIMEOUT_SECS,
    MemoryCredentialStore,
};
use tracing::{info, warn};

use crate::auth_api::{AuthApi, HttpAuthApi};
use crate::call::{ApiCall, ApiResponse};
use crate::coordinator::RefreshCoordinator;
use crate::dispatcher::Dispatcher;
use crate::error::{Error, Result};
use crate::notifier::{LogNotifier, SessionNotifier};
use crate::transport::{HttpTransport, Transport};

/// Authenticated API client for one session.
pub struct SessionClient {
    dispatcher: Dispatcher,
    store: Arc<dyn CredentialStore>,
    auth: Arc<dyn AuthApi>,
    logout_timeout: Duration,
}

impl SessionClient {
    pub fn builder() -> SessionClientBuilder {
        SessionClientBuilder::default()
    }

    /// Send a call. A 401 is recovered by one shared credential refresh.
    pub async fn send(&self, call: ApiCall) -> Result<ApiResponse> {
        self.dispatcher.send(call).await
    }

    /// Send a call and decode the success body.
    pub async fn send_json<T: DeserializeOwned>(&self, call: ApiCall) -> Result<T> {
        self.send(call).await?.json()
    }

    pub async fn get(&self, path: &str) -> Result<ApiResponse> {
        self.send(ApiCall::get(path)).await
    }

    pub async fn post(&self, path: &str, body: serde_json::Value) -> Result<ApiResponse> {
        self.send(ApiCall::post(path).with_json(body)).await
    }

    pub async fn put(&self, path: &str, body: serde_json::Value) -> Result<ApiResponse> {
        self.send(ApiCall::put(path).with_json(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<ApiResponse> {
        self.send(ApiCall::delete(path)).await
    }

    /// Store an issued credential pair as a new session.
    pub fn login(&self, access: impl Into<String>, refresh: impl Into<String>) -> Result<()> {
        self.coordinator().start_session(Credential::new(access, refresh))?;
        info!("session credential stored");
        Ok(())
    }

    /// Tell the auth service the session is over, then forget the credential.
    ///
    /// The remote call is best effort and bounded by the refresh timeout; the
    /// local credential is cleared whatever its outcome. A refresh running at
    /// that point cannot bring the session back.
    pub async fn logout(&self) -> Result<()> {
        let access = self.store.access_token();
        let remote = tokio::time::timeout(
            self.logout_timeout,
            self.auth.logout(access.as_ref().map(|a| a.expose().as_str())),
        )
        .await;

        match remote {
            Ok(Ok(())) => info!("logged out"),
            Ok(Err(e)) => warn!(error = %e, "logout request failed, clearing local session anyway"),
            Err(_) => warn!("logout request timed out, clearing local session anyway"),
        }

        self.coordinator().end_session()?;
        Ok(())
    }

    /// Whether an access token is currently stored.
    pub fn is_authenticated(&self) -> bool {
        self.access_token().is_some()
    }

    pub fn access_token(&self) -> Option<Secret<String>> {
        self.store
            .access_token()
            .filter(|access| !access.expose().is_empty())
    }

    pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        self.dispatcher.coordinator()
    }
}

/// Builder for `SessionClient`.
pub struct SessionClientBuilder {
    base_url: Option<String>,
    timeout: Duration,
    refresh_timeout: Duration,
    http_client: Option<reqwest::Client>,
    store: Option<Arc<dyn CredentialStore>>,
    notifier: Option<Arc<dyn SessionNotifier>>,
    transport: Option<Arc<dyn Transport>>,
    auth: Option<Arc<dyn AuthApi>>,
}

impl Default for SessionClientBuilder {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            refresh_timeout: Duration::from_secs(DEFAULT_REFRESH_TIMEOUT_SECS),
            http_client: None,
            store: None,
            notifier: None,
            transport: None,
            auth: None,
        }
    }
}

impl SessionClientBuilder {
    /// API root shared by general calls and the auth service.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Per-call timeout for general API calls.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Bound on a single refresh exchange; also bounds logout.
    pub fn refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout = timeout;
        self
    }

    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn SessionNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn auth_api(mut self, auth: Arc<dyn AuthApi>) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn build(self) -> Result<SessionClient> {
        if self.timeout.is_zero() {
            return Err(Error::Config("request timeout must be greater than zero".into()));
        }
        if self.refresh_timeout.is_zero() {
            return Err(Error::Config("refresh timeout must be greater than zero".into()));
        }
        let base_url = self.base_url.map(validate_base_url).transpose()?;

        let (transport, auth) = match (self.transport, self.auth) {
            (Some(transport), Some(auth)) => (transport, auth),
            (transport, auth) => {
                let base_url = base_url.ok_or_else(|| {
                    Error::Config("base_url is required for the HTTP transport".into())
                })?;
                let client = match self.http_client {
                    Some(client) => client,
                    None => reqwest::Client::builder()
                        .build()
                        .map_err(|e| Error::Config(format!("building HTTP client: {e}")))?,
                };
                let transport = transport.unwrap_or_else(|| {
                    Arc::new(HttpTransport::new(
                        client.clone(),
                        base_url.clone(),
                        self.timeout,
                    )) as Arc<dyn Transport>
                });
                let auth = auth.unwrap_or_else(|| {
                    Arc::new(HttpAuthApi::new(client, base_url)) as Arc<dyn AuthApi>
                });
                (transport, auth)
            }
        };

        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryCredentialStore::new()) as Arc<dyn CredentialStore>);
        let notifier = self
            .notifier
            .unwrap_or_else(|| Arc::new(LogNotifier) as Arc<dyn SessionNotifier>);

        let coordinator = Arc::new(RefreshCoordinator::new(
            store.clone(),
            auth.clone(),
            transport.clone(),
            notifier,
            self.refresh_timeout,
        ));

        Ok(SessionClient {
            dispatcher: Dispatcher::new(transport, store.clone(), coordinator),
            store,
            auth,
            logout_timeout: self.refresh_timeout,
        })
    }
}

/// Accept only absolute http(s) URLs; trailing slashes are dropped.
fn validate_base_url(base_url: String) -> Result<String> {
    common::Error::check_url("base_url", &base_url).map_err(|e| Error::Config(e.to_string()))?;
    Ok(base_url.trim_end_matches('/').to_string())
}
