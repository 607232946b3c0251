//! Authentication service seam used by the refresh coordinator and logout

use std::future::Future;
use std::pin::Pin;

use session_auth::Credential;

/// The two authentication-service operations the client depends on.
pub trait AuthApi: Send + Sync {
    /// Exchange a refresh token for a rotated credential pair.
    fn refresh<'a>(
        &'a self,
        refresh_token: &'a str,
    ) -> Pin<Box<dyn Future<Output = session_auth::Result<Credential>> + Send + 'a>>;

    /// Best-effort logout notification.
    fn logout<'a>(
        &'a self,
        access: Option<&'a str>,
    ) -> Pin<Box<dyn Future<Output = session_auth::Result<()>> + Send + 'a>>;
}

/// reqwest-backed authentication service client.
pub struct HttpAuthApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAuthApi {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

impl AuthApi for HttpAuthApi {
    fn refresh<'a>(
        &'a self,
        refresh_token: &'a str,
    ) -> Pin<Box<dyn Future<Output = session_auth::Result<Credential>> + Send + 'a>> {
        Box::pin(async move {
            session_auth::refresh_token(&self.client, &self.base_url, refresh_token)
                .await
                .map(Credential::from)
        })
    }

    fn logout<'a>(
        &'a self,
        access: Option<&'a str>,
    ) -> Pin<Box<dyn Future<Output = session_auth::Result<()>> + Send + 'a>> {
        Box::pin(session_auth::logout(&self.client, &self.base_url, access))
    }
}
