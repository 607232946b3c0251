//! Authentication service calls: token refresh and logout
//!
//! Both calls POST JSON to paths under the API base URL. Refresh carries only
//! the refresh token in its body and no bearer header; logout carries the
//! current access token (if any) and is best effort.

use serde::{Deserialize, Serialize};

use crate::constants::{LOGOUT_PATH, REFRESH_PATH};
use crate::credentials::Credential;
use crate::error::{Error, Result};

/// Body of the refresh request.
#[derive(Debug, Serialize)]
pub struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

/// Response from the refresh endpoint: a rotated token pair.
#[derive(Debug, Deserialize, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
}

impl From<TokenResponse> for Credential {
    fn from(token: TokenResponse) -> Self {
        Credential::new(token.access_token, token.refresh_token)
    }
}

/// Join an API base URL and an absolute path.
pub fn endpoint_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Exchange a refresh token for a new token pair.
///
/// 401/403 mean the refresh token itself is no longer accepted and map to
/// `InvalidCredentials`. Any other non-success status or an unparseable body
/// is a `TokenEndpoint` error. The caller applies its own timeout.
pub async fn refresh_token(
    client: &reqwest::Client,
    base_url: &str,
    refresh: &str,
) -> Result<TokenResponse> {
    let response = client
        .post(endpoint_url(base_url, REFRESH_PATH))
        .json(&RefreshRequest {
            refresh_token: refresh,
        })
        .send()
        .await
        .map_err(|e| Error::Http(format!("token refresh request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));

        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(Error::InvalidCredentials(format!(
                "refresh token rejected ({status}): {body}"
            )));
        }

        return Err(Error::TokenEndpoint(format!(
            "token refresh returned {status}: {body}"
        )));
    }

    response
        .json::<TokenResponse>()
        .await
        .map_err(|e| Error::TokenEndpoint(format!("invalid refresh response: {e}")))
}

/// Tell the authentication service the session is over.
///
/// The response body is ignored. A non-success status is still reported so
/// the caller can log it, but nothing depends on this call succeeding.
pub async fn logout(client: &reqwest::Client, base_url: &str, access: Option<&str>) -> Result<()> {
    let mut request = client.post(endpoint_url(base_url, LOGOUT_PATH));
    if let Some(access) = access {
        request = request.bearer_auth(access);
    }

    let response = request
        .send()
        .await
        .map_err(|e| Error::Http(format!("logout request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::TokenEndpoint(format!("logout returned {status}")));
    }
    Ok(())
}
