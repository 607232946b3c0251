//! Transport seam between the dispatcher and the network
//!
//! The dispatcher never talks to reqwest directly. `Transport` performs one
//! HTTP exchange and reports the raw status; classification and the refresh
//! flow live above it. Uses `Pin<Box<dyn Future>>` return types for
//! dyn-compatibility (`Arc<dyn Transport>`).

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, HeaderValue};
use session_auth::endpoint_url;
use tracing::debug;

use crate::call::{ApiCall, ApiResponse};
use crate::error::{Error, Result};

/// Performs a single outbound exchange.
///
/// Implementations return `Ok` for any HTTP response, including 401 and 5xx,
/// and `Err(Error::Transport)` only when no response was obtained.
pub trait Transport: Send + Sync {
    fn execute<'a>(
        &'a self,
        call: &'a ApiCall,
        access: Option<&'a str>,
    ) -> Pin<Box<dyn Future<Output = Result<ApiResponse>> + Send + 'a>>;
}

/// reqwest-backed transport rooted at an API base URL.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            timeout,
        }
    }
}

impl Transport for HttpTransport {
    fn execute<'a>(
        &'a self,
        call: &'a ApiCall,
        access: Option<&'a str>,
    ) -> Pin<Box<dyn Future<Output = Result<ApiResponse>> + Send + 'a>> {
        Box::pin(async move {
            let url = endpoint_url(&self.base_url, &call.path);
            let mut request = self
                .client
                .request(call.method.clone(), &url)
                .timeout(self.timeout)
                .header(CONTENT_TYPE, HeaderValue::from_static("application/json"));

            if let Some(access) = access {
                request = request.bearer_auth(access);
            }
            if let Some(body) = &call.body {
                request = request.json(body);
            }

            let response = request.send().await.map_err(|e| {
                if e.is_timeout() {
                    Error::Transport(format!(
                        "request timed out after {}s",
                        self.timeout.as_secs_f64()
                    ))
                } else {
                    Error::Transport(e.to_string())
                }
            })?;

            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .map_err(|e| Error::Transport(format!("reading response body: {e}")))?;

            debug!(call_id = %call.id(), status, "response received");
            Ok(ApiResponse { status, body })
        })
    }
}
