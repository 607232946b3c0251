//! Request dispatcher
//!
//! Attaches the current access token to each call and classifies the
//! outcome. A 401 on a first attempt goes to the refresh coordinator, unless
//! the stored token already changed while the call was in flight, in which
//! case the call is replayed straight away. A 401 on a replayed call is
//! terminal.

use std::sync::Arc;

use common::Secret;
use session_auth::CredentialStore;
use tracing::{debug, instrument, warn};

use crate::call::{ApiCall, ApiResponse};
use crate::classify::into_result;
use crate::coordinator::RefreshCoordinator;
use crate::error::{Error, Result};
use crate::metrics;
use crate::transport::Transport;

/// Sends calls with the session's bearer token and recovers from expiry.
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    store: Arc<dyn CredentialStore>,
    coordinator: Arc<RefreshCoordinator>,
}

impl Dispatcher {
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<dyn CredentialStore>,
        coordinator: Arc<RefreshCoordinator>,
    ) -> Self {
        Self {
            transport,
            store,
            coordinator,
        }
    }

    pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.coordinator
    }

    /// Send a call, transparently refreshing the credential on expiry.
    #[instrument(skip_all, fields(call_id = %call.id(), method = %call.method, path = %call.path))]
    pub async fn send(&self, mut call: ApiCall) -> Result<ApiResponse> {
        call.ensure_sequence(|| self.coordinator.next_sequence());

        let access = self.current_access();
        let result = attempt(
            self.transport.as_ref(),
            &call,
            access.as_ref().map(|a| a.expose().as_str()),
        )
        .await;

        let result = match result {
            Err(Error::Unauthorized) if call.is_retried() => {
                warn!("access token rejected on an already retried call");
                Err(Error::AlreadyRetried)
            }
            Err(Error::Unauthorized) => match self.current_access() {
                Some(current) if Some(current.expose()) != access.as_ref().map(|a| a.expose()) => {
                    debug!("access token rotated while the call was in flight, replaying");
                    call.mark_retried();
                    let result = replay(self.transport.as_ref(), &call, current.expose()).await;
                    metrics::record_replay(match &result {
                        Ok(_) => "ok",
                        Err(e) => e.label(),
                    });
                    result
                }
                _ => {
                    debug!("access token rejected, handing call to refresh coordinator");
                    self.coordinator.recover(call).await
                }
            },
            other => other,
        };

        metrics::record_request(match &result {
            Ok(_) => "ok",
            Err(e) => e.label(),
        });
        result
    }

    /// Stored access token; an empty one counts as none.
    fn current_access(&self) -> Option<Secret<String>> {
        self.store
            .access_token()
            .filter(|access| !access.expose().is_empty())
    }
}

/// One exchange with `access` attached, classified.
pub(crate) async fn attempt(
    transport: &dyn Transport,
    call: &ApiCall,
    access: Option<&str>,
) -> Result<ApiResponse> {
    transport.execute(call, access).await.and_then(into_result)
}

/// Replay a queued call with the refreshed token. A second 401 is terminal.
pub(crate) async fn replay(
    transport: &dyn Transport,
    call: &ApiCall,
    access: &str,
) -> Result<ApiResponse> {
    match attempt(transport, call, Some(access)).await {
        Err(Error::Unauthorized) => {
            warn!(call_id = %call.id(), "replayed call rejected again, giving up");
            Err(Error::AlreadyRetried)
        }
        other => other,
    }
}
