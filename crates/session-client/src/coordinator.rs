//! Single-flight credential refresh
//!
//! The coordinator owns the `Idle`/`Refreshing` flag and the queue of calls
//! blocked on an expired access token. The first 401 observed while `Idle`
//! flips the state and starts exactly one refresh episode; every later 401
//! joins the queue of that episode instead of starting another.
//!
//! Transitions:
//! - Idle → Refreshing (first 401, under the state lock)
//! - Refreshing → Idle (episode settled: queue taken in the same critical section)
//!
//! Login and logout go through `start_session` / `end_session`, which bump a
//! session epoch. An episode only commits its refreshed credential (or clears
//! the store on failure) if the epoch is unchanged since it read the refresh
//! token; otherwise its queue fails without replay.
//!
//! The episode runs on its own spawned task. Callers only hold a oneshot
//! receiver, so a caller that gives up cannot strand the coordinator in
//! `Refreshing`, and an episode whose task is torn down fails its queue
//! through `EpisodeGuard` rather than leaving it blocked forever.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use session_auth::{Credential, CredentialStore};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::auth_api::AuthApi;
use crate::call::{ApiCall, ApiResponse};
use crate::dispatcher;
use crate::error::{Error, Result};
use crate::metrics;
use crate::notifier::SessionNotifier;
use crate::transport::Transport;

/// Refresh state of one client session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    Refreshing,
}

/// A call waiting for the current episode to settle.
struct PendingCall {
    call: ApiCall,
    respond_to: oneshot::Sender<Result<ApiResponse>>,
}

struct Inner {
    state: RefreshState,
    queue: VecDeque<PendingCall>,
    episodes: u64,
    epoch: u64,
}

/// How an episode ended once its result met the current session.
enum Outcome {
    Refreshed(String),
    Failed(String),
    /// The session was ended or replaced while the refresh was in flight.
    Superseded,
}

/// Coordinates credential refresh for one client session.
///
/// Holds the only copies of the refresh flag and queue; construct one per
/// session and share it via `Arc`.
pub struct RefreshCoordinator {
    inner: Mutex<Inner>,
    next_sequence: AtomicU64,
    store: Arc<dyn CredentialStore>,
    auth: Arc<dyn AuthApi>,
    transport: Arc<dyn Transport>,
    notifier: Arc<dyn SessionNotifier>,
    refresh_timeout: Duration,
}

impl RefreshCoordinator {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        auth: Arc<dyn AuthApi>,
        transport: Arc<dyn Transport>,
        notifier: Arc<dyn SessionNotifier>,
        refresh_timeout: Duration,
    ) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: RefreshState::Idle,
                queue: VecDeque::new(),
                episodes: 0,
                epoch: 0,
            }),
            next_sequence: AtomicU64::new(0),
            store,
            auth,
            transport,
            notifier,
            refresh_timeout,
        }
    }

    /// Current refresh state.
    pub fn state(&self) -> RefreshState {
        self.inner.lock().state
    }

    /// Number of calls blocked on the current episode.
    pub fn queued(&self) -> usize {
        self.inner.lock().queue.len()
    }

    /// Number of refresh episodes started so far.
    pub fn episodes(&self) -> u64 {
        self.inner.lock().episodes
    }

    /// Issuance stamp shared by every dispatcher on this session.
    pub(crate) fn next_sequence(&self) -> u64 {
        self.next_sequence.fetch_add(1, Ordering::Relaxed)
    }

    /// Store a freshly issued credential as a new session.
    ///
    /// A refresh still running for the previous session will not overwrite it.
    pub fn start_session(&self, credential: Credential) -> session_auth::Result<()> {
        let mut inner = self.inner.lock();
        inner.epoch += 1;
        self.store.set(credential)
    }

    /// Forget the stored credential. A refresh in flight is discarded.
    pub fn end_session(&self) -> session_auth::Result<()> {
        let mut inner = self.inner.lock();
        inner.epoch += 1;
        self.store.clear()
    }

    /// Hand over a call that was rejected with 401 on its first attempt.
    ///
    /// The call is queued; if no episode is running one is started. Resolves
    /// with the replay's result once the episode settles.
    pub async fn recover(self: &Arc<Self>, mut call: ApiCall) -> Result<ApiResponse> {
        call.mark_retried();
        call.ensure_sequence(|| self.next_sequence());
        let call_id = call.id();
        let (tx, rx) = oneshot::channel();

        let start_episode = {
            let mut inner = self.inner.lock();
            inner.queue.push_back(PendingCall {
                call,
                respond_to: tx,
            });
            metrics::queue_grew();
            match inner.state {
                RefreshState::Idle => {
                    inner.state = RefreshState::Refreshing;
                    inner.episodes += 1;
                    true
                }
                RefreshState::Refreshing => {
                    debug!(%call_id, queued = inner.queue.len(), "refresh in progress, call queued");
                    false
                }
            }
        };

        if start_episode {
            info!(%call_id, "access token rejected, starting credential refresh");
            let coordinator = Arc::clone(self);
            tokio::spawn(async move { coordinator.run_episode().await });
        }

        rx.await.unwrap_or_else(|_| {
            Err(Error::RefreshFailed(
                "refresh episode ended before replaying the call".into(),
            ))
        })
    }

    /// Run one refresh episode to completion and settle the queue.
    async fn run_episode(self: Arc<Self>) {
        let mut guard = EpisodeGuard {
            coordinator: &self,
            settled: false,
        };

        let (epoch, credential) = {
            let inner = self.inner.lock();
            (inner.epoch, self.store.get())
        };
        let refreshed = self.refresh(credential).await;

        match self.commit(epoch, refreshed) {
            Outcome::Refreshed(access) => {
                let batch = self.settle();
                guard.settled = true;
                metrics::record_refresh("success");
                info!(replaying = batch.len(), "credential refreshed, replaying blocked calls");

                // Sequential replay keeps the batch in issuance order end to end
                for pending in batch {
                    let call_id = pending.call.id();
                    let result =
                        dispatcher::replay(self.transport.as_ref(), &pending.call, &access).await;
                    metrics::record_replay(match &result {
                        Ok(_) => "ok",
                        Err(e) => e.label(),
                    });
                    if pending.respond_to.send(result).is_err() {
                        debug!(%call_id, "caller went away before its replay finished");
                    }
                }
            }
            Outcome::Superseded => {
                let batch = self.settle();
                guard.settled = true;
                metrics::record_refresh("superseded");
                info!(failed_calls = batch.len(), "session changed during refresh, discarding result");

                let error = Error::RefreshFailed("session ended during refresh".into());
                for pending in batch {
                    let _ = pending.respond_to.send(Err(error.clone()));
                }
            }
            Outcome::Failed(reason) => {
                let batch = self.settle();
                guard.settled = true;
                metrics::record_refresh("failed");
                warn!(failed_calls = batch.len(), reason = %reason, "credential refresh failed, session ended");

                self.notifier.notify_unrecoverable(&reason);

                let error = Error::RefreshFailed(reason);
                for pending in batch {
                    let _ = pending.respond_to.send(Err(error.clone()));
                }
            }
        }
    }

    /// Exchange the refresh token of `credential` for a new credential.
    async fn refresh(
        &self,
        credential: Option<Credential>,
    ) -> std::result::Result<Credential, String> {
        let Some(refresh_token) = credential.as_ref().and_then(|c| c.refresh_token()) else {
            return Err("no refresh token available".into());
        };

        match tokio::time::timeout(self.refresh_timeout, self.auth.refresh(refresh_token)).await {
            Ok(Ok(refreshed)) => Ok(refreshed),
            Ok(Err(e)) => {
                debug!(rejected = e.is_rejection(), error = %e, "auth service did not refresh");
                Err(e.to_string())
            }
            Err(_) => Err(format!(
                "refresh timed out after {}s",
                self.refresh_timeout.as_secs_f64()
            )),
        }
    }

    /// Apply a refresh result to the store, unless the session it was read
    /// from has since been ended or replaced.
    fn commit(&self, epoch: u64, refreshed: std::result::Result<Credential, String>) -> Outcome {
        let inner = self.inner.lock();
        if inner.epoch != epoch {
            return Outcome::Superseded;
        }
        match refreshed {
            Ok(credential) => {
                let access = credential.access.expose().clone();
                if let Err(e) = self.store.set(credential) {
                    warn!(error = %e, "failed to persist refreshed credential");
                }
                Outcome::Refreshed(access)
            }
            Err(reason) => {
                if let Err(e) = self.store.clear() {
                    warn!(error = %e, "failed to clear credential after refresh failure");
                }
                Outcome::Failed(reason)
            }
        }
    }

    /// Return to `Idle` and take the whole queue in one critical section.
    ///
    /// Any call that enqueued before this point belongs to the batch; any
    /// call after it starts a new episode. The batch is ordered by issuance.
    fn settle(&self) -> Vec<PendingCall> {
        let mut batch: Vec<PendingCall> = {
            let mut inner = self.inner.lock();
            inner.state = RefreshState::Idle;
            inner.queue.drain(..).collect()
        };
        metrics::queue_drained(batch.len());
        batch.sort_by_key(|pending| pending.call.sequence());
        batch
    }
}

/// Fails the queue if an episode's task stops before it settles.
struct EpisodeGuard<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl Drop for EpisodeGuard<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let batch = self.coordinator.settle();
        warn!(failed_calls = batch.len(), "refresh episode aborted before settling");
        metrics::record_refresh("aborted");
        let error = Error::RefreshFailed("refresh episode aborted".into());
        for pending in batch {
            let _ = pending.respond_to.send(Err(error.clone()));
        }
    }
}
