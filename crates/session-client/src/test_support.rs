//! Fakes and a harness for driving refresh interleavings in tests

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use session_auth::{Credential, CredentialStore, MemoryCredentialStore};
use tokio::sync::Notify;

use crate::auth_api::AuthApi;
use crate::call::{ApiCall, ApiResponse};
use crate::client::SessionClient;
use crate::coordinator::RefreshCoordinator;
use crate::dispatcher::Dispatcher;
use crate::error::{Error, Result};
use crate::notifier::SessionNotifier;
use crate::transport::Transport;

/// How `FakeAuth::refresh` behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Succeed,
    Reject,
    Hang,
    Panic,
}

/// API fake: accepts exactly one access token, everything else is a 401.
///
/// `/down` fails at the transport level and `/boom` answers 500.
pub struct FakeTransport {
    valid_access: Mutex<String>,
    reject_all: AtomicBool,
    attempts: Mutex<Vec<(String, Option<String>)>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
}

impl FakeTransport {
    pub fn new(valid_access: &str) -> Self {
        Self {
            valid_access: Mutex::new(valid_access.to_string()),
            reject_all: AtomicBool::new(false),
            attempts: Mutex::new(Vec::new()),
            gates: Mutex::new(HashMap::new()),
        }
    }

    pub fn set_valid_access(&self, access: &str) {
        *self.valid_access.lock() = access.to_string();
    }

    pub fn set_reject_all(&self, reject: bool) {
        self.reject_all.store(reject, Ordering::SeqCst);
    }

    /// Park the first attempt on `path` until the returned gate is notified.
    pub fn hold_first(&self, path: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates.lock().insert(path.to_string(), gate.clone());
        gate
    }

    /// Every attempt in arrival order as (path, access token).
    pub fn attempts(&self) -> Vec<(String, Option<String>)> {
        self.attempts.lock().clone()
    }

    pub fn attempts_for(&self, path: &str) -> Vec<Option<String>> {
        self.attempts
            .lock()
            .iter()
            .filter(|(p, _)| p == path)
            .map(|(_, access)| access.clone())
            .collect()
    }
}

impl Transport for FakeTransport {
    fn execute<'a>(
        &'a self,
        call: &'a ApiCall,
        access: Option<&'a str>,
    ) -> Pin<Box<dyn Future<Output = Result<ApiResponse>> + Send + 'a>> {
        Box::pin(async move {
            self.attempts
                .lock()
                .push((call.path.clone(), access.map(str::to_string)));

            // Gates are one-shot: only the first attempt on a path waits
            let gate = self.gates.lock().remove(&call.path);
            if let Some(gate) = gate {
                gate.notified().await;
            }

            match call.path.as_str() {
                "/down" => return Err(Error::Transport("connection refused".into())),
                "/boom" => return Ok(ApiResponse::new(500, "internal error")),
                _ => {}
            }

            let valid = access == Some(self.valid_access.lock().as_str());
            if valid && !self.reject_all.load(Ordering::SeqCst) {
                Ok(ApiResponse::new(
                    200,
                    serde_json::json!({ "path": call.path }).to_string(),
                ))
            } else {
                Ok(ApiResponse::new(401, "token expired"))
            }
        })
    }
}

/// Authentication service fake with a hold/release gate on refresh.
pub struct FakeAuth {
    mode: Mutex<AuthMode>,
    next: Mutex<(String, String)>,
    delay: Mutex<Option<Duration>>,
    held: AtomicBool,
    gate: Notify,
    refresh_tokens: Mutex<Vec<String>>,
    logout_tokens: Mutex<Vec<Option<String>>>,
    fail_logout: AtomicBool,
}

impl FakeAuth {
    pub fn new(mode: AuthMode) -> Self {
        Self {
            mode: Mutex::new(mode),
            next: Mutex::new(("A2".into(), "R2".into())),
            delay: Mutex::new(None),
            held: AtomicBool::new(false),
            gate: Notify::new(),
            refresh_tokens: Mutex::new(Vec::new()),
            logout_tokens: Mutex::new(Vec::new()),
            fail_logout: AtomicBool::new(false),
        }
    }

    pub fn set_mode(&self, mode: AuthMode) {
        *self.mode.lock() = mode;
    }

    pub fn set_next_credential(&self, access: &str, refresh: &str) {
        *self.next.lock() = (access.to_string(), refresh.to_string());
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    /// Block refreshes until `release`.
    pub fn hold(&self) {
        self.held.store(true, Ordering::SeqCst);
    }

    pub fn release(&self) {
        self.held.store(false, Ordering::SeqCst);
        self.gate.notify_one();
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_tokens.lock().len()
    }

    pub fn seen_refresh_tokens(&self) -> Vec<String> {
        self.refresh_tokens.lock().clone()
    }

    pub fn set_fail_logout(&self, fail: bool) {
        self.fail_logout.store(fail, Ordering::SeqCst);
    }

    pub fn seen_logout_tokens(&self) -> Vec<Option<String>> {
        self.logout_tokens.lock().clone()
    }
}

impl AuthApi for FakeAuth {
    fn refresh<'a>(
        &'a self,
        refresh_token: &'a str,
    ) -> Pin<Box<dyn Future<Output = session_auth::Result<Credential>> + Send + 'a>> {
        Box::pin(async move {
            self.refresh_tokens.lock().push(refresh_token.to_string());

            if self.held.load(Ordering::SeqCst) {
                self.gate.notified().await;
            }
            let delay = *self.delay.lock();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            let mode = *self.mode.lock();
            match mode {
                AuthMode::Succeed => {
                    let (access, refresh) = self.next.lock().clone();
                    Ok(Credential::new(access, refresh))
                }
                AuthMode::Reject => Err(session_auth::Error::InvalidCredentials(
                    "refresh token revoked".into(),
                )),
                AuthMode::Hang => std::future::pending().await,
                AuthMode::Panic => panic!("auth client blew up"),
            }
        })
    }

    fn logout<'a>(
        &'a self,
        access: Option<&'a str>,
    ) -> Pin<Box<dyn Future<Output = session_auth::Result<()>> + Send + 'a>> {
        Box::pin(async move {
            self.logout_tokens.lock().push(access.map(str::to_string));
            if self.fail_logout.load(Ordering::SeqCst) {
                return Err(session_auth::Error::TokenEndpoint("503: unavailable".into()));
            }
            Ok(())
        })
    }
}

/// Fakes wired into one coordinator, starting from a `{A1, R1}` session.
pub struct Harness {
    pub coordinator: Arc<RefreshCoordinator>,
    pub transport: Arc<FakeTransport>,
    pub auth: Arc<FakeAuth>,
    pub store: Arc<MemoryCredentialStore>,
    notifications: Arc<AtomicUsize>,
}

impl Harness {
    pub fn new(mode: AuthMode) -> Self {
        Self::with_credential(mode, Some(("A1", "R1")))
    }

    pub fn with_credential(mode: AuthMode, credential: Option<(&str, &str)>) -> Self {
        let store = Arc::new(match credential {
            Some((access, refresh)) => {
                MemoryCredentialStore::with_credential(Credential::new(access, refresh))
            }
            None => MemoryCredentialStore::new(),
        });
        let transport = Arc::new(FakeTransport::new("A2"));
        let auth = Arc::new(FakeAuth::new(mode));
        let notifications = Arc::new(AtomicUsize::new(0));
        let coordinator = new_coordinator(
            &store,
            &auth,
            &transport,
            &notifications,
            Duration::from_secs(5),
        );

        Self {
            coordinator,
            transport,
            auth,
            store,
            notifications,
        }
    }

    pub fn refresh_timeout(mut self, timeout: Duration) -> Self {
        self.coordinator = new_coordinator(
            &self.store,
            &self.auth,
            &self.transport,
            &self.notifications,
            timeout,
        );
        self
    }

    pub fn refresh_delay(self, delay: Duration) -> Self {
        self.auth.set_delay(delay);
        self
    }

    /// Times the session-ended notification has fired.
    pub fn notified(&self) -> usize {
        self.notifications.load(Ordering::SeqCst)
    }

    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(
            self.transport.clone(),
            self.store.clone(),
            self.coordinator.clone(),
        )
    }

    pub fn client(&self) -> SessionClient {
        SessionClient::builder()
            .store(self.store.clone())
            .transport(self.transport.clone())
            .auth_api(self.auth.clone())
            .notifier(counting_notifier(&self.notifications))
            .build()
            .unwrap()
    }
}

fn counting_notifier(notifications: &Arc<AtomicUsize>) -> Arc<dyn SessionNotifier> {
    let notifications = notifications.clone();
    Arc::new(move |_: &str| {
        notifications.fetch_add(1, Ordering::SeqCst);
    })
}

fn new_coordinator(
    store: &Arc<MemoryCredentialStore>,
    auth: &Arc<FakeAuth>,
    transport: &Arc<FakeTransport>,
    notifications: &Arc<AtomicUsize>,
    refresh_timeout: Duration,
) -> Arc<RefreshCoordinator> {
    let store: Arc<dyn CredentialStore> = store.clone();
    Arc::new(RefreshCoordinator::new(
        store,
        auth.clone(),
        transport.clone(),
        counting_notifier(notifications),
        refresh_timeout,
    ))
}

/// Poll `condition` until it holds, failing the test after one second.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached within 1s");
}
