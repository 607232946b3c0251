//! Session-aware API client
//!
//! Sends calls to a bearer-token API and recovers from access token expiry
//! with a single shared refresh:
//!
//! 1. `Dispatcher::send` attaches the stored access token
//! 2. A 401 hands the call to `RefreshCoordinator::recover`
//! 3. The first such call starts one refresh episode; later ones queue on it
//! 4. On success every queued call is replayed once, in issuance order
//! 5. On failure the credential is cleared, every queued call fails with
//!    `RefreshFailed`, and the `SessionNotifier` fires once
//!
//! `SessionClient` wires these together; the trait seams (`Transport`,
//! `AuthApi`, `CredentialStore`, `SessionNotifier`) let tests and embedders
//! swap any part.

pub mod auth_api;
pub mod call;
pub mod classify;
pub mod client;
pub mod coordinator;
pub mod dispatcher;
pub mod error;
pub mod metrics;
pub mod notifier;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_support;

pub use auth_api::{AuthApi, HttpAuthApi};
pub use call::{ApiCall, ApiResponse};
pub use classify::{StatusClass, classify_status};
pub use client::{SessionClient, SessionClientBuilder};
pub use coordinator::{RefreshCoordinator, RefreshState};
pub use dispatcher::Dispatcher;
pub use error::{Error, Result};
pub use notifier::{ChannelNotifier, LogNotifier, SessionEvent, SessionNotifier};
pub use transport::{HttpTransport, Transport};

pub use session_auth::{Credential, CredentialStore, FileCredentialStore, MemoryCredentialStore};
