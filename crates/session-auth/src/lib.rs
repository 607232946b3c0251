//! Credential handling for the session client
//!
//! Provides the credential model, the `CredentialStore` slot abstraction with
//! in-memory and file-backed implementations, and the two authentication
//! service calls the client depends on. This crate has no knowledge of the
//! refresh coordinator; it can be tested and used independently.
//!
//! Credential flow:
//! 1. An issued credential is stored via `CredentialStore::set()`
//! 2. The dispatcher reads the access token via `CredentialStore::get()`
//! 3. On expiry the coordinator calls `token::refresh_token()` once
//! 4. The rotated pair replaces the old one via `CredentialStore::set()`
//! 5. On logout or unrecoverable failure the slot is emptied via `clear()`

pub mod constants;
pub mod credentials;
pub mod error;
pub mod token;

pub use constants::*;
pub use credentials::{Credential, CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use error::{Error, Result};
pub use token::{RefreshRequest, TokenResponse, endpoint_url, logout, refresh_token};
