//! Credential storage for the session's token pair
//!
//! The store is a single slot: one access token and one refresh token per
//! client session. All operations are synchronous and immediately consistent
//! within the process, so the dispatcher can read the slot on every call
//! without awaiting. A `parking_lot::Mutex` serializes writers; it is never
//! held across an await point.
//!
//! Writers race on a last-writer-wins basis. A refresh that commits after an
//! explicit logout is simply overwritten by the logout's clear.

use std::path::{Path, PathBuf};

use common::Secret;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// The session's token pair.
///
/// No expiry is tracked client-side; an expired access token is discovered
/// when the API rejects a call with 401.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Current access token (Bearer token for API calls)
    pub access: Secret<String>,
    /// Refresh token for obtaining a new pair
    pub refresh: Secret<String>,
}

impl Credential {
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: Secret::new(access.into()),
            refresh: Secret::new(refresh.into()),
        }
    }

    /// The refresh token, or `None` if the session was stored without one.
    pub fn refresh_token(&self) -> Option<&str> {
        let refresh = self.refresh.expose().as_str();
        (!refresh.is_empty()).then_some(refresh)
    }
}

/// A synchronous keyed slot holding at most one credential.
///
/// Implementations must be cheap to read: `get` is called before every
/// outbound request.
pub trait CredentialStore: Send + Sync {
    /// Current credential, if any.
    fn get(&self) -> Option<Credential>;

    /// Replace the stored credential.
    fn set(&self, credential: Credential) -> Result<()>;

    /// Remove the stored credential.
    fn clear(&self) -> Result<()>;

    /// Current access token, if any.
    fn access_token(&self) -> Option<Secret<String>> {
        self.get().map(|c| c.access)
    }
}

/// Process-local credential slot.
#[derive(Default)]
pub struct MemoryCredentialStore {
    slot: Mutex<Option<Credential>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds a credential.
    pub fn with_credential(credential: Credential) -> Self {
        Self {
            slot: Mutex::new(Some(credential)),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> Option<Credential> {
        self.slot.lock().clone()
    }

    fn set(&self, credential: Credential) -> Result<()> {
        *self.slot.lock() = Some(credential);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.slot.lock().take();
        Ok(())
    }
}

/// Credential slot persisted as a JSON file.
///
/// The file is the durable copy; reads are served from memory. Writes update
/// memory first and then persist with temp-file + rename, so a failed write
/// never leaves the in-process view stale.
pub struct FileCredentialStore {
    path: PathBuf,
    slot: Mutex<Option<Credential>>,
}

impl FileCredentialStore {
    /// Load the credential file at `path`.
    ///
    /// A missing file means no stored session; it is created on the first
    /// `set`.
    pub fn load(path: PathBuf) -> Result<Self> {
        let credential = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| Error::Io(format!("reading credential file: {e}")))?;
            let credential: Credential = serde_json::from_str(&contents)
                .map_err(|e| Error::CredentialParse(format!("parsing credential file: {e}")))?;
            info!(path = %path.display(), "loaded stored session");
            Some(credential)
        } else {
            info!(path = %path.display(), "credential file not found, starting logged out");
            None
        };

        Ok(Self {
            path,
            slot: Mutex::new(credential),
        })
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self) -> Option<Credential> {
        self.slot.lock().clone()
    }

    fn set(&self, credential: Credential) -> Result<()> {
        let mut slot = self.slot.lock();
        *slot = Some(credential.clone());
        write_atomic(&self.path, &credential)
    }

    fn clear(&self) -> Result<()> {
        let mut slot = self.slot.lock();
        slot.take();
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "removed credential file");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Io(format!("removing credential file: {e}"))),
        }
    }
}

/// Write the credential to a file atomically.
///
/// Writes to a temporary file in the same directory, then renames it over
/// the target. Sets file permissions to 0600 (owner read/write only) since
/// the file contains bearer tokens.
fn write_atomic(path: &Path, credential: &Credential) -> Result<()> {
    let json = serde_json::to_string_pretty(credential)
        .map_err(|e| Error::CredentialParse(format!("serializing credential: {e}")))?;

    let dir = path
        .parent()
        .ok_or_else(|| Error::Io("credential path has no parent directory".into()))?;

    let tmp_path = dir.join(format!(".credentials.tmp.{}", std::process::id()));

    std::fs::write(&tmp_path, json.as_bytes())
        .map_err(|e| Error::Io(format!("writing temp credential file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&tmp_path, perms)
            .map_err(|e| Error::Io(format!("setting credential file permissions: {e}")))?;
    }

    std::fs::rename(&tmp_path, path)
        .map_err(|e| Error::Io(format!("renaming temp credential file: {e}")))?;

    debug!(path = %path.display(), "persisted credential");
    Ok(())
}
