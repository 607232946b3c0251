//! Outbound call descriptor and raw response

use reqwest::Method;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::{Error, Result};

/// A single outbound API call.
///
/// Carries a one-shot `retried` marker: once a call has been handed to the
/// refresh coordinator it is replayed at most once, and a second 401 is
/// terminal.
#[derive(Debug, Clone)]
pub struct ApiCall {
    id: Uuid,
    pub method: Method,
    pub path: String,
    pub body: Option<serde_json::Value>,
    retried: bool,
    sequence: Option<u64>,
}

impl ApiCall {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            method,
            path: path.into(),
            body: None,
            retried: false,
            sequence: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a JSON body.
    pub fn with_json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Identifier used in logs.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Whether this call has already been replayed after a refresh.
    pub fn is_retried(&self) -> bool {
        self.retried
    }

    pub(crate) fn mark_retried(&mut self) {
        self.retried = true;
    }

    /// Issuance order within one session, once stamped.
    pub(crate) fn sequence(&self) -> Option<u64> {
        self.sequence
    }

    /// Stamp the call on first sight; later calls keep the original stamp.
    pub(crate) fn ensure_sequence(&mut self, next: impl FnOnce() -> u64) -> u64 {
        *self.sequence.get_or_insert_with(next)
    }
}

/// Raw response from the API: status code and body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body).map_err(|e| Error::Decode(e.to_string()))
    }
}
