//! Caller-facing error taxonomy
//!
//! `Error` is `Clone` because a failed refresh hands the same terminal error
//! to every call that was blocked on it.

/// Errors surfaced by the session client.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// 401 from the API. Absorbed by the refresh coordinator on a first
    /// attempt; `send` never returns it.
    #[error("access token rejected")]
    Unauthorized,

    #[error("session refresh failed: {0}")]
    RefreshFailed(String),

    #[error("request rejected again after credential refresh")]
    AlreadyRetried,

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("response decode error: {0}")]
    Decode(String),

    #[error("credential store error: {0}")]
    Credential(String),

    #[error("client configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Short label for metrics and structured logs.
    pub fn label(&self) -> &'static str {
        match self {
            Error::Unauthorized => "unauthorized",
            Error::RefreshFailed(_) => "refresh_failed",
            Error::AlreadyRetried => "already_retried",
            Error::Transport(_) => "transport",
            Error::Status { .. } => "status",
            Error::Decode(_) => "decode",
            Error::Credential(_) => "credential",
            Error::Config(_) => "config",
        }
    }

    /// Whether this error means the session is gone and the user must log in again.
    pub fn is_session_ended(&self) -> bool {
        matches!(self, Error::RefreshFailed(_))
    }
}

impl From<session_auth::Error> for Error {
    fn from(err: session_auth::Error) -> Self {
        Error::Credential(err.to_string())
    }
}

/// Result alias for session client operations.
pub type Result<T> = std::result::Result<T, Error>;
