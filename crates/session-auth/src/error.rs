//! Error types for credential and authentication-service operations

/// Errors from credential storage and auth service calls.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No response from the auth service.
    #[error("auth service unreachable: {0}")]
    Http(String),

    #[error("auth service error: {0}")]
    TokenEndpoint(String),

    /// The auth service refused the refresh token (401/403).
    #[error("refresh token rejected: {0}")]
    InvalidCredentials(String),

    #[error("stored credential unreadable: {0}")]
    CredentialParse(String),

    #[error("credential file I/O error: {0}")]
    Io(String),
}

impl Error {
    /// Whether the auth service answered and said no, as opposed to failing.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Error::InvalidCredentials(_))
    }
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, Error>;
