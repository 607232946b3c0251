//! Configuration and startup errors shared across the workspace

use thiserror::Error;

/// Errors raised while loading and validating configuration.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    /// A URL setting without an http(s) scheme.
    #[error("Configuration error: {field} must start with http:// or https://, got: {value}")]
    InvalidUrl { field: &'static str, value: String },

    /// A duration setting that must be positive.
    #[error("Configuration error: {0} must be greater than 0")]
    ZeroDuration(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Check that `value` is an absolute http(s) URL.
    pub fn check_url(field: &'static str, value: &str) -> Result<()> {
        if value.starts_with("http://") || value.starts_with("https://") {
            Ok(())
        } else {
            Err(Error::InvalidUrl {
                field,
                value: value.to_string(),
            })
        }
    }

    /// Check that a seconds setting is non-zero.
    pub fn check_nonzero(field: &'static str, secs: u64) -> Result<()> {
        if secs == 0 {
            Err(Error::ZeroDuration(field))
        } else {
            Ok(())
        }
    }
}

/// Result alias using common Error
pub type Result<T> = std::result::Result<T, Error>;
