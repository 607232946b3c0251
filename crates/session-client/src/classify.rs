//! Response classification
//!
//! Only a 401 means the access token expired. A 403 is a permission problem
//! for this particular resource and refreshing would not change the answer,
//! so it is passed through like any other failure.

use crate::call::ApiResponse;
use crate::error::{Error, Result};

/// How the dispatcher treats a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// 2xx, returned to the caller
    Success,
    /// 401, routed to the refresh coordinator on a first attempt
    Unauthorized,
    /// Anything else, returned to the caller as `Error::Status`
    Other,
}

/// Classify an HTTP status code.
pub fn classify_status(status: u16) -> StatusClass {
    match status {
        200..=299 => StatusClass::Success,
        401 => StatusClass::Unauthorized,
        _ => StatusClass::Other,
    }
}

/// Turn a raw response into the dispatcher's result shape.
pub fn into_result(response: ApiResponse) -> Result<ApiResponse> {
    match classify_status(response.status) {
        StatusClass::Success => Ok(response),
        StatusClass::Unauthorized => Err(Error::Unauthorized),
        StatusClass::Other => Err(Error::Status {
            status: response.status,
            body: response.body,
        }),
    }
}
