//! Authentication service paths and client defaults
//!
//! Paths are relative to the API base URL. The defaults mirror the browser
//! client this library replaces: a generous two-minute budget for ordinary
//! calls and a much shorter one for the refresh call, which blocks every
//! queued request while it is outstanding.

/// Refresh endpoint: `{ refresh_token }` in, `{ access_token, refresh_token }` out
pub const REFRESH_PATH: &str = "/auth/refresh";

/// Best-effort logout notification
pub const LOGOUT_PATH: &str = "/auth/logout";

/// Default per-call timeout for ordinary API calls
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Default timeout for the refresh call
pub const DEFAULT_REFRESH_TIMEOUT_SECS: u64 = 30;
