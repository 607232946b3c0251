//! Metrics emitted through the `metrics` facade
//!
//! - `session_requests_total` (counter): label `outcome`
//! - `session_refresh_total` (counter): label `outcome`
//! - `session_replays_total` (counter): label `outcome`
//! - `session_queue_depth` (gauge): calls currently blocked on a refresh
//!
//! The library never installs a recorder; without one these calls are no-ops.

/// Record a finished `send` with its outcome label.
pub fn record_request(outcome: &'static str) {
    metrics::counter!("session_requests_total", "outcome" => outcome).increment(1);
}

/// Record a settled refresh episode.
pub fn record_refresh(outcome: &'static str) {
    metrics::counter!("session_refresh_total", "outcome" => outcome).increment(1);
}

/// Record one replayed call after a successful refresh.
pub fn record_replay(outcome: &'static str) {
    metrics::counter!("session_replays_total", "outcome" => outcome).increment(1);
}

/// A call joined the refresh queue.
pub fn queue_grew() {
    metrics::gauge!("session_queue_depth").increment(1.0);
}

/// A refresh episode drained `count` calls from the queue.
pub fn queue_drained(count: usize) {
    metrics::gauge!("session_queue_depth").decrement(count as f64);
}
