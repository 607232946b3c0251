//! Session lifecycle notification
//!
//! When a refresh episode fails the session cannot be recovered without a new
//! login. The coordinator reports that once per failed episode; what happens
//! next (redirect, exit, re-prompt) is up to the embedding application.

use tokio::sync::broadcast;
use tracing::warn;

/// Receives the one-shot "session is over" signal.
pub trait SessionNotifier: Send + Sync {
    fn notify_unrecoverable(&self, reason: &str);
}

impl<F> SessionNotifier for F
where
    F: Fn(&str) + Send + Sync,
{
    fn notify_unrecoverable(&self, reason: &str) {
        self(reason)
    }
}

/// Default notifier: logs and does nothing else.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl SessionNotifier for LogNotifier {
    fn notify_unrecoverable(&self, reason: &str) {
        warn!(reason, "session is no longer recoverable, a new login is required");
    }
}

/// Lifecycle event published by `ChannelNotifier`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Unrecoverable { reason: String },
}

/// Fans the signal out to any number of async subscribers.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: broadcast::Sender<SessionEvent>,
}

impl ChannelNotifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(16);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }
}

impl Default for ChannelNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionNotifier for ChannelNotifier {
    fn notify_unrecoverable(&self, reason: &str) {
        // No subscribers is fine; the event is simply dropped
        let _ = self.tx.send(SessionEvent::Unrecoverable {
            reason: reason.to_string(),
        });
    }
}
