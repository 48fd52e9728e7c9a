//! User-facing notification channel (the console's toast bus).
//!
//! The transport owns failure notifications: it fires exactly one per failed
//! call at the point of classification, so subscribers observing the same
//! error state never produce duplicates. Mutations push their success
//! messages through the same handle.

use std::fmt;

use tokio::sync::mpsc;
use tracing::{info, warn};

/// Notification severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Info => write!(f, "info"),
            Level::Success => write!(f, "success"),
            Level::Error => write!(f, "error"),
        }
    }
}

/// A single user-facing message.
#[derive(Debug, Clone)]
pub struct Notification {
    pub level: Level,
    pub message: String,
}

/// Handle for emitting notifications.
///
/// Cloneable; all clones feed the same receiver. When constructed with
/// [`Notifier::log_only`] there is no receiver and messages only reach the
/// tracing output.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: Option<mpsc::UnboundedSender<Notification>>,
}

impl Notifier {
    /// Create a notifier plus the receiving end a UI can drain.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A notifier that only logs, for headless use.
    pub fn log_only() -> Self {
        Self { tx: None }
    }

    pub fn notify(&self, level: Level, message: impl Into<String>) {
        let message = message.into();
        match level {
            Level::Error => warn!(target: "review_console::notify", %message, "notification"),
            _ => info!(target: "review_console::notify", %message, "notification"),
        }
        if let Some(tx) = &self.tx {
            // Receiver may have gone away (UI closed); that is not an error.
            let _ = tx.send(Notification { level, message });
        }
    }

    pub fn info(&self, message: impl Into<String>) {
        self.notify(Level::Info, message);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.notify(Level::Success, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.notify(Level::Error, message);
    }
}

/// Human-readable message for an HTTP failure status.
///
/// Statuses without a dedicated entry fall back to a generic message carrying
/// the numeric code.
pub fn status_message(status: u16) -> String {
    match status {
        400 => "invalid request parameters".to_string(),
        401 => "unauthorized".to_string(),
        403 => "permission denied".to_string(),
        404 => "resource not found".to_string(),
        500 => "server error".to_string(),
        other => format!("request failed ({other})"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_message_table() {
        assert_eq!(status_message(404), "resource not found");
        assert_eq!(status_message(500), "server error");
        assert_eq!(status_message(418), "request failed (418)");
    }

    #[tokio::test]
    async fn test_channel_delivery() {
        let (notifier, mut rx) = Notifier::channel();
        notifier.error("boom");

        let n = rx.recv().await.unwrap();
        assert_eq!(n.level, Level::Error);
        assert_eq!(n.message, "boom");
    }

    #[tokio::test]
    async fn test_buffered_messages_drain_after_notifier_drops() {
        let (notifier, mut rx) = Notifier::channel();
        notifier.success("repository created");
        notifier.info("settings saved");
        drop(notifier);

        // Messages emitted before the last sender went away must still be
        // drainable without awaiting.
        let mut drained = Vec::new();
        while let Ok(n) = rx.try_recv() {
            drained.push(n.message);
        }
        assert_eq!(drained, ["repository created", "settings saved"]);
    }

    #[test]
    fn test_log_only_does_not_panic() {
        Notifier::log_only().info("no receiver attached");
    }
}
