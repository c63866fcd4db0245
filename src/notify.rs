use serde::{Deserialize, Serialize};

/// Severity levels the admin UI maps to toast styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Success,
    Warning,
    Danger,
}

/// Outbound notification boundary. The core reports outcomes through this
/// trait and never depends on the sink's behavior.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, kind: NotificationKind, title: &str, body: &str);
}

/// Default sink that writes notifications to the log stream.
pub struct LogNotifier;

impl NotificationSink for LogNotifier {
    fn notify(&self, kind: NotificationKind, title: &str, body: &str) {
        match kind {
            NotificationKind::Success => tracing::info!(title, body, "notification"),
            NotificationKind::Warning => tracing::warn!(title, body, "notification"),
            NotificationKind::Danger => tracing::error!(title, body, "notification"),
        }
    }
}
