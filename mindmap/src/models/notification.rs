//! Transient user-facing notifications.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// How long a notification stays visible.
pub const NOTIFICATION_TTL: Duration = Duration::seconds(3);

/// Kind of notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
    Info,
}

impl NotificationKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Info => "info",
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A notification shown to the user until `visible_until`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub message: String,
    pub kind: NotificationKind,
    pub visible_until: DateTime<Utc>,
}

impl Notification {
    /// Create a notification shown at `now`.
    pub fn new(message: impl Into<String>, kind: NotificationKind, now: DateTime<Utc>) -> Self {
        Self {
            message: message.into(),
            kind,
            visible_until: now + NOTIFICATION_TTL,
        }
    }

    pub fn is_visible_at(&self, now: DateTime<Utc>) -> bool {
        now < self.visible_until
    }
}
