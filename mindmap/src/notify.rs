//! Single-slot notification center.
//!
//! At most one notification is visible; showing a new one replaces the old.
//! Expiry is evaluated lazily against the caller's clock.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::models::{Notification, NotificationKind};

#[derive(Debug, Default)]
pub struct Notifier {
    current: Option<Notification>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(&mut self, message: impl Into<String>, kind: NotificationKind) -> &Notification {
        self.show_at(message, kind, Utc::now())
    }

    pub fn show_at(
        &mut self,
        message: impl Into<String>,
        kind: NotificationKind,
        now: DateTime<Utc>,
    ) -> &Notification {
        let notification = Notification::new(message, kind, now);
        match kind {
            NotificationKind::Error => warn!(message = %notification.message, "notification"),
            _ => info!(message = %notification.message, %kind, "notification"),
        }
        self.current.insert(notification)
    }

    pub fn success(&mut self, message: impl Into<String>) -> &Notification {
        self.show(message, NotificationKind::Success)
    }

    pub fn error(&mut self, message: impl Into<String>) -> &Notification {
        self.show(message, NotificationKind::Error)
    }

    pub fn info(&mut self, message: impl Into<String>) -> &Notification {
        self.show(message, NotificationKind::Info)
    }

    /// The visible notification, if any.
    pub fn current(&self) -> Option<&Notification> {
        self.current_at(Utc::now())
    }

    pub fn current_at(&self, now: DateTime<Utc>) -> Option<&Notification> {
        self.current.as_ref().filter(|n| n.is_visible_at(now))
    }
}
