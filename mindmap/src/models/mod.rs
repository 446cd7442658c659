//! Data models for the mindmap client.

mod document;
mod notification;
mod session;

pub use document::{DocumentId, DocumentSummary};
pub use notification::{Notification, NotificationKind};
pub use session::{local_part, Session, UserProfile};
