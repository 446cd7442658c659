//! Session model: the bearer credential plus the signed-in user's profile.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Profile of the signed-in user, persisted next to the token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Email address (or a placeholder when the identity provider omits it).
    pub email: String,
    /// Display name, derived from the email's local part.
    pub name: String,
    /// When the login happened.
    pub login_time: DateTime<Utc>,
}

impl UserProfile {
    /// Build a profile from an email, deriving the display name.
    pub fn from_email(email: &str, login_time: DateTime<Utc>) -> Self {
        Self {
            email: email.to_string(),
            name: local_part(email).to_string(),
            login_time,
        }
    }
}

/// Everything before the first `@`.
pub fn local_part(email: &str) -> &str {
    email.split('@').next().unwrap_or_default()
}

/// An active session.
///
/// A session exists iff a token is stored. The profile may be missing even
/// when the token is present; callers must cope with that degraded state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Opaque bearer credential.
    pub token: String,
    /// Profile, if one was stored and could be read back.
    pub user: Option<UserProfile>,
}

impl Session {
    /// Create a new session.
    pub const fn new(token: String, user: Option<UserProfile>) -> Self {
        Self { token, user }
    }
}
