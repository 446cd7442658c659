//! Document summary: the client-side record of one mindmap.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Cosmetic tag applied when the backend does not send one.
pub const DEFAULT_COLOR: &str = "from-indigo-500 to-purple-600";

/// Server-assigned document identifier.
///
/// The backend sends numeric ids today, but the client treats them as opaque,
/// so both JSON numbers and strings are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Wrap a raw identifier.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The identifier as it appears in request paths.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl<'de> Deserialize<'de> for DocumentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Text(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Int(n) => Self(n.to_string()),
            Raw::Text(s) => Self(s),
        })
    }
}

/// Lightweight record of a mindmap held in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentSummary {
    /// Immutable server identifier.
    pub id: DocumentId,
    /// Display name; never blank.
    pub name: String,
    /// Date of the last server-side mutation.
    pub updated: NaiveDate,
    /// Cosmetic tag.
    pub color: String,
}

impl DocumentSummary {
    /// Build a summary, substituting `today` for a missing timestamp and the
    /// default tag for a missing color.
    pub fn normalized(
        id: DocumentId,
        name: String,
        updated_at: Option<DateTime<Utc>>,
        color: Option<String>,
        today: NaiveDate,
    ) -> Self {
        Self {
            id,
            name,
            updated: updated_at.map_or(today, |t| t.date_naive()),
            color: color
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| DEFAULT_COLOR.to_string()),
        }
    }
}
