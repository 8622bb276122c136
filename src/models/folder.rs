//! Folder and search-result models.

use serde::{Deserialize, Serialize};

/// A folder in the service hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    /// Numeric id, used by folder-scoped search and dashboard upserts.
    pub id: i64,
    /// Stable identifier, unique within one service instance.
    pub uid: String,
    /// Display title. May be empty or contain path separators.
    #[serde(default)]
    pub title: String,
}

/// Kind of entry returned by the search endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchHitKind {
    /// A folder.
    #[serde(rename = "dash-folder")]
    Folder,
    /// A dashboard.
    #[serde(rename = "dash-db")]
    Dashboard,
    /// Anything newer service versions add.
    #[serde(other)]
    Other,
}

/// Summary entry returned by `GET /api/search`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Numeric id.
    pub id: i64,
    /// Stable identifier.
    pub uid: String,
    /// Display title.
    #[serde(default)]
    pub title: String,
    /// Entry kind.
    #[serde(rename = "type")]
    pub kind: SearchHitKind,
}

impl SearchHit {
    /// Converts a folder hit into a [`Folder`].
    #[must_use]
    pub fn into_folder(self) -> Folder {
        Folder {
            id: self.id,
            uid: self.uid,
            title: self.title,
        }
    }
}
