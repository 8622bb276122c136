//! Remote clients.
//!
//! Thin blocking wrappers around the dashboard service's REST API and an
//! S3-compatible object store. Every call returns a decoded response or a
//! classified [`RemoteError`]; failures are logged here, at the boundary, so
//! pipelines only decide whether to continue.
//!
//! # Error classification
//!
//! | Variant | Raised When |
//! |---------|-------------|
//! | `Network` | Connection refused, DNS failure, timeout |
//! | `Protocol` | Non-2xx status from the service |
//! | `Storage` | Object-store API error |
//! | `Decode` | Response body is not the expected JSON |
//! | `DeadlineExceeded` | The run budget ran out before the call started |

mod deadline;
mod http;
mod memory;
mod store;

pub use deadline::Deadline;
pub use http::{HttpDashboardClient, HttpSettings};
pub use memory::{InMemoryDashboardService, StoredDashboard};
pub use store::ObjectStoreClient;

use crate::models::{
    DashboardDocument, DashboardEnvelope, Datasource, DatasourceCreated, Folder, SearchHit,
    UpsertedDashboard,
};
use serde_json::Value;
use thiserror::Error as ThisError;

/// Classified failure of a single remote call.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum RemoteError {
    /// The request never produced a response.
    #[error("network error during '{operation}': {cause}")]
    Network {
        /// The call that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// The service answered with a non-success status.
    #[error("'{operation}' returned HTTP {status}: {body}")]
    Protocol {
        /// The call that failed.
        operation: String,
        /// HTTP status code.
        status: u16,
        /// Response body, as text.
        body: String,
    },

    /// The object store rejected the call.
    #[error("object store error during '{operation}': {cause}")]
    Storage {
        /// The call that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// The response could not be decoded.
    #[error("could not decode response of '{operation}': {cause}")]
    Decode {
        /// The call that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// The run deadline passed; no new calls are started.
    #[error("run deadline exceeded")]
    DeadlineExceeded,
}

impl RemoteError {
    /// Returns the HTTP status for protocol failures.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Protocol { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result of a remote call.
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// The dashboard service's REST API.
///
/// Implemented over HTTP by [`HttpDashboardClient`] and in memory by
/// [`InMemoryDashboardService`].
pub trait DashboardApi: Send + Sync {
    /// Lists all folders (`GET /api/search`, folder entries only).
    fn search_folders(&self) -> RemoteResult<Vec<Folder>>;

    /// Lists the dashboards in one folder (`GET /api/search?folderIds=<id>`).
    fn search_dashboards(&self, folder_id: i64) -> RemoteResult<Vec<SearchHit>>;

    /// Fetches a folder by uid. Returns `Ok(None)` on HTTP 404.
    fn get_folder(&self, uid: &str) -> RemoteResult<Option<Folder>>;

    /// Creates a folder (`POST /api/folders`).
    fn create_folder(&self, uid: &str, title: &str) -> RemoteResult<Folder>;

    /// Fetches the full dashboard document (`GET /api/dashboards/uid/<uid>`).
    fn get_dashboard(&self, uid: &str) -> RemoteResult<DashboardEnvelope>;

    /// Creates or replaces a dashboard (`POST /api/dashboards/db`).
    fn upsert_dashboard(
        &self,
        dashboard: &DashboardDocument,
        folder_id: i64,
        overwrite: bool,
    ) -> RemoteResult<UpsertedDashboard>;

    /// Lists all datasources (`GET /api/datasources`).
    fn list_datasources(&self) -> RemoteResult<Vec<Datasource>>;

    /// Fetches a datasource by uid. Returns `Ok(None)` on HTTP 404.
    fn get_datasource_by_uid(&self, uid: &str) -> RemoteResult<Option<Datasource>>;

    /// Creates a datasource from a stored definition (`POST /api/datasources`).
    fn create_datasource(&self, definition: &Value) -> RemoteResult<DatasourceCreated>;
}

/// An object store addressed by string keys.
pub trait BlobStore: Send + Sync {
    /// Lists every key under `prefix`.
    ///
    /// Keys come back in the store's canonical form and are accepted as-is by
    /// [`BlobStore::get`].
    fn list(&self, prefix: &str) -> RemoteResult<Vec<String>>;

    /// Reads an object.
    fn get(&self, key: &str) -> RemoteResult<Vec<u8>>;

    /// Writes an object, replacing any previous content.
    fn put(&self, key: &str, bytes: Vec<u8>) -> RemoteResult<()>;
}
