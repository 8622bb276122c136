//! Data models for the dashboard service.
//!
//! Only the fields the backup and restore logic reads or rewrites are typed.
//! Dashboard documents and datasource definitions are otherwise opaque JSON and
//! are carried through untouched.

mod dashboard;
mod datasource;
mod folder;

pub use dashboard::{DashboardDocument, DashboardEnvelope, UpsertedDashboard};
pub use datasource::{Datasource, DatasourceCreated};
pub use folder::{Folder, SearchHit, SearchHitKind};
