//! # Dashvault
//!
//! Backup and restore of dashboard-service configuration objects (folders,
//! dashboards, datasources) to S3-compatible object storage.
//!
//! Dashvault walks a Grafana-compatible service's folder hierarchy, writes every
//! dashboard and datasource definition to a flat, sanitized key layout, and later
//! replays those objects into the same or a different service instance.
//!
//! ## Features
//!
//! - Deterministic key layout (`<namespace>/<folder>/<dashboard>.json`)
//! - Per-item failure isolation with a structured [`RunReport`]
//! - Folder re-creation keyed by a stable identifier derived from the title
//! - Datasource reference resolution with a per-run cache
//! - Pluggable object stores (S3, local filesystem, in-memory)
//!
//! ## Example
//!
//! ```rust,ignore
//! use dashvault::{Deadline, ExportService, HttpDashboardClient, ObjectStoreClient, VaultConfig};
//! use std::sync::Arc;
//!
//! let config = VaultConfig::load(None)?;
//! let deadline = Deadline::from_secs(config.run.deadline_secs);
//! let api = Arc::new(HttpDashboardClient::from_config(&config.service, deadline)?);
//! let store = Arc::new(ObjectStoreClient::from_config(&config.store, deadline)?);
//! let report = ExportService::new(api, store, config.namespaces.clone()).run();
//! println!("{}", report.summary());
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
// multiple_crate_versions is inherently crate-level (detects duplicate transitive dependencies).
// Current duplicates come from the object_store and reqwest TLS stacks.
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

// Module declarations
pub mod client;
pub mod config;
pub mod keys;
pub mod models;
pub mod observability;
pub mod report;
pub mod services;

// Re-exports for convenience
pub use client::{
    BlobStore, DashboardApi, Deadline, HttpDashboardClient, InMemoryDashboardService,
    ObjectStoreClient, RemoteError,
};
pub use config::{Namespaces, RunSettings, UidStrategy, VaultConfig};
pub use report::{ExitPolicy, ItemKind, ItemRef, RunReport, RunStatus};
pub use services::{ExportService, ImportOptions, ImportService};

/// Error type for dashvault operations.
///
/// Uses `thiserror` for automatic `Display` and `Error` trait implementations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Missing configuration values, malformed config files |
/// | `OperationFailed` | Client construction fails, logging cannot be initialized |
/// | `FeatureNotEnabled` | A store kind needs a compile-time feature that is off |
/// | `Remote` | A service or object-store call failed |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    ///
    /// Raised when:
    /// - The service URL, token or bucket is missing
    /// - The config file does not parse
    /// - An unknown store kind or uid strategy is configured
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation failed.
    ///
    /// Raised when:
    /// - The HTTP or object-store client cannot be built
    /// - The config file cannot be read
    /// - The tracing subscriber is already installed
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// Feature not enabled (requires feature flag).
    #[error("feature not enabled: {0} (compile with --features {0})")]
    FeatureNotEnabled(String),

    /// A remote call failed.
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

/// Result type alias for dashvault operations.
pub type Result<T> = std::result::Result<T, Error>;
