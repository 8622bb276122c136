//! Import pipeline.
//!
//! Replays stored objects into a dashboard service: datasources first, then
//! dashboards. Folders are recreated under an identifier derived from the
//! stored folder title, so repeated imports land in the same folder.

use super::{DatasourceResolver, finish_run, record_item};
use crate::client::{BlobStore, DashboardApi};
use crate::config::{Namespaces, RunSettings, UidStrategy};
use crate::keys::{
    derive_folder_identifier, is_document_key, namespace_prefix, split_dashboard_key,
};
use crate::models::{DashboardDocument, DatasourceCreated};
use crate::report::{ItemRef, RunReport};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

const PIPELINE: &str = "import";

/// Options for an import run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportOptions {
    /// Import stored datasources before dashboards.
    pub import_datasources: bool,
    /// Rewrite panel datasource references to names known by the target.
    pub resolve_datasources: bool,
    /// Uid assignment for imported dashboards.
    pub uid_strategy: UidStrategy,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            import_datasources: true,
            resolve_datasources: true,
            uid_strategy: UidStrategy::Regenerate,
        }
    }
}

impl ImportOptions {
    /// Takes the import-related run settings.
    #[must_use]
    pub const fn from_settings(settings: &RunSettings) -> Self {
        Self {
            import_datasources: settings.import_datasources,
            resolve_datasources: settings.resolve_datasources,
            uid_strategy: settings.uid_strategy,
        }
    }

    /// Enables or disables the datasource pass.
    #[must_use]
    pub const fn with_import_datasources(mut self, enabled: bool) -> Self {
        self.import_datasources = enabled;
        self
    }

    /// Enables or disables datasource reference resolution.
    #[must_use]
    pub const fn with_resolve_datasources(mut self, enabled: bool) -> Self {
        self.resolve_datasources = enabled;
        self
    }

    /// Sets the uid strategy.
    #[must_use]
    pub const fn with_uid_strategy(mut self, strategy: UidStrategy) -> Self {
        self.uid_strategy = strategy;
        self
    }
}

/// Yields the keys of stored JSON documents.
///
/// Other objects under a namespace are logged and left out of the report.
fn document_keys(keys: &[String]) -> impl Iterator<Item = &String> {
    keys.iter().filter(|key| {
        let document = is_document_key(key);
        if !document {
            tracing::debug!(key = %key, "skipping object without .json extension");
        }
        document
    })
}

/// Restores an object-store backup into a dashboard service.
pub struct ImportService {
    api: Arc<dyn DashboardApi>,
    store: Arc<dyn BlobStore>,
    namespaces: Namespaces,
    options: ImportOptions,
}

/// Folder uid to numeric id, for one run.
type FolderCache = HashMap<String, i64>;

impl ImportService {
    /// Creates an import service with default options.
    #[must_use]
    pub fn new(
        api: Arc<dyn DashboardApi>,
        store: Arc<dyn BlobStore>,
        namespaces: Namespaces,
    ) -> Self {
        Self {
            api,
            store,
            namespaces,
            options: ImportOptions::default(),
        }
    }

    /// Replaces the options.
    #[must_use]
    pub const fn with_options(mut self, options: ImportOptions) -> Self {
        self.options = options;
        self
    }

    /// Runs one import.
    #[instrument(
        skip(self),
        fields(
            operation = "import",
            namespace = %self.namespaces.dashboards,
            uid_strategy = self.options.uid_strategy.as_str()
        )
    )]
    pub fn run(&self) -> RunReport {
        let start = Instant::now();

        let mut report = if self.options.import_datasources {
            self.import_datasources()
        } else {
            tracing::debug!("skipping datasource pass");
            RunReport::new()
        };
        report.merge(self.import_dashboards());

        finish_run(PIPELINE, &report, start);
        report
    }

    fn import_datasources(&self) -> RunReport {
        let mut report = RunReport::new();
        let prefix = namespace_prefix(&self.namespaces.datasources);

        let keys = match self.store.list(&prefix) {
            Ok(keys) => keys,
            Err(e) => {
                record_item(
                    &mut report,
                    PIPELINE,
                    ItemRef::datasource(&prefix),
                    Err(format!("could not list stored datasources: {e}")),
                );
                return report;
            },
        };

        for key in document_keys(&keys) {
            let outcome = self.import_datasource(key);
            record_item(&mut report, PIPELINE, ItemRef::datasource(key), outcome);
        }

        report
    }

    fn import_datasource(&self, key: &str) -> Result<(), String> {
        let bytes = self.store.get(key).map_err(|e| e.to_string())?;
        let definition: Value =
            serde_json::from_slice(&bytes).map_err(|e| format!("invalid JSON: {e}"))?;
        if !definition.is_object() {
            return Err("datasource definition is not a JSON object".to_string());
        }

        match self
            .api
            .create_datasource(&definition)
            .map_err(|e| e.to_string())?
        {
            DatasourceCreated::Created { name } => {
                tracing::debug!(key, name = %name, "imported datasource");
            },
            DatasourceCreated::AlreadyExists => {
                tracing::debug!(key, "datasource already present, left unchanged");
            },
        }
        Ok(())
    }

    fn import_dashboards(&self) -> RunReport {
        let mut report = RunReport::new();
        let prefix = namespace_prefix(&self.namespaces.dashboards);

        let keys = match self.store.list(&prefix) {
            Ok(keys) => keys,
            Err(e) => {
                report.mark_fatal(format!("could not list stored dashboards: {e}"));
                return report;
            },
        };
        tracing::debug!(count = keys.len(), prefix = %prefix, "listed stored dashboards");

        let mut folders = FolderCache::new();
        let mut resolver = self
            .options
            .resolve_datasources
            .then(|| DatasourceResolver::new(self.api.as_ref()));

        for key in document_keys(&keys) {
            let outcome = self.import_dashboard(key, &mut folders, resolver.as_mut());
            record_item(&mut report, PIPELINE, ItemRef::dashboard(key), outcome);
        }

        report
    }

    fn import_dashboard(
        &self,
        key: &str,
        folders: &mut FolderCache,
        resolver: Option<&mut DatasourceResolver<'_>>,
    ) -> Result<(), String> {
        let (folder_title, _filename) =
            split_dashboard_key(key).ok_or_else(|| "key has no folder segment".to_string())?;
        let folder_uid = derive_folder_identifier(&folder_title);
        let folder_id = self.resolve_folder(&folder_uid, &folder_title, folders)?;

        let bytes = self.store.get(key).map_err(|e| e.to_string())?;
        let mut document =
            DashboardDocument::from_slice(&bytes).map_err(|e| format!("invalid JSON: {e}"))?;
        if document.title().is_none() {
            return Err("dashboard has no title".to_string());
        }

        if let Some(resolver) = resolver {
            let stats = resolver.resolve_document(&mut document);
            if stats.unresolved > 0 {
                tracing::debug!(
                    key,
                    unresolved = stats.unresolved,
                    "cleared datasource references"
                );
            }
        }

        let new_uid = match self.options.uid_strategy {
            UidStrategy::Regenerate => Some(uuid::Uuid::new_v4().to_string()),
            UidStrategy::Preserve => None,
        };
        document.reset_identity(new_uid);

        let upserted = self
            .api
            .upsert_dashboard(&document, folder_id, true)
            .map_err(|e| e.to_string())?;
        tracing::debug!(
            key,
            dashboard_uid = %upserted.uid,
            folder_uid = %folder_uid,
            "imported dashboard"
        );
        Ok(())
    }

    /// Finds or creates the folder, at most one service round trip per uid.
    fn resolve_folder(
        &self,
        uid: &str,
        title: &str,
        folders: &mut FolderCache,
    ) -> Result<i64, String> {
        if let Some(id) = folders.get(uid) {
            return Ok(*id);
        }

        let id = match self.api.get_folder(uid) {
            Ok(Some(folder)) => folder.id,
            Ok(None) => {
                self.api
                    .create_folder(uid, title)
                    .map_err(|e| format!("could not create folder '{uid}': {e}"))?
                    .id
            },
            Err(e) => return Err(format!("could not look up folder '{uid}': {e}")),
        };
        folders.insert(uid.to_string(), id);
        Ok(id)
    }
}
