//! Export pipeline.
//!
//! Walks folders, then the dashboards in each folder, and writes every
//! dashboard document and datasource definition to the object store. Only a
//! failure to list folders stops the run.

use super::{finish_run, record_item};
use crate::client::{BlobStore, DashboardApi};
use crate::config::Namespaces;
use crate::keys::{dashboard_key, datasource_key};
use crate::models::{DashboardDocument, Folder, SearchHit};
use crate::report::{ItemRef, RunReport};
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

const PIPELINE: &str = "export";

/// Copies a dashboard service's configuration into an object store.
pub struct ExportService {
    api: Arc<dyn DashboardApi>,
    store: Arc<dyn BlobStore>,
    namespaces: Namespaces,
}

impl ExportService {
    /// Creates an export service.
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
        }
    }

    /// Runs one export.
    #[instrument(skip(self), fields(operation = "export", namespace = %self.namespaces.dashboards))]
    pub fn run(&self) -> RunReport {
        let start = Instant::now();

        let mut report = self.export_dashboards();
        if report.fatal.is_none() {
            report.merge(self.export_datasources());
        }

        finish_run(PIPELINE, &report, start);
        report
    }

    fn export_dashboards(&self) -> RunReport {
        let mut report = RunReport::new();

        let folders = match self.api.search_folders() {
            Ok(folders) => folders,
            Err(e) => {
                report.mark_fatal(format!("could not list folders: {e}"));
                return report;
            },
        };
        tracing::debug!(count = folders.len(), "listed folders");

        for folder in &folders {
            let hits = match self.api.search_dashboards(folder.id) {
                Ok(hits) => hits,
                Err(e) => {
                    record_item(
                        &mut report,
                        PIPELINE,
                        ItemRef::folder(&folder.uid),
                        Err(format!("could not list dashboards: {e}")),
                    );
                    continue;
                },
            };

            for hit in &hits {
                let outcome = self.export_dashboard(folder, hit);
                record_item(&mut report, PIPELINE, ItemRef::dashboard(&hit.uid), outcome);
            }
        }

        report
    }

    fn export_dashboard(&self, folder: &Folder, hit: &SearchHit) -> Result<(), String> {
        let envelope = self.api.get_dashboard(&hit.uid).map_err(|e| e.to_string())?;
        let document = DashboardDocument::new(envelope.dashboard);

        let title = document.title().unwrap_or(&hit.title);
        let key = dashboard_key(&self.namespaces.dashboards, &folder.title, title);
        let bytes = document.to_bytes()?;

        self.store.put(&key, bytes).map_err(|e| e.to_string())?;
        tracing::debug!(dashboard_uid = %hit.uid, key = %key, "exported dashboard");
        Ok(())
    }

    fn export_datasources(&self) -> RunReport {
        let mut report = RunReport::new();

        let datasources = match self.api.list_datasources() {
            Ok(datasources) => datasources,
            Err(e) => {
                record_item(
                    &mut report,
                    PIPELINE,
                    ItemRef::datasource(&self.namespaces.datasources),
                    Err(format!("could not list datasources: {e}")),
                );
                return report;
            },
        };

        for datasource in &datasources {
            let key = datasource_key(&self.namespaces.datasources, &datasource.name);
            let outcome = datasource
                .to_bytes()
                .and_then(|bytes| self.store.put(&key, bytes).map_err(|e| e.to_string()));
            if outcome.is_ok() {
                tracing::debug!(name = %datasource.name, key = %key, "exported datasource");
            }
            record_item(
                &mut report,
                PIPELINE,
                ItemRef::datasource(&datasource.name),
                outcome,
            );
        }

        report
    }
}
