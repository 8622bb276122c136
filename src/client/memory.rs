//! In-memory dashboard service for testing.
//!
//! Provides a non-persistent implementation of [`DashboardApi`] that behaves
//! like the REST API closely enough to drive both pipelines end to end: ids
//! are assigned on create, folder-scoped search works, and duplicate
//! datasource names answer "already exists". Failures can be injected per
//! operation or per target.
//!
//! # Example
//!
//! ```rust,ignore
//! use dashvault::client::InMemoryDashboardService;
//!
//! let service = InMemoryDashboardService::new();
//! let infra = service.add_folder("infra", "Infra/Prod");
//! service.add_dashboard(infra.id, serde_json::json!({"uid": "cpu", "title": "CPU"}));
//! service.fail_on("get_dashboard", Some("cpu"));
//! ```

use super::{DashboardApi, RemoteError, RemoteResult};
use crate::models::{
    DashboardDocument, DashboardEnvelope, Datasource, DatasourceCreated, Folder, SearchHit,
    SearchHitKind, UpsertedDashboard,
};
use serde_json::{Map, Value, json};
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A dashboard held by the in-memory service.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDashboard {
    /// Numeric id.
    pub id: i64,
    /// Folder the dashboard lives in.
    pub folder_id: i64,
    /// The document as last written.
    pub document: Value,
}

impl StoredDashboard {
    fn uid(&self) -> &str {
        self.document.get("uid").and_then(Value::as_str).unwrap_or("")
    }

    fn title(&self) -> &str {
        self.document.get("title").and_then(Value::as_str).unwrap_or("")
    }
}

#[derive(Debug, Default)]
struct State {
    next_id: i64,
    folders: Vec<Folder>,
    dashboards: Vec<StoredDashboard>,
    datasources: Vec<Datasource>,
    /// `(operation, target)`; a `None` target fails every call.
    failures: HashSet<(String, Option<String>)>,
    /// `(operation, target)` of every call, in order.
    calls: Vec<(String, String)>,
}

impl State {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn enter(&mut self, operation: &str, target: &str) -> RemoteResult<()> {
        self.calls.push((operation.to_string(), target.to_string()));

        let fails = self.failures.contains(&(operation.to_string(), None))
            || self
                .failures
                .contains(&(operation.to_string(), Some(target.to_string())));
        if fails {
            return Err(RemoteError::Protocol {
                operation: operation.to_string(),
                status: 500,
                body: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

/// In-memory dashboard service for testing.
///
/// Uses a `Mutex` so the service can be shared as `Arc<dyn DashboardApi>`.
/// Data is not persisted between runs.
#[derive(Debug, Default)]
pub struct InMemoryDashboardService {
    state: Mutex<State>,
}

impl InMemoryDashboardService {
    /// Creates an empty service.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a folder and returns it with its assigned id.
    pub fn add_folder(&self, uid: &str, title: &str) -> Folder {
        let mut state = self.state();
        let folder = Folder {
            id: state.allocate_id(),
            uid: uid.to_string(),
            title: title.to_string(),
        };
        state.folders.push(folder.clone());
        folder
    }

    /// Adds a dashboard to a folder. Returns the assigned id.
    pub fn add_dashboard(&self, folder_id: i64, document: Value) -> i64 {
        let mut state = self.state();
        let id = state.allocate_id();
        state.dashboards.push(StoredDashboard {
            id,
            folder_id,
            document,
        });
        id
    }

    /// Adds a datasource.
    pub fn add_datasource(&self, name: &str, uid: &str, body: Value) {
        let body = match body {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        self.state().datasources.push(Datasource {
            name: name.to_string(),
            uid: uid.to_string(),
            body,
        });
    }

    /// Makes `operation` answer HTTP 500, for one target or for every call.
    ///
    /// Targets are the uid argument, or the numeric folder id for
    /// `search_dashboards` and the datasource name for `create_datasource`.
    pub fn fail_on(&self, operation: &str, target: Option<&str>) {
        self.state()
            .failures
            .insert((operation.to_string(), target.map(ToString::to_string)));
    }

    /// Returns the targets of every call to `operation`, in order.
    #[must_use]
    pub fn calls(&self, operation: &str) -> Vec<String> {
        self.state()
            .calls
            .iter()
            .filter(|(op, _)| op == operation)
            .map(|(_, target)| target.clone())
            .collect()
    }

    /// Returns all folders.
    #[must_use]
    pub fn folders(&self) -> Vec<Folder> {
        self.state().folders.clone()
    }

    /// Returns all dashboards.
    #[must_use]
    pub fn dashboards(&self) -> Vec<StoredDashboard> {
        self.state().dashboards.clone()
    }

    /// Returns all datasources.
    #[must_use]
    pub fn datasources(&self) -> Vec<Datasource> {
        self.state().datasources.clone()
    }
}

fn not_found(operation: &str) -> RemoteError {
    RemoteError::Protocol {
        operation: operation.to_string(),
        status: 404,
        body: "not found".to_string(),
    }
}

impl DashboardApi for InMemoryDashboardService {
    fn search_folders(&self) -> RemoteResult<Vec<Folder>> {
        let mut state = self.state();
        state.enter("search_folders", "")?;
        Ok(state.folders.clone())
    }

    fn search_dashboards(&self, folder_id: i64) -> RemoteResult<Vec<SearchHit>> {
        let mut state = self.state();
        state.enter("search_dashboards", &folder_id.to_string())?;
        Ok(state
            .dashboards
            .iter()
            .filter(|d| d.folder_id == folder_id)
            .map(|d| SearchHit {
                id: d.id,
                uid: d.uid().to_string(),
                title: d.title().to_string(),
                kind: SearchHitKind::Dashboard,
            })
            .collect())
    }

    fn get_folder(&self, uid: &str) -> RemoteResult<Option<Folder>> {
        let mut state = self.state();
        state.enter("get_folder", uid)?;
        Ok(state.folders.iter().find(|f| f.uid == uid).cloned())
    }

    fn create_folder(&self, uid: &str, title: &str) -> RemoteResult<Folder> {
        let mut state = self.state();
        state.enter("create_folder", uid)?;
        if state.folders.iter().any(|f| f.uid == uid) {
            return Err(RemoteError::Protocol {
                operation: "create_folder".to_string(),
                status: 409,
                body: "a folder with the same uid already exists".to_string(),
            });
        }
        let folder = Folder {
            id: state.allocate_id(),
            uid: uid.to_string(),
            title: title.to_string(),
        };
        state.folders.push(folder.clone());
        Ok(folder)
    }

    fn get_dashboard(&self, uid: &str) -> RemoteResult<DashboardEnvelope> {
        let mut state = self.state();
        state.enter("get_dashboard", uid)?;
        let stored = state
            .dashboards
            .iter()
            .find(|d| d.uid() == uid)
            .ok_or_else(|| not_found("get_dashboard"))?;

        let mut dashboard = stored.document.clone();
        if let Some(object) = dashboard.as_object_mut() {
            object.insert("id".to_string(), json!(stored.id));
        }
        Ok(DashboardEnvelope { dashboard })
    }

    fn upsert_dashboard(
        &self,
        dashboard: &DashboardDocument,
        folder_id: i64,
        overwrite: bool,
    ) -> RemoteResult<UpsertedDashboard> {
        let mut state = self.state();
        let uid = dashboard.uid().unwrap_or_default().to_string();
        state.enter("upsert_dashboard", &uid)?;

        let mut document = dashboard.as_value().clone();
        let existing = state.dashboards.iter().position(|d| d.uid() == uid);
        let id = match existing {
            Some(_) if !overwrite => {
                return Err(RemoteError::Protocol {
                    operation: "upsert_dashboard".to_string(),
                    status: 412,
                    body: "a dashboard with the same uid already exists".to_string(),
                });
            },
            Some(index) => state.dashboards.remove(index).id,
            None => state.allocate_id(),
        };
        if let Some(object) = document.as_object_mut() {
            object.remove("id");
        }
        state.dashboards.push(StoredDashboard {
            id,
            folder_id,
            document,
        });

        Ok(UpsertedDashboard {
            id: Some(id),
            uid,
            status: Some("success".to_string()),
            version: Some(1),
        })
    }

    fn list_datasources(&self) -> RemoteResult<Vec<Datasource>> {
        let mut state = self.state();
        state.enter("list_datasources", "")?;
        Ok(state.datasources.clone())
    }

    fn get_datasource_by_uid(&self, uid: &str) -> RemoteResult<Option<Datasource>> {
        let mut state = self.state();
        state.enter("get_datasource_by_uid", uid)?;
        Ok(state.datasources.iter().find(|ds| ds.uid == uid).cloned())
    }

    fn create_datasource(&self, definition: &Value) -> RemoteResult<DatasourceCreated> {
        let mut state = self.state();
        let name = definition
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        state.enter("create_datasource", &name)?;

        if name.is_empty() {
            return Err(RemoteError::Protocol {
                operation: "create_datasource".to_string(),
                status: 400,
                body: "name is required".to_string(),
            });
        }
        if state.datasources.iter().any(|ds| ds.name == name) {
            return Ok(DatasourceCreated::AlreadyExists);
        }

        let mut datasource: Datasource =
            serde_json::from_value(definition.clone()).map_err(|e| RemoteError::Decode {
                operation: "create_datasource".to_string(),
                cause: e.to_string(),
            })?;
        if datasource.uid.is_empty() {
            datasource.uid = format!("ds-{}", state.allocate_id());
        }
        state.datasources.push(datasource);
        Ok(DatasourceCreated::Created { name })
    }
}
