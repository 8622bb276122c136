//! Export and import pipeline integration tests.
//!
//! Drives both pipelines against the in-memory dashboard service and the
//! in-memory (or local filesystem) object store:
//! - Per-item failure isolation and run status
//! - Deterministic export bytes
//! - Folder re-creation and reuse by derived identifier
//! - Datasource reference resolution
//! - Fatal conditions and the exit policy

// Integration tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

use dashvault::client::RemoteResult;
use dashvault::config::{StoreConfig, StoreKind};
use dashvault::{
    BlobStore, Deadline, ExitPolicy, ExportService, ImportOptions, ImportService,
    InMemoryDashboardService, ItemKind, Namespaces, ObjectStoreClient, RemoteError, RunStatus,
    UidStrategy,
};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Test Helpers
// ============================================================================

/// A source instance with two folders, three dashboards and two datasources.
fn source_service() -> Arc<InMemoryDashboardService> {
    let api = Arc::new(InMemoryDashboardService::new());
    let infra = api.add_folder("infra", "Infra/Prod");
    let apps = api.add_folder("apps", "Apps");

    api.add_dashboard(
        infra.id,
        json!({
            "uid": "cpu",
            "title": "CPU",
            "panels": [
                {"id": 1, "datasource": "prom-src"},
                {"id": 2, "type": "row", "panels": [
                    {"id": 3, "datasource": {"type": "loki", "uid": "loki-src"}}
                ]}
            ]
        }),
    );
    api.add_dashboard(
        infra.id,
        json!({"uid": "mem", "title": "Memory", "panels": [{"datasource": "$datasource"}]}),
    );
    api.add_dashboard(
        apps.id,
        json!({"uid": "http", "title": "HTTP / Latency", "rows": [
            {"panels": [{"datasource": "retired-uid"}]}
        ]}),
    );

    api.add_datasource(
        "Prometheus",
        "prom-src",
        json!({"type": "prometheus", "url": "http://prom:9090", "access": "proxy"}),
    );
    api.add_datasource("Loki", "loki-src", json!({"type": "loki", "url": "http://loki:3100"}));
    api
}

fn memory_store() -> Arc<ObjectStoreClient> {
    Arc::new(ObjectStoreClient::in_memory().unwrap())
}

fn export(
    api: &Arc<InMemoryDashboardService>,
    store: &Arc<ObjectStoreClient>,
) -> dashvault::RunReport {
    ExportService::new(api.clone(), store.clone(), Namespaces::default()).run()
}

fn import(
    api: &Arc<InMemoryDashboardService>,
    store: &Arc<ObjectStoreClient>,
    options: ImportOptions,
) -> dashvault::RunReport {
    ImportService::new(api.clone(), store.clone(), Namespaces::default())
        .with_options(options)
        .run()
}

fn dashboard_titled(api: &InMemoryDashboardService, title: &str) -> Value {
    api.dashboards()
        .into_iter()
        .find(|d| d.document["title"] == title)
        .map(|d| d.document)
        .unwrap()
}

/// An object store whose every call fails.
struct UnreachableStore;

impl BlobStore for UnreachableStore {
    fn list(&self, _prefix: &str) -> RemoteResult<Vec<String>> {
        Err(unreachable_error())
    }

    fn get(&self, _key: &str) -> RemoteResult<Vec<u8>> {
        Err(unreachable_error())
    }

    fn put(&self, _key: &str, _bytes: Vec<u8>) -> RemoteResult<()> {
        Err(unreachable_error())
    }
}

fn unreachable_error() -> RemoteError {
    RemoteError::Storage {
        operation: "list_objects".to_string(),
        cause: "connection refused".to_string(),
    }
}

// ============================================================================
// Export
// ============================================================================

#[test]
fn test_export_layout() {
    let api = source_service();
    let store = memory_store();

    let report = export(&api, &store);
    assert_eq!(report.status(), RunStatus::AllSucceeded);
    assert_eq!(report.succeeded, 5);

    assert_eq!(
        store.list("dashboards/").unwrap(),
        vec![
            "dashboards/Apps/HTTP - Latency.json",
            "dashboards/Infra-Prod/CPU.json",
            "dashboards/Infra-Prod/Memory.json",
        ]
    );
    assert_eq!(
        store.list("datasources/").unwrap(),
        vec!["datasources/Loki.json", "datasources/Prometheus.json"]
    );

    let prometheus: Value =
        serde_json::from_slice(&store.get("datasources/Prometheus.json").unwrap()).unwrap();
    assert_eq!(prometheus["url"], "http://prom:9090");
    assert_eq!(prometheus["access"], "proxy");
}

#[test]
fn test_one_failing_dashboard_of_three() {
    let api = Arc::new(InMemoryDashboardService::new());
    let folder = api.add_folder("ops", "Ops");
    for uid in ["a", "b", "c"] {
        api.add_dashboard(folder.id, json!({"uid": uid, "title": uid.to_uppercase()}));
    }
    api.fail_on("get_dashboard", Some("b"));
    let store = memory_store();

    let report = export(&api, &store);
    assert_eq!(report.status(), RunStatus::PartialFailure);
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed(), 1);
    assert_eq!(report.failures[0].item.kind, ItemKind::Dashboard);
    assert_eq!(report.failures[0].item.id, "b");
    assert!(report.failures[0].reason.contains("500"));
    assert_eq!(store.list("dashboards/").unwrap().len(), 2);

    assert!(!ExitPolicy::default().is_failure(&report));
    assert!(ExitPolicy::new(Some(0)).is_failure(&report));
}

#[test]
fn test_export_is_byte_stable() {
    let api = source_service();
    let store = memory_store();

    export(&api, &store);
    let first = store.get("dashboards/Infra-Prod/CPU.json").unwrap();
    export(&api, &store);
    let second = store.get("dashboards/Infra-Prod/CPU.json").unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_export_fatal_on_folder_listing() {
    let api = source_service();
    api.fail_on("search_folders", None);
    let store = memory_store();

    let report = export(&api, &store);
    assert_eq!(report.status(), RunStatus::Fatal);
    assert!(report.fatal.as_deref().unwrap().contains("could not list folders"));
    assert!(store.list("").unwrap().is_empty());
    assert!(ExitPolicy::default().is_failure(&report));
}

#[test]
fn test_export_store_failures_are_item_failures() {
    let api = source_service();
    let report = ExportService::new(api, Arc::new(UnreachableStore), Namespaces::default()).run();

    assert_eq!(report.status(), RunStatus::PartialFailure);
    assert_eq!(report.succeeded, 0);
    assert_eq!(report.failed(), 5);
}

// ============================================================================
// Import
// ============================================================================

#[test]
fn test_round_trip_into_fresh_instance() {
    let source = source_service();
    let store = memory_store();
    export(&source, &store);

    let target = Arc::new(InMemoryDashboardService::new());
    let report = import(&target, &store, ImportOptions::default());
    assert_eq!(report.status(), RunStatus::AllSucceeded);
    assert_eq!(report.succeeded, 5);

    let mut folder_uids: Vec<String> = target.folders().into_iter().map(|f| f.uid).collect();
    folder_uids.sort();
    assert_eq!(folder_uids, vec!["apps", "infra-prod"]);
    assert_eq!(target.datasources().len(), 2);

    // References are rewritten to datasource names.
    let cpu = dashboard_titled(&target, "CPU");
    assert_eq!(cpu["panels"][0]["datasource"], "Prometheus");
    assert_eq!(cpu["panels"][1]["panels"][0]["datasource"], "Loki");
    assert_ne!(cpu["uid"], "cpu");

    let memory = dashboard_titled(&target, "Memory");
    assert_eq!(memory["panels"][0]["datasource"], "$datasource");
}

#[test]
fn test_unknown_datasource_becomes_null() {
    let source = source_service();
    let store = memory_store();
    export(&source, &store);

    let target = Arc::new(InMemoryDashboardService::new());
    let report = import(&target, &store, ImportOptions::default());
    assert_eq!(report.status(), RunStatus::AllSucceeded);

    let http = dashboard_titled(&target, "HTTP / Latency");
    assert_eq!(http["rows"][0]["panels"][0]["datasource"], Value::Null);
}

#[test]
fn test_reserved_characters_survive_round_trip() {
    let source = Arc::new(InMemoryDashboardService::new());
    let prod = source.add_folder("prod", "[Prod] API");
    source.add_dashboard(prod.id, json!({"uid": "exp", "title": "Node Exporter | Linux 50%"}));
    let store = memory_store();

    assert_eq!(export(&source, &store).status(), RunStatus::AllSucceeded);
    assert_eq!(
        store.list("dashboards/").unwrap(),
        vec!["dashboards/[Prod] API/Node Exporter | Linux 50%.json"]
    );

    let target = Arc::new(InMemoryDashboardService::new());
    let options = ImportOptions::default().with_import_datasources(false);
    assert_eq!(import(&target, &store, options).status(), RunStatus::AllSucceeded);

    let folders = target.folders();
    assert_eq!(folders[0].title, "[Prod] API");
    assert_eq!(folders[0].uid, "-prod--api");
    assert_eq!(target.dashboards()[0].document["title"], "Node Exporter | Linux 50%");
}

#[test]
fn test_same_derived_folder_created_once() {
    let store = memory_store();
    store
        .put("dashboards/Infra-Prod/A.json", br#"{"title": "A"}"#.to_vec())
        .unwrap();
    store
        .put("dashboards/infra prod/B.json", br#"{"title": "B"}"#.to_vec())
        .unwrap();
    store
        .put("dashboards/Infra-Prod/C.json", br#"{"title": "C"}"#.to_vec())
        .unwrap();

    let target = Arc::new(InMemoryDashboardService::new());
    let report = import(&target, &store, ImportOptions::default());

    assert_eq!(report.status(), RunStatus::AllSucceeded);
    assert_eq!(target.calls("create_folder"), vec!["infra-prod"]);
    assert_eq!(target.calls("get_folder"), vec!["infra-prod"]);
    assert_eq!(target.dashboards().len(), 3);
}

#[test]
fn test_regenerated_uids_duplicate_on_reimport() {
    let source = source_service();
    let store = memory_store();
    export(&source, &store);

    let target = Arc::new(InMemoryDashboardService::new());
    let options = ImportOptions::default().with_import_datasources(false);
    import(&target, &store, options);
    import(&target, &store, options);

    assert_eq!(target.dashboards().len(), 6);
    assert_eq!(target.folders().len(), 2);
}

#[test]
fn test_preserved_uids_overwrite_on_reimport() {
    let source = source_service();
    let store = memory_store();
    export(&source, &store);

    let target = Arc::new(InMemoryDashboardService::new());
    let options = ImportOptions::default().with_uid_strategy(UidStrategy::Preserve);
    import(&target, &store, options);
    let second = import(&target, &store, options);

    assert_eq!(second.status(), RunStatus::AllSucceeded);
    assert_eq!(target.dashboards().len(), 3);
    assert_eq!(target.datasources().len(), 2);
    assert_eq!(dashboard_titled(&target, "CPU")["uid"], "cpu");
}

#[test]
fn test_import_fatal_when_listing_fails() {
    let target = Arc::new(InMemoryDashboardService::new());
    let report =
        ImportService::new(target.clone(), Arc::new(UnreachableStore), Namespaces::default()).run();

    // Datasource listing failure is one item, dashboard listing failure is fatal.
    assert_eq!(report.status(), RunStatus::Fatal);
    assert_eq!(report.attempted, 1);
    assert_eq!(report.failures[0].item.kind, ItemKind::Datasource);
    assert!(target.calls("upsert_dashboard").is_empty());
}

#[test]
fn test_spent_deadline_stops_import() {
    let store = ObjectStoreClient::with_store(
        Arc::new(object_store::memory::InMemory::new()),
        Deadline::after(Duration::ZERO),
    )
    .unwrap();
    let target = Arc::new(InMemoryDashboardService::new());

    let report = ImportService::new(target, Arc::new(store), Namespaces::default())
        .with_options(ImportOptions::default().with_import_datasources(false))
        .run();

    assert_eq!(report.status(), RunStatus::Fatal);
    assert!(
        report
            .fatal
            .as_deref()
            .unwrap()
            .contains(&RemoteError::DeadlineExceeded.to_string())
    );
}

#[test]
fn test_failing_upsert_isolated() {
    let source = source_service();
    let store = memory_store();
    export(&source, &store);

    let target = Arc::new(InMemoryDashboardService::new());
    let options = ImportOptions::default().with_uid_strategy(UidStrategy::Preserve);
    target.fail_on("upsert_dashboard", Some("mem"));

    let report = import(&target, &store, options);
    assert_eq!(report.status(), RunStatus::PartialFailure);
    assert_eq!(report.failed(), 1);
    assert_eq!(report.failures[0].item.id, "dashboards/Infra-Prod/Memory.json");
    assert_eq!(target.dashboards().len(), 2);
}

// ============================================================================
// Local filesystem store
// ============================================================================

#[test]
fn test_round_trip_through_local_store() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig {
        kind: StoreKind::Local,
        root: Some(dir.path().to_path_buf()),
        ..StoreConfig::default()
    };
    let store = Arc::new(ObjectStoreClient::from_config(&config, Deadline::none()).unwrap());

    let source = Arc::new(InMemoryDashboardService::new());
    let team = source.add_folder("team", "Team A / Ops");
    source.add_dashboard(team.id, json!({"uid": "t", "title": "Overview"}));

    let exported = ExportService::new(source, store.clone(), Namespaces::default()).run();
    assert_eq!(exported.status(), RunStatus::AllSucceeded);

    let target = Arc::new(InMemoryDashboardService::new());
    let imported = ImportService::new(target.clone(), store, Namespaces::default()).run();
    assert_eq!(imported.status(), RunStatus::AllSucceeded);

    let folders = target.folders();
    assert_eq!(folders.len(), 1);
    assert_eq!(folders[0].title, "Team A - Ops");
    assert_eq!(folders[0].uid, "team-a---ops");
}
