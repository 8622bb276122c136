//! Backup and restore pipelines.
//!
//! Services orchestrate the dashboard service and the object store. Each run
//! returns a [`RunReport`]; nothing inside a run returns early on an item
//! failure.

mod datasource_resolver;
mod export;
mod import;

pub use datasource_resolver::{DatasourceResolver, Resolution, ResolutionStats};
pub use export::ExportService;
pub use import::{ImportOptions, ImportService};

use crate::report::{ItemRef, RunReport};
use std::time::Instant;

/// Records one item outcome, logging and counting it.
fn record_item(
    report: &mut RunReport,
    pipeline: &'static str,
    item: ItemRef,
    outcome: std::result::Result<(), String>,
) {
    let status = if outcome.is_ok() { "success" } else { "error" };
    metrics::counter!(
        "dashvault_items_total",
        "pipeline" => pipeline,
        "kind" => item.kind.as_str(),
        "status" => status
    )
    .increment(1);

    if let Err(reason) = &outcome {
        tracing::warn!(pipeline, item = %item, reason = %reason, "item failed");
    }
    report.record(item, outcome);
}

/// Emits the end-of-run log line and duration histogram.
fn finish_run(pipeline: &'static str, report: &RunReport, start: Instant) {
    metrics::histogram!("dashvault_run_duration_ms", "pipeline" => pipeline)
        .record(start.elapsed().as_secs_f64() * 1000.0);

    match &report.fatal {
        Some(cause) => tracing::error!(
            pipeline,
            attempted = report.attempted,
            failed = report.failed(),
            cause = %cause,
            "run stopped"
        ),
        None => tracing::info!(
            pipeline,
            status = %report.status(),
            attempted = report.attempted,
            succeeded = report.succeeded,
            failed = report.failed(),
            "run finished"
        ),
    }
}
