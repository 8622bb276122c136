//! Export and import command handlers.

use dashvault::{
    BlobStore, DashboardApi, Deadline, ExitPolicy, ExportService, HttpDashboardClient,
    ImportOptions, ImportService, ObjectStoreClient, RunReport, UidStrategy, VaultConfig,
};
use std::process::ExitCode;
use std::sync::Arc;

/// Import flags from the command line. Each one overrides the config file.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportFlags {
    /// Skip the datasource pass.
    pub skip_datasources: bool,
    /// Leave datasource references unresolved.
    pub no_resolve_datasources: bool,
    /// Keep stored uids.
    pub preserve_uids: bool,
}

impl ImportFlags {
    fn apply(self, mut options: ImportOptions) -> ImportOptions {
        if self.skip_datasources {
            options = options.with_import_datasources(false);
        }
        if self.no_resolve_datasources {
            options = options.with_resolve_datasources(false);
        }
        if self.preserve_uids {
            options = options.with_uid_strategy(UidStrategy::Preserve);
        }
        options
    }
}

type Clients = (Arc<dyn DashboardApi>, Arc<dyn BlobStore>);

/// Builds both clients sharing one run deadline.
fn build_clients(config: &VaultConfig) -> Result<Clients, Box<dyn std::error::Error>> {
    config.validate()?;

    let deadline = Deadline::from_secs(config.run.deadline_secs);
    if let Some(budget) = deadline.remaining() {
        tracing::info!(budget_secs = budget.as_secs(), "run deadline set");
    }
    let api: Arc<dyn DashboardApi> =
        Arc::new(HttpDashboardClient::from_config(&config.service, deadline)?);
    let store: Arc<dyn BlobStore> =
        Arc::new(ObjectStoreClient::from_config(&config.store, deadline)?);
    Ok((api, store))
}

/// Prints the report and maps it to an exit code.
fn finish(config: &VaultConfig, report: &RunReport) -> ExitCode {
    println!("{}", report.summary());

    if ExitPolicy::new(config.run.max_item_failures).is_failure(report) {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Export command.
pub fn cmd_export(config: &VaultConfig) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let (api, store) = build_clients(config)?;

    let report = ExportService::new(api, store, config.namespaces.clone()).run();
    Ok(finish(config, &report))
}

/// Import command.
pub fn cmd_import(
    config: &VaultConfig,
    flags: ImportFlags,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let (api, store) = build_clients(config)?;
    let options = flags.apply(ImportOptions::from_settings(&config.run));

    let report = ImportService::new(api, store, config.namespaces.clone())
        .with_options(options)
        .run();
    Ok(finish(config, &report))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_settings() {
        let options = ImportOptions::default();
        let flags = ImportFlags {
            skip_datasources: true,
            no_resolve_datasources: false,
            preserve_uids: true,
        };

        let applied = flags.apply(options);
        assert!(!applied.import_datasources);
        assert!(applied.resolve_datasources);
        assert_eq!(applied.uid_strategy, UidStrategy::Preserve);
    }

    #[test]
    fn test_no_flags_keep_settings() {
        let options = ImportOptions::default().with_resolve_datasources(false);
        assert_eq!(ImportFlags::default().apply(options), options);
    }
}
