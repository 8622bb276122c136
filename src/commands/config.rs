//! Config command handler.
//!
//! Prints the effective configuration. Secrets are shown only as set or unset.

use dashvault::VaultConfig;
use dashvault::config::StoreKind;
use std::process::ExitCode;

/// Config command.
pub fn cmd_config(
    config: &VaultConfig,
    show: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    if !show {
        println!("Use --show to display the effective configuration.");
        return Ok(ExitCode::SUCCESS);
    }

    println!("Current Configuration");
    println!("=====================");
    println!();

    println!("Service:");
    println!("  URL: {}", config.service.url);
    println!("  Token: {}", redacted(config.service.token.is_some()));
    println!("  Timeout: {}ms", config.service.timeout_ms);
    println!("  Connect Timeout: {}ms", config.service.connect_timeout_ms);
    println!();

    println!("Store:");
    println!("  Kind: {}", config.store.kind.as_str());
    match config.store.kind {
        StoreKind::S3 => {
            println!("  Bucket: {}", config.store.bucket);
            println!("  Region: {}", config.store.region);
            println!(
                "  Endpoint: {}",
                config.store.endpoint.as_deref().unwrap_or("(default)")
            );
            println!(
                "  Access Key Id: {}",
                config.store.access_key_id.as_deref().unwrap_or("(from environment)")
            );
            println!(
                "  Secret Access Key: {}",
                redacted(config.store.secret_access_key.is_some())
            );
            println!("  Allow HTTP: {}", config.store.allow_http);
        },
        StoreKind::Local => {
            println!(
                "  Root: {}",
                config
                    .store
                    .root
                    .as_ref()
                    .map_or_else(|| "(not set)".to_string(), |p| p.display().to_string())
            );
        },
        StoreKind::Memory => {},
    }
    println!();

    println!("Namespaces:");
    println!("  Dashboards: {}", config.namespaces.dashboards);
    println!("  Datasources: {}", config.namespaces.datasources);
    println!();

    println!("Run:");
    println!(
        "  Deadline: {}",
        config
            .run
            .deadline_secs
            .map_or_else(|| "(none)".to_string(), |secs| format!("{secs}s"))
    );
    println!(
        "  Max Item Failures: {}",
        config
            .run
            .max_item_failures
            .map_or_else(|| "(unlimited)".to_string(), |max| max.to_string())
    );
    println!("  Import Datasources: {}", config.run.import_datasources);
    println!("  Resolve Datasources: {}", config.run.resolve_datasources);
    println!("  Uid Strategy: {}", config.run.uid_strategy.as_str());
    println!();

    println!("Logging:");
    println!(
        "  Level: {}",
        config.logging.level.as_deref().unwrap_or("(default)")
    );
    println!(
        "  Format: {}",
        config.logging.format.as_deref().unwrap_or("pretty")
    );
    if let Some(file) = &config.logging.file {
        println!("  File: {}", file.display());
    }

    if let Err(e) = config.validate() {
        println!();
        println!("Warning: {e}");
    }

    Ok(ExitCode::SUCCESS)
}

const fn redacted(is_set: bool) -> &'static str {
    if is_set { "(set)" } else { "(not set)" }
}
