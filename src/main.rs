//! Binary entry point for dashvault.
//!
//! This binary provides the CLI for backing up and restoring a dashboard
//! service to object storage.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

mod commands;

use clap::{Parser, Subcommand};
use dashvault::VaultConfig;
use dashvault::observability;
use std::path::PathBuf;
use std::process::ExitCode;

/// Dashvault - backup and restore for dashboards, folders and datasources.
#[derive(Parser)]
#[command(name = "dashvault")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true, env = "DASHVAULT_CONFIG_PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Copy folders, dashboards and datasources into the object store.
    Export,

    /// Replay a stored backup into the dashboard service.
    Import {
        /// Do not import stored datasources.
        #[arg(long)]
        skip_datasources: bool,

        /// Leave panel datasource references as stored.
        #[arg(long)]
        no_resolve_datasources: bool,

        /// Keep stored dashboard uids instead of generating new ones.
        #[arg(long)]
        preserve_uids: bool,
    },

    /// Manage configuration.
    Config {
        /// Show the effective configuration.
        #[arg(long)]
        show: bool,
    },
}

/// Main entry point.
fn main() -> ExitCode {
    // A missing .env file is normal.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let config = match VaultConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    if let Err(e) = observability::init_from_settings(&config.logging, cli.verbose) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match run_command(cli, config) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command.
fn run_command(cli: Cli, config: VaultConfig) -> Result<ExitCode, Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Export => commands::cmd_export(&config),

        Commands::Import {
            skip_datasources,
            no_resolve_datasources,
            preserve_uids,
        } => commands::cmd_import(
            &config,
            commands::ImportFlags {
                skip_datasources,
                no_resolve_datasources,
                preserve_uids,
            },
        ),

        Commands::Config { show } => commands::cmd_config(&config, show),
    }
}
