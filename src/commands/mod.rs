//! Command handlers module.
//!
//! - `run.rs`: export and import commands
//! - `config.rs`: configuration display command

mod config;
mod run;

pub use config::cmd_config;
pub use run::{ImportFlags, cmd_export, cmd_import};
