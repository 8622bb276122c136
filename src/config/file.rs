//! Configuration file structure (for TOML parsing).
//!
//! Every field is optional; missing values keep their defaults.

use serde::Deserialize;

/// Top-level config file.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Dashboard service section.
    pub service: Option<ConfigFileService>,
    /// Object store section.
    pub store: Option<ConfigFileStore>,
    /// Key namespaces section.
    pub namespaces: Option<ConfigFileNamespaces>,
    /// Run behaviour section.
    pub run: Option<ConfigFileRun>,
    /// Logging section.
    pub logging: Option<ConfigFileLogging>,
}

/// `[service]` section.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileService {
    /// Base URL.
    pub url: Option<String>,
    /// API token.
    pub token: Option<String>,
    /// Request timeout in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Connect timeout in milliseconds.
    pub connect_timeout_ms: Option<u64>,
}

/// `[store]` section.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileStore {
    /// Store kind: `s3`, `local` or `memory`.
    pub kind: Option<String>,
    /// Endpoint URL for S3-compatible services.
    pub endpoint: Option<String>,
    /// Bucket name.
    pub bucket: Option<String>,
    /// Region.
    pub region: Option<String>,
    /// Access key id.
    pub access_key_id: Option<String>,
    /// Secret access key.
    pub secret_access_key: Option<String>,
    /// Allow plain HTTP endpoints.
    pub allow_http: Option<bool>,
    /// Root directory for the local store.
    pub root: Option<String>,
}

/// `[namespaces]` section.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileNamespaces {
    /// Dashboard key prefix.
    pub dashboards: Option<String>,
    /// Datasource key prefix.
    pub datasources: Option<String>,
}

/// `[run]` section.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileRun {
    /// Overall budget in seconds.
    pub deadline_secs: Option<u64>,
    /// Item failures tolerated before the exit code turns non-zero.
    pub max_item_failures: Option<usize>,
    /// Resolve panel datasource references on import.
    pub resolve_datasources: Option<bool>,
    /// Import datasources before dashboards.
    pub import_datasources: Option<bool>,
    /// `regenerate` or `preserve`.
    pub uid_strategy: Option<String>,
}

/// `[logging]` section.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileLogging {
    /// Log level or filter directive.
    pub level: Option<String>,
    /// `pretty` or `json`.
    pub format: Option<String>,
    /// Log file path.
    pub file: Option<String>,
}
