//! Configuration management.
//!
//! Configuration is layered: defaults, then a TOML file, then `DASHVAULT_*`
//! environment variables. Secrets are held as [`SecretString`] and never
//! printed.

mod file;

pub use file::{
    ConfigFile, ConfigFileLogging, ConfigFileNamespaces, ConfigFileRun, ConfigFileService,
    ConfigFileStore,
};

use crate::keys::namespace_prefix;
use crate::{Error, Result};
use secrecy::SecretString;
use std::path::{Path, PathBuf};

/// Main configuration for dashvault.
#[derive(Debug, Clone, Default)]
pub struct VaultConfig {
    /// Dashboard service connection.
    pub service: ServiceConfig,
    /// Object store connection.
    pub store: StoreConfig,
    /// Key prefixes.
    pub namespaces: Namespaces,
    /// Run behaviour.
    pub run: RunSettings,
    /// Logging settings.
    pub logging: LoggingSettings,
}

/// Dashboard service connection.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Base URL, e.g. `http://grafana:3000`.
    pub url: String,
    /// API token sent as a bearer token.
    pub token: Option<SecretString>,
    /// Request timeout in milliseconds (0 to disable).
    pub timeout_ms: u64,
    /// Connect timeout in milliseconds (0 to disable).
    pub connect_timeout_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:3000".to_string(),
            token: None,
            timeout_ms: 30_000,
            connect_timeout_ms: 3_000,
        }
    }
}

/// Available object store backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreKind {
    /// S3-compatible service (AWS, MinIO, Ceph).
    #[default]
    S3,
    /// Directory on the local filesystem.
    Local,
    /// Process memory; contents vanish at exit.
    Memory,
}

impl StoreKind {
    /// Parses a store kind string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "s3" | "minio" => Some(Self::S3),
            "local" | "fs" | "filesystem" => Some(Self::Local),
            "memory" | "in-memory" => Some(Self::Memory),
            _ => None,
        }
    }

    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::S3 => "s3",
            Self::Local => "local",
            Self::Memory => "memory",
        }
    }
}

/// Object store connection.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Backend kind.
    pub kind: StoreKind,
    /// Endpoint URL for S3-compatible services other than AWS.
    pub endpoint: Option<String>,
    /// Bucket name.
    pub bucket: String,
    /// Region.
    pub region: String,
    /// Access key id.
    pub access_key_id: Option<String>,
    /// Secret access key.
    pub secret_access_key: Option<SecretString>,
    /// Allow plain HTTP endpoints.
    pub allow_http: bool,
    /// Root directory for [`StoreKind::Local`].
    pub root: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::S3,
            endpoint: None,
            bucket: String::new(),
            region: "us-east-1".to_string(),
            access_key_id: None,
            secret_access_key: None,
            allow_http: false,
            root: None,
        }
    }
}

/// Object-store key prefixes for each class of object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespaces {
    /// Prefix for dashboard documents.
    pub dashboards: String,
    /// Prefix for datasource definitions.
    pub datasources: String,
}

impl Default for Namespaces {
    fn default() -> Self {
        Self {
            dashboards: "dashboards".to_string(),
            datasources: "datasources".to_string(),
        }
    }
}

/// How imported dashboards get their uid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UidStrategy {
    /// Assign a fresh random uid on every import.
    #[default]
    Regenerate,
    /// Keep the stored uid so repeated imports overwrite in place.
    Preserve,
}

impl UidStrategy {
    /// Parses a strategy string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "regenerate" | "fresh" | "random" => Some(Self::Regenerate),
            "preserve" | "keep" => Some(Self::Preserve),
            _ => None,
        }
    }

    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Regenerate => "regenerate",
            Self::Preserve => "preserve",
        }
    }
}

/// Run behaviour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    /// Overall budget in seconds; no new remote call starts after it.
    pub deadline_secs: Option<u64>,
    /// Item failures tolerated before the exit code turns non-zero.
    /// `None` means only fatal runs fail.
    pub max_item_failures: Option<usize>,
    /// Resolve panel datasource references on import.
    pub resolve_datasources: bool,
    /// Import datasources before dashboards.
    pub import_datasources: bool,
    /// Uid assignment for imported dashboards.
    pub uid_strategy: UidStrategy,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            deadline_secs: None,
            max_item_failures: None,
            resolve_datasources: true,
            import_datasources: true,
            uid_strategy: UidStrategy::Regenerate,
        }
    }
}

/// Logging settings as configured; see [`crate::observability::LoggingConfig`].
#[derive(Debug, Clone, Default)]
pub struct LoggingSettings {
    /// Log level or filter directive.
    pub level: Option<String>,
    /// `pretty` or `json`.
    pub format: Option<String>,
    /// Log file path.
    pub file: Option<PathBuf>,
}

impl VaultConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration the way the CLI does.
    ///
    /// Uses `path` if given, then `DASHVAULT_CONFIG_PATH`, then the default
    /// location. Environment overrides are applied last.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly named file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = if let Some(path) = path {
            Self::load_from_file(path)?
        } else if let Some(env_path) = std::env::var("DASHVAULT_CONFIG_PATH")
            .ok()
            .filter(|p| !p.trim().is_empty())
        {
            Self::load_from_file(Path::new(&env_path))?
        } else {
            Self::load_default()?
        };

        config.with_env_overrides()
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::OperationFailed {
            operation: "read_config_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;
        Self::from_toml(&contents)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid config file.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(contents)
            .map_err(|e| Error::InvalidInput(format!("config file: {e}")))?;
        Self::from_config_file(file)
    }

    /// Loads configuration from the default location.
    ///
    /// Checks `<platform config dir>/dashvault/config.toml`, then
    /// `~/.config/dashvault/config.toml`. Returns defaults if neither exists.
    ///
    /// # Errors
    ///
    /// Returns an error if a file exists but cannot be parsed.
    pub fn load_default() -> Result<Self> {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Ok(Self::default());
        };

        let candidates = [
            base_dirs.config_dir().join("dashvault").join("config.toml"),
            base_dirs
                .home_dir()
                .join(".config")
                .join("dashvault")
                .join("config.toml"),
        ];
        for candidate in &candidates {
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "loading config file");
                return Self::load_from_file(candidate);
            }
        }

        Ok(Self::default())
    }

    /// Applies `DASHVAULT_*` environment variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if an override has an unparseable value.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if an override has an unparseable value.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = var("DASHVAULT_SERVICE_URL") {
            self.service.url = v;
        }
        if let Some(v) = var("DASHVAULT_SERVICE_TOKEN") {
            self.service.token = Some(SecretString::from(v));
        }
        if let Some(v) = var("DASHVAULT_SERVICE_TIMEOUT_MS") {
            self.service.timeout_ms = parse_number("DASHVAULT_SERVICE_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = var("DASHVAULT_STORE_KIND") {
            self.store.kind = parse_store_kind(&v)?;
        }
        if let Some(v) = var("DASHVAULT_STORE_ENDPOINT") {
            self.store.endpoint = Some(v);
        }
        if let Some(v) = var("DASHVAULT_STORE_BUCKET") {
            self.store.bucket = v;
        }
        if let Some(v) = var("DASHVAULT_STORE_REGION") {
            self.store.region = v;
        }
        if let Some(v) = var("DASHVAULT_STORE_ACCESS_KEY_ID") {
            self.store.access_key_id = Some(v);
        }
        if let Some(v) = var("DASHVAULT_STORE_SECRET_ACCESS_KEY") {
            self.store.secret_access_key = Some(SecretString::from(v));
        }
        if let Some(v) = var("DASHVAULT_STORE_ALLOW_HTTP") {
            self.store.allow_http = parse_bool("DASHVAULT_STORE_ALLOW_HTTP", &v)?;
        }
        if let Some(v) = var("DASHVAULT_STORE_ROOT") {
            self.store.root = Some(PathBuf::from(v));
        }
        if let Some(v) = var("DASHVAULT_DASHBOARD_NAMESPACE") {
            self.namespaces.dashboards = v;
        }
        if let Some(v) = var("DASHVAULT_DATASOURCE_NAMESPACE") {
            self.namespaces.datasources = v;
        }
        if let Some(v) = var("DASHVAULT_DEADLINE_SECS") {
            self.run.deadline_secs = Some(parse_number("DASHVAULT_DEADLINE_SECS", &v)?);
        }
        if let Some(v) = var("DASHVAULT_MAX_ITEM_FAILURES") {
            self.run.max_item_failures = Some(parse_number("DASHVAULT_MAX_ITEM_FAILURES", &v)?);
        }
        if let Some(v) = var("DASHVAULT_UID_STRATEGY") {
            self.run.uid_strategy = parse_uid_strategy(&v)?;
        }
        if let Some(v) = var("DASHVAULT_LOG_LEVEL") {
            self.logging.level = Some(v);
        }
        if let Some(v) = var("DASHVAULT_LOG_FORMAT") {
            self.logging.format = Some(v);
        }
        if let Some(v) = var("DASHVAULT_LOG_FILE") {
            self.logging.file = Some(PathBuf::from(v));
        }

        Ok(self)
    }

    /// Checks that the configuration is usable for a run.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] naming the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.service.url.trim().is_empty() {
            return Err(Error::InvalidInput("service url is not configured".to_string()));
        }
        if self.service.token.is_none() {
            return Err(Error::InvalidInput("service token is not configured".to_string()));
        }
        match self.store.kind {
            StoreKind::S3 if self.store.bucket.trim().is_empty() => {
                return Err(Error::InvalidInput("store bucket is not configured".to_string()));
            },
            StoreKind::Local if self.store.root.is_none() => {
                return Err(Error::InvalidInput("store root is not configured".to_string()));
            },
            _ => {},
        }
        self.namespaces.validate()
    }

    /// Converts a `ConfigFile` to `VaultConfig`.
    fn from_config_file(file: ConfigFile) -> Result<Self> {
        let mut config = Self::default();

        if let Some(service) = file.service {
            if let Some(url) = service.url {
                config.service.url = url;
            }
            config.service.token = service.token.map(SecretString::from);
            if let Some(timeout_ms) = service.timeout_ms {
                config.service.timeout_ms = timeout_ms;
            }
            if let Some(connect_timeout_ms) = service.connect_timeout_ms {
                config.service.connect_timeout_ms = connect_timeout_ms;
            }
        }
        if let Some(store) = file.store {
            if let Some(kind) = store.kind {
                config.store.kind = parse_store_kind(&kind)?;
            }
            config.store.endpoint = store.endpoint;
            if let Some(bucket) = store.bucket {
                config.store.bucket = bucket;
            }
            if let Some(region) = store.region {
                config.store.region = region;
            }
            config.store.access_key_id = store.access_key_id;
            config.store.secret_access_key = store.secret_access_key.map(SecretString::from);
            config.store.allow_http = store.allow_http.unwrap_or(false);
            config.store.root = store.root.map(PathBuf::from);
        }
        if let Some(namespaces) = file.namespaces {
            if let Some(dashboards) = namespaces.dashboards {
                config.namespaces.dashboards = dashboards;
            }
            if let Some(datasources) = namespaces.datasources {
                config.namespaces.datasources = datasources;
            }
        }
        if let Some(run) = file.run {
            config.run.deadline_secs = run.deadline_secs;
            config.run.max_item_failures = run.max_item_failures;
            if let Some(resolve) = run.resolve_datasources {
                config.run.resolve_datasources = resolve;
            }
            if let Some(import) = run.import_datasources {
                config.run.import_datasources = import;
            }
            if let Some(strategy) = run.uid_strategy {
                config.run.uid_strategy = parse_uid_strategy(&strategy)?;
            }
        }
        if let Some(logging) = file.logging {
            config.logging.level = logging.level;
            config.logging.format = logging.format;
            config.logging.file = logging.file.map(PathBuf::from);
        }

        Ok(config)
    }
}

impl Namespaces {
    /// Checks that both prefixes are set and do not overlap.
    ///
    /// Overlapping prefixes would make one listing pick up the other's objects.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] describing the conflict.
    pub fn validate(&self) -> Result<()> {
        if self.dashboards.trim_matches('/').is_empty()
            || self.datasources.trim_matches('/').is_empty()
        {
            return Err(Error::InvalidInput("namespaces must not be empty".to_string()));
        }

        let dashboards = namespace_prefix(&self.dashboards);
        let datasources = namespace_prefix(&self.datasources);
        if dashboards.starts_with(&datasources) || datasources.starts_with(&dashboards) {
            return Err(Error::InvalidInput(format!(
                "namespaces overlap: '{}' and '{}'",
                self.dashboards, self.datasources
            )));
        }
        Ok(())
    }
}

fn parse_store_kind(value: &str) -> Result<StoreKind> {
    StoreKind::parse(value)
        .ok_or_else(|| Error::InvalidInput(format!("unknown store kind '{value}'")))
}

fn parse_uid_strategy(value: &str) -> Result<UidStrategy> {
    UidStrategy::parse(value)
        .ok_or_else(|| Error::InvalidInput(format!("unknown uid strategy '{value}'")))
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::InvalidInput(format!("{key}: '{value}' is not a number")))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::InvalidInput(format!("{key}: '{value}' is not a boolean"))),
    }
}
