//! Object store client.
//!
//! Wraps an [`object_store::ObjectStore`] behind the blocking [`BlobStore`]
//! facade. The async store is driven by a private current-thread runtime, so
//! callers never need an executor of their own.

use super::{BlobStore, Deadline, RemoteError, RemoteResult};
use crate::config::{StoreConfig, StoreKind};
use crate::{Error, Result};
use futures::TryStreamExt;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{ObjectStore, PutPayload};
use std::sync::Arc;
use tokio::runtime::Runtime;

/// Blocking client for S3-compatible, local and in-memory object stores.
pub struct ObjectStoreClient {
    /// The underlying store.
    store: Arc<dyn ObjectStore>,
    /// Runtime that drives the async store.
    runtime: Runtime,
    /// Overall run budget.
    deadline: Deadline,
}

impl ObjectStoreClient {
    /// Wraps an existing store.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime cannot be started.
    pub fn with_store(store: Arc<dyn ObjectStore>, deadline: Deadline) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::OperationFailed {
                operation: "start_store_runtime".to_string(),
                cause: e.to_string(),
            })?;

        Ok(Self {
            store,
            runtime,
            deadline,
        })
    }

    /// Creates a client over a fresh in-memory store.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime cannot be started.
    pub fn in_memory() -> Result<Self> {
        Self::with_store(Arc::new(InMemory::new()), Deadline::none())
    }

    /// Creates a client from the store section of the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if required settings are missing, the backend is not
    /// compiled in, or the store cannot be built.
    pub fn from_config(config: &StoreConfig, deadline: Deadline) -> Result<Self> {
        let store: Arc<dyn ObjectStore> = match config.kind {
            StoreKind::S3 => build_s3(config)?,
            StoreKind::Local => build_local(config)?,
            StoreKind::Memory => Arc::new(InMemory::new()),
        };
        tracing::debug!(kind = config.kind.as_str(), store = %store, "object store ready");
        Self::with_store(store, deadline)
    }
}

/// Converts a key to a store path without escaping it.
///
/// Keys are stored exactly as composed, so a listed key reads back under the
/// same name. Only keys the store cannot hold verbatim (empty, `.` or `..`
/// segments, control characters) are escaped.
fn key_path(key: &str) -> Path {
    Path::parse(key).unwrap_or_else(|_| Path::from(key))
}

fn storage_error(operation: &'static str, key: &str, e: &object_store::Error) -> RemoteError {
    let err = RemoteError::Storage {
        operation: operation.to_string(),
        cause: e.to_string(),
    };
    tracing::error!(operation, key, error = %err, "object store call failed");
    err
}

impl BlobStore for ObjectStoreClient {
    fn list(&self, prefix: &str) -> RemoteResult<Vec<String>> {
        self.deadline.check()?;

        let store = Arc::clone(&self.store);
        let prefix_path = key_path(prefix);
        let listed = self.runtime.block_on(async move {
            store
                .list(Some(&prefix_path))
                .map_ok(|meta| meta.location.to_string())
                .try_collect::<Vec<_>>()
                .await
        });

        let mut keys = listed.map_err(|e| storage_error("list_objects", prefix, &e))?;
        keys.sort();
        tracing::debug!(prefix, count = keys.len(), "listed objects");
        Ok(keys)
    }

    fn get(&self, key: &str) -> RemoteResult<Vec<u8>> {
        self.deadline.check()?;

        let store = Arc::clone(&self.store);
        let path = key_path(key);
        let fetched = self.runtime.block_on(async move {
            let result = store.get(&path).await?;
            result.bytes().await
        });

        fetched
            .map(|bytes| bytes.to_vec())
            .map_err(|e| storage_error("get_object", key, &e))
    }

    fn put(&self, key: &str, bytes: Vec<u8>) -> RemoteResult<()> {
        self.deadline.check()?;

        let store = Arc::clone(&self.store);
        let path = key_path(key);
        let size = bytes.len();
        self.runtime
            .block_on(async move { store.put(&path, PutPayload::from(bytes)).await })
            .map_err(|e| storage_error("put_object", key, &e))?;

        tracing::debug!(key, size, "stored object");
        Ok(())
    }
}

#[cfg(feature = "s3")]
fn build_s3(config: &StoreConfig) -> Result<Arc<dyn ObjectStore>> {
    use object_store::aws::AmazonS3Builder;
    use secrecy::ExposeSecret;

    if config.bucket.is_empty() {
        return Err(Error::InvalidInput("store bucket is not configured".to_string()));
    }

    let mut builder = AmazonS3Builder::new()
        .with_bucket_name(&config.bucket)
        .with_region(&config.region)
        .with_allow_http(config.allow_http);
    if let Some(endpoint) = &config.endpoint {
        builder = builder.with_endpoint(endpoint);
    }
    if let Some(access_key_id) = &config.access_key_id {
        builder = builder.with_access_key_id(access_key_id);
    }
    if let Some(secret) = &config.secret_access_key {
        builder = builder.with_secret_access_key(secret.expose_secret());
    }

    let store = builder.build().map_err(|e| Error::OperationFailed {
        operation: "build_s3_store".to_string(),
        cause: e.to_string(),
    })?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "s3"))]
fn build_s3(_config: &StoreConfig) -> Result<Arc<dyn ObjectStore>> {
    Err(Error::FeatureNotEnabled("s3".to_string()))
}

fn build_local(config: &StoreConfig) -> Result<Arc<dyn ObjectStore>> {
    use object_store::local::LocalFileSystem;

    let root = config
        .root
        .as_ref()
        .ok_or_else(|| Error::InvalidInput("store root is not configured".to_string()))?;
    std::fs::create_dir_all(root).map_err(|e| Error::OperationFailed {
        operation: "create_store_root".to_string(),
        cause: format!("{}: {e}", root.display()),
    })?;

    let store = LocalFileSystem::new_with_prefix(root).map_err(|e| Error::OperationFailed {
        operation: "build_local_store".to_string(),
        cause: e.to_string(),
    })?;
    Ok(Arc::new(store))
}
