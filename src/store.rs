//! Configuration store adapters.
//!
//! The pipeline only ever reads a [`Configuration`] snapshot; writes come from the admin surface.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    foundation::error::{ReportError, ReportResult},
    model::catalog::{ConfigUpdate, Configuration},
};

/// Read/update access to the content configuration.
#[async_trait]
pub trait ConfigurationStore: Send + Sync {
    /// Current configuration snapshot.
    async fn read(&self) -> ReportResult<Configuration>;

    /// Apply one edit and persist it.
    async fn write(&self, update: ConfigUpdate) -> ReportResult<()>;
}

/// Store that keeps the configuration in memory only.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    config: RwLock<Configuration>,
}

impl InMemoryStore {
    pub fn new(config: Configuration) -> Self {
        Self {
            config: RwLock::new(config),
        }
    }
}

#[async_trait]
impl ConfigurationStore for InMemoryStore {
    async fn read(&self) -> ReportResult<Configuration> {
        Ok(self.config.read().await.clone())
    }

    async fn write(&self, update: ConfigUpdate) -> ReportResult<()> {
        self.config.write().await.apply(update)
    }
}

/// Store backed by a pretty-printed JSON file.
///
/// A missing file reads as [`Configuration::default`]; the first write creates it.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrite the file with `config`.
    pub async fn save(&self, config: &Configuration) -> ReportResult<()> {
        let json = serde_json::to_vec_pretty(config)
            .map_err(|e| ReportError::store(format!("serialize configuration: {e}")))?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                ReportError::store(format!("create '{}': {e}", parent.display()))
            })?;
        }
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| ReportError::store(format!("write '{}': {e}", self.path.display())))
    }

    async fn load(&self) -> ReportResult<Configuration> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no configuration file, using defaults");
                return Ok(Configuration::default());
            }
            Err(e) => {
                return Err(ReportError::store(format!(
                    "read '{}': {e}",
                    self.path.display()
                )));
            }
        };
        serde_json::from_slice(&bytes)
            .map_err(|e| ReportError::store(format!("parse '{}': {e}", self.path.display())))
    }
}

#[async_trait]
impl ConfigurationStore for JsonFileStore {
    async fn read(&self) -> ReportResult<Configuration> {
        self.load().await
    }

    async fn write(&self, update: ConfigUpdate) -> ReportResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut config = self.load().await?;
        config.apply(update)?;
        self.save(&config).await
    }
}
