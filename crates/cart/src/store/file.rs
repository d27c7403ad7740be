//! File-backed adapters.
//!
//! - [`FileKeyValueStore`] keeps one JSON file per key in a directory
//! - [`JsonLinesOrderStore`] appends one JSON document per order to a file
//! - [`load_catalog`] reads a JSON array of products

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::debug;
use uuid::Uuid;

use cedar_tech_core::{OrderId, Product};

use super::memory::MemoryCatalog;
use super::{KeyValueStore, OrderStore};
use crate::error::StoreError;
use crate::order::OrderSnapshot;

/// Key-value store keeping each key in `<dir>/<key>.json`.
///
/// Writes go to a temporary file that is then renamed over the target, so a
/// crash mid-write leaves the previous value intact.
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    /// Creates a store rooted at `dir`. The directory is created on first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        debug!(path = %path.display(), bytes = value.len(), "wrote key");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// One line of a [`JsonLinesOrderStore`] file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredOrder {
    pub id: OrderId,
    pub order: OrderSnapshot,
}

/// Order collection stored as newline-delimited JSON.
#[derive(Debug, Clone)]
pub struct JsonLinesOrderStore {
    path: PathBuf,
}

impl JsonLinesOrderStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every stored order, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Corrupt` if a line cannot be parsed, or an I/O
    /// error if the file exists but cannot be read.
    pub async fn orders(&self) -> Result<Vec<StoredOrder>, StoreError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .enumerate()
            .map(|(n, line)| {
                serde_json::from_str(line)
                    .map_err(|e| StoreError::Corrupt(format!("line {}: {e}", n + 1)))
            })
            .collect()
    }
}

#[async_trait]
impl OrderStore for JsonLinesOrderStore {
    async fn insert(&self, order: OrderSnapshot) -> Result<OrderId, StoreError> {
        let record = StoredOrder {
            id: OrderId::new(Uuid::new_v4().to_string()),
            order,
        };
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        Ok(record.id)
    }
}

/// Load a catalog from a JSON array of product records.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be read, or `StoreError::Corrupt`
/// if it is not a valid product list.
pub fn load_catalog(path: &Path) -> Result<MemoryCatalog, StoreError> {
    let content = fs::read_to_string(path)?;
    let products: Vec<Product> = serde_json::from_str(&content)
        .map_err(|e| StoreError::Corrupt(format!("{}: {e}", path.display())))?;
    debug!(path = %path.display(), products = products.len(), "loaded catalog");
    Ok(MemoryCatalog::with_products(products))
}
