//! Materials catalog.
//!
//! Flat key-value metadata owned by the request layer. Estimation never
//! reads it. Concurrent writers are not coordinated; the last `put` for an
//! id wins.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CatalogError;

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Catalog key.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Free-form attributes (price, colour, supplier, ...).
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl Material {
    /// Create an entry with no properties.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            properties: BTreeMap::new(),
        }
    }

    /// Add a property.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// Storage for [`Material`] entries.
pub trait MaterialStore: Send + Sync {
    /// Entry for `id`.
    fn get(&self, id: &str) -> Result<Option<Material>, CatalogError>;

    /// Insert or replace an entry.
    fn put(&self, material: Material) -> Result<(), CatalogError>;

    /// All entries ordered by id.
    fn list(&self) -> Result<Vec<Material>, CatalogError>;

    /// Remove an entry, returning it if it existed.
    fn remove(&self, id: &str) -> Result<Option<Material>, CatalogError>;
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct InMemoryMaterialStore {
    entries: RwLock<BTreeMap<String, Material>>,
}

impl InMemoryMaterialStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl MaterialStore for InMemoryMaterialStore {
    fn get(&self, id: &str) -> Result<Option<Material>, CatalogError> {
        let entries = self.entries.read().map_err(|_| CatalogError::Poisoned)?;
        Ok(entries.get(id).cloned())
    }

    fn put(&self, material: Material) -> Result<(), CatalogError> {
        let mut entries = self.entries.write().map_err(|_| CatalogError::Poisoned)?;
        entries.insert(material.id.clone(), material);
        Ok(())
    }

    fn list(&self) -> Result<Vec<Material>, CatalogError> {
        let entries = self.entries.read().map_err(|_| CatalogError::Poisoned)?;
        Ok(entries.values().cloned().collect())
    }

    fn remove(&self, id: &str) -> Result<Option<Material>, CatalogError> {
        let mut entries = self.entries.write().map_err(|_| CatalogError::Poisoned)?;
        Ok(entries.remove(id))
    }
}

/// Store backed by a JSON document on disk.
///
/// Every write rewrites the whole file. A missing file reads as empty.
#[derive(Debug)]
pub struct JsonFileMaterialStore {
    path: PathBuf,
    lock: RwLock<()>,
}

impl JsonFileMaterialStore {
    /// Use the document at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: RwLock::new(()),
        }
    }

    /// Backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, Material>, CatalogError> {
        match std::fs::read(&self.path) {
            Ok(bytes) => {
                let list: Vec<Material> = serde_json::from_slice(&bytes)?;
                Ok(list.into_iter().map(|m| (m.id.clone(), m)).collect())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, entries: &BTreeMap<String, Material>) -> Result<(), CatalogError> {
        let list: Vec<&Material> = entries.values().collect();
        let json = serde_json::to_vec_pretty(&list)?;
        std::fs::write(&self.path, json)?;
        debug!(path = %self.path.display(), entries = list.len(), "saved materials catalog");
        Ok(())
    }
}

impl MaterialStore for JsonFileMaterialStore {
    fn get(&self, id: &str) -> Result<Option<Material>, CatalogError> {
        let _guard = self.lock.read().map_err(|_| CatalogError::Poisoned)?;
        Ok(self.load()?.remove(id))
    }

    fn put(&self, material: Material) -> Result<(), CatalogError> {
        let _guard = self.lock.write().map_err(|_| CatalogError::Poisoned)?;
        let mut entries = self.load()?;
        entries.insert(material.id.clone(), material);
        self.save(&entries)
    }

    fn list(&self) -> Result<Vec<Material>, CatalogError> {
        let _guard = self.lock.read().map_err(|_| CatalogError::Poisoned)?;
        Ok(self.load()?.into_values().collect())
    }

    fn remove(&self, id: &str) -> Result<Option<Material>, CatalogError> {
        let _guard = self.lock.write().map_err(|_| CatalogError::Poisoned)?;
        let mut entries = self.load()?;
        let removed = entries.remove(id);
        if removed.is_some() {
            self.save(&entries)?;
        }
        Ok(removed)
    }
}
