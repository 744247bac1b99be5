//! Process-wide access to the loaded catalog, with atomic reload

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{info, warn};

use crate::catalog::Catalog;
use crate::error::Result;
use crate::loader::load_catalog;
use crate::model::{AreaId, Record};

/// Holds the active catalog behind a swappable pointer.
///
/// Readers take an `Arc` snapshot and never see a half-built catalog; a
/// reload builds a complete replacement before publishing it.
#[derive(Debug)]
pub struct Repository {
    root: PathBuf,
    active: RwLock<Arc<Catalog>>,
}

impl Repository {
    /// Load `root` eagerly. Any load failure is returned and nothing is served.
    pub fn load(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let catalog = load_catalog(&root)?;
        Ok(Repository {
            root,
            active: RwLock::new(Arc::new(catalog)),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The catalog in force right now.
    pub fn current(&self) -> Arc<Catalog> {
        Arc::clone(&self.active.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Rebuild from disk and swap. On failure the previous catalog stays active.
    pub fn reload(&self) -> Result<Arc<Catalog>> {
        let fresh = match load_catalog(&self.root) {
            Ok(catalog) => Arc::new(catalog),
            Err(e) => {
                warn!("Reload of {} failed, keeping previous data: {}", self.root.display(), e);
                return Err(e);
            }
        };
        *self.active.write().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&fresh);
        info!("Data reloaded from {}", self.root.display());
        Ok(fresh)
    }

    /// Look up one record by dataset name and area id.
    pub fn get(&self, dataset: &str, area_id: &AreaId) -> Result<Record> {
        self.current().record(dataset, area_id).cloned()
    }
}
