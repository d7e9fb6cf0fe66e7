//! Catalog persistence.
//!
//! [`CatalogFile`] reads and writes the JSON file; [`actor::StoreHandle`]
//! serializes every access through one background thread.

pub mod actor;

use std::io::Write;
use std::path::{Path, PathBuf};

use modlayer_schema::Catalog;
use tracing::debug;

use crate::error::{ModError, ModResult};

pub use actor::StoreHandle;

/// The persisted catalog on disk.
#[derive(Debug, Clone)]
pub struct CatalogFile {
    path: PathBuf,
}

impl CatalogFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the catalog. A missing file is `Ok(None)`; an unreadable or
    /// corrupt one is a [`ModError::Persistence`].
    pub fn load(&self) -> ModResult<Option<Catalog>> {
        let data = match std::fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(ModError::Persistence(format!(
                    "cannot read {}: {e}",
                    self.path.display()
                )));
            }
        };
        let catalog = serde_json::from_slice(&data).map_err(|e| {
            ModError::Persistence(format!("corrupt catalog {}: {e}", self.path.display()))
        })?;
        Ok(Some(catalog))
    }

    /// Write the catalog atomically: a temp file beside the target is
    /// renamed over it, so readers never see a torn file.
    pub fn save(&self, catalog: &Catalog) -> ModResult<()> {
        let persistence = |what: &str, e: &dyn std::fmt::Display| {
            ModError::Persistence(format!("cannot {what} {}: {e}", self.path.display()))
        };

        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir).map_err(|e| persistence("create directory for", &e))?;

        let json = serde_json::to_vec_pretty(catalog).map_err(|e| persistence("encode", &e))?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| persistence("write", &e))?;
        tmp.write_all(&json).map_err(|e| persistence("write", &e))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| persistence("write", &e))?;
        tmp.persist(&self.path)
            .map_err(|e| persistence("replace", &e.error))?;

        debug!("Saved {} mods to {}", catalog.mods.len(), self.path.display());
        Ok(())
    }
}
