//! Local scanner: turns unrecognized plugin files into local mod records.

use std::path::{Path, PathBuf};

use modlayer_schema::{Catalog, ModRecord};
use tracing::debug;

use crate::error::{ModError, ModResult};
use crate::locator::is_artifact;
use crate::paths::Layout;

/// Artifacts directly inside `dir`, sorted by file name. A missing
/// directory yields nothing.
fn artifacts_in(dir: &Path) -> ModResult<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut found = Vec::new();
    for entry in walkdir::WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            ModError::io(path, e.into())
        })?;
        if entry.file_type().is_file() && is_artifact(entry.path()) {
            found.push(entry.into_path());
        }
    }
    Ok(found)
}

/// Rebuild the local mods of `catalog` from the plugin directories.
///
/// Every existing local record is dropped first, so repeated scans with no
/// filesystem change produce the same records. Returns the number of local
/// mods found.
pub fn scan(layout: &Layout, catalog: &mut Catalog) -> ModResult<usize> {
    catalog.mods.retain(|m| !m.is_local());

    let mut found = 0;
    for dir in [&layout.plugins_dir, &layout.disabled_dir] {
        for path in artifacts_in(dir)? {
            let known = catalog
                .remote_mods()
                .any(|m| m.file.as_deref() == Some(path.as_path()));
            if known {
                continue;
            }
            debug!("Found local mod {}", path.display());
            catalog.mods.push(ModRecord::local(path));
            found += 1;
        }
    }
    Ok(found)
}
