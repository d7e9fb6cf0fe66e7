//! Single-artifact container extraction.

use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{ModError, ModResult};
use crate::locator::is_artifact;

/// Unpack the first installable entry of `container` next to it.
///
/// Entries are tried in the archive's own order and the first whose name
/// ends in the artifact extension wins, even when several match. The entry
/// is written under its base name beside the container, and the container
/// is deleted. Without a matching entry the container is left in place and
/// [`ModError::Extraction`] is returned.
pub fn extract_single_artifact(container: &Path) -> ModResult<PathBuf> {
    let file = File::open(container).map_err(|e| ModError::io(container, e))?;
    let mut archive = zip::ZipArchive::new(file)?;
    let dir = container.parent().unwrap_or_else(|| Path::new("."));

    let mut extracted = None;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() {
            continue;
        }
        let Some(name) = entry
            .enclosed_name()
            .and_then(|p| p.file_name().map(PathBuf::from))
        else {
            continue;
        };
        if !is_artifact(&name) {
            continue;
        }

        let dest = dir.join(&name);
        let mut out = File::create(&dest).map_err(|e| ModError::io(&dest, e))?;
        std::io::copy(&mut entry, &mut out).map_err(|e| ModError::io(&dest, e))?;
        extracted = Some(dest);
        break;
    }

    let Some(dest) = extracted else {
        return Err(ModError::Extraction {
            path: container.to_path_buf(),
        });
    };

    drop(archive);
    std::fs::remove_file(container).map_err(|e| ModError::io(container, e))?;
    debug!("Extracted {} from {}", dest.display(), container.display());
    Ok(dest)
}
