//! Artifact locator: where a release installs to and which location a file
//! is in.

use std::path::{Path, PathBuf};

use modlayer_schema::{ARTIFACT_EXTENSION, CONTAINER_EXTENSION, ModRecord, Release};
use tracing::{debug, warn};

use crate::paths::Layout;

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

/// Whether `path` names an installable plugin artifact.
pub fn is_artifact(path: &Path) -> bool {
    has_extension(path, ARTIFACT_EXTENSION)
}

/// Whether `path` names a compressed container that must be unpacked.
pub fn is_container(path: &Path) -> bool {
    has_extension(path, CONTAINER_EXTENSION)
}

/// Install path for `release` inside the active location.
pub fn candidate_path(layout: &Layout, release: &Release) -> PathBuf {
    layout.plugins_dir.join(&release.file_name)
}

/// Where `path` moves to when its enabled/disabled placement is toggled.
///
/// Returns `None` when the file name cannot be determined.
pub fn toggled_path(layout: &Layout, path: &Path, enable: bool) -> Option<PathBuf> {
    let name = path.file_name()?;
    let dir = if enable {
        &layout.plugins_dir
    } else {
        &layout.disabled_dir
    };
    Some(dir.join(name))
}

/// Re-associate a mod with its artifact when the recorded file is gone.
///
/// Looks for a file named after the current (or latest stable) release in
/// both locations. An active copy wins; a disabled duplicate of it is
/// deleted. Returns `true` when `m.file` changed.
pub fn check_file(layout: &Layout, m: &mut ModRecord) -> bool {
    if m.existing_file().is_some() {
        return false;
    }
    let Some(release) = m.current().or_else(|| m.latest(false)) else {
        return false;
    };

    let active = layout.plugins_dir.join(&release.file_name);
    let disabled = layout.disabled_dir.join(&release.file_name);

    let found = if active.exists() {
        if disabled.exists() {
            debug!("Removing disabled duplicate {}", disabled.display());
            if let Err(e) = std::fs::remove_file(&disabled) {
                warn!("Failed to remove duplicate {}: {e}", disabled.display());
            }
        }
        Some(active)
    } else if disabled.exists() {
        Some(disabled)
    } else {
        None
    };

    match found {
        Some(path) => {
            debug!("Recovered {} for {}", path.display(), m.display_title());
            m.file = Some(path);
            true
        }
        None => false,
    }
}
