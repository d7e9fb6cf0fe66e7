//! File operations on installed mods: uninstall, enable, disable.
//!
//! These act unconditionally; callers decide from [`crate::state::classify`]
//! whether an operation makes sense.

use std::path::PathBuf;

use modlayer_schema::{Catalog, ModId, ModRecord};
use tracing::debug;

use crate::error::{ModError, ModResult};
use crate::locator::toggled_path;
use crate::paths::Layout;

fn lookup<'a>(catalog: &'a mut Catalog, id: &ModId) -> ModResult<&'a mut ModRecord> {
    catalog
        .get_mut(id)
        .ok_or_else(|| ModError::NotFound(format!("mod {id}")))
}

/// Delete the mod's file and forget its install state.
///
/// A local mod has no identity besides its file, so its record is dropped
/// as well. Returns the record as it was before the call.
pub fn uninstall(catalog: &mut Catalog, id: &ModId) -> ModResult<ModRecord> {
    let m = lookup(catalog, id)?;
    let before = m.clone();

    if let Some(file) = m.existing_file() {
        debug!("Removing {}", file.display());
        std::fs::remove_file(file).map_err(|e| ModError::io(file, e))?;
    }

    if before.is_local() {
        catalog.remove(id);
    } else {
        m.file = None;
        m.current_tag = None;
    }
    Ok(before)
}

/// Move the mod's file into the active location.
pub fn enable(layout: &Layout, catalog: &mut Catalog, id: &ModId) -> ModResult<PathBuf> {
    relocate(layout, catalog, id, true)
}

/// Move the mod's file into the disabled location.
pub fn disable(layout: &Layout, catalog: &mut Catalog, id: &ModId) -> ModResult<PathBuf> {
    relocate(layout, catalog, id, false)
}

fn relocate(layout: &Layout, catalog: &mut Catalog, id: &ModId, enable: bool) -> ModResult<PathBuf> {
    let m = lookup(catalog, id)?;
    let from = m
        .existing_file()
        .map(std::path::Path::to_path_buf)
        .ok_or_else(|| ModError::NotFound(format!("installed file of {}", m.display_title())))?;
    let to = toggled_path(layout, &from, enable)
        .ok_or_else(|| ModError::Format(format!("{} has no file name", from.display())))?;

    if let Some(dir) = to.parent() {
        std::fs::create_dir_all(dir).map_err(|e| ModError::io(dir, e))?;
    }
    std::fs::rename(&from, &to).map_err(|e| ModError::io(&from, e))?;
    debug!("Moved {} -> {}", from.display(), to.display());

    m.file = Some(to.clone());
    Ok(to)
}
