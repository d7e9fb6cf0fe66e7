use std::path::{Path, PathBuf};

use crate::error::{ModError, ModResult};

/// Returns the modlayer home directory, or None if neither an override nor a
/// working directory can be resolved.
///
/// `MODLAYER_HOME` wins; otherwise the tool keeps its state in `.modlayer`
/// under the directory it is run from, which is normally the game directory.
pub fn try_modlayer_home() -> Option<PathBuf> {
    if let Ok(val) = std::env::var("MODLAYER_HOME") {
        return Some(PathBuf::from(val));
    }
    std::env::current_dir()
        .ok()
        .or_else(dirs::home_dir)
        .map(|d| d.join(".modlayer"))
}

/// Config file: `<home>/config.toml`
pub fn config_path(home: &Path) -> PathBuf {
    home.join("config.toml")
}

/// Persisted catalog: `<home>/catalog.json`
pub fn catalog_path(home: &Path) -> PathBuf {
    home.join("catalog.json")
}

/// Extract the filename from a URL.
pub fn filename_from_url(url: &str) -> &str {
    url.split('/').next_back().unwrap_or("")
}

/// On-disk locations the engine works with.
///
/// ```text
/// <game>/BepInEx/
/// ├── plugins/            # active location
/// └── disabled-plugins/   # disabled location
/// <home>/catalog.json     # persisted catalog
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub game_dir: PathBuf,
    pub plugins_dir: PathBuf,
    pub disabled_dir: PathBuf,
    pub catalog_file: PathBuf,
}

impl Layout {
    pub fn new(game_dir: &Path, home: &Path) -> Self {
        let loader_dir = game_dir.join("BepInEx");
        Self {
            game_dir: game_dir.to_path_buf(),
            plugins_dir: loader_dir.join("plugins"),
            disabled_dir: loader_dir.join("disabled-plugins"),
            catalog_file: catalog_path(home),
        }
    }

    /// Create both plugin directories if they are missing.
    pub fn ensure_dirs(&self) -> ModResult<()> {
        for dir in [&self.plugins_dir, &self.disabled_dir] {
            std::fs::create_dir_all(dir).map_err(|e| ModError::io(dir, e))?;
        }
        Ok(())
    }

    /// Whether `path` sits directly inside the active location.
    pub fn is_active(&self, path: &Path) -> bool {
        path.parent() == Some(self.plugins_dir.as_path())
    }

    /// Whether `path` sits directly inside the disabled location.
    pub fn is_disabled(&self, path: &Path) -> bool {
        path.parent() == Some(self.disabled_dir.as_path())
    }
}
