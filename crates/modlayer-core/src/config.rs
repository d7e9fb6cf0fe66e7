//! User configuration (`<home>/config.toml`).

use std::path::{Path, PathBuf};

use modlayer_schema::RepoKey;
use serde::{Deserialize, Serialize};

use crate::error::{ModError, ModResult};
use crate::paths::{self, Layout};

/// Default path of the tracked-repository list inside the catalog repository.
pub const DEFAULT_LIST_PATH: &str = "mods.xml";

/// Default minimum time between two full fetches.
pub const DEFAULT_FETCH_COOLDOWN_MINUTES: u64 = 10;

fn default_list_path() -> String {
    DEFAULT_LIST_PATH.to_string()
}

fn default_cooldown() -> u64 {
    DEFAULT_FETCH_COOLDOWN_MINUTES
}

/// Contents of `config.toml` in the modlayer home.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Catalog repository, as `owner/name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_repository: Option<String>,

    /// Path of the tracked-repository list inside `main_repository`.
    #[serde(default = "default_list_path")]
    pub list_path: String,

    /// Game root; defaults to the parent of the home directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_dir: Option<PathBuf>,

    /// Fetch the catalog on the next start, then clear the flag.
    #[serde(default)]
    pub fetch_on_start: bool,

    /// Minimum minutes between two full fetches.
    #[serde(default = "default_cooldown")]
    pub fetch_cooldown_minutes: u64,

    /// Token for authenticated API requests and a higher rate limit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            main_repository: None,
            list_path: default_list_path(),
            game_dir: None,
            fetch_on_start: false,
            fetch_cooldown_minutes: default_cooldown(),
            github_token: None,
        }
    }
}

impl Config {
    /// Load `<home>/config.toml`, or the defaults when it does not exist.
    pub fn load(home: &Path) -> ModResult<Self> {
        let path = paths::config_path(home);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(ModError::io(path, e)),
        };
        toml::from_str(&content)
            .map_err(|e| ModError::Config(format!("cannot parse {}: {e}", path.display())))
    }

    /// Write `config.toml` into `home`.
    pub fn save(&self, home: &Path) -> ModResult<()> {
        let path = paths::config_path(home);
        let content = toml::to_string_pretty(self)
            .map_err(|e| ModError::Config(format!("cannot encode config: {e}")))?;
        std::fs::create_dir_all(home).map_err(|e| ModError::io(home, e))?;
        std::fs::write(&path, content).map_err(|e| ModError::io(path, e))
    }

    /// Apply `MODLAYER_REPOSITORY`, `MODLAYER_GAME_DIR` and `GITHUB_TOKEN`.
    #[must_use]
    pub fn with_env(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup (the environment in production).
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        if let Some(repo) = get("MODLAYER_REPOSITORY") {
            self.main_repository = Some(repo);
        }
        if let Some(dir) = get("MODLAYER_GAME_DIR") {
            self.game_dir = Some(PathBuf::from(dir));
        }
        if let Some(token) = get("GITHUB_TOKEN") {
            self.github_token = Some(token);
        }
        self
    }

    /// The configured catalog repository.
    pub fn catalog_repo(&self) -> ModResult<RepoKey> {
        let repo = self.main_repository.as_deref().ok_or_else(|| {
            ModError::Config("main_repository is not set (owner/name of the mod list)".into())
        })?;
        Ok(RepoKey::parse(repo)?)
    }

    /// Configured game directory, or the parent of `home`.
    pub fn game_dir(&self, home: &Path) -> PathBuf {
        self.game_dir.clone().unwrap_or_else(|| {
            home.parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(home)
                .to_path_buf()
        })
    }

    pub fn layout(&self, home: &Path) -> Layout {
        Layout::new(&self.game_dir(home), home)
    }

    /// Whether a fetch made at `last_check` is still within the cooldown at
    /// `now` (both unix seconds). Returns the minutes since that fetch.
    pub fn in_cooldown(&self, last_check: Option<i64>, now: i64) -> Option<u64> {
        let elapsed = now.saturating_sub(last_check?);
        let elapsed = u64::try_from(elapsed).unwrap_or(0);
        let cooldown = self.fetch_cooldown_minutes.saturating_mul(60);
        (elapsed < cooldown).then(|| elapsed.div_ceil(60))
    }
}
