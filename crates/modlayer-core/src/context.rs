//! Application context: the one place that owns the catalog.
//!
//! Built once at startup and handed to every command. All mutations go
//! through the catalog lock and are saved through the store actor before
//! the lock is released.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use modlayer_schema::{Catalog, ModId};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::config::Config;
use crate::downloads::{DownloadManager, DownloadTask};
use crate::error::{ModError, ModResult};
use crate::io::download::{HttpTransport, Transport};
use crate::locator;
use crate::ops;
use crate::paths::Layout;
use crate::remote::{CatalogSource, GitHubCatalog};
use crate::reporter::Reporter;
use crate::scanner;
use crate::state::{self, ModState};
use crate::store::{CatalogFile, StoreHandle};
use crate::sync::{self, FetchOutcome, SyncSummary, Synchronizer};

/// The opened catalog and everything that acts on it.
///
/// Every mutation takes the catalog lock, applies the change and saves a
/// snapshot before releasing it. Network calls run outside the lock.
pub struct AppContext {
    config: Config,
    home: PathBuf,
    layout: Layout,
    catalog: Arc<Mutex<Catalog>>,
    store: StoreHandle,
    sync: Synchronizer,
    downloads: DownloadManager,
    reporter: Arc<dyn Reporter>,
}

impl fmt::Debug for AppContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppContext")
            .field("home", &self.home)
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}

impl AppContext {
    /// Open the catalog under `home` with explicit collaborators.
    ///
    /// Creates the plugin directories, loads the persisted catalog (starting
    /// empty when it is missing or unreadable), re-associates every mod with
    /// its file and rescans for local mods.
    pub async fn open(
        config: Config,
        home: &Path,
        source: Arc<dyn CatalogSource>,
        transport: Arc<dyn Transport>,
        reporter: Arc<dyn Reporter>,
    ) -> ModResult<Self> {
        let layout = config.layout(home);
        layout.ensure_dirs()?;

        let store = StoreHandle::spawn(CatalogFile::new(&layout.catalog_file));
        let mut catalog = match store.load().await {
            Ok(Some(catalog)) => catalog,
            Ok(None) => Catalog::default(),
            Err(e) => {
                warn!("Starting with an empty catalog: {e}");
                reporter.warning(&format!("{e}; starting with an empty catalog"));
                Catalog::default()
            }
        };

        for m in &mut catalog.mods {
            locator::check_file(&layout, m);
        }
        let locals = scanner::scan(&layout, &mut catalog)?;
        debug!(
            "Loaded {} mods ({locals} local) from {}",
            catalog.mods.len(),
            layout.catalog_file.display()
        );

        let catalog = Arc::new(Mutex::new(catalog));
        let downloads = DownloadManager::new(
            transport,
            layout.clone(),
            Arc::clone(&catalog),
            store.clone(),
            Arc::clone(&reporter),
        );

        Ok(Self {
            config,
            home: home.to_path_buf(),
            layout,
            catalog,
            store,
            sync: Synchronizer::new(source),
            downloads,
            reporter,
        })
    }

    /// Open with the GitHub catalog and HTTP transport described by `config`.
    pub async fn from_config(
        config: Config,
        home: &Path,
        reporter: Arc<dyn Reporter>,
    ) -> ModResult<Self> {
        let list_repo = match config.main_repository {
            Some(_) => Some(config.catalog_repo()?),
            None => None,
        };
        let client = reqwest::Client::builder()
            .user_agent(crate::USER_AGENT)
            .build()?;
        let source = GitHubCatalog::new(client.clone(), list_repo, config.list_path.clone())
            .with_token(config.github_token.clone());
        let transport = HttpTransport::new(client);
        Self::open(config, home, Arc::new(source), Arc::new(transport), reporter).await
    }

    /// Effective configuration, environment overrides applied.
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Plugin locations inside the game directory.
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn reporter(&self) -> &Arc<dyn Reporter> {
        &self.reporter
    }

    /// Manager for in-flight downloads and their aggregate progress.
    pub fn downloads(&self) -> &DownloadManager {
        &self.downloads
    }

    /// Remaining remote request quota, if known.
    pub fn remaining_quota(&self) -> Option<u64> {
        self.sync.source().remaining_quota()
    }

    /// A consistent copy of the catalog.
    pub async fn snapshot(&self) -> Catalog {
        self.catalog.lock().await.clone()
    }

    /// Save the current catalog. The lock is held until the store has
    /// written it.
    async fn persist(&self, catalog: &Catalog) -> ModResult<()> {
        self.store.save(catalog.clone()).await
    }

    /// Full catalog sync. The network phase runs without the catalog lock;
    /// the merge and save run under it.
    pub async fn sync(&self) -> ModResult<SyncSummary> {
        let previous = self.snapshot().await;
        let fresh = self.sync.fetch_catalog(&previous).await?;

        let mut catalog = self.catalog.lock().await;
        let summary = sync::merge(&self.layout, &mut catalog, fresh)?;
        self.persist(&catalog).await?;
        Ok(summary)
    }

    /// Refresh one remote mod's metadata and releases.
    pub async fn fetch_one(&self, id: &ModId) -> ModResult<FetchOutcome> {
        let ModId::Remote(repo) = id else {
            return Err(ModError::LocalMod(id.to_string()));
        };
        let mut m = self
            .snapshot()
            .await
            .find(repo)
            .cloned()
            .ok_or_else(|| ModError::NotFound(format!("mod {repo}")))?;
        let outcome = self.sync.fetch_one(&mut m).await?;

        let mut catalog = self.catalog.lock().await;
        let target = catalog
            .find_mut(repo)
            .ok_or_else(|| ModError::NotFound(format!("mod {repo}")))?;
        target.title = m.title;
        target.description = m.description;
        target.stars = m.stars;
        target.watchers = m.watchers;
        target.downloads = m.downloads;
        target.releases = m.releases;
        target.last_check = m.last_check;
        locator::check_file(&self.layout, target);
        self.persist(&catalog).await?;
        Ok(outcome)
    }

    /// Rebuild local mods from the plugin directories.
    pub async fn rescan(&self) -> ModResult<usize> {
        let mut catalog = self.catalog.lock().await;
        let found = scanner::scan(&self.layout, &mut catalog)?;
        self.persist(&catalog).await?;
        Ok(found)
    }

    /// Current state of one mod.
    pub async fn classify(&self, id: &ModId) -> ModResult<ModState> {
        let catalog = self.catalog.lock().await;
        let m = catalog
            .get(id)
            .ok_or_else(|| ModError::NotFound(format!("mod {id}")))?;
        Ok(state::classify(&self.layout, m))
    }

    /// Start installing release `tag` of a remote mod.
    pub async fn start_download(&self, id: &ModId, tag: &str) -> ModResult<Arc<DownloadTask>> {
        let ModId::Remote(repo) = id else {
            return Err(ModError::LocalMod(id.to_string()));
        };
        self.downloads.start_download(repo, tag).await
    }

    /// Delete a mod's file. Any download in flight for it is cancelled.
    pub async fn uninstall(&self, id: &ModId) -> ModResult<()> {
        if let ModId::Remote(repo) = id {
            self.downloads.cancel(repo).await;
        }
        let mut catalog = self.catalog.lock().await;
        ops::uninstall(&mut catalog, id)?;
        self.persist(&catalog).await
    }

    /// Move a mod's file to the active location. Returns its new path.
    pub async fn enable(&self, id: &ModId) -> ModResult<PathBuf> {
        let mut catalog = self.catalog.lock().await;
        let path = ops::enable(&self.layout, &mut catalog, id)?;
        self.persist(&catalog).await?;
        Ok(path)
    }

    /// Move a mod's file to the disabled location. Returns its new path.
    pub async fn disable(&self, id: &ModId) -> ModResult<PathBuf> {
        let mut catalog = self.catalog.lock().await;
        let path = ops::disable(&self.layout, &mut catalog, id)?;
        self.persist(&catalog).await?;
        Ok(path)
    }
}
