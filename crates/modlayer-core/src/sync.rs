//! Catalog synchronizer.
//!
//! A sync runs in two phases so the catalog lock is never held across network
//! calls: [`Synchronizer::fetch_catalog`] builds fresh records from the remote
//! source, then [`merge`] commits them, carrying over install state.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use modlayer_schema::{Catalog, ModRecord, RepoKey};
use tracing::{debug, info};

use crate::error::{ModError, ModResult};
use crate::locator;
use crate::paths::Layout;
use crate::remote::CatalogSource;
use crate::scanner;

/// Which halves of a per-mod refresh have landed in the current attempt.
#[derive(Debug, Default, Clone, Copy)]
struct FetchSession {
    metadata: bool,
    releases: bool,
}

/// Result of a per-mod refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Metadata and releases are both current.
    Complete,
    /// The quota ran out; calling again finishes the missing half.
    Partial,
}

/// Counts from a committed sync.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    /// Remote mods kept in the catalog.
    pub mods: usize,
    /// Tracked repositories dropped because they have no usable release.
    pub dropped: usize,
    /// Local mods found by the rescan.
    pub locals: usize,
}

/// Refreshes catalog records from a [`CatalogSource`].
///
/// Remembers, per mod, which halves of an interrupted refresh already
/// landed, so a call after a quota skip only fetches what is missing.
pub struct Synchronizer {
    source: Arc<dyn CatalogSource>,
    sessions: Mutex<HashMap<RepoKey, FetchSession>>,
}

impl std::fmt::Debug for Synchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Synchronizer")
            .field("remaining_quota", &self.source.remaining_quota())
            .finish_non_exhaustive()
    }
}

impl Synchronizer {
    /// Synchronizer over `source`.
    pub fn new(source: Arc<dyn CatalogSource>) -> Self {
        Self {
            source,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn source(&self) -> &Arc<dyn CatalogSource> {
        &self.source
    }

    fn session(&self, repo: &RepoKey) -> FetchSession {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(repo)
            .copied()
            .unwrap_or_default()
    }

    fn remember(&self, repo: &RepoKey, session: FetchSession) {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        if session.metadata && session.releases {
            sessions.remove(repo);
        } else {
            sessions.insert(repo.clone(), session);
        }
    }

    fn forget(&self, repo: &RepoKey) {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(repo);
    }

    /// Refresh one mod's metadata and releases.
    ///
    /// Each half is skipped, leaving the values already held untouched, when
    /// the remote quota cannot cover it. Halves already obtained in the same
    /// attempt are not fetched again. The release list is rebuilt from
    /// scratch and the download counter re-summed, so repeated calls never
    /// duplicate releases.
    ///
    /// Only quota skips are resumable: an error from either half discards the
    /// progress recorded for the mod, since the caller drops the record.
    pub async fn fetch_one(&self, m: &mut ModRecord) -> ModResult<FetchOutcome> {
        let Some(repo) = m.repo.clone() else {
            return Err(ModError::LocalMod(m.display_title().into_owned()));
        };
        let result = self.fetch_halves(&repo, m).await;
        if result.is_err() {
            self.forget(&repo);
        }
        result
    }

    async fn fetch_halves(&self, repo: &RepoKey, m: &mut ModRecord) -> ModResult<FetchOutcome> {
        let mut session = self.session(repo);

        if !session.metadata {
            if self.source.can_request(1) {
                let meta = self.source.repo_metadata(repo).await?;
                m.title = Some(meta.full_name).filter(|t| !t.is_empty());
                m.description = meta.description;
                m.stars = meta.stars;
                m.watchers = meta.watchers;
                session.metadata = true;
                self.remember(repo, session);
            } else {
                debug!("Quota exhausted, skipping metadata of {repo}");
            }
        }

        if !session.releases {
            if self.source.can_request(1) {
                let remote = self.source.list_releases(repo).await?;
                m.releases.clear();
                m.downloads = 0;
                for release in remote {
                    if let Some((release, count)) = release.into_release() {
                        m.downloads += count;
                        m.releases.push(release);
                    }
                }
                session.releases = true;
                self.remember(repo, session);
            } else {
                debug!("Quota exhausted, skipping releases of {repo}");
            }
        }

        if session.metadata && session.releases {
            m.last_check = Some(chrono::Utc::now().timestamp());
            Ok(FetchOutcome::Complete)
        } else {
            Ok(FetchOutcome::Partial)
        }
    }

    /// Build fresh records for every tracked repository.
    ///
    /// Records are seeded with what `previous` already knows about each mod,
    /// so a half skipped for quota keeps its old values. Install state is not
    /// carried here; [`merge`] restores it at commit time. Any fetch failure
    /// aborts the whole operation.
    pub async fn fetch_catalog(&self, previous: &Catalog) -> ModResult<Vec<ModRecord>> {
        if !self.source.can_request(1) {
            return Err(ModError::QuotaExceeded {
                needed: 1,
                remaining: self.source.remaining_quota().unwrap_or(0),
            });
        }
        let repos = self.source.list_tracked_repos().await?;
        info!("Fetching {} tracked repositories", repos.len());

        let mut fresh: Vec<ModRecord> = Vec::with_capacity(repos.len());
        for repo in repos {
            if fresh.iter().any(|m| m.repo.as_ref() == Some(&repo)) {
                continue;
            }
            let mut m = match previous.find(&repo) {
                Some(old) => ModRecord {
                    current_tag: None,
                    file: None,
                    ..old.clone()
                },
                None => ModRecord::remote(repo),
            };
            if let Err(e) = self.fetch_one(&mut m).await {
                // The fresh list is discarded, so halves recorded for earlier
                // mods never reached the catalog.
                for done in fresh.iter().filter_map(|f| f.repo.as_ref()) {
                    self.forget(done);
                }
                return Err(e);
            }
            fresh.push(m);
        }
        Ok(fresh)
    }

    /// Fetch and commit in one step.
    pub async fn sync(&self, layout: &Layout, catalog: &mut Catalog) -> ModResult<SyncSummary> {
        let fresh = self.fetch_catalog(catalog).await?;
        merge(layout, catalog, fresh)
    }
}

/// Replace the remote mods of `catalog` with `fresh`.
///
/// The installed tag and existing file of every remote mod are snapshotted
/// first and restored onto its fresh record; a fresh record's own file
/// reference wins over the snapshot. Mods left without releases are
/// dropped. Local mods are rebuilt by a rescan afterwards.
pub fn merge(layout: &Layout, catalog: &mut Catalog, fresh: Vec<ModRecord>) -> ModResult<SyncSummary> {
    let snapshot: HashMap<RepoKey, (Option<String>, Option<PathBuf>)> = catalog
        .remote_mods()
        .filter_map(|m| {
            let repo = m.repo.clone()?;
            let file = m.existing_file().map(Path::to_path_buf);
            Some((repo, (m.current_tag.clone(), file)))
        })
        .collect();

    catalog.mods.retain(ModRecord::is_local);

    let mut summary = SyncSummary::default();
    for mut m in fresh {
        if let Some((tag, file)) = m.repo.as_ref().and_then(|r| snapshot.get(r)) {
            if tag.is_some() {
                m.current_tag.clone_from(tag);
            }
            if m.file.is_none() {
                m.file.clone_from(file);
            }
        }
        locator::check_file(layout, &mut m);
        if m.releases.is_empty() {
            debug!("Dropping {}: no usable release", m.display_title());
            summary.dropped += 1;
            continue;
        }
        catalog.mods.push(m);
        summary.mods += 1;
    }

    catalog.last_check = Some(chrono::Utc::now().timestamp());
    summary.locals = scanner::scan(layout, catalog)?;
    Ok(summary)
}
