//! Remote catalog collaborator.
//!
//! The synchronizer only sees [`CatalogSource`]; [`github::GitHubCatalog`]
//! is the production implementation.

pub mod github;

use async_trait::async_trait;
use modlayer_schema::{Release, RepoKey};

use crate::error::ModResult;

pub use github::GitHubCatalog;

/// Repository metadata as reported by the remote catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoMetadata {
    pub full_name: String,
    pub description: Option<String>,
    pub stars: u64,
    pub watchers: u64,
}

/// A downloadable asset attached to a remote release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteAsset {
    pub url: String,
    pub name: String,
    pub download_count: u64,
}

/// A release as listed remotely, before it is reduced to a [`Release`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteRelease {
    pub tag: String,
    pub prerelease: bool,
    pub draft: bool,
    pub title: Option<String>,
    pub body: Option<String>,
    pub assets: Vec<RemoteAsset>,
}

impl RemoteRelease {
    /// Reduce to a catalog entry using the first asset.
    ///
    /// Returns the entry and that asset's download count, or `None` when the
    /// release has no assets. Drafts are recorded as pre-releases.
    pub fn into_release(self) -> Option<(Release, u64)> {
        let asset = self.assets.into_iter().next()?;
        let release = Release {
            tag: self.tag,
            prerelease: self.prerelease || self.draft,
            title: self.title.filter(|t| !t.is_empty()),
            description: self.body.filter(|b| !b.is_empty()),
            download_url: asset.url,
            file_name: asset.name,
        };
        Some((release, asset.download_count))
    }
}

/// A remote source of tracked repositories, their metadata and releases.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Ordered list of tracked repositories.
    async fn list_tracked_repos(&self) -> ModResult<Vec<RepoKey>>;

    async fn repo_metadata(&self, repo: &RepoKey) -> ModResult<RepoMetadata>;

    /// Releases, newest first.
    async fn list_releases(&self, repo: &RepoKey) -> ModResult<Vec<RemoteRelease>>;

    /// Remaining request quota, or `None` while it is unknown.
    fn remaining_quota(&self) -> Option<u64>;

    /// Whether `requests` more calls fit in the remaining quota. An unknown
    /// quota allows the call.
    fn can_request(&self, requests: u64) -> bool {
        self.remaining_quota()
            .is_none_or(|remaining| requests <= remaining)
    }
}
