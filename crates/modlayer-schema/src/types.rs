//! Catalog data model: mods, their releases and the catalog itself.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::path::{Path, PathBuf};

use crate::repo::RepoKey;

#[allow(clippy::trivially_copy_pass_by_ref)] // serde's skip_serializing_if passes by reference
fn is_false(b: &bool) -> bool {
    !*b
}

/// One downloadable version of a mod, as listed by the remote catalog.
///
/// Immutable once it is part of a [`ModRecord`]'s release list. A release
/// with no downloadable asset is never turned into a `Release`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    /// Version tag, unique within the owning mod's release list.
    pub tag: String,

    /// Pre-release flag. Drafts are recorded as pre-releases.
    #[serde(default, skip_serializing_if = "is_false")]
    pub prerelease: bool,

    /// Release title; falls back to the mod title when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Release notes; fall back to the mod description when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// URL of the asset to download.
    pub download_url: String,

    /// File name the installed artifact is given.
    pub file_name: String,
}

/// A tracked mod: identity, metadata, releases and local install facts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModRecord {
    /// Remote repository backing this mod; `None` for a local mod
    /// synthesized from an unrecognized plugin file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<RepoKey>,

    /// Display title. See [`ModRecord::display_title`] for the fallback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Repository description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Star count of the repository.
    #[serde(default)]
    pub stars: u64,

    /// Watcher count of the repository.
    #[serde(default)]
    pub watchers: u64,

    /// Download count summed over the releases' assets.
    #[serde(default)]
    pub downloads: u64,

    /// Releases, newest first, in the order the catalog returned them.
    #[serde(default)]
    pub releases: Vec<Release>,

    /// Tag of the installed release, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_tag: Option<String>,

    /// On-disk artifact believed to back this mod.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,

    /// Unix timestamp of the last metadata fetch for this mod.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_check: Option<i64>,
}

impl ModRecord {
    /// A fresh remote mod with no metadata or releases yet.
    pub fn remote(repo: RepoKey) -> Self {
        Self {
            repo: Some(repo),
            ..Self::default()
        }
    }

    /// A local mod backed by `file`, titled after the file name.
    pub fn local(file: PathBuf) -> Self {
        let title = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned());
        Self {
            title,
            file: Some(file),
            ..Self::default()
        }
    }

    /// Whether this record came from a directory scan rather than the catalog.
    pub fn is_local(&self) -> bool {
        self.repo.is_none()
    }

    /// Title, falling back to `owner/name` for remote mods.
    pub fn display_title(&self) -> Cow<'_, str> {
        match (&self.title, &self.repo) {
            (Some(title), _) => Cow::Borrowed(title),
            (None, Some(repo)) => Cow::Owned(repo.to_string()),
            (None, None) => Cow::Borrowed("<unnamed>"),
        }
    }

    /// The release matching `current_tag`, if the catalog still lists it.
    pub fn current(&self) -> Option<&Release> {
        let tag = self.current_tag.as_deref()?;
        self.find_release(tag)
    }

    /// The newest release on a channel.
    ///
    /// With `include_prereleases` the first release is returned; otherwise the
    /// first stable one, falling back to the first release when every release
    /// is a pre-release. Returns `None` only when there are no releases.
    pub fn latest(&self, include_prereleases: bool) -> Option<&Release> {
        if include_prereleases {
            return self.releases.first();
        }
        self.releases
            .iter()
            .find(|r| !r.prerelease)
            .or_else(|| self.releases.first())
    }

    /// Latest release on the installed release's channel (stable when
    /// nothing resolvable is installed).
    pub fn channel_latest(&self) -> Option<&Release> {
        let prerelease = self.current().is_some_and(|r| r.prerelease);
        self.latest(prerelease)
    }

    /// Look up a release by exact tag.
    pub fn find_release(&self, tag: &str) -> Option<&Release> {
        self.releases.iter().find(|r| r.tag == tag)
    }

    /// Title of `release`, or the mod title when the release has none.
    pub fn release_title<'a>(&'a self, release: &'a Release) -> Cow<'a, str> {
        match &release.title {
            Some(title) => Cow::Borrowed(title),
            None => self.display_title(),
        }
    }

    /// Notes of `release`, or the mod description when the release has none.
    pub fn release_description<'a>(&'a self, release: &'a Release) -> Option<&'a str> {
        release
            .description
            .as_deref()
            .or(self.description.as_deref())
    }

    fn has_id(&self, id: &ModId) -> bool {
        match id {
            ModId::Remote(repo) => self.repo.as_ref() == Some(repo),
            ModId::Local(path) => self.is_local() && self.file.as_deref() == Some(path.as_path()),
        }
    }

    /// Catalog identity of this record.
    pub fn id(&self) -> ModId {
        match &self.repo {
            Some(repo) => ModId::Remote(repo.clone()),
            None => ModId::Local(self.file.clone().unwrap_or_default()),
        }
    }

    /// The recorded file, only if it still exists on disk.
    pub fn existing_file(&self) -> Option<&Path> {
        self.file.as_deref().filter(|p| p.exists())
    }
}

/// Identifies a mod inside a [`Catalog`].
///
/// Remote mods are keyed by repository; local mods have no remote identity
/// and are keyed by the file that backs them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ModId {
    /// A mod fetched from the remote catalog.
    Remote(RepoKey),
    /// A mod synthesized from an unrecognized plugin file.
    Local(PathBuf),
}

impl std::fmt::Display for ModId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Remote(repo) => write!(f, "{repo}"),
            Self::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

/// The full persisted state: every known mod plus the last sync time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    /// Unix timestamp of the last completed catalog sync.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_check: Option<i64>,

    /// Remote and local mods.
    #[serde(default)]
    pub mods: Vec<ModRecord>,
}

impl Catalog {
    /// Find a remote mod by repository.
    pub fn find(&self, repo: &RepoKey) -> Option<&ModRecord> {
        self.mods.iter().find(|m| m.repo.as_ref() == Some(repo))
    }

    /// Mutable lookup of a remote mod by repository.
    pub fn find_mut(&mut self, repo: &RepoKey) -> Option<&mut ModRecord> {
        self.mods.iter_mut().find(|m| m.repo.as_ref() == Some(repo))
    }

    /// Look up any mod by its identity.
    pub fn get(&self, id: &ModId) -> Option<&ModRecord> {
        self.mods.iter().find(|m| m.has_id(id))
    }

    /// Mutable lookup of any mod by its identity.
    pub fn get_mut(&mut self, id: &ModId) -> Option<&mut ModRecord> {
        self.mods.iter_mut().find(|m| m.has_id(id))
    }

    /// Drop the record with the given identity, returning it.
    pub fn remove(&mut self, id: &ModId) -> Option<ModRecord> {
        let index = self.mods.iter().position(|m| m.has_id(id))?;
        Some(self.mods.remove(index))
    }

    /// Find any mod (remote or local) whose recorded file is `path`.
    pub fn find_by_file(&self, path: &Path) -> Option<&ModRecord> {
        self.mods.iter().find(|m| m.file.as_deref() == Some(path))
    }

    /// Iterate over the remote mods only.
    pub fn remote_mods(&self) -> impl Iterator<Item = &ModRecord> {
        self.mods.iter().filter(|m| !m.is_local())
    }

    /// Iterate over the local mods only.
    pub fn local_mods(&self) -> impl Iterator<Item = &ModRecord> {
        self.mods.iter().filter(|m| m.is_local())
    }
}
