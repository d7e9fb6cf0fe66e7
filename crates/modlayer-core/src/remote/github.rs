//! GitHub REST implementation of [`CatalogSource`].

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use modlayer_schema::RepoKey;
use reqwest::{Client, Response, StatusCode, header};
use serde::Deserialize;
use tracing::debug;

use super::{CatalogSource, RemoteAsset, RemoteRelease, RepoMetadata};
use crate::error::{ModError, ModResult};

/// Public GitHub API endpoint.
pub const GITHUB_API: &str = "https://api.github.com";

const RATE_LIMIT_HEADER: &str = "x-ratelimit-remaining";
const RELEASES_PER_PAGE: usize = 100;

#[derive(Deserialize)]
struct TrackedList {
    #[serde(default, rename = "repository")]
    repos: Vec<String>,
}

/// Parse the tracked repository list:
/// `<repositories><repository>owner/name</repository>...</repositories>`.
pub fn parse_tracked_list(xml: &str) -> ModResult<Vec<RepoKey>> {
    let list: TrackedList = quick_xml::de::from_str(xml)
        .map_err(|e| ModError::Format(format!("tracked repository list is malformed: {e}")))?;
    list.repos
        .iter()
        .map(|r| RepoKey::parse(r).map_err(ModError::from))
        .collect()
}

#[derive(Deserialize)]
struct ContentEntry {
    #[serde(rename = "type")]
    kind: String,
    download_url: Option<String>,
}

#[derive(Deserialize)]
struct GhRepo {
    full_name: String,
    description: Option<String>,
    #[serde(default)]
    stargazers_count: u64,
    #[serde(default)]
    watchers_count: u64,
}

#[derive(Deserialize)]
struct GhAsset {
    name: String,
    browser_download_url: String,
    #[serde(default)]
    download_count: u64,
}

#[derive(Deserialize)]
struct GhRelease {
    tag_name: String,
    #[serde(default)]
    prerelease: bool,
    #[serde(default)]
    draft: bool,
    name: Option<String>,
    body: Option<String>,
    #[serde(default)]
    assets: Vec<GhAsset>,
}

impl From<GhRelease> for RemoteRelease {
    fn from(r: GhRelease) -> Self {
        Self {
            tag: r.tag_name,
            prerelease: r.prerelease,
            draft: r.draft,
            title: r.name,
            body: r.body,
            assets: r
                .assets
                .into_iter()
                .map(|a| RemoteAsset {
                    url: a.browser_download_url,
                    name: a.name,
                    download_count: a.download_count,
                })
                .collect(),
        }
    }
}

/// Catalog backed by a GitHub repository holding the tracked list, with
/// each tracked mod being a GitHub repository publishing releases.
pub struct GitHubCatalog {
    client: Client,
    api_base: String,
    list_repo: Option<RepoKey>,
    list_path: String,
    token: Option<String>,
    /// Last observed quota; negative while unknown.
    remaining: AtomicI64,
}

impl std::fmt::Debug for GitHubCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubCatalog")
            .field("api_base", &self.api_base)
            .field("list_repo", &self.list_repo)
            .field("list_path", &self.list_path)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("remaining", &self.remaining_quota())
            .finish_non_exhaustive()
    }
}

impl GitHubCatalog {
    /// `list_repo` holds the tracked list; without it only per-mod calls work.
    pub fn new(client: Client, list_repo: Option<RepoKey>, list_path: impl Into<String>) -> Self {
        Self {
            client,
            api_base: GITHUB_API.to_string(),
            list_repo,
            list_path: list_path.into(),
            token: None,
            remaining: AtomicI64::new(-1),
        }
    }

    /// Point at a different API host (used by tests).
    #[must_use]
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    fn record_quota(&self, resp: &Response) {
        let remaining = resp
            .headers()
            .get(RATE_LIMIT_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<i64>().ok());
        if let Some(remaining) = remaining {
            self.remaining.store(remaining, Ordering::Relaxed);
        }
    }

    async fn get(&self, url: &str) -> ModResult<Response> {
        debug!("GET {url}");
        let mut req = self
            .client
            .get(url)
            .header(header::USER_AGENT, crate::USER_AGENT)
            .header(header::ACCEPT, "application/vnd.github+json");
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        let resp = req.send().await?;
        self.record_quota(&resp);

        match resp.status() {
            StatusCode::NOT_FOUND => Err(ModError::NotFound(url.to_string())),
            StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS
                if self.remaining_quota() == Some(0) =>
            {
                Err(ModError::QuotaExceeded {
                    needed: 1,
                    remaining: 0,
                })
            }
            _ => Ok(resp.error_for_status()?),
        }
    }

    fn repo_url(&self, repo: &RepoKey) -> String {
        format!("{}/repos/{}/{}", self.api_base, repo.owner, repo.name)
    }
}

#[async_trait]
impl CatalogSource for GitHubCatalog {
    async fn list_tracked_repos(&self) -> ModResult<Vec<RepoKey>> {
        let list_repo = self
            .list_repo
            .as_ref()
            .ok_or_else(|| ModError::Config("main_repository is not set".into()))?;
        let url = format!(
            "{}/contents/{}",
            self.repo_url(list_repo),
            self.list_path.trim_start_matches('/')
        );
        let value: serde_json::Value = self.get(&url).await?.json().await?;
        if value.is_array() {
            return Err(ModError::Format(format!(
                "entry at {} in {list_repo} is not a file",
                self.list_path
            )));
        }
        let entry: ContentEntry = serde_json::from_value(value)
            .map_err(|e| ModError::Format(format!("unexpected contents response: {e}")))?;
        if entry.kind != "file" {
            return Err(ModError::Format(format!(
                "entry at {} in {list_repo} is not a file",
                self.list_path
            )));
        }
        let download_url = entry
            .download_url
            .ok_or_else(|| ModError::NotFound(format!("{} in {list_repo}", self.list_path)))?;

        let xml = self.get(&download_url).await?.text().await?;
        let repos = parse_tracked_list(&xml)?;
        debug!("{} tracked repositories", repos.len());
        Ok(repos)
    }

    async fn repo_metadata(&self, repo: &RepoKey) -> ModResult<RepoMetadata> {
        let gh: GhRepo = self.get(&self.repo_url(repo)).await?.json().await?;
        Ok(RepoMetadata {
            full_name: gh.full_name,
            description: gh.description,
            stars: gh.stargazers_count,
            watchers: gh.watchers_count,
        })
    }

    async fn list_releases(&self, repo: &RepoKey) -> ModResult<Vec<RemoteRelease>> {
        let mut releases = Vec::new();
        for page in 1.. {
            let url = format!(
                "{}/releases?per_page={RELEASES_PER_PAGE}&page={page}",
                self.repo_url(repo)
            );
            let batch: Vec<GhRelease> = self.get(&url).await?.json().await?;
            let last = batch.len() < RELEASES_PER_PAGE;
            releases.extend(batch.into_iter().map(RemoteRelease::from));
            if last {
                break;
            }
        }
        Ok(releases)
    }

    fn remaining_quota(&self) -> Option<u64> {
        u64::try_from(self.remaining.load(Ordering::Relaxed)).ok()
    }
}
