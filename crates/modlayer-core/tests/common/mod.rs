//! In-memory collaborators shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use modlayer_core::io::download::{Progress, Transport};
use modlayer_core::remote::{CatalogSource, RemoteAsset, RemoteRelease, RepoMetadata};
use modlayer_core::{AppContext, Config, ModError, ModResult, Reporter};
use modlayer_schema::RepoKey;
use tempfile::TempDir;

#[derive(Default)]
pub struct FakeSource {
    pub repos: Mutex<Vec<RepoKey>>,
    pub metadata: Mutex<HashMap<RepoKey, RepoMetadata>>,
    pub releases: Mutex<HashMap<RepoKey, Vec<RemoteRelease>>>,
    pub failing: Mutex<HashSet<RepoKey>>,
    /// Repositories whose next release listing fails.
    pub flaky_releases: Mutex<HashSet<RepoKey>>,
    pub quota: Mutex<Option<u64>>,
    pub metadata_calls: AtomicUsize,
    pub release_calls: AtomicUsize,
}

impl FakeSource {
    pub fn add(&self, repo: &RepoKey, releases: Vec<RemoteRelease>) {
        self.repos.lock().unwrap().push(repo.clone());
        self.metadata.lock().unwrap().insert(
            repo.clone(),
            RepoMetadata {
                full_name: repo.to_string(),
                description: Some(format!("{} description", repo.name)),
                stars: 3,
                watchers: 2,
            },
        );
        self.releases.lock().unwrap().insert(repo.clone(), releases);
    }

    pub fn set_quota(&self, quota: Option<u64>) {
        *self.quota.lock().unwrap() = quota;
    }

    fn spend(&self) {
        if let Some(q) = self.quota.lock().unwrap().as_mut() {
            *q = q.saturating_sub(1);
        }
    }

    fn check(&self, repo: &RepoKey) -> ModResult<()> {
        if self.failing.lock().unwrap().contains(repo) {
            return Err(ModError::NotFound(format!("repository {repo}")));
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogSource for FakeSource {
    async fn list_tracked_repos(&self) -> ModResult<Vec<RepoKey>> {
        self.spend();
        Ok(self.repos.lock().unwrap().clone())
    }

    async fn repo_metadata(&self, repo: &RepoKey) -> ModResult<RepoMetadata> {
        self.spend();
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        self.check(repo)?;
        self.metadata
            .lock()
            .unwrap()
            .get(repo)
            .cloned()
            .ok_or_else(|| ModError::NotFound(repo.to_string()))
    }

    async fn list_releases(&self, repo: &RepoKey) -> ModResult<Vec<RemoteRelease>> {
        self.spend();
        self.release_calls.fetch_add(1, Ordering::SeqCst);
        self.check(repo)?;
        if self.flaky_releases.lock().unwrap().remove(repo) {
            return Err(ModError::Transfer {
                url: format!("releases of {repo}"),
                reason: "502 Bad Gateway".to_string(),
            });
        }
        Ok(self
            .releases
            .lock()
            .unwrap()
            .get(repo)
            .cloned()
            .unwrap_or_default())
    }

    fn remaining_quota(&self) -> Option<u64> {
        *self.quota.lock().unwrap()
    }
}

/// Serves fixed payloads by URL. URLs containing `hang` write a partial
/// file and never finish.
#[derive(Default)]
pub struct FakeTransport {
    pub files: Mutex<HashMap<String, Vec<u8>>>,
}

impl FakeTransport {
    pub fn serve(&self, url: &str, data: Vec<u8>) {
        self.files.lock().unwrap().insert(url.to_string(), data);
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn download(&self, url: &str, dest: &Path, progress: &Progress) -> ModResult<u64> {
        if url.contains("hang") {
            std::fs::write(dest, b"part").unwrap();
            progress.update(4, 100);
            std::future::pending::<()>().await;
        }
        let data = self.files.lock().unwrap().get(url).cloned();
        let Some(data) = data else {
            return Err(ModError::Transfer {
                url: url.to_string(),
                reason: "404 Not Found".to_string(),
            });
        };
        std::fs::write(dest, &data).map_err(|e| ModError::io(dest, e))?;
        let len = data.len() as u64;
        progress.update(len, len);
        Ok(len)
    }
}

/// Collects warnings and errors for assertions.
#[derive(Default)]
pub struct RecordingReporter {
    pub messages: Mutex<Vec<String>>,
}

impl RecordingReporter {
    fn push(&self, msg: String) {
        self.messages.lock().unwrap().push(msg);
    }
}

impl Reporter for RecordingReporter {
    fn section(&self, _: &str) {}
    fn fetching(&self, _: &str) {}
    fn downloading(&self, _: &str, _: &str, _: u64, _: Option<u64>) {}
    fn done(&self, name: &str, tag: &str, detail: &str) {
        self.push(format!("done {name} {tag} {detail}"));
    }
    fn failed(&self, name: &str, tag: &str, reason: &str) {
        self.push(format!("failed {name} {tag} {reason}"));
    }
    fn info(&self, _: &str) {}
    fn success(&self, _: &str) {}
    fn warning(&self, msg: &str) {
        self.push(format!("warning {msg}"));
    }
    fn error(&self, msg: &str) {
        self.push(format!("error {msg}"));
    }
}

pub fn remote_release(tag: &str, prerelease: bool, file_name: &str) -> RemoteRelease {
    RemoteRelease {
        tag: tag.to_string(),
        prerelease,
        draft: false,
        title: Some(format!("Release {tag}")),
        body: None,
        assets: vec![RemoteAsset {
            url: format!("https://dl.test/{tag}/{file_name}"),
            name: file_name.to_string(),
            download_count: 10,
        }],
    }
}

pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (name, data) in entries {
        zip.start_file(*name, zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

/// A game directory with `.modlayer` as home inside it.
pub struct TestEnv {
    pub tmp: TempDir,
    pub home: PathBuf,
    pub source: Arc<FakeSource>,
    pub transport: Arc<FakeTransport>,
    pub reporter: Arc<RecordingReporter>,
}

impl TestEnv {
    pub fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let home = tmp.path().join(".modlayer");
        std::fs::create_dir_all(&home).unwrap();
        Self {
            tmp,
            home,
            source: Arc::new(FakeSource::default()),
            transport: Arc::new(FakeTransport::default()),
            reporter: Arc::new(RecordingReporter::default()),
        }
    }

    pub fn plugins(&self) -> PathBuf {
        self.tmp.path().join("BepInEx").join("plugins")
    }

    pub fn disabled(&self) -> PathBuf {
        self.tmp.path().join("BepInEx").join("disabled-plugins")
    }

    pub fn catalog_file(&self) -> PathBuf {
        self.home.join("catalog.json")
    }

    pub async fn open(&self) -> AppContext {
        AppContext::open(
            Config::default(),
            &self.home,
            self.source.clone(),
            self.transport.clone(),
            self.reporter.clone(),
        )
        .await
        .unwrap()
    }
}
