//! Download manager.
//!
//! Each download runs as its own tokio task. The active set holds at most
//! one task per mod: starting a second download for a mod aborts the first,
//! waits for it to stop, and removes whatever it wrote before starting over.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use modlayer_schema::{Catalog, RepoKey};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{ModError, ModResult};
use crate::io::download::{Progress, Transport};
use crate::io::extract::extract_single_artifact;
use crate::locator::{candidate_path, is_container};
use crate::paths::Layout;
use crate::reporter::Reporter;
use crate::store::StoreHandle;

/// One in-flight transfer of a release asset.
///
/// A task settles exactly once: complete, failed, or superseded. The catalog
/// save that follows is part of the task, so its outcome is known by the
/// time [`DownloadTask::wait`] returns.
#[derive(Debug)]
pub struct DownloadTask {
    repo: RepoKey,
    tag: String,
    url: String,
    dest: PathBuf,
    progress: Progress,
    complete: AtomicBool,
    failed: AtomicBool,
    cancelled: AtomicBool,
    failure: Mutex<Option<String>>,
    save_failure: Mutex<Option<String>>,
    /// Held while a container is unpacked on a blocking thread.
    unpacking: Arc<tokio::sync::Mutex<()>>,
    artifact: Mutex<Option<PathBuf>>,
    settled: watch::Sender<bool>,
}

impl DownloadTask {
    fn new(repo: RepoKey, tag: String, url: String, dest: PathBuf) -> Self {
        Self {
            repo,
            tag,
            url,
            dest,
            progress: Progress::default(),
            complete: AtomicBool::new(false),
            failed: AtomicBool::new(false),
            cancelled: AtomicBool::new(false),
            failure: Mutex::new(None),
            save_failure: Mutex::new(None),
            unpacking: Arc::new(tokio::sync::Mutex::new(())),
            artifact: Mutex::new(None),
            settled: watch::Sender::new(false),
        }
    }

    /// Mod being installed.
    pub fn repo(&self) -> &RepoKey {
        &self.repo
    }

    /// Tag being installed. It only becomes the mod's installed tag once the
    /// download succeeds.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Asset URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Where the asset is written.
    pub fn dest(&self) -> &Path {
        &self.dest
    }

    /// Byte counters of the transfer.
    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    /// The asset is installed and its tag committed.
    pub fn is_complete(&self) -> bool {
        self.complete.load(Ordering::Acquire)
    }

    /// The transfer or extraction failed, or a newer download replaced it.
    pub fn is_failed(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }

    /// Completed or failed.
    pub fn is_finished(&self) -> bool {
        self.is_complete() || self.is_failed()
    }

    /// Reason of a failed download.
    pub fn failure(&self) -> Option<String> {
        self.failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn fail(&self, reason: String) {
        *self.failure.lock().unwrap_or_else(PoisonError::into_inner) = Some(reason);
        self.failed.store(true, Ordering::Release);
    }

    /// Why the catalog could not be saved after the task finished. The
    /// installed file and the in-memory catalog are still up to date.
    pub fn save_failure(&self) -> Option<String> {
        self.save_failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The first problem the task ran into: its failure, or else a failed
    /// catalog save.
    pub fn error(&self) -> Option<String> {
        self.failure().or_else(|| self.save_failure())
    }

    /// Wait until the task has completed, failed or been superseded.
    pub async fn wait(&self) {
        let mut rx = self.settled.subscribe();
        let _ = rx.wait_for(|settled| *settled).await;
    }
}

/// Marks a task settled when its future ends, including by abort.
struct SettleGuard(Arc<DownloadTask>);

impl Drop for SettleGuard {
    fn drop(&mut self) {
        if !self.0.is_finished() {
            self.0.fail("superseded by a newer download".to_string());
        }
        self.0.settled.send_replace(true);
    }
}

/// Progress summed over the active downloads.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Aggregate {
    /// Bytes received so far.
    pub bytes_received: u64,
    /// Expected bytes, where known.
    pub bytes_total: u64,
    /// Unfinished tasks counted.
    pub active: usize,
}

impl Aggregate {
    /// Percentage of bytes received, or 0 while nothing has arrived.
    #[allow(clippy::cast_precision_loss)]
    pub fn percentage(&self) -> f64 {
        if self.bytes_received == 0 || self.bytes_total == 0 {
            return 0.0;
        }
        self.bytes_received as f64 / self.bytes_total as f64 * 100.0
    }

    /// Nothing is left in flight.
    pub fn is_complete(&self) -> bool {
        self.active == 0
    }
}

/// Sum the counters of the unfinished tasks in `tasks`.
pub fn aggregate<'a>(tasks: impl IntoIterator<Item = &'a DownloadTask>) -> Aggregate {
    tasks
        .into_iter()
        .filter(|t| !t.is_finished())
        .fold(Aggregate::default(), |mut acc, t| {
            acc.bytes_received += t.progress.received();
            acc.bytes_total += t.progress.total();
            acc.active += 1;
            acc
        })
}

struct ActiveDownload {
    task: Arc<DownloadTask>,
    handle: JoinHandle<()>,
}

/// State shared between the manager and its running tasks.
struct Shared {
    transport: Arc<dyn Transport>,
    layout: Layout,
    catalog: Arc<tokio::sync::Mutex<Catalog>>,
    store: StoreHandle,
    reporter: Arc<dyn Reporter>,
    active: Mutex<HashMap<RepoKey, ActiveDownload>>,
}

impl Shared {
    fn lock_active(&self) -> MutexGuard<'_, HashMap<RepoKey, ActiveDownload>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drop `task` from the active set unless a newer task replaced it.
    fn detach(&self, task: &Arc<DownloadTask>) {
        let mut active = self.lock_active();
        if active
            .get(&task.repo)
            .is_some_and(|a| Arc::ptr_eq(&a.task, task))
        {
            active.remove(&task.repo);
        }
    }

    /// Save a snapshot while still holding the catalog lock, so saves land
    /// in the order the changes were made.
    async fn persist(&self) -> ModResult<()> {
        let catalog = self.catalog.lock().await;
        self.store.save(catalog.clone()).await
    }
}

/// Runs downloads concurrently, at most one per mod, and commits each
/// finished install to the shared catalog.
pub struct DownloadManager {
    shared: Arc<Shared>,
    start_gate: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for DownloadManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadManager")
            .field("active", &self.shared.lock_active().len())
            .finish_non_exhaustive()
    }
}

impl DownloadManager {
    /// Create a manager writing into `layout` and committing to `catalog`.
    pub fn new(
        transport: Arc<dyn Transport>,
        layout: Layout,
        catalog: Arc<tokio::sync::Mutex<Catalog>>,
        store: StoreHandle,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                transport,
                layout,
                catalog,
                store,
                reporter,
                active: Mutex::new(HashMap::new()),
            }),
            start_gate: tokio::sync::Mutex::new(()),
        }
    }

    /// Start installing release `tag` of `repo`.
    ///
    /// A download already running for the mod is cancelled first. The mod's
    /// current file is deleted, and the new asset is written over its path
    /// (keeping a custom file name) or to the release's default location.
    /// The installed tag is committed only once the transfer succeeds.
    pub async fn start_download(&self, repo: &RepoKey, tag: &str) -> ModResult<Arc<DownloadTask>> {
        let _gate = self.start_gate.lock().await;
        self.cancel(repo).await;

        let task = {
            let mut catalog = self.shared.catalog.lock().await;
            let m = catalog
                .find_mut(repo)
                .ok_or_else(|| ModError::NotFound(format!("mod {repo}")))?;
            let release = m
                .find_release(tag)
                .ok_or_else(|| ModError::NotFound(format!("release {tag} of {repo}")))?
                .clone();

            if let Some(existing) = m.existing_file() {
                debug!("Removing {}", existing.display());
                std::fs::remove_file(existing).map_err(|e| ModError::io(existing, e))?;
            }

            let dest = match m.file.as_deref() {
                Some(recorded) if is_container(Path::new(&release.file_name)) => recorded
                    .parent()
                    .map_or_else(|| candidate_path(&self.shared.layout, &release), |dir| {
                        dir.join(&release.file_name)
                    }),
                Some(recorded) => recorded.to_path_buf(),
                None => candidate_path(&self.shared.layout, &release),
            };
            m.file = Some(dest.clone());

            Arc::new(DownloadTask::new(
                repo.clone(),
                release.tag,
                release.download_url,
                dest,
            ))
        };

        info!("Downloading {repo} {tag} -> {}", task.dest.display());
        let mut active = self.shared.lock_active();
        let handle = tokio::spawn(run_download(Arc::clone(&self.shared), Arc::clone(&task)));
        active.insert(
            repo.clone(),
            ActiveDownload {
                task: Arc::clone(&task),
                handle,
            },
        );
        Ok(task)
    }

    /// Abort the download running for `repo`, if any, and remove what it
    /// wrote. Returns whether a download was cancelled.
    ///
    /// An extraction already running on a blocking thread cannot be aborted;
    /// it is waited for, and its artifact removed too.
    pub async fn cancel(&self, repo: &RepoKey) -> bool {
        let previous = self.shared.lock_active().remove(repo);
        let Some(previous) = previous else {
            return false;
        };
        previous.task.cancelled.store(true, Ordering::Release);
        previous.handle.abort();
        let _ = previous.handle.await;
        if previous.task.is_complete() {
            return false;
        }
        debug!("Cancelled download of {repo} {}", previous.task.tag);
        discard(&previous.task).await;
        true
    }

    /// Finished and failed tasks are purged, then the rest are summed.
    pub fn aggregate(&self) -> Aggregate {
        let mut active = self.shared.lock_active();
        active.retain(|_, a| !a.task.is_finished());
        aggregate(active.values().map(|a| a.task.as_ref()))
    }

    /// Bytes received across active downloads.
    pub fn bytes_received(&self) -> u64 {
        self.aggregate().bytes_received
    }

    /// Expected bytes across active downloads.
    pub fn bytes_total(&self) -> u64 {
        self.aggregate().bytes_total
    }

    /// See [`Aggregate::percentage`].
    pub fn percentage(&self) -> f64 {
        self.aggregate().percentage()
    }

    /// No download is in flight.
    pub fn is_complete(&self) -> bool {
        self.aggregate().is_complete()
    }

    /// Number of downloads in flight.
    pub fn active_count(&self) -> usize {
        self.aggregate().active
    }

    /// The running task for `repo`, if any.
    pub fn task_for(&self, repo: &RepoKey) -> Option<Arc<DownloadTask>> {
        self.shared
            .lock_active()
            .get(repo)
            .filter(|a| !a.task.is_finished())
            .map(|a| Arc::clone(&a.task))
    }

    /// Wait for every download running right now.
    pub async fn wait_all(&self) {
        let tasks: Vec<_> = self
            .shared
            .lock_active()
            .values()
            .map(|a| Arc::clone(&a.task))
            .collect();
        for task in tasks {
            task.wait().await;
        }
    }
}

async fn run_download(shared: Arc<Shared>, task: Arc<DownloadTask>) {
    let _guard = SettleGuard(Arc::clone(&task));
    let name = task.repo.to_string();
    shared.reporter.downloading(&name, &task.tag, 0, None);

    match transfer(&shared, &task).await {
        Ok(path) => {
            task.complete.store(true, Ordering::Release);
            shared.detach(&task);
            info!("Installed {name} {} at {}", task.tag, path.display());
            shared.reporter.done(&name, &task.tag, "installed");
        }
        Err(e) => {
            task.fail(e.to_string());
            shared.detach(&task);
            if task.dest.exists() {
                tokio::fs::remove_file(&task.dest).await.ok();
            }
            warn!("Download of {name} {} failed: {e}", task.tag);
            shared.reporter.failed(&name, &task.tag, &e.to_string());
        }
    }

    if let Err(e) = shared.persist().await {
        warn!("Failed to save catalog after {name} {}: {e}", task.tag);
        *task
            .save_failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(e.to_string());
        shared.reporter.error(&e.to_string());
    }
}

/// Move the asset, unpack it when it is a container, and commit the
/// installed file and tag.
async fn transfer(shared: &Shared, task: &Arc<DownloadTask>) -> ModResult<PathBuf> {
    shared
        .transport
        .download(&task.url, &task.dest, &task.progress)
        .await?;

    let path = if is_container(&task.dest) {
        unpack(task).await?
    } else {
        task.dest.clone()
    };

    let mut catalog = shared.catalog.lock().await;
    if let Some(m) = catalog.find_mut(&task.repo) {
        m.file = Some(path.clone());
        m.current_tag = Some(task.tag.clone());
    }
    Ok(path)
}

/// Extract the task's container on a blocking thread.
///
/// The blocking closure holds the task's unpacking lock and records the
/// artifact it wrote, so [`discard`] can wait for it and clean up after an
/// abort. Nothing is written once the task is cancelled.
async fn unpack(task: &Arc<DownloadTask>) -> ModResult<PathBuf> {
    let guard = Arc::clone(&task.unpacking).lock_owned().await;
    let job = Arc::clone(task);
    tokio::task::spawn_blocking(move || {
        let _guard = guard;
        if job.cancelled.load(Ordering::Acquire) {
            return Err(ModError::Cancelled(format!("{} {}", job.repo, job.tag)));
        }
        let path = extract_single_artifact(&job.dest)?;
        *job.artifact.lock().unwrap_or_else(PoisonError::into_inner) = Some(path.clone());
        Ok(path)
    })
    .await
    .map_err(|e| ModError::io(&task.dest, std::io::Error::other(e)))?
}

/// Remove everything an unfinished task wrote, once any extraction it
/// started has stopped.
async fn discard(task: &DownloadTask) {
    let _unpacked = task.unpacking.lock().await;
    let artifact = task
        .artifact
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .take();
    for path in std::iter::once(task.dest.clone()).chain(artifact) {
        match tokio::fs::remove_file(&path).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
                warn!("Failed to remove {}: {e}", path.display());
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(received: u64, total: u64) -> DownloadTask {
        let t = DownloadTask::new(
            RepoKey::new("o", "m"),
            "v1".into(),
            "https://example.com".into(),
            PathBuf::from("/tmp/x.dll"),
        );
        t.progress.update(received, total);
        t
    }

    #[test]
    fn test_aggregate_sums_active_tasks() {
        let tasks = [task(10, 100), task(50, 50), task(0, 0)];
        let agg = aggregate(&tasks);
        assert_eq!(agg.bytes_received, 60);
        assert_eq!(agg.bytes_total, 150);
        assert_eq!(agg.active, 3);
        assert!((agg.percentage() - 40.0).abs() < 1e-9);
        assert!(!agg.is_complete());
    }

    #[test]
    fn test_aggregate_skips_finished() {
        let done = task(100, 100);
        done.complete.store(true, Ordering::Release);
        let failed = task(5, 100);
        failed.fail("boom".into());
        let running = task(1, 4);

        let agg = aggregate([&done, &failed, &running]);
        assert_eq!(agg.bytes_received, 1);
        assert_eq!(agg.bytes_total, 4);
        assert_eq!(agg.active, 1);
        assert_eq!(failed.failure().as_deref(), Some("boom"));
    }

    #[test]
    fn test_aggregate_empty() {
        let agg = aggregate(std::iter::empty());
        assert!(agg.is_complete());
        assert!((agg.percentage() - 0.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_settle_guard_marks_aborted_task() {
        let t = Arc::new(task(0, 0));
        drop(SettleGuard(Arc::clone(&t)));
        t.wait().await;
        assert!(t.is_failed());
        assert!(t.failure().unwrap().contains("superseded"));
    }

    fn container_task(dir: &Path) -> Arc<DownloadTask> {
        use std::io::Write;
        let dest = dir.join("Mod.zip");
        let mut zip = zip::ZipWriter::new(std::fs::File::create(&dest).unwrap());
        zip.start_file("Mod.dll", zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(b"plugin").unwrap();
        zip.finish().unwrap();
        Arc::new(DownloadTask::new(
            RepoKey::new("o", "m"),
            "v1".into(),
            "https://example.com/Mod.zip".into(),
            dest,
        ))
    }

    #[tokio::test]
    async fn test_cancelled_task_does_not_unpack() {
        let tmp = tempfile::TempDir::new().unwrap();
        let t = container_task(tmp.path());
        t.cancelled.store(true, Ordering::Release);

        let err = unpack(&t).await.unwrap_err();
        assert!(matches!(err, ModError::Cancelled(_)));
        assert!(!tmp.path().join("Mod.dll").exists());

        discard(&t).await;
        assert!(!t.dest.exists());
    }

    #[tokio::test]
    async fn test_discard_removes_unpacked_artifact() {
        let tmp = tempfile::TempDir::new().unwrap();
        let t = container_task(tmp.path());

        let path = unpack(&t).await.unwrap();
        assert_eq!(path, tmp.path().join("Mod.dll"));
        assert!(!t.dest.exists());

        discard(&t).await;
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_discard_waits_for_running_extraction() {
        let tmp = tempfile::TempDir::new().unwrap();
        let t = container_task(tmp.path());
        let running = Arc::clone(&t.unpacking).lock_owned().await;

        let pending = tokio::spawn({
            let t = Arc::clone(&t);
            async move { discard(&t).await }
        });
        tokio::task::yield_now().await;
        assert!(!pending.is_finished());
        assert!(t.dest.exists());

        // The extraction finishes and records its artifact.
        std::fs::write(tmp.path().join("Mod.dll"), b"plugin").unwrap();
        *t.artifact.lock().unwrap() = Some(tmp.path().join("Mod.dll"));
        drop(running);

        pending.await.unwrap();
        assert!(!t.dest.exists());
        assert!(!tmp.path().join("Mod.dll").exists());
    }

    #[test]
    fn test_error_prefers_failure_over_save_failure() {
        let t = task(0, 0);
        assert!(t.error().is_none());
        *t.save_failure.lock().unwrap() = Some("disk full".into());
        assert_eq!(t.error().as_deref(), Some("disk full"));
        t.fail("404".into());
        assert_eq!(t.error().as_deref(), Some("404"));
    }
}
