mod common;

use std::sync::atomic::Ordering;

use common::{TestEnv, remote_release};
use modlayer_core::ModState;
use modlayer_core::remote::RemoteRelease;
use modlayer_core::sync::{FetchOutcome, Synchronizer};
use modlayer_schema::{Catalog, ModId, ModRecord, Release, RepoKey};

fn release(tag: &str, file_name: &str) -> Release {
    Release {
        tag: tag.to_string(),
        prerelease: false,
        title: None,
        description: None,
        download_url: format!("https://dl.test/{tag}/{file_name}"),
        file_name: file_name.to_string(),
    }
}

fn write_catalog(env: &TestEnv, catalog: &Catalog) {
    std::fs::write(env.catalog_file(), serde_json::to_vec(catalog).unwrap()).unwrap();
}

#[tokio::test]
async fn test_sync_builds_catalog() {
    let env = TestEnv::new();
    let speed = RepoKey::new("alice", "speed");
    let empty = RepoKey::new("bob", "empty");
    env.source.add(
        &speed,
        vec![
            remote_release("v1.1-pre", true, "Speed.dll"),
            remote_release("v1.0", false, "Speed.dll"),
        ],
    );
    env.source.add(&empty, Vec::new());

    let ctx = env.open().await;
    let summary = ctx.sync().await.unwrap();
    assert_eq!(summary.mods, 1);
    assert_eq!(summary.dropped, 1);

    let catalog = ctx.snapshot().await;
    assert!(catalog.last_check.is_some());
    let m = catalog.find(&speed).unwrap();
    assert_eq!(m.title.as_deref(), Some("alice/speed"));
    assert_eq!(m.downloads, 20);
    assert_eq!(m.releases.len(), 2);
    assert_eq!(m.latest(false).unwrap().tag, "v1.0");
    assert_eq!(m.latest(true).unwrap().tag, "v1.1-pre");
    assert!(m.last_check.is_some());
    assert!(catalog.find(&empty).is_none());

    assert_eq!(
        ctx.classify(&ModId::Remote(speed)).await.unwrap(),
        ModState::NotInstalled
    );

    // Persisted through the store.
    let saved: Catalog =
        serde_json::from_slice(&std::fs::read(env.catalog_file()).unwrap()).unwrap();
    assert_eq!(saved, catalog);
}

#[tokio::test]
async fn test_sync_preserves_user_state() {
    let env = TestEnv::new();
    let repo = RepoKey::new("o", "x");
    std::fs::create_dir_all(env.plugins()).unwrap();
    let file = env.plugins().join("X.dll");
    std::fs::write(&file, b"installed").unwrap();

    let mut old = ModRecord::remote(repo.clone());
    old.releases = vec![release("T", "X.dll")];
    old.current_tag = Some("T".into());
    old.file = Some(file.clone());
    write_catalog(
        &env,
        &Catalog {
            last_check: None,
            mods: vec![old],
        },
    );

    env.source.add(
        &repo,
        vec![
            remote_release("U", false, "X.dll"),
            remote_release("T", false, "X.dll"),
        ],
    );

    let ctx = env.open().await;
    ctx.sync().await.unwrap();

    let catalog = ctx.snapshot().await;
    let m = catalog.find(&repo).unwrap();
    assert_eq!(m.current_tag.as_deref(), Some("T"));
    assert_eq!(m.file.as_deref(), Some(file.as_path()));
    assert_eq!(
        ctx.classify(&ModId::Remote(repo)).await.unwrap(),
        ModState::HasUpdate
    );
}

#[tokio::test]
async fn test_sync_failure_aborts_without_changes() {
    let env = TestEnv::new();
    let a = RepoKey::new("o", "a");
    let b = RepoKey::new("o", "b");

    let mut old = ModRecord::remote(a.clone());
    old.title = Some("Old title".into());
    old.releases = vec![release("v1", "A.dll")];
    let before = Catalog {
        last_check: Some(1),
        mods: vec![old],
    };
    write_catalog(&env, &before);
    let saved_before = std::fs::read(env.catalog_file()).unwrap();

    env.source
        .add(&a, vec![remote_release("v2", false, "A.dll")]);
    env.source
        .add(&b, vec![remote_release("v1", false, "B.dll")]);
    env.source.failing.lock().unwrap().insert(b);

    let ctx = env.open().await;
    assert!(ctx.sync().await.is_err());

    assert_eq!(ctx.snapshot().await, before);
    assert_eq!(std::fs::read(env.catalog_file()).unwrap(), saved_before);
}

#[tokio::test]
async fn test_sync_retry_after_release_failure_refetches_metadata() {
    let env = TestEnv::new();
    let speed = RepoKey::new("alice", "speed");
    env.source
        .add(&speed, vec![remote_release("v1", false, "Speed.dll")]);
    env.source
        .flaky_releases
        .lock()
        .unwrap()
        .insert(speed.clone());
    let sync = Synchronizer::new(env.source.clone());

    let previous = Catalog::default();
    assert!(sync.fetch_catalog(&previous).await.is_err());

    let fresh = sync.fetch_catalog(&previous).await.unwrap();
    assert_eq!(env.source.metadata_calls.load(Ordering::SeqCst), 2);
    assert_eq!(env.source.release_calls.load(Ordering::SeqCst), 2);
    let m = &fresh[0];
    assert_eq!(m.title.as_deref(), Some("alice/speed"));
    assert_eq!(m.description.as_deref(), Some("speed description"));
    assert_eq!(m.stars, 3);
    assert_eq!(m.releases.len(), 1);
}

#[tokio::test]
async fn test_sync_abort_forgets_earlier_mods() {
    let env = TestEnv::new();
    let a = RepoKey::new("o", "a");
    let b = RepoKey::new("o", "b");
    env.source
        .add(&a, vec![remote_release("v1", false, "A.dll")]);
    env.source
        .add(&b, vec![remote_release("v1", false, "B.dll")]);
    env.source.flaky_releases.lock().unwrap().insert(b);

    let ctx = env.open().await;
    assert!(ctx.sync().await.is_err());
    assert!(ctx.snapshot().await.find(&a).is_none());

    let summary = ctx.sync().await.unwrap();
    assert_eq!(summary.mods, 2);
    let catalog = ctx.snapshot().await;
    assert_eq!(catalog.find(&a).unwrap().title.as_deref(), Some("o/a"));
    assert_eq!(catalog.find(&a).unwrap().releases.len(), 1);
}

#[tokio::test]
async fn test_context_fetch_one_retries_after_failure() {
    let env = TestEnv::new();
    let repo = RepoKey::new("o", "m");
    env.source
        .add(&repo, vec![remote_release("v1", false, "M.dll")]);
    let ctx = env.open().await;
    ctx.sync().await.unwrap();

    env.source.metadata.lock().unwrap().insert(
        repo.clone(),
        modlayer_core::remote::RepoMetadata {
            full_name: "o/m renamed".into(),
            description: None,
            stars: 9,
            watchers: 1,
        },
    );
    env.source
        .flaky_releases
        .lock()
        .unwrap()
        .insert(repo.clone());
    let id = ModId::Remote(repo.clone());
    assert!(ctx.fetch_one(&id).await.is_err());
    assert_eq!(
        ctx.snapshot().await.find(&repo).unwrap().title.as_deref(),
        Some("o/m")
    );

    assert_eq!(ctx.fetch_one(&id).await.unwrap(), FetchOutcome::Complete);
    let catalog = ctx.snapshot().await;
    let m = catalog.find(&repo).unwrap();
    assert_eq!(m.title.as_deref(), Some("o/m renamed"));
    assert_eq!(m.stars, 9);
}

#[tokio::test]
async fn test_sync_keeps_local_mods() {
    let env = TestEnv::new();
    std::fs::create_dir_all(env.disabled()).unwrap();
    std::fs::write(env.disabled().join("Handmade.dll"), b"h").unwrap();
    let repo = RepoKey::new("o", "m");
    env.source
        .add(&repo, vec![remote_release("v1", false, "M.dll")]);

    let ctx = env.open().await;
    assert_eq!(ctx.snapshot().await.local_mods().count(), 1);

    let summary = ctx.sync().await.unwrap();
    assert_eq!(summary.locals, 1);
    let catalog = ctx.snapshot().await;
    let local = catalog.local_mods().next().unwrap();
    assert_eq!(local.title.as_deref(), Some("Handmade.dll"));
    assert_eq!(
        ctx.classify(&local.id()).await.unwrap(),
        ModState::UnknownVersion
    );
}

#[tokio::test]
async fn test_sync_refuses_without_quota() {
    let env = TestEnv::new();
    env.source.set_quota(Some(0));
    let ctx = env.open().await;

    let err = ctx.sync().await.unwrap_err();
    assert!(err.is_quota());
    assert!(err.to_string().contains("rate limit exhausted, try later"));
}

#[tokio::test]
async fn test_fetch_one_resumes_partial_fetch() {
    let env = TestEnv::new();
    let repo = RepoKey::new("o", "m");
    env.source.add(
        &repo,
        vec![
            remote_release("v2", false, "M.dll"),
            remote_release("v1", false, "M.dll"),
        ],
    );
    let sync = Synchronizer::new(env.source.clone());

    let mut m = ModRecord::remote(repo.clone());
    m.description = Some("kept".into());
    m.releases = vec![release("v0", "M.dll")];

    // Enough quota for the metadata half only.
    env.source.set_quota(Some(1));
    let outcome = sync.fetch_one(&mut m).await.unwrap();
    assert_eq!(outcome, FetchOutcome::Partial);
    assert_eq!(m.title.as_deref(), Some("o/m"));
    assert_eq!(m.releases.len(), 1);
    assert_eq!(m.releases[0].tag, "v0");
    assert!(m.last_check.is_none());

    // The second call only fetches the missing half.
    env.source.set_quota(Some(10));
    let outcome = sync.fetch_one(&mut m).await.unwrap();
    assert_eq!(outcome, FetchOutcome::Complete);
    assert_eq!(env.source.metadata_calls.load(Ordering::SeqCst), 1);
    assert_eq!(env.source.release_calls.load(Ordering::SeqCst), 1);
    assert_eq!(m.releases.len(), 2);
    assert!(m.last_check.is_some());
}

#[tokio::test]
async fn test_fetch_one_is_idempotent() {
    let env = TestEnv::new();
    let repo = RepoKey::new("o", "m");
    env.source.add(
        &repo,
        vec![
            remote_release("v2", false, "M.dll"),
            RemoteRelease {
                tag: "no-assets".into(),
                ..RemoteRelease::default()
            },
            RemoteRelease {
                draft: true,
                ..remote_release("v3-draft", false, "M.dll")
            },
        ],
    );
    let sync = Synchronizer::new(env.source.clone());
    let mut m = ModRecord::remote(repo);

    sync.fetch_one(&mut m).await.unwrap();
    let first = m.clone();
    sync.fetch_one(&mut m).await.unwrap();

    assert_eq!(m.releases, first.releases);
    assert_eq!(m.releases.len(), 2);
    assert_eq!(m.downloads, 20);
    assert!(m.releases[1].prerelease);
}

#[tokio::test]
async fn test_fetch_one_rejects_local_mod() {
    let env = TestEnv::new();
    let sync = Synchronizer::new(env.source.clone());
    let mut m = ModRecord::local(env.plugins().join("Loose.dll"));
    let err = sync.fetch_one(&mut m).await.unwrap_err();
    assert!(err.to_string().contains("local mod"));
}

#[tokio::test]
async fn test_context_fetch_one_updates_record() {
    let env = TestEnv::new();
    let repo = RepoKey::new("o", "m");
    env.source
        .add(&repo, vec![remote_release("v1", false, "M.dll")]);
    let ctx = env.open().await;
    ctx.sync().await.unwrap();

    env.source
        .releases
        .lock()
        .unwrap()
        .insert(
            repo.clone(),
            vec![
                remote_release("v2", false, "M.dll"),
                remote_release("v1", false, "M.dll"),
            ],
        );
    let id = ModId::Remote(repo.clone());
    assert_eq!(ctx.fetch_one(&id).await.unwrap(), FetchOutcome::Complete);
    assert_eq!(ctx.snapshot().await.find(&repo).unwrap().releases.len(), 2);

    let missing = ModId::Remote(RepoKey::new("x", "y"));
    assert!(ctx.fetch_one(&missing).await.is_err());
}
