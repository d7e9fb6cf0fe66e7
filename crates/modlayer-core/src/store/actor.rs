//! Store actor - serialized access to the catalog file
//!
//! Every load and save from every caller goes through one background thread,
//! so writes never interleave. Callers hand over an owned snapshot of the
//! catalog rather than a reference to live state.

use std::fmt;
use std::sync::mpsc;
use std::thread;

use modlayer_schema::Catalog;
use tokio::sync::oneshot;
use tracing::warn;

use super::CatalogFile;
use crate::error::{ModError, ModResult};

/// Events that can be sent to the store actor
pub enum StoreEvent {
    /// Read the persisted catalog
    Load {
        resp: oneshot::Sender<ModResult<Option<Catalog>>>,
    },
    /// Replace the persisted catalog with a snapshot
    Save {
        catalog: Box<Catalog>,
        resp: oneshot::Sender<ModResult<()>>,
    },
    /// Shutdown the actor
    Shutdown,
}

impl fmt::Debug for StoreEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load { .. } => f.debug_struct("Load").finish_non_exhaustive(),
            Self::Save { catalog, .. } => f
                .debug_struct("Save")
                .field("mods", &catalog.mods.len())
                .finish_non_exhaustive(),
            Self::Shutdown => write!(f, "Shutdown"),
        }
    }
}

fn actor_died() -> ModError {
    ModError::Persistence("store actor is no longer running".to_string())
}

/// A handle to the store actor that is Send + Sync and Clone.
#[derive(Clone)]
pub struct StoreHandle {
    sender: mpsc::Sender<StoreEvent>,
}

impl fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreHandle").finish_non_exhaustive()
    }
}

impl StoreHandle {
    /// Spawn a new store actor thread owning `file`
    pub fn spawn(file: CatalogFile) -> Self {
        let (sender, receiver) = mpsc::channel();
        thread::spawn(move || {
            run_store_event_loop(&file, &receiver);
        });
        Self { sender }
    }

    /// Helper to send a request and wait for the response
    async fn request<T, F>(&self, f: F) -> ModResult<T>
    where
        F: FnOnce(oneshot::Sender<ModResult<T>>) -> StoreEvent,
    {
        let (tx, rx) = oneshot::channel();
        self.sender.send(f(tx)).map_err(|_| actor_died())?;
        rx.await.map_err(|_| actor_died())?
    }

    /// The persisted catalog, or `None` when nothing was saved yet.
    pub async fn load(&self) -> ModResult<Option<Catalog>> {
        self.request(|resp| StoreEvent::Load { resp }).await
    }

    /// Persist `catalog`, replacing the previous snapshot.
    pub async fn save(&self, catalog: Catalog) -> ModResult<()> {
        self.request(|resp| StoreEvent::Save {
            catalog: Box::new(catalog),
            resp,
        })
        .await
    }

    /// Stop the actor. Later requests fail with a persistence error.
    pub fn shutdown(&self) {
        if self.sender.send(StoreEvent::Shutdown).is_err() {
            warn!("Store actor already stopped");
        }
    }
}

/// The event loop running in the background thread
fn run_store_event_loop(file: &CatalogFile, receiver: &mpsc::Receiver<StoreEvent>) {
    while let Ok(event) = receiver.recv() {
        match event {
            StoreEvent::Load { resp } => {
                let _ = resp.send(file.load());
            }
            StoreEvent::Save { catalog, resp } => {
                let _ = resp.send(file.save(&catalog));
            }
            StoreEvent::Shutdown => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modlayer_schema::{ModRecord, RepoKey};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_actor_round_trip() {
        let tmp = TempDir::new().unwrap();
        let store = StoreHandle::spawn(CatalogFile::new(tmp.path().join("catalog.json")));

        assert!(store.load().await.unwrap().is_none());

        let catalog = Catalog {
            last_check: None,
            mods: vec![ModRecord::remote(RepoKey::new("o", "m"))],
        };
        store.save(catalog.clone()).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(catalog));
    }

    #[tokio::test]
    async fn test_concurrent_saves_are_serialized() {
        let tmp = TempDir::new().unwrap();
        let store = StoreHandle::spawn(CatalogFile::new(tmp.path().join("catalog.json")));

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let catalog = Catalog {
                    last_check: Some(i),
                    mods: Vec::new(),
                };
                store.save(catalog).await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }

        // Whatever save landed last, the file is whole.
        let loaded = store.load().await.unwrap().unwrap();
        assert!(loaded.last_check.is_some());
    }

    #[tokio::test]
    async fn test_shutdown() {
        let tmp = TempDir::new().unwrap();
        let store = StoreHandle::spawn(CatalogFile::new(tmp.path().join("catalog.json")));
        store.shutdown();

        let err = store.load().await.unwrap_err();
        assert!(matches!(err, ModError::Persistence(_)));
    }
}
