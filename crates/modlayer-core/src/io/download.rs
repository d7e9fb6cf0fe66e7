//! Streaming downloads with live progress counters.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{ModError, ModResult};

/// Byte counters of one transfer, readable while it runs.
///
/// Both counters stay at 0 until the transport reports a size; a transfer
/// with unknown length keeps `total` at 0.
#[derive(Debug, Default)]
pub struct Progress {
    received: AtomicU64,
    total: AtomicU64,
}

impl Progress {
    /// Record the latest counters. A `total` of 0 means unknown.
    pub fn update(&self, received: u64, total: u64) {
        self.received.store(received, Ordering::Relaxed);
        self.total.store(total, Ordering::Relaxed);
    }

    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    /// Received share of the total, or 0 while either is unknown.
    #[allow(clippy::cast_precision_loss)]
    pub fn percentage(&self) -> f64 {
        let received = self.received();
        let total = self.total();
        if received == 0 || total == 0 {
            0.0
        } else {
            received as f64 / total as f64 * 100.0
        }
    }
}

/// Moves a remote asset to a local path.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Download `url` to `dest`, updating `progress` as bytes arrive.
    ///
    /// On failure no partial file is left at `dest`. Returns the number of
    /// bytes written.
    async fn download(&self, url: &str, dest: &Path, progress: &Progress) -> ModResult<u64>;
}

/// [`Transport`] over HTTP(S).
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn stream_to(&self, url: &str, dest: &Path, progress: &Progress) -> ModResult<u64> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, crate::USER_AGENT)
            .send()
            .await?
            .error_for_status()?;

        let total = response.content_length().unwrap_or(0);
        progress.update(0, total);

        let mut file = File::create(dest).await.map_err(|e| ModError::io(dest, e))?;
        let mut stream = response.bytes_stream();
        let mut downloaded: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk)
                .await
                .map_err(|e| ModError::io(dest, e))?;
            downloaded += chunk.len() as u64;
            progress.update(downloaded, total.max(downloaded));
        }

        file.flush().await.map_err(|e| ModError::io(dest, e))?;
        Ok(downloaded)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn download(&self, url: &str, dest: &Path, progress: &Progress) -> ModResult<u64> {
        debug!("Downloading {url} -> {}", dest.display());
        match self.stream_to(url, dest, progress).await {
            Ok(bytes) => Ok(bytes),
            Err(e) => {
                tokio::fs::remove_file(dest).await.ok();
                Err(ModError::Transfer {
                    url: url.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use tempfile::TempDir;

    #[test]
    fn test_progress_percentage() {
        let progress = Progress::default();
        assert!((progress.percentage() - 0.0).abs() < f64::EPSILON);
        progress.update(25, 100);
        assert!((progress.percentage() - 25.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_http_download() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/Mod.dll")
            .with_status(200)
            .with_body(vec![7u8; 300])
            .create_async()
            .await;

        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("Mod.dll");
        let progress = Progress::default();
        let transport = HttpTransport::new(Client::new());

        let bytes = transport
            .download(&format!("{}/Mod.dll", server.url()), &dest, &progress)
            .await
            .unwrap();

        assert_eq!(bytes, 300);
        assert_eq!(progress.received(), 300);
        assert_eq!(progress.total(), 300);
        assert_eq!(std::fs::read(&dest).unwrap().len(), 300);
    }

    #[tokio::test]
    async fn test_http_failure_leaves_no_file() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/Mod.dll")
            .with_status(500)
            .create_async()
            .await;

        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("Mod.dll");
        let transport = HttpTransport::new(Client::new());

        let err = transport
            .download(&format!("{}/Mod.dll", server.url()), &dest, &Progress::default())
            .await
            .unwrap_err();

        assert!(matches!(err, ModError::Transfer { .. }));
        assert!(!dest.exists());
    }
}
