//! Staggered image downloads.
//!
//! [`DownloadScheduler::download_all`] turns a product's generated images
//! into a planned batch (see [`prodgen_core::download::plan_downloads`]) and
//! runs each download on its own task after its offset. Batches are not
//! cancellable: starting a second batch before the first finishes simply
//! interleaves both.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use prodgen_core::download::{plan_downloads, ScheduledDownload, DOWNLOAD_SPACING};
use prodgen_core::product::Image;
use prodgen_core::types::DbId;
use tokio::task::JoinHandle;

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("Download request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Download of {url} failed with status {status}")]
    Status { url: String, status: u16 },

    #[error("Failed to write download: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image {0} is not part of this product")]
    UnknownImage(DbId),

    #[error("Download task aborted: {0}")]
    Task(String),
}

/// Sink that fetches one resource and stores it under a file name.
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn download(&self, url: &str, filename: &str) -> Result<(), DownloadError>;
}

/// Saves downloads into a local directory.
#[derive(Debug, Clone)]
pub struct FileDownloader {
    client: reqwest::Client,
    dir: PathBuf,
}

impl FileDownloader {
    pub fn new(client: reqwest::Client, dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            dir: dir.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Target path for `filename`. Path separators are flattened so a
    /// backend-supplied kind cannot escape the download directory.
    pub fn target_path(&self, filename: &str) -> PathBuf {
        let safe: String = filename
            .chars()
            .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
            .collect();
        let safe = if safe.is_empty() || safe == "." || safe == ".." {
            "download".to_string()
        } else {
            safe
        };
        self.dir.join(safe)
    }
}

#[async_trait]
impl Downloader for FileDownloader {
    async fn download(&self, url: &str, filename: &str) -> Result<(), DownloadError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let bytes = response.bytes().await?;

        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.target_path(filename);
        tokio::fs::write(&path, &bytes).await?;

        tracing::info!(url, path = %path.display(), bytes = bytes.len(), "Image downloaded");
        Ok(())
    }
}

/// Handles for one staged batch. Dropping it detaches the downloads; they
/// still run.
#[derive(Debug)]
pub struct DownloadBatch {
    handles: Vec<(String, JoinHandle<Result<(), DownloadError>>)>,
}

impl DownloadBatch {
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// File names in scheduled order.
    pub fn filenames(&self) -> impl Iterator<Item = &str> {
        self.handles.iter().map(|(name, _)| name.as_str())
    }

    /// Wait for every download in the batch, returning per-file results in
    /// scheduled order.
    pub async fn join(self) -> Vec<(String, Result<(), DownloadError>)> {
        let (names, handles): (Vec<_>, Vec<_>) = self.handles.into_iter().unzip();
        let results = join_all(handles).await;
        names
            .into_iter()
            .zip(results)
            .map(|(name, joined)| {
                let result = joined.unwrap_or_else(|e| Err(DownloadError::Task(e.to_string())));
                (name, result)
            })
            .collect()
    }
}

/// Triggers single downloads immediately and spaces out batches.
#[derive(Clone)]
pub struct DownloadScheduler {
    downloader: Arc<dyn Downloader>,
    spacing: Duration,
}

impl DownloadScheduler {
    pub fn new(downloader: Arc<dyn Downloader>) -> Self {
        Self {
            downloader,
            spacing: DOWNLOAD_SPACING,
        }
    }

    pub fn with_spacing(mut self, spacing: Duration) -> Self {
        self.spacing = spacing;
        self
    }

    pub fn spacing(&self) -> Duration {
        self.spacing
    }

    /// Download one resource right away.
    pub async fn download_one(&self, url: &str, filename: &str) -> Result<(), DownloadError> {
        self.downloader.download(url, filename).await
    }

    /// Download every non-original image, the n-th one `n * spacing` after
    /// the call.
    pub fn download_all<F>(&self, images: &[Image], namer: F) -> DownloadBatch
    where
        F: Fn(&Image) -> String,
    {
        self.schedule(plan_downloads(images, namer, self.spacing))
    }

    /// Run an explicit `(url, filename, delay)` sequence.
    pub fn schedule(&self, plan: Vec<ScheduledDownload>) -> DownloadBatch {
        tracing::debug!(count = plan.len(), "Scheduling download batch");
        let start = tokio::time::Instant::now();
        let handles = plan
            .into_iter()
            .map(|item| {
                let downloader = Arc::clone(&self.downloader);
                let filename = item.filename.clone();
                let handle = tokio::spawn(async move {
                    tokio::time::sleep_until(start + item.delay).await;
                    let result = downloader.download(&item.url, &item.filename).await;
                    if let Err(e) = &result {
                        tracing::warn!(url = %item.url, filename = %item.filename, error = %e, "Download failed");
                    }
                    result
                });
                (filename, handle)
            })
            .collect();
        DownloadBatch { handles }
    }
}
