use std::{path::PathBuf, time::Duration};

use async_trait::async_trait;
use tokio::{fs::File, sync::watch};
use url::Url;

use crate::Result;

/// A file produced by the downloader, sitting in the temp directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadedVideo {
    /// File name as reported by the downloader (relative to the temp dir).
    pub filename: String,
    pub path: PathBuf,
    pub elapsed: Duration,
}

impl DownloadedVideo {
    /// Final path component, used for the object key.
    pub fn base_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.filename)
    }
}

/// Port for fetching a remote video to local disk.
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn download(&self, url: &Url) -> Result<DownloadedVideo>;
}

/// Bytes handed to the object store so far.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UploadProgress {
    pub sent: u64,
    pub total: u64,
}

impl UploadProgress {
    /// Whole percent, 0 while the size is unknown.
    pub fn percent(&self) -> u64 {
        if self.total == 0 {
            0
        } else {
            self.sent.min(self.total) * 100 / self.total
        }
    }
}

/// Write half of an upload progress channel. Reporting never blocks and
/// never fails; the job reads the latest value on its own schedule.
#[derive(Clone, Debug)]
pub struct ProgressReporter {
    tx: watch::Sender<UploadProgress>,
}

impl ProgressReporter {
    pub fn channel() -> (Self, watch::Receiver<UploadProgress>) {
        let (tx, rx) = watch::channel(UploadProgress::default());
        (Self { tx }, rx)
    }

    pub fn report(&self, sent: u64, total: u64) {
        self.tx.send_replace(UploadProgress { sent, total });
    }
}

/// Port for copying a local file into object storage.
#[async_trait]
pub trait Uploader: Send + Sync {
    /// Upload `file` under the configured prefix + `file_name`; returns the
    /// object key. Bytes sent are reported through `progress` as they go.
    async fn upload(
        &self,
        file: File,
        file_name: &str,
        progress: &ProgressReporter,
    ) -> Result<String>;
}
