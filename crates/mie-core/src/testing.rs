//! In-memory fakes for the ports, shared by the unit tests of this crate.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use tokio::{fs::File, io::AsyncReadExt};
use url::Url;

use crate::{
    config::{ChatPlatform, Config, StorageConfig, DEFAULT_EMBED_COLOR, DEFAULT_PART_SIZE_MB},
    domain::{ChatId, MessageId, MessageRef},
    errors::Error,
    job::JobDeps,
    media::{DownloadedVideo, Downloader, ProgressReporter, Uploader},
    messaging::{card::StatusCard, port::MessagingPort},
    Result,
};

pub fn scratch_dir(prefix: &str) -> PathBuf {
    let ts = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_nanos();
    let pid = std::process::id();
    let dir = PathBuf::from(format!("/tmp/mie-{prefix}-{pid}-{ts}"));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

pub fn test_config(temp_dir: &Path) -> Config {
    Config {
        debug: false,
        port: 8000,
        platform: ChatPlatform::Discord,
        bot_token: "x".to_string(),
        storage: StorageConfig {
            key_id: "id".to_string(),
            application_key: "key".to_string(),
            bucket_name: "bucket".to_string(),
            path_prefix: "videos".to_string(),
            endpoint: "http://localhost:9000".to_string(),
            region: "us-east-1".to_string(),
            part_size: DEFAULT_PART_SIZE_MB * 1024 * 1024,
        },
        host_url: "https://cdn.example.com/".to_string(),
        ytdl_path: "yt-dlp".into(),
        instagram_proxy_url: None,
        temp_dir: temp_dir.to_path_buf(),
        embed_color: DEFAULT_EMBED_COLOR,
        // Long enough that only the slow-upload tests ever see a tick.
        progress_interval: Duration::from_secs(60),
    }
}

pub fn test_deps(
    temp_dir: &Path,
    messenger: Arc<FakeMessenger>,
    downloader: Arc<FakeDownloader>,
    uploader: Arc<FakeUploader>,
) -> JobDeps {
    JobDeps {
        cfg: Arc::new(test_config(temp_dir)),
        messenger,
        downloader,
        uploader,
    }
}

#[derive(Default)]
pub struct FakeMessenger {
    next_id: Mutex<i64>,
    sends: Mutex<Vec<(MessageRef, StatusCard)>>,
    edits: Mutex<Vec<(MessageRef, StatusCard)>>,
    fail_sends: bool,
    fail_edits: bool,
}

impl FakeMessenger {
    pub fn new() -> Self {
        Self {
            next_id: Mutex::new(1),
            ..Default::default()
        }
    }

    pub fn failing_sends() -> Self {
        Self {
            fail_sends: true,
            ..Self::new()
        }
    }

    pub fn failing_edits() -> Self {
        Self {
            fail_edits: true,
            ..Self::new()
        }
    }

    pub fn sends(&self) -> Vec<(MessageRef, StatusCard)> {
        self.sends.lock().unwrap().clone()
    }

    pub fn edits(&self) -> Vec<(MessageRef, StatusCard)> {
        self.edits.lock().unwrap().clone()
    }

    /// Edits applied to one placeholder, in order.
    pub fn edits_for(&self, msg: MessageRef) -> Vec<StatusCard> {
        self.edits()
            .into_iter()
            .filter(|(m, _)| *m == msg)
            .map(|(_, c)| c)
            .collect()
    }
}

#[async_trait]
impl MessagingPort for FakeMessenger {
    async fn send_card(&self, chat_id: ChatId, card: &StatusCard) -> Result<MessageRef> {
        if self.fail_sends {
            return Err(Error::Messaging("missing permissions".to_string()));
        }
        let msg = {
            let mut guard = self.next_id.lock().unwrap();
            let id = *guard;
            *guard += 1;
            MessageRef {
                chat_id,
                message_id: MessageId(id),
            }
        };
        self.sends.lock().unwrap().push((msg, card.clone()));
        Ok(msg)
    }

    async fn edit_card(&self, msg: MessageRef, card: &StatusCard) -> Result<()> {
        if self.fail_edits {
            return Err(Error::Messaging("message deleted".to_string()));
        }
        self.edits.lock().unwrap().push((msg, card.clone()));
        Ok(())
    }
}

enum DownloadMode {
    WriteFiles,
    NoFiles,
    Fail,
}

pub struct FakeDownloader {
    dir: PathBuf,
    mode: DownloadMode,
    fixed_name: Option<String>,
    fail_hosts: Vec<String>,
    calls: Mutex<usize>,
    written: Mutex<Vec<PathBuf>>,
}

impl FakeDownloader {
    fn with_mode(dir: &Path, mode: DownloadMode) -> Self {
        Self {
            dir: dir.to_path_buf(),
            mode,
            fixed_name: None,
            fail_hosts: Vec::new(),
            calls: Mutex::new(0),
            written: Mutex::new(Vec::new()),
        }
    }

    /// Writes a small file per call into `dir`.
    pub fn writing_files(dir: &Path) -> Self {
        Self::with_mode(dir, DownloadMode::WriteFiles)
    }

    /// Reports success but never creates the file.
    pub fn without_files(dir: &Path) -> Self {
        Self::with_mode(dir, DownloadMode::NoFiles)
    }

    pub fn failing() -> Self {
        Self::with_mode(Path::new("/nonexistent"), DownloadMode::Fail)
    }

    /// Every download produces the same file name.
    pub fn with_fixed_name(mut self, name: &str) -> Self {
        self.fixed_name = Some(name.to_string());
        self
    }

    pub fn failing_for(mut self, host: &str) -> Self {
        self.fail_hosts.push(host.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }

    pub fn written_paths(&self) -> Vec<PathBuf> {
        self.written.lock().unwrap().clone()
    }
}

#[async_trait]
impl Downloader for FakeDownloader {
    async fn download(&self, url: &Url) -> Result<DownloadedVideo> {
        let n = {
            let mut guard = self.calls.lock().unwrap();
            *guard += 1;
            *guard
        };

        let host = url.host_str().unwrap_or_default().to_string();
        if matches!(self.mode, DownloadMode::Fail) || self.fail_hosts.contains(&host) {
            return Err(Error::Download("yt-dlp exited with status 1".to_string()));
        }

        let filename = self
            .fixed_name
            .clone()
            .unwrap_or_else(|| format!("20240101-{n}-{host}.mp4"));
        let path = self.dir.join(&filename);
        if matches!(self.mode, DownloadMode::WriteFiles) {
            tokio::fs::write(&path, format!("video from {url}")).await?;
            self.written.lock().unwrap().push(path.clone());
        }

        Ok(DownloadedVideo {
            filename,
            path,
            elapsed: Duration::from_millis(12),
        })
    }
}

/// Object store stand-in: `put` semantics, last write wins.
pub struct FakeUploader {
    prefix: String,
    fail: bool,
    steps: Option<(u64, Duration)>,
    objects: Mutex<HashMap<String, Vec<u8>>>,
    names: Mutex<Vec<String>>,
}

impl FakeUploader {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            fail: false,
            steps: None,
            objects: Mutex::new(HashMap::new()),
            names: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new("")
        }
    }

    /// Report progress in `steps` equal slices, pausing `delay` before each.
    pub fn in_steps(mut self, steps: u64, delay: Duration) -> Self {
        self.steps = Some((steps.max(1), delay));
        self
    }

    pub fn uploaded_names(&self) -> Vec<String> {
        self.names.lock().unwrap().clone()
    }

    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }
}

#[async_trait]
impl Uploader for FakeUploader {
    async fn upload(
        &self,
        mut file: File,
        file_name: &str,
        progress: &ProgressReporter,
    ) -> Result<String> {
        if self.fail {
            return Err(Error::Storage("bucket not found".to_string()));
        }
        let mut body = Vec::new();
        file.read_to_end(&mut body).await?;

        let total = body.len() as u64;
        match self.steps {
            Some((steps, delay)) => {
                for i in 1..=steps {
                    tokio::time::sleep(delay).await;
                    progress.report(total * i / steps, total);
                }
            }
            None => progress.report(total, total),
        }

        let key = if self.prefix.is_empty() {
            file_name.to_string()
        } else {
            format!("{}/{}", self.prefix, file_name)
        };
        self.objects.lock().unwrap().insert(key.clone(), body);
        self.names.lock().unwrap().push(file_name.to_string());
        Ok(key)
    }
}
