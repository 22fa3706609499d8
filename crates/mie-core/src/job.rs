//! Per-URL job: one placeholder message driven through
//! `Created → Downloading → Uploading → Done`, or into `Failed` from either
//! of the two work phases.

use std::sync::Arc;

use chrono::Utc;
use tokio::{
    fs::File,
    time::{self, Instant, MissedTickBehavior},
};
use url::Url;

use crate::{
    config::Config,
    domain::{ChatId, MessageRef},
    media::{DownloadedVideo, Downloader, ProgressReporter, Uploader},
    messaging::{card::StatusCard, port::MessagingPort},
    Result,
};

/// Shared collaborators every job needs. Cheap to clone.
#[derive(Clone)]
pub struct JobDeps {
    pub cfg: Arc<Config>,
    pub messenger: Arc<dyn MessagingPort>,
    pub downloader: Arc<dyn Downloader>,
    pub uploader: Arc<dyn Uploader>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobPhase {
    Created,
    Downloading,
    Uploading,
    Done,
    Failed,
}

/// How a job ended. Returned from the spawned task so callers (and tests)
/// can observe it; the chat adapters drop it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JobOutcome {
    /// The placeholder could not be sent; nothing else was attempted.
    Aborted,
    DownloadFailed,
    UploadFailed,
    Done { key: String, public_url: String },
}

pub struct Job {
    deps: JobDeps,
    chat_id: ChatId,
    url: Url,
    phase: JobPhase,
}

impl Job {
    pub fn new(deps: JobDeps, chat_id: ChatId, url: Url) -> Self {
        Self {
            deps,
            chat_id,
            url,
            phase: JobPhase::Created,
        }
    }

    #[cfg(test)]
    pub(crate) fn phase(&self) -> JobPhase {
        self.phase
    }

    pub async fn run(mut self) -> JobOutcome {
        let color = self.deps.cfg.embed_color;

        // Sending first also proves we may post in this chat.
        let placeholder = match self
            .deps
            .messenger
            .send_card(self.chat_id, &StatusCard::downloading(color))
            .await
        {
            Ok(msg) => msg,
            Err(e) => {
                tracing::error!(url = %self.url, error = %e, "failed to send placeholder message");
                return JobOutcome::Aborted;
            }
        };

        self.advance(JobPhase::Downloading);
        let video = match self.deps.downloader.download(&self.url).await {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(url = %self.url, error = %e, "error downloading video");
                self.advance(JobPhase::Failed);
                self.edit(placeholder, &StatusCard::download_error(color))
                    .await;
                return JobOutcome::DownloadFailed;
            }
        };
        tracing::info!(
            url = %self.url,
            filename = %video.filename,
            elapsed_ms = video.elapsed.as_millis() as u64,
            "downloaded video"
        );

        self.advance(JobPhase::Uploading);
        self.edit(placeholder, &StatusCard::uploading(color, video.elapsed))
            .await;

        let upload_start = Instant::now();
        let key = match self.upload(placeholder, &video).await {
            Ok(k) => k,
            Err(e) => {
                tracing::error!(
                    url = %self.url,
                    path = %video.path.display(),
                    error = %e,
                    "error uploading file"
                );
                self.advance(JobPhase::Failed);
                self.edit(placeholder, &StatusCard::upload_error(color)).await;
                return JobOutcome::UploadFailed;
            }
        };
        let upload_elapsed = upload_start.elapsed();

        let public_url = self.deps.cfg.public_url(&key);
        tracing::info!(
            url = %self.url,
            key = %key,
            upload_ms = upload_elapsed.as_millis() as u64,
            "uploaded file"
        );

        self.advance(JobPhase::Done);
        self.edit(
            placeholder,
            &StatusCard::done(
                color,
                &public_url,
                video.elapsed,
                upload_elapsed,
                Utc::now(),
            ),
        )
        .await;

        JobOutcome::Done { key, public_url }
    }

    /// Run the upload, refreshing the placeholder with the latest progress
    /// every `progress_interval` until it finishes.
    async fn upload(&self, placeholder: MessageRef, video: &DownloadedVideo) -> Result<String> {
        let file = File::open(&video.path).await?;
        let (reporter, mut progress) = ProgressReporter::channel();

        let start = Instant::now();
        let period = self.deps.cfg.progress_interval;
        let mut ticker = time::interval_at(start + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let upload = self
            .deps
            .uploader
            .upload(file, video.base_name(), &reporter);
        tokio::pin!(upload);

        loop {
            tokio::select! {
                res = &mut upload => return res,
                _ = ticker.tick() => {
                    if !progress.has_changed().unwrap_or(false) {
                        continue;
                    }
                    let snapshot = *progress.borrow_and_update();
                    let card = StatusCard::upload_progress(
                        self.deps.cfg.embed_color,
                        video.elapsed,
                        snapshot,
                        start.elapsed(),
                    );
                    self.edit(placeholder, &card).await;
                }
            }
        }
    }

    /// Edit failures are logged only; the job outcome is decided by the work.
    async fn edit(&self, msg: MessageRef, card: &StatusCard) {
        if let Err(e) = self.deps.messenger.edit_card(msg, card).await {
            tracing::warn!(
                url = %self.url,
                phase = ?self.phase,
                error = %e,
                "failed to update placeholder message"
            );
        }
    }

    fn advance(&mut self, next: JobPhase) {
        tracing::debug!(url = %self.url, from = ?self.phase, to = ?next, "job transition");
        self.phase = next;
    }
}
