use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::{
    command::{follow_up_text, parse_link, DownloadReply, DownloadRequest},
    job::{Job, JobDeps, JobOutcome},
    links::extract_links,
    messaging::{port::MessagingPort, types::IncomingMessage},
};

/// Inbound message entry point shared by every chat adapter.
///
/// Each detected link gets its own detached task; tasks share nothing but the
/// ports and the read-only config, and there is no cap on how many run.
#[derive(Clone)]
pub struct MessageHandler {
    deps: JobDeps,
}

impl MessageHandler {
    pub fn new(deps: JobDeps) -> Self {
        Self { deps }
    }

    /// Spawn one job per link in `msg`. Must be called from within a tokio runtime.
    ///
    /// The handles are only useful to callers that want to observe outcomes;
    /// dropping them leaves the jobs running.
    pub fn dispatch(&self, msg: IncomingMessage) -> Vec<JoinHandle<JobOutcome>> {
        if msg.author.is_bot {
            tracing::trace!(chat_id = msg.chat_id.0, "ignoring bot message");
            return Vec::new();
        }

        // Our own uploads are links too; only re-process them when debugging.
        let cfg = &self.deps.cfg;
        let ignore_prefix = (!cfg.debug).then_some(cfg.host_url.as_str());
        let links = extract_links(&msg.text, ignore_prefix);
        if links.is_empty() {
            return Vec::new();
        }

        tracing::info!(
            chat_id = msg.chat_id.0,
            user_id = msg.author.id.0,
            username = msg.author.username.as_deref().unwrap_or("unknown"),
            links = links.len(),
            "processing message links"
        );

        links
            .into_iter()
            .map(|url| tokio::spawn(Job::new(self.deps.clone(), msg.chat_id, url).run()))
            .collect()
    }

    /// Run `/download` to completion, posting the status card through the
    /// handler's own messenger.
    pub async fn download(&self, req: DownloadRequest) -> DownloadReply {
        let messenger = self.deps.messenger.clone();
        self.download_via(req, messenger).await
    }

    /// Like [`download`](Self::download), but the status card goes through
    /// `messenger` (a Discord interaction response, for instance).
    pub async fn download_via(
        &self,
        req: DownloadRequest,
        messenger: Arc<dyn MessagingPort>,
    ) -> DownloadReply {
        let Some(url) = parse_link(&req.url) else {
            tracing::debug!(
                chat_id = req.chat_id.0,
                arg = %req.url,
                "download command without a link"
            );
            return DownloadReply::NotALink;
        };

        tracing::info!(
            chat_id = req.chat_id.0,
            user_id = req.author.id.0,
            username = req.author.username.as_deref().unwrap_or("unknown"),
            url = %url,
            "processing download command"
        );

        let deps = JobDeps {
            messenger,
            ..self.deps.clone()
        };
        let outcome = Job::new(deps, req.chat_id, url).run().await;
        let follow_up = match &outcome {
            JobOutcome::Done { public_url, .. } => {
                Some(follow_up_text(req.content.as_deref(), public_url))
            }
            _ => None,
        };
        DownloadReply::Finished { outcome, follow_up }
    }
}
