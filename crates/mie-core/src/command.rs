//! `/download <url> [content]`: re-host one link on request and answer with
//! a follow-up message carrying the public URL.

use url::Url;

use crate::{domain::ChatId, job::JobOutcome, messaging::types::Author};

pub const DOWNLOAD_COMMAND: &str = "download";
pub const DOWNLOAD_DESCRIPTION: &str = "Download a video and re-host it";
pub const NOT_A_LINK_TEXT: &str = "That is not a link. Usage: /download <url> [message]";

#[derive(Clone, Debug)]
pub struct DownloadRequest {
    pub chat_id: ChatId,
    pub author: Author,
    /// Raw argument as typed; validated by the handler.
    pub url: String,
    /// Text posted in front of the public URL in the follow-up.
    pub content: Option<String>,
}

impl DownloadRequest {
    /// Split free-form command arguments: the first token is the link and the
    /// remainder, if any, is the follow-up content.
    pub fn from_args(chat_id: ChatId, author: Author, args: &str) -> Self {
        let mut parts = args.trim().splitn(2, char::is_whitespace);
        let url = parts.next().unwrap_or("").trim().to_string();
        let content = parts
            .next()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        Self {
            chat_id,
            author,
            url,
            content,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DownloadReply {
    /// The argument was not an http(s) link; nothing was posted.
    NotALink,
    Finished {
        outcome: JobOutcome,
        /// Present only when the upload succeeded.
        follow_up: Option<String>,
    },
}

/// Accept only absolute http(s) URLs with a host.
pub fn parse_link(raw: &str) -> Option<Url> {
    let url = Url::parse(raw.trim()).ok()?;
    let web = matches!(url.scheme(), "http" | "https");
    let has_host = url.host_str().is_some_and(|h| !h.is_empty());
    (web && has_host).then_some(url)
}

pub fn follow_up_text(content: Option<&str>, public_url: &str) -> String {
    match content.map(str::trim).filter(|c| !c.is_empty()) {
        Some(c) => format!("{c} {public_url}"),
        None => public_url.to_string(),
    }
}
