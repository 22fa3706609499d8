//! Instagram resolver: yt-dlp needs a login for most Instagram posts, so the
//! direct media URL is scraped from the public post page instead.

use std::{sync::OnceLock, time::Duration};

use regex::Regex;
use url::{form_urlencoded, Url};

use mie_core::{errors::Error, Result};

const USER_AGENT: &str = "Mozilla/5.0 (compatible; mie/0.1)";

fn content_url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#""contentUrl"\s*:\s*"((?:[^"\\]|\\.)*)""#).expect("valid regex")
    })
}

#[derive(Clone, Debug)]
pub struct InstagramResolver {
    http: reqwest::Client,
    proxy_url: Option<String>,
}

impl InstagramResolver {
    pub fn new(proxy_url: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::Extract(format!("http client build failed: {e}")))?;
        Ok(Self { http, proxy_url })
    }

    /// URL actually fetched for `post` (through the proxy when configured).
    pub fn page_url(&self, post: &Url) -> String {
        match &self.proxy_url {
            Some(proxy) => {
                let encoded: String =
                    form_urlencoded::byte_serialize(post.as_str().as_bytes()).collect();
                format!("{proxy}{encoded}")
            }
            None => post.to_string(),
        }
    }

    /// Fetch the post page and return the direct media URL embedded in it.
    pub async fn resolve(&self, post: &Url) -> Result<String> {
        let page_url = self.page_url(post);
        tracing::info!(url = %post, page_url = %page_url, "fetching instagram page");

        let resp = self
            .http
            .get(&page_url)
            .send()
            .await
            .map_err(|e| Error::Extract(format!("instagram request error: {e}")))?;

        if !resp.status().is_success() {
            return Err(Error::Extract(format!(
                "instagram page returned {}",
                resp.status()
            )));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| Error::Extract(format!("instagram body error: {e}")))?;

        let media_url = extract_content_url(&body)?;
        tracing::debug!(url = %post, media_url = %media_url, "resolved instagram media url");
        Ok(media_url)
    }
}

/// Find the first `"contentUrl":"..."` value in the page and decode its JSON escapes.
pub fn extract_content_url(body: &str) -> Result<String> {
    let raw = content_url_re()
        .captures(body)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| Error::Extract("no contentUrl in page".to_string()))?;

    let decoded: String = serde_json::from_str(&format!("\"{raw}\""))
        .map_err(|e| Error::Extract(format!("contentUrl is not a valid json string: {e}")))?;

    if decoded.trim().is_empty() {
        return Err(Error::Extract("contentUrl is empty".to_string()));
    }
    Ok(decoded)
}
