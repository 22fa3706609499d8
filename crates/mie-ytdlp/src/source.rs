use async_trait::async_trait;
use url::Url;

use mie_core::{
    config::Config,
    media::{DownloadedVideo, Downloader},
    Result,
};

use crate::{instagram::InstagramResolver, ytdlp::YtDlp};

/// Where a link points, as far as download routing is concerned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Source {
    Generic,
    Instagram,
}

impl Source {
    pub fn classify(url: &Url) -> Self {
        let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
        if host == "instagram.com" || host.ends_with(".instagram.com") {
            Source::Instagram
        } else {
            Source::Generic
        }
    }
}

/// `Downloader` backed by yt-dlp, with Instagram links resolved to their
/// direct media URL first.
#[derive(Clone, Debug)]
pub struct MediaDownloader {
    ytdlp: YtDlp,
    instagram: InstagramResolver,
}

impl MediaDownloader {
    pub fn new(cfg: &Config) -> Result<Self> {
        Ok(Self {
            ytdlp: YtDlp::new(&cfg.ytdl_path, &cfg.temp_dir),
            instagram: InstagramResolver::new(cfg.instagram_proxy_url.clone())?,
        })
    }

    pub fn from_parts(ytdlp: YtDlp, instagram: InstagramResolver) -> Self {
        Self { ytdlp, instagram }
    }
}

#[async_trait]
impl Downloader for MediaDownloader {
    async fn download(&self, url: &Url) -> Result<DownloadedVideo> {
        match Source::classify(url) {
            Source::Generic => self.ytdlp.download(url.as_str()).await,
            Source::Instagram => {
                let media_url = self.instagram.resolve(url).await?;
                self.ytdlp.download(&media_url).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(s: &str) -> Source {
        Source::classify(&Url::parse(s).unwrap())
    }

    #[test]
    fn instagram_hosts_are_recognised() {
        assert_eq!(classify("https://www.instagram.com/reel/Cabc/"), Source::Instagram);
        assert_eq!(classify("https://instagram.com/p/xyz"), Source::Instagram);
        assert_eq!(classify("https://WWW.Instagram.com/p/xyz"), Source::Instagram);
    }

    #[test]
    fn lookalike_hosts_are_generic() {
        assert_eq!(classify("https://notinstagram.com/p/xyz"), Source::Generic);
        assert_eq!(classify("https://instagram.com.evil.example/p"), Source::Generic);
        assert_eq!(classify("https://www.youtube.com/watch?v=1"), Source::Generic);
        assert_eq!(
            classify("https://example.com/?u=https://instagram.com/p/1"),
            Source::Generic
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn generic_links_go_straight_to_ytdlp() {
        use std::os::unix::fs::PermissionsExt;

        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let dir = std::path::PathBuf::from(format!("/tmp/mie-source-{}-{ts}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let script = dir.join("yt-dlp.sh");
        std::fs::write(
            &script,
            "#!/bin/sh\ntouch 20240101-v.mp4\necho '{\"_filename\":\"20240101-v.mp4\"}'\n",
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let downloader = MediaDownloader::from_parts(
            YtDlp::new(&script, &dir),
            InstagramResolver::new(None).unwrap(),
        );
        let video = downloader
            .download(&Url::parse("https://example.com/v").unwrap())
            .await
            .unwrap();
        assert_eq!(video.filename, "20240101-v.mp4");
        assert!(video.path.exists());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
