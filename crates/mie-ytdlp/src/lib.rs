//! Download adapter: runs the yt-dlp executable, with an Instagram
//! page-scraping step in front of it.

mod instagram;
mod source;
mod ytdlp;

pub use instagram::{extract_content_url, InstagramResolver};
pub use source::{MediaDownloader, Source};
pub use ytdlp::{parse_filename, CliInvocation, YtDlp, OUTPUT_TEMPLATE};
