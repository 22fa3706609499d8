use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::media::UploadProgress;

pub const DOWNLOADING_TEXT: &str = "Downloading...";
pub const UPLOADING_TEXT: &str = "Uploading to CDN...";
pub const DOWNLOAD_ERROR_TEXT: &str = "Error downloading video";
pub const UPLOAD_ERROR_TEXT: &str = "Error uploading file";
pub const DONE_PREFIX: &str = "Done! Here is the file: ";

/// One `name: value` line of a status card (an inline embed field on Discord).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusField {
    pub name: String,
    pub value: String,
}

/// Platform-neutral content of a placeholder message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusCard {
    pub text: String,
    pub fields: Vec<StatusField>,
    pub color: u32,
    pub timestamp: Option<DateTime<Utc>>,
}

impl StatusCard {
    pub fn new(text: impl Into<String>, color: u32) -> Self {
        Self {
            text: text.into(),
            fields: Vec::new(),
            color,
            timestamp: None,
        }
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(StatusField {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn timestamp(mut self, at: DateTime<Utc>) -> Self {
        self.timestamp = Some(at);
        self
    }

    pub fn downloading(color: u32) -> Self {
        Self::new(DOWNLOADING_TEXT, color)
    }

    pub fn uploading(color: u32, download: Duration) -> Self {
        Self::new(UPLOADING_TEXT, color).field("Download", format_millis(download))
    }

    /// Periodic refresh while the upload is running.
    pub fn upload_progress(
        color: u32,
        download: Duration,
        progress: UploadProgress,
        elapsed: Duration,
    ) -> Self {
        let secs = elapsed.as_secs_f64();
        let speed = if secs > 0.0 {
            (progress.sent as f64 / secs) as u64
        } else {
            0
        };
        Self::uploading(color, download)
            .field(
                "Progress",
                format!("{}/{}", format_bytes(progress.sent), format_bytes(progress.total)),
            )
            .field("Percentage", format!("{}%", progress.percent()))
            .field("Speed", format!("{}/s", format_bytes(speed)))
    }

    pub fn done(
        color: u32,
        public_url: &str,
        download: Duration,
        upload: Duration,
        at: DateTime<Utc>,
    ) -> Self {
        Self::new(format!("{DONE_PREFIX}{public_url}"), color)
            .field("Download", format_millis(download))
            .field("Upload", format_millis(upload))
            .timestamp(at)
    }

    pub fn download_error(color: u32) -> Self {
        Self::new(DOWNLOAD_ERROR_TEXT, color)
    }

    pub fn upload_error(color: u32) -> Self {
        Self::new(UPLOAD_ERROR_TEXT, color)
    }
}

pub fn format_millis(d: Duration) -> String {
    format!("{}ms", d.as_millis())
}

/// Human-readable size with decimal units (`1.5 MB`).
pub fn format_bytes(n: u64) -> String {
    const UNITS: [&str; 5] = ["kB", "MB", "GB", "TB", "PB"];
    if n < 1000 {
        return format!("{n} B");
    }
    let mut value = n as f64 / 1000.0;
    let mut unit = 0;
    while value >= 999.95 && unit + 1 < UNITS.len() {
        value /= 1000.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}
