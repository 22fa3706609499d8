use std::{path::PathBuf, process::Stdio};

use serde::Deserialize;
use tokio::{process::Command, time::Instant};

use mie_core::{errors::Error, media::DownloadedVideo, Result};

/// Output template handed to yt-dlp; keeps names stable per source video.
pub const OUTPUT_TEMPLATE: &str = "%(upload_date)s-%(id)s.%(ext)s";

const STDERR_TAIL_MAX_CHARS: usize = 2000;

/// A concrete yt-dlp invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CliInvocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: PathBuf,
}

/// Runs the external yt-dlp executable inside the temp directory.
#[derive(Clone, Debug)]
pub struct YtDlp {
    program: PathBuf,
    temp_dir: PathBuf,
}

#[derive(Debug, Deserialize)]
struct InfoJson {
    #[serde(rename = "_filename")]
    filename: Option<String>,
}

impl YtDlp {
    pub fn new(program: impl Into<PathBuf>, temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            temp_dir: temp_dir.into(),
        }
    }

    /// Build the yt-dlp command line for `url`.
    pub fn build_invocation(&self, url: &str) -> CliInvocation {
        let args = vec![
            // Print the info JSON, but still download.
            "-j".to_string(),
            "--no-simulate".to_string(),
            "-o".to_string(),
            OUTPUT_TEMPLATE.to_string(),
            "--concurrent-fragments".to_string(),
            "10".to_string(),
            // URL as the final positional argument.
            url.to_string(),
        ];

        CliInvocation {
            program: self.program.clone(),
            args,
            cwd: self.temp_dir.clone(),
        }
    }

    pub async fn download(&self, url: &str) -> Result<DownloadedVideo> {
        tracing::info!(url, "downloading video");
        let started = Instant::now();

        let inv = self.build_invocation(url);
        let output = Command::new(&inv.program)
            .args(&inv.args)
            .current_dir(&inv.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                Error::Download(format!(
                    "failed to start {}: {e}",
                    inv.program.display()
                ))
            })?;

        if !output.status.success() {
            let stderr = tail(&String::from_utf8_lossy(&output.stderr), STDERR_TAIL_MAX_CHARS);
            tracing::error!(url, status = %output.status, stderr = %stderr, "yt-dlp failed");
            let mut msg = format!("yt-dlp exited with status {}", output.status);
            if !stderr.trim().is_empty() {
                msg.push_str("\nstderr (tail):\n");
                msg.push_str(&stderr);
            }
            return Err(Error::Download(msg));
        }

        let filename = parse_filename(&String::from_utf8_lossy(&output.stdout))?;
        let video = DownloadedVideo {
            path: self.temp_dir.join(&filename),
            filename,
            elapsed: started.elapsed(),
        };
        tracing::debug!(url, path = %video.path.display(), "yt-dlp reported output file");
        Ok(video)
    }
}

/// Pull `_filename` out of yt-dlp's `-j` output.
///
/// yt-dlp prints one JSON object per downloaded entry; the last one wins.
pub fn parse_filename(stdout: &str) -> Result<String> {
    let line = stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .last()
        .ok_or_else(|| Error::Download("yt-dlp printed no metadata".to_string()))?;

    let info: InfoJson = serde_json::from_str(line)
        .map_err(|e| Error::Download(format!("malformed yt-dlp json: {e}")))?;

    info.filename
        .filter(|f| !f.trim().is_empty())
        .ok_or_else(|| Error::Download("yt-dlp metadata has no `_filename`".to_string()))
}

fn tail(s: &str, max_chars: usize) -> String {
    let count = s.chars().count();
    if count <= max_chars {
        return s.to_string();
    }
    let mut out = "...".to_string();
    out.extend(s.chars().skip(count - max_chars));
    out
}
