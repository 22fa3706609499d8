/// Core error type for mie.
///
/// Adapter crates map their specific errors into this type so the job runner
/// can pick the right user-facing message for each phase.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("download failed: {0}")]
    Download(String),

    #[error("could not extract media url: {0}")]
    Extract(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("messaging error: {0}")]
    Messaging(String),
}

pub type Result<T> = std::result::Result<T, Error>;
