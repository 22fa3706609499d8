use tracing_subscriber::{fmt, EnvFilter};

use crate::{errors::Error, Result};

/// Initialize logging/tracing for the bot.
///
/// Debug mode lowers the default level for our crates to `debug`; otherwise
/// `info`. Can be overridden with `RUST_LOG`.
pub fn init(service_name: &str, debug: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(service_name, debug)));

    fmt()
        .with_env_filter(filter)
        .with_target(debug)
        .with_ansi(debug)
        .try_init()
        .map_err(|e| Error::Config(format!("failed to install tracing subscriber: {e}")))
}

fn default_directives(service_name: &str, debug: bool) -> String {
    let level = if debug { "debug" } else { "info" };
    let crates = ["mie_core", "mie_ytdlp", "mie_s3", "mie_telegram", "mie_discord"]
        .iter()
        .map(|c| format!("{c}={level}"))
        .collect::<Vec<_>>()
        .join(",");
    format!("warn,{service_name}={level},{crates}")
}
