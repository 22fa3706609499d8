use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use mie_core::{
    config::{ChatPlatform, Config},
    handler::MessageHandler,
    job::JobDeps,
    messaging::port::MessagingPort,
};
use mie_discord::DiscordMessenger;
use mie_s3::S3Uploader;
use mie_telegram::TelegramMessenger;
use mie_ytdlp::MediaDownloader;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = Arc::new(Config::load()?);
    mie_core::logging::init("mie", cfg.debug)?;

    tracing::info!(
        platform = %cfg.platform,
        port = cfg.port,
        debug = cfg.debug,
        temp_dir = %cfg.temp_dir.display(),
        "starting mie"
    );
    tracing::debug!(config = ?cfg, "loaded config");

    let uploader = Arc::new(S3Uploader::connect(&cfg.storage).await?);
    let downloader = Arc::new(MediaDownloader::new(&cfg)?);

    let messenger: Arc<dyn MessagingPort> = match cfg.platform {
        ChatPlatform::Discord => Arc::new(DiscordMessenger::new(&cfg.bot_token)),
        ChatPlatform::Telegram => Arc::new(TelegramMessenger::new(
            mie_telegram::router::bot(&cfg.bot_token),
        )),
    };

    let handler = MessageHandler::new(JobDeps {
        cfg: cfg.clone(),
        messenger,
        downloader,
        uploader,
    });

    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_signal(shutdown.clone()));

    match cfg.platform {
        ChatPlatform::Discord => mie_discord::run(cfg, handler, shutdown).await?,
        ChatPlatform::Telegram => mie_telegram::run(cfg, handler, shutdown).await?,
    }

    tracing::info!("mie stopped");
    Ok(())
}

/// Cancel `token` on Ctrl+C or SIGTERM.
async fn cancel_on_signal(token: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "cannot listen for SIGTERM; Ctrl+C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    tracing::info!("shutdown signal received");
    token.cancel();
}
