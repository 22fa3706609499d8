use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};
use tokio_util::sync::CancellationToken;

use mie_core::{
    command::{DownloadReply, DownloadRequest, DOWNLOAD_COMMAND, NOT_A_LINK_TEXT},
    config::Config,
    domain::{ChatId, UserId},
    handler::MessageHandler,
    messaging::types::{Author, IncomingMessage},
};

pub fn bot(token: &str) -> Bot {
    Bot::new(token)
}

/// Long-poll Telegram until `shutdown` fires.
pub async fn run(
    cfg: Arc<Config>,
    handler: MessageHandler,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let bot = bot(&cfg.bot_token);

    match bot.get_me().await {
        Ok(me) => tracing::info!(username = %me.username(), "telegram bot started"),
        Err(e) => anyhow::bail!("telegram login failed: {e}"),
    }

    let schema = Update::filter_message().endpoint(handle_message);
    let mut dispatcher = Dispatcher::builder(bot, schema)
        .dependencies(dptree::deps![Arc::new(handler)])
        .build();

    let token = dispatcher.shutdown_token();
    tokio::spawn(async move {
        shutdown.cancelled().await;
        tracing::info!("stopping telegram dispatcher");
        // Errors only when the dispatcher is not running yet or already stopping.
        if let Ok(done) = token.shutdown() {
            done.await;
        }
    });

    dispatcher.dispatch().await;
    Ok(())
}

async fn handle_message(
    bot: Bot,
    msg: Message,
    handler: Arc<MessageHandler>,
) -> ResponseResult<()> {
    let Some(incoming) = to_incoming(&msg) else {
        return Ok(());
    };

    if incoming.text.starts_with('/') && !incoming.author.is_bot {
        let (cmd, args) = parse_command(&incoming.text);
        if cmd == DOWNLOAD_COMMAND {
            let req = DownloadRequest::from_args(incoming.chat_id, incoming.author, &args);
            tokio::spawn(run_download(bot, handler, req));
            return Ok(());
        }
    }

    // Jobs run detached; their outcomes are only logged.
    drop(handler.dispatch(incoming));
    Ok(())
}

async fn run_download(bot: Bot, handler: Arc<MessageHandler>, req: DownloadRequest) {
    let chat = teloxide::types::ChatId(req.chat_id.0);
    let reply = handler.download(req).await;
    let Some(text) = reply_text(&reply) else {
        return;
    };
    if let Err(e) = bot.send_message(chat, text).await {
        tracing::warn!(chat_id = chat.0, error = %e, "failed to send download reply");
    }
}

/// Plain-text answer posted after the status card, if any.
fn reply_text(reply: &DownloadReply) -> Option<&str> {
    match reply {
        DownloadReply::NotALink => Some(NOT_A_LINK_TEXT),
        DownloadReply::Finished { follow_up, .. } => follow_up.as_deref(),
    }
}

/// `/Download@mie_bot https://x  hi` -> (`download`, `https://x  hi`).
fn parse_command(text: &str) -> (String, String) {
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();
    (cmd, rest)
}

/// Map a Telegram message to the shared shape. Media posts carry their text in the caption.
fn to_incoming(msg: &Message) -> Option<IncomingMessage> {
    let user = msg.from()?;
    let text = msg.text().or_else(|| msg.caption())?;

    Some(IncomingMessage {
        chat_id: ChatId(msg.chat.id.0),
        author: Author {
            id: UserId(user.id.0 as i64),
            username: user.username.clone(),
            is_bot: user.is_bot,
        },
        text: text.to_string(),
    })
}
