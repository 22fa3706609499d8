//! Telegram adapter (teloxide).
//!
//! Implements the `mie-core` MessagingPort over the Telegram Bot API and feeds
//! incoming messages to the shared handler.

use async_trait::async_trait;

use teloxide::{prelude::*, types::ParseMode};

mod render;
pub mod router;

pub use render::{escape_html, render_card};
pub use router::run;

use mie_core::{
    domain::{ChatId, MessageId, MessageRef},
    errors::Error,
    messaging::{card::StatusCard, port::MessagingPort},
    Result,
};

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn tg_msg_id(message_id: MessageId) -> Result<teloxide::types::MessageId> {
        i32::try_from(message_id.0)
            .map(teloxide::types::MessageId)
            .map_err(|_| Error::Messaging(format!("message id {} out of range", message_id.0)))
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::Messaging(format!("telegram error: {e}"))
    }
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    async fn send_card(&self, chat_id: ChatId, card: &StatusCard) -> Result<MessageRef> {
        let msg = self
            .bot
            .send_message(Self::tg_chat(chat_id), render_card(card))
            .parse_mode(ParseMode::Html)
            .await
            .map_err(Self::map_err)?;

        Ok(MessageRef {
            chat_id,
            message_id: MessageId(i64::from(msg.id.0)),
        })
    }

    async fn edit_card(&self, msg: MessageRef, card: &StatusCard) -> Result<()> {
        self.bot
            .edit_message_text(
                Self::tg_chat(msg.chat_id),
                Self::tg_msg_id(msg.message_id)?,
                render_card(card),
            )
            .parse_mode(ParseMode::Html)
            .await
            .map_err(Self::map_err)?;
        Ok(())
    }
}
