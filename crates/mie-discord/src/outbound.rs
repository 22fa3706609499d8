//! Discord API calls via serenity's HTTP client.

use std::sync::Arc;

use async_trait::async_trait;
use serenity::builder::{CreateEmbed, CreateMessage, EditInteractionResponse, EditMessage};
use serenity::http::Http;
use serenity::model::channel::Message;
use serenity::model::id::{ChannelId, MessageId as DiscordMessageId};
use serenity::model::Timestamp;

use mie_core::{
    domain::{ChatId, MessageId, MessageRef},
    errors::Error,
    messaging::{card::StatusCard, port::MessagingPort},
    Result,
};

#[derive(Clone)]
pub struct DiscordMessenger {
    http: Arc<Http>,
}

impl DiscordMessenger {
    /// REST-only client; usable before the gateway connects.
    pub fn new(bot_token: &str) -> Self {
        Self {
            http: Arc::new(Http::new(bot_token)),
        }
    }
}

/// Discord snowflakes are non-zero u64s; the core carries them as i64.
pub(crate) fn snowflake(id: i64) -> Result<u64> {
    u64::try_from(id)
        .ok()
        .filter(|v| *v != 0)
        .ok_or_else(|| Error::Messaging(format!("invalid discord id {id}")))
}

pub(crate) fn core_id(id: u64) -> i64 {
    id as i64
}

/// Build the embed shown for `card`.
pub fn card_embed(card: &StatusCard) -> CreateEmbed {
    let mut embed = CreateEmbed::new()
        .description(&card.text)
        .colour(card.color);
    for f in &card.fields {
        embed = embed.field(&f.name, &f.value, true);
    }
    if let Some(at) = card.timestamp {
        if let Ok(ts) = Timestamp::from_unix_timestamp(at.timestamp()) {
            embed = embed.timestamp(ts);
        }
    }
    embed
}

fn map_err(e: serenity::Error) -> Error {
    Error::Messaging(format!("discord error: {e}"))
}

#[async_trait]
impl MessagingPort for DiscordMessenger {
    async fn send_card(&self, chat_id: ChatId, card: &StatusCard) -> Result<MessageRef> {
        let channel = ChannelId::new(snowflake(chat_id.0)?);
        let msg = channel
            .send_message(&*self.http, CreateMessage::new().embed(card_embed(card)))
            .await
            .map_err(map_err)?;

        Ok(MessageRef {
            chat_id,
            message_id: MessageId(core_id(msg.id.get())),
        })
    }

    async fn edit_card(&self, msg: MessageRef, card: &StatusCard) -> Result<()> {
        let channel = ChannelId::new(snowflake(msg.chat_id.0)?);
        let message_id = DiscordMessageId::new(snowflake(msg.message_id.0)?);
        channel
            .edit_message(
                &*self.http,
                message_id,
                EditMessage::new().embed(card_embed(card)),
            )
            .await
            .map_err(map_err)?;
        Ok(())
    }
}

/// Status card for one `/download` slash command. The card lives in the
/// command's deferred response, so sending and editing both rewrite it.
pub struct InteractionMessenger {
    http: Arc<Http>,
    token: String,
}

impl InteractionMessenger {
    pub fn new(http: Arc<Http>, token: impl Into<String>) -> Self {
        Self {
            http,
            token: token.into(),
        }
    }

    async fn respond(&self, card: &StatusCard) -> Result<Message> {
        self.http
            .edit_original_interaction_response(
                &self.token,
                &EditInteractionResponse::new().embed(card_embed(card)),
                Vec::new(),
            )
            .await
            .map_err(map_err)
    }
}

#[async_trait]
impl MessagingPort for InteractionMessenger {
    async fn send_card(&self, chat_id: ChatId, card: &StatusCard) -> Result<MessageRef> {
        let msg = self.respond(card).await?;
        Ok(MessageRef {
            chat_id,
            message_id: MessageId(core_id(msg.id.get())),
        })
    }

    async fn edit_card(&self, _msg: MessageRef, card: &StatusCard) -> Result<()> {
        self.respond(card).await?;
        Ok(())
    }
}
