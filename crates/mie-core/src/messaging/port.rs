use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageRef},
    messaging::card::StatusCard,
    Result,
};

/// Cross-messenger port.
///
/// The job runner only ever needs two things from a chat platform: post a
/// placeholder and rewrite it in place. Each adapter decides how a
/// [`StatusCard`] is rendered (HTML text on Telegram, an embed on Discord).
#[async_trait]
pub trait MessagingPort: Send + Sync {
    async fn send_card(&self, chat_id: ChatId, card: &StatusCard) -> Result<MessageRef>;
    async fn edit_card(&self, msg: MessageRef, card: &StatusCard) -> Result<()>;
}
