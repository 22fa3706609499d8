use crate::domain::{ChatId, UserId};

/// Cross-messenger incoming text message.
///
/// Platform-specific fields stay in the adapter crates.
#[derive(Clone, Debug)]
pub struct IncomingMessage {
    pub chat_id: ChatId,
    pub author: Author,
    pub text: String,
}

#[derive(Clone, Debug)]
pub struct Author {
    pub id: UserId,
    pub username: Option<String>,
    /// Bots (including this one) are never served.
    pub is_bot: bool,
}
