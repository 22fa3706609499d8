//! Cross-messenger abstractions (Discord and Telegram).

pub mod card;
pub mod port;
pub mod types;
