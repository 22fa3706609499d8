//! Discord adapter (serenity).
//!
//! Status cards are sent as embeds; the gateway client feeds incoming
//! messages to the shared handler and answers the `/download` slash command.

mod handler;
mod outbound;

pub use handler::{run, Handler};
pub use outbound::{card_embed, DiscordMessenger, InteractionMessenger};
