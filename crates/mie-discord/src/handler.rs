use std::sync::Arc;

use serenity::async_trait;
use serenity::builder::{
    CreateCommand, CreateCommandOption, CreateInteractionResponseFollowup,
    EditInteractionResponse,
};
use serenity::model::application::{
    Command, CommandDataOption, CommandInteraction, CommandOptionType, Interaction,
};
use serenity::model::channel::Message;
use serenity::model::gateway::{GatewayIntents, Ready};
use serenity::model::user::User;
use serenity::prelude::*;
use tokio_util::sync::CancellationToken;

use mie_core::{
    command::{
        DownloadReply, DownloadRequest, DOWNLOAD_COMMAND, DOWNLOAD_DESCRIPTION, NOT_A_LINK_TEXT,
    },
    config::Config,
    domain::{ChatId, UserId},
    handler::MessageHandler,
    messaging::types::{Author, IncomingMessage},
};

use crate::outbound::{core_id, InteractionMessenger};

pub struct Handler {
    handler: MessageHandler,
}

impl Handler {
    pub fn new(handler: MessageHandler) -> Self {
        Self { handler }
    }

    async fn download(&self, ctx: &Context, cmd: &CommandInteraction) -> serenity::Result<()> {
        cmd.defer(&ctx.http).await?;

        let req = request_from_options(
            ChatId(core_id(cmd.channel_id.get())),
            author(&cmd.user),
            &cmd.data.options,
        );
        let messenger = Arc::new(InteractionMessenger::new(ctx.http.clone(), cmd.token.clone()));

        match self.handler.download_via(req, messenger).await {
            DownloadReply::NotALink => {
                cmd.edit_response(&ctx.http, EditInteractionResponse::new().content(NOT_A_LINK_TEXT))
                    .await?;
            }
            DownloadReply::Finished {
                follow_up: Some(text),
                ..
            } => {
                cmd.create_followup(
                    &ctx.http,
                    CreateInteractionResponseFollowup::new().content(text),
                )
                .await?;
            }
            DownloadReply::Finished { .. } => {}
        }
        Ok(())
    }
}

fn author(user: &User) -> Author {
    Author {
        id: UserId(core_id(user.id.get())),
        username: Some(user.name.clone()),
        is_bot: user.bot,
    }
}

fn to_incoming(msg: &Message) -> IncomingMessage {
    IncomingMessage {
        chat_id: ChatId(core_id(msg.channel_id.get())),
        author: author(&msg.author),
        text: msg.content.clone(),
    }
}

fn download_command() -> CreateCommand {
    CreateCommand::new(DOWNLOAD_COMMAND)
        .description(DOWNLOAD_DESCRIPTION)
        .add_option(
            CreateCommandOption::new(CommandOptionType::String, "url", "Link to the video")
                .required(true),
        )
        .add_option(CreateCommandOption::new(
            CommandOptionType::String,
            "content",
            "Message posted together with the link",
        ))
}

fn request_from_options(
    chat_id: ChatId,
    author: Author,
    options: &[CommandDataOption],
) -> DownloadRequest {
    let arg = |name: &str| {
        options
            .iter()
            .find(|o| o.name == name)
            .and_then(|o| o.value.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    DownloadRequest {
        chat_id,
        author,
        url: arg("url").unwrap_or_default(),
        content: arg("content"),
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        tracing::info!(user = %ready.user.name, guilds = ready.guilds.len(), "discord bot connected");

        match Command::set_global_commands(&ctx.http, vec![download_command()]).await {
            Ok(cmds) => tracing::info!(commands = cmds.len(), "registered slash commands"),
            Err(e) => tracing::warn!(error = %e, "failed to register slash commands"),
        }
    }

    async fn message(&self, _ctx: Context, msg: Message) {
        drop(self.handler.dispatch(to_incoming(&msg)));
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Interaction::Command(cmd) = interaction else {
            return;
        };
        if cmd.data.name != DOWNLOAD_COMMAND {
            return;
        }
        if let Err(e) = self.download(&ctx, &cmd).await {
            tracing::warn!(
                channel_id = cmd.channel_id.get(),
                error = %e,
                "download command failed"
            );
        }
    }
}

/// Connect to the gateway and serve until `shutdown` fires.
pub async fn run(
    cfg: Arc<Config>,
    handler: MessageHandler,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let intents = GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let mut client = Client::builder(&cfg.bot_token, intents)
        .event_handler(Handler::new(handler))
        .await
        .map_err(|e| anyhow::anyhow!("failed to create discord client: {e}"))?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        shutdown.cancelled().await;
        tracing::info!("stopping discord client");
        shard_manager.shutdown_all().await;
    });

    tracing::info!("starting discord gateway connection");
    client
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("discord client error: {e}"))
}
