//! Chat service integration for Discord.
//!
//! This module provides functionality for interacting with Discord through serenity:
//! - Receiving messages, slash commands, and connection lifecycle events
//! - Replying to messages and fetching replied-to messages
//! - Registering the bot's slash commands
//!
//! Lifecycle events drive the [`Liveness`] flag read by the liveness endpoint.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use serenity::all::{
    ChannelId, Command, ConnectionStage, Context, CreateCommand, CreateInteractionResponse, CreateInteractionResponseMessage, CreateMessage, EventHandler, GatewayIntents, Http, Interaction,
    Message, MessageId, Ready, ResumedEvent, ShardManager, ShardStageUpdateEvent,
};
use tracing::{debug, error, info, instrument, warn};

use crate::{
    base::{
        config::Config,
        types::{Res, Void},
    },
    interaction::{self, command::SlashCommand},
    routing::{Router, inbound::InboundMessage},
    service::{health::Liveness, llm::LlmClient},
};

use super::{ChatClient, FetchedMessage, GenericChatClient};

// Extra methods on `ChatClient` applied by the discord implementation.

impl ChatClient {
    /// Creates a new Discord chat client.
    pub async fn discord(config: &Config, llm: LlmClient, liveness: Liveness) -> Res<Self> {
        let client = DiscordChatClient::new(config, llm, liveness).await?;
        Ok(Self { inner: Arc::new(client) })
    }
}

impl From<DiscordChatClient> for ChatClient {
    fn from(client: DiscordChatClient) -> Self {
        Self { inner: Arc::new(client) }
    }
}

// Structs.

/// Discord client implementation.
#[derive(Clone)]
struct DiscordChatClient {
    token: String,
    bot_user_id: String,
    http: Arc<Http>,
    router: Arc<Router>,
    llm: LlmClient,
    liveness: Liveness,
    register_commands: bool,
    shard_manager: Arc<OnceLock<Arc<ShardManager>>>,
}

impl DiscordChatClient {
    /// Create a new Discord chat client.
    #[instrument(name = "DiscordChatClient::new", skip_all)]
    pub async fn new(config: &Config, llm: LlmClient, liveness: Liveness) -> Res<Self> {
        let token = config.discord_token.clone();
        let http = Arc::new(Http::new(&token));

        // Get the bot's user ID.

        let current_user = http.get_current_user().await.map_err(|e| anyhow::anyhow!("Failed to authenticate with Discord: {e}"))?;
        let bot_user_id = current_user.id.to_string();

        info!("Discord bot user ID: {}", bot_user_id);

        let router = Arc::new(Router::new(config, &bot_user_id)?);

        Ok(Self {
            token,
            bot_user_id,
            http,
            router,
            llm,
            liveness,
            register_commands: config.register_slash_commands,
            shard_manager: Arc::new(OnceLock::new()),
        })
    }

    /// Required gateway intents for the bot.
    fn intents() -> GatewayIntents {
        GatewayIntents::GUILDS | GatewayIntents::GUILD_MESSAGES | GatewayIntents::DIRECT_MESSAGES | GatewayIntents::MESSAGE_CONTENT
    }
}

#[async_trait]
impl GenericChatClient for DiscordChatClient {
    fn bot_user_id(&self) -> &str {
        &self.bot_user_id
    }

    async fn start(&self) -> Void {
        let handler = DiscordHandler {
            router: self.router.clone(),
            llm: self.llm.clone(),
            chat: ChatClient::from(self.clone()),
            liveness: self.liveness.clone(),
            register_commands: self.register_commands,
        };

        let mut client = serenity::Client::builder(&self.token, Self::intents()).event_handler(handler).await?;

        if self.shard_manager.set(client.shard_manager.clone()).is_err() {
            return Err(anyhow::anyhow!("Discord client was already started."));
        }

        // Runs until the shards shut down.
        let result = client.start().await;
        self.liveness.set_connected(false);

        result.map_err(|e| anyhow::anyhow!("Discord gateway failed: {e}"))
    }

    async fn shutdown(&self) {
        self.liveness.set_connected(false);

        if let Some(shard_manager) = self.shard_manager.get() {
            info!("Shutting down Discord shards ...");
            shard_manager.shutdown_all().await;
        }
    }

    #[instrument(skip(self, text))]
    async fn send_reply(&self, channel_id: &str, message_id: &str, text: &str) -> Void {
        let channel = ChannelId::new(parse_id(channel_id)?);
        let message = MessageId::new(parse_id(message_id)?);

        let builder = CreateMessage::new().content(text).reference_message((channel, message));

        channel.send_message(&self.http, builder).await.map_err(|e| anyhow::anyhow!("Failed to send message: {}", e))?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn fetch_message(&self, channel_id: &str, message_id: &str) -> Res<FetchedMessage> {
        let channel = ChannelId::new(parse_id(channel_id)?);
        let message = MessageId::new(parse_id(message_id)?);

        let fetched = channel.message(&self.http, message).await.map_err(|e| anyhow::anyhow!("Failed to fetch message: {}", e))?;

        Ok(FetchedMessage {
            author_id: fetched.author.id.to_string(),
            content: fetched.content,
        })
    }
}

/// Parse a Discord snowflake; zero is not a valid id.
fn parse_id(id: &str) -> Res<u64> {
    match id.parse::<u64>() {
        Ok(0) | Err(_) => Err(anyhow::anyhow!("Invalid Discord id: `{id}`")),
        Ok(value) => Ok(value),
    }
}

/// Normalize a serenity message for the router.
fn to_inbound(msg: &Message, bot_user_id: &str) -> InboundMessage {
    InboundMessage {
        message_id: msg.id.to_string(),
        author_id: msg.author.id.to_string(),
        is_bot_author: msg.author.bot,
        raw_text: msg.content.clone(),
        channel_id: msg.channel_id.to_string(),
        is_direct_message: msg.guild_id.is_none(),
        mentions_self: msg.mentions.iter().any(|user| user.id.to_string() == bot_user_id),
        reply_to_message_id: msg.message_reference.as_ref().and_then(|reference| reference.message_id).map(|id| id.to_string()),
    }
}

// Gateway event handler.

/// Handler for Discord gateway events.
struct DiscordHandler {
    router: Arc<Router>,
    llm: LlmClient,
    chat: ChatClient,
    liveness: Liveness,
    register_commands: bool,
}

impl DiscordHandler {
    /// Replace the global slash commands with ours.
    async fn register_commands(&self, ctx: &Context) {
        let commands = SlashCommand::ALL.iter().map(|command| CreateCommand::new(command.name()).description(command.description())).collect::<Vec<_>>();

        match Command::set_global_commands(&ctx.http, commands).await {
            Ok(registered) => info!("Registered {} slash command(s).", registered.len()),
            Err(e) => error!("Failed to register slash commands: {}", e),
        }
    }
}

#[serenity::async_trait]
impl EventHandler for DiscordHandler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(bot_name = %ready.user.name, guilds = ready.guilds.len(), "Discord gateway ready.");

        self.liveness.set_connected(true);

        if self.register_commands {
            self.register_commands(&ctx).await;
        }
    }

    async fn resume(&self, _ctx: Context, _event: ResumedEvent) {
        info!("Discord gateway resumed.");
        self.liveness.set_connected(true);
    }

    async fn shard_stage_update(&self, _ctx: Context, event: ShardStageUpdateEvent) {
        debug!("Shard {} stage: {:?} -> {:?}", event.shard_id, event.old, event.new);
        self.liveness.set_connected(event.new == ConnectionStage::Connected);
    }

    async fn message(&self, _ctx: Context, msg: Message) {
        let message = to_inbound(&msg, self.chat.bot_user_id());

        interaction::message::handle_message(message, &self.router, &self.llm, &self.chat).await;
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Interaction::Command(command) = interaction else {
            return;
        };

        info!("Received slash command /{} from {}.", command.data.name, command.user.name);

        let Some(reply) = interaction::command::handle_command(&command.data.name, &self.router) else {
            return;
        };

        let response = CreateInteractionResponse::Message(CreateInteractionResponseMessage::new().content(reply.content).ephemeral(reply.ephemeral));

        if let Err(e) = command.create_response(&ctx.http, response).await {
            warn!("Failed to respond to slash command: {}", e);
        }
    }
}

// Tests.
