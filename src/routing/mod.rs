//! Message routing: decides whether and how to answer one inbound message.
//!
//! The decision itself ([`Router::route`]) is pure: it reads the immutable
//! tables built at startup plus the message, and never touches the network.
//! [`Router::handle`] resolves a [`Decision::Generate`] through the LLM client
//! and turns every path into a [`RoutingOutcome`] that never carries an error.
//!
//! Rules, in order (the first match is terminal):
//! 1. messages from bots are ignored;
//! 2. greetings get a canned reply (gated roles need a mention or DM);
//! 3. anything else needs a mention or DM;
//! 4. a bare mention gets the "how can I help" prompt;
//! 5. replies to the bot are stitched with the replied-to text;
//! 6. the keyword table is scanned in order;
//! 7. micro-commands (joke, coin, time, capabilities);
//! 8. otherwise, ask the LLM.

pub mod inbound;
pub mod micro;
pub mod table;
pub mod text;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use rand::{Rng, seq::IndexedRandom};
use tracing::{debug, error, info, instrument, warn};

use crate::{
    base::{config::Config, prompts, types::Res},
    service::llm::{CompletionRequest, LlmClient},
};

use inbound::{InboundMessage, ReplyContext};
use micro::MicroCommand;
use table::{ChannelRole, ChannelRoles, KeywordTable, render_template};

// Types.

/// Why a message was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    BotAuthor,
    UnlistedChannel,
    NotEngaged,
}

/// The router's decision for one message.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Ignore(IgnoreReason),
    Reply(String),
    Generate(CompletionRequest),
}

/// How a message was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingKind {
    Ignored,
    HandledByRule,
    HandledByGeneration,
    Errored,
}

/// Result of handling one message: the kind, and the ordered reply fragments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingOutcome {
    pub kind: RoutingKind,
    pub fragments: Vec<String>,
}

impl RoutingOutcome {
    fn ignored() -> Self {
        Self {
            kind: RoutingKind::Ignored,
            fragments: Vec::new(),
        }
    }

    fn new(kind: RoutingKind, reply: &str) -> Self {
        Self {
            kind,
            fragments: text::chunk(reply, text::FRAGMENT_LIMIT),
        }
    }
}

// Router.

/// Immutable routing tables, built once at startup.
#[derive(Debug, Clone)]
pub struct Router {
    bot_user_id: String,
    channels: ChannelRoles,
    only_configured_channels: bool,
    keywords: KeywordTable,
    greeting_tokens: Vec<String>,
    greeting_replies: Vec<String>,
    greeting_gated_roles: Vec<ChannelRole>,
    persona_directive: String,
    role_guidance: std::collections::HashMap<String, String>,
    help_text: String,
    max_tokens: u32,
    temperature: f32,
    timezone: Tz,
}

impl Router {
    /// Build the router for the bot user `bot_user_id`.
    pub fn new(config: &Config, bot_user_id: &str) -> Res<Self> {
        let channels = ChannelRoles::new(config.channels.clone());
        let keywords = KeywordTable::compile(&config.keywords, &channels);
        let help_text = render_template(&config.help_text, &channels);

        info!("Loaded {} keyword rules for {} channels.", keywords.len(), config.channels.len());

        if config.only_configured_channels && config.channels.is_empty() {
            warn!("No channels are configured and `only_configured_channels` is on; only direct messages will be answered.");
        }

        Ok(Self {
            bot_user_id: bot_user_id.to_string(),
            only_configured_channels: config.only_configured_channels,
            keywords,
            greeting_tokens: config.greeting_tokens.iter().map(|t| t.trim().to_lowercase()).filter(|t| !t.is_empty()).collect(),
            greeting_replies: config.greeting_replies.clone(),
            greeting_gated_roles: config.greeting_gated_roles.clone(),
            persona_directive: config.persona_directive.clone(),
            role_guidance: config.role_guidance.clone(),
            help_text,
            max_tokens: config.openai_max_tokens,
            temperature: config.openai_temperature,
            timezone: config.tz()?,
            channels,
        })
    }

    /// The bot's own user id.
    pub fn bot_user_id(&self) -> &str {
        &self.bot_user_id
    }

    /// The rendered `/help` text.
    pub fn help_text(&self) -> &str {
        &self.help_text
    }

    /// The role of a channel; unlisted channels are `general`.
    pub fn role_of(&self, channel_id: &str) -> ChannelRole {
        self.channels.role_of(channel_id).unwrap_or(ChannelRole::General)
    }

    /// The role a message is routed under, or `None` when the channel filter drops it.
    fn admitted_role(&self, message: &InboundMessage) -> Option<ChannelRole> {
        match self.channels.role_of(&message.channel_id) {
            Some(role) => Some(role),
            None if message.is_direct_message || !self.only_configured_channels => Some(ChannelRole::General),
            None => None,
        }
    }

    /// Whether `message` passes the author and channel filters, i.e. whether
    /// routing it can produce anything other than an ignore.
    pub fn accepts(&self, message: &InboundMessage) -> bool {
        !message.is_bot_author && self.admitted_role(message).is_some()
    }

    /// Decide the response for `message`.
    pub fn route<R: Rng>(&self, message: &InboundMessage, reply: Option<&ReplyContext>, rng: &mut R, now: DateTime<Utc>) -> Decision {
        if message.is_bot_author {
            return Decision::Ignore(IgnoreReason::BotAuthor);
        }

        let Some(role) = self.admitted_role(message) else {
            return Decision::Ignore(IgnoreReason::UnlistedChannel);
        };

        let stripped = text::strip_mentions(&message.raw_text, &self.bot_user_id);

        // Greetings.

        if text::is_greeting(&stripped.to_lowercase(), &self.greeting_tokens) {
            let gated = self.greeting_gated_roles.contains(&role);

            if !gated || message.is_engaged() {
                if let Some(greeting) = self.greeting_replies.choose(rng) {
                    return Decision::Reply(greeting.clone());
                }
            }
        }

        // Everything else needs a mention or a DM.

        if !message.is_engaged() {
            return Decision::Ignore(IgnoreReason::NotEngaged);
        }

        if stripped.is_empty() {
            return Decision::Reply(prompts::BARE_MENTION_PROMPT.to_string());
        }

        let input = match reply {
            Some(context) if context.author_is_self => format!("{}\n\n{}", context.text.to_lowercase(), stripped),
            _ => stripped,
        };

        // Keyword table.

        if let Some(response) = self.keywords.lookup(&input) {
            return Decision::Reply(response.to_string());
        }

        // Micro-commands.

        if let Some(command) = MicroCommand::detect(&input.to_lowercase()) {
            return Decision::Reply(command.reply(rng, now, self.timezone));
        }

        // Generation.

        Decision::Generate(CompletionRequest {
            system: self.system_instruction(role),
            user: input,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        })
    }

    /// Persona plus the guidance for `role`, if any.
    pub fn system_instruction(&self, role: ChannelRole) -> String {
        match self.role_guidance.get(role.as_str()).filter(|g| !g.trim().is_empty()) {
            Some(guidance) => format!("{}\n\n{}", self.persona_directive, guidance),
            None => self.persona_directive.clone(),
        }
    }

    /// Route `message` and resolve generation through `llm`.
    #[instrument(skip_all, fields(message_id = %message.message_id, channel_id = %message.channel_id))]
    pub async fn handle(&self, message: &InboundMessage, reply: Option<&ReplyContext>, llm: &LlmClient) -> RoutingOutcome {
        let decision = {
            let mut rng = rand::rng();
            self.route(message, reply, &mut rng, Utc::now())
        };

        match decision {
            Decision::Ignore(reason) => {
                debug!("Ignoring message ({reason:?}).");
                RoutingOutcome::ignored()
            }
            Decision::Reply(reply) => {
                info!("Answered by rule.");
                RoutingOutcome::new(RoutingKind::HandledByRule, &reply)
            }
            Decision::Generate(request) => self.generate(&request, llm).await,
        }
    }

    /// Ask the LLM; failures become the fixed apology.
    async fn generate(&self, request: &CompletionRequest, llm: &LlmClient) -> RoutingOutcome {
        match llm.complete(request).await {
            Ok(Some(text)) if !text.trim().is_empty() => {
                info!("Answered by generation ({} characters).", text.chars().count());
                RoutingOutcome::new(RoutingKind::HandledByGeneration, &text)
            }
            Ok(_) => {
                warn!("Completion returned no text.");
                RoutingOutcome::new(RoutingKind::HandledByGeneration, prompts::EMPTY_COMPLETION_REPLY)
            }
            Err(err) => {
                error!("Completion failed: {err:#}");
                RoutingOutcome::new(RoutingKind::Errored, prompts::GENERATION_FAILED_REPLY)
            }
        }
    }
}

// Tests.
