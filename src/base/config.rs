//! Load configuration via `config` crate with env-override support.

use std::{
    collections::{BTreeMap, HashMap},
    ops::Deref,
    sync::Arc,
};

use chrono_tz::Tz;
use serde::Deserialize;

use crate::{
    base::prompts,
    routing::table::{ChannelRole, KeywordRule, default_keywords},
};

use super::types::{Res, Void};

/// Port used by the liveness endpoint when `PORT` is unset or invalid.
pub const DEFAULT_PORT: u16 = 3000;

/// Default OpenAI model to use
fn default_openai_model() -> String {
    "gpt-3.5-turbo".to_string()
}

/// Default sampling temperature for completions
fn default_openai_temperature() -> f32 {
    0.7
}

/// Default max output tokens for completions
fn default_openai_max_tokens() -> u32 {
    300
}

/// Default request timeout for completions
fn default_openai_timeout_secs() -> u64 {
    60
}

fn default_persona_directive() -> String {
    prompts::PERSONA_DIRECTIVE.to_string()
}

fn default_role_guidance() -> HashMap<String, String> {
    HashMap::from([
        (ChannelRole::Support.to_string(), prompts::SUPPORT_GUIDANCE.to_string()),
        (ChannelRole::Downloads.to_string(), prompts::DOWNLOADS_GUIDANCE.to_string()),
    ])
}

fn default_true() -> bool {
    true
}

fn default_greeting_tokens() -> Vec<String> {
    prompts::GREETING_TOKENS.iter().map(|s| s.to_string()).collect()
}

fn default_greeting_replies() -> Vec<String> {
    prompts::GREETING_REPLIES.iter().map(|s| s.to_string()).collect()
}

fn default_greeting_gated_roles() -> Vec<ChannelRole> {
    vec![ChannelRole::Downloads, ChannelRole::Updates]
}

fn default_help_text() -> String {
    prompts::HELP_TEXT.to_string()
}

fn default_timezone() -> String {
    "UTC".to_string()
}

/// Configuration for the bot.
#[derive(Debug, Clone)]
pub struct Config {
    /// Shared, immutable settings.
    pub inner: Arc<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl From<ConfigInner> for Config {
    fn from(inner: ConfigInner) -> Self {
        Self { inner: Arc::new(inner) }
    }
}

/// Settings as loaded from the environment and config file.
#[derive(Debug, Deserialize, Clone)]
pub struct ConfigInner {
    /// Discord bot token (`PRISM_BOT_DISCORD_TOKEN`).
    pub discord_token: String,
    /// OpenAI API key (`PRISM_BOT_OPENAI_API_KEY`).
    pub openai_api_key: String,
    /// Optional OpenAI-compatible API base URL (`PRISM_BOT_OPENAI_API_BASE`).
    #[serde(default)]
    pub openai_api_base: Option<String>,
    /// OpenAI chat model (`PRISM_BOT_OPENAI_MODEL`).
    #[serde(default = "default_openai_model")]
    pub openai_model: String,
    /// Sampling temperature between 0 and 2 (`PRISM_BOT_OPENAI_TEMPERATURE`).
    #[serde(default = "default_openai_temperature")]
    pub openai_temperature: f32,
    /// Max completion tokens (`PRISM_BOT_OPENAI_MAX_TOKENS`).
    #[serde(default = "default_openai_max_tokens")]
    pub openai_max_tokens: u32,
    /// Completion request timeout in seconds (`PRISM_BOT_OPENAI_TIMEOUT_SECS`).
    #[serde(default = "default_openai_timeout_secs")]
    pub openai_timeout_secs: u64,
    /// Persona used as the system instruction (`PRISM_BOT_PERSONA_DIRECTIVE`).
    #[serde(default = "default_persona_directive")]
    pub persona_directive: String,
    /// Extra system guidance per channel role, keyed by role name.
    #[serde(default = "default_role_guidance")]
    pub role_guidance: HashMap<String, String>,
    /// Channel id → role.
    #[serde(default)]
    pub channels: BTreeMap<String, ChannelRole>,
    /// Ignore guild messages from channels missing in `channels`.
    #[serde(default = "default_true")]
    pub only_configured_channels: bool,
    /// Greeting tokens, matched at the start of a message.
    #[serde(default = "default_greeting_tokens")]
    pub greeting_tokens: Vec<String>,
    /// Replies picked at random for a greeting.
    #[serde(default = "default_greeting_replies")]
    pub greeting_replies: Vec<String>,
    /// Roles where a greeting only gets a reply on mention or in a DM.
    #[serde(default = "default_greeting_gated_roles")]
    pub greeting_gated_roles: Vec<ChannelRole>,
    /// Ordered keyword table; the first match wins.
    #[serde(default = "default_keywords")]
    pub keywords: Vec<KeywordRule>,
    /// Template for the `/help` slash command.
    #[serde(default = "default_help_text")]
    pub help_text: String,
    /// IANA time zone for the time micro-command (`PRISM_BOT_TIMEZONE`).
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Liveness port (`PORT`, or `PRISM_BOT_PORT`).
    #[serde(default)]
    pub port: Option<String>,
    /// Register the `/help` slash command on ready.
    #[serde(default = "default_true")]
    pub register_slash_commands: bool,
}

impl Default for ConfigInner {
    fn default() -> Self {
        Self {
            discord_token: String::new(),
            openai_api_key: String::new(),
            openai_api_base: None,
            openai_model: default_openai_model(),
            openai_temperature: default_openai_temperature(),
            openai_max_tokens: default_openai_max_tokens(),
            openai_timeout_secs: default_openai_timeout_secs(),
            persona_directive: default_persona_directive(),
            role_guidance: default_role_guidance(),
            channels: BTreeMap::new(),
            only_configured_channels: true,
            greeting_tokens: default_greeting_tokens(),
            greeting_replies: default_greeting_replies(),
            greeting_gated_roles: default_greeting_gated_roles(),
            keywords: default_keywords(),
            help_text: default_help_text(),
            timezone: default_timezone(),
            port: None,
            register_slash_commands: true,
        }
    }
}

impl Config {
    /// Load from `PRISM_BOT_*` environment variables, `PORT`, and an optional TOML file, then validate.
    pub fn load(explicit_path: Option<&std::path::Path>) -> Res<Self> {
        let mut cfg = config::Config::builder().add_source(config::Environment::default().prefix("PRISM_BOT"));

        if let Some(p) = explicit_path {
            cfg = cfg.add_source(config::File::from(p.to_path_buf()));
        } else if std::path::Path::new(".hidden/config.toml").exists() {
            cfg = cfg.add_source(config::File::with_name(".hidden/config.toml"));
        }

        // Hosting platforms hand the port over as a bare `PORT`.
        cfg = cfg.set_override_option("port", std::env::var("PORT").ok())?;

        let result = Config {
            inner: Arc::new(cfg.build()?.try_deserialize()?),
        };

        result.validate()?;

        Ok(result)
    }

    /// Reject configurations that cannot run.
    pub fn validate(&self) -> Void {
        if self.discord_token.trim().is_empty() {
            return Err(anyhow::anyhow!("Discord token is required (`PRISM_BOT_DISCORD_TOKEN`)."));
        }

        if self.openai_api_key.trim().is_empty() {
            return Err(anyhow::anyhow!("OpenAI API key is required (`PRISM_BOT_OPENAI_API_KEY`)."));
        }

        if self.openai_temperature < 0.0 || self.openai_temperature > 2.0 {
            return Err(anyhow::anyhow!("OpenAI temperature must be between 0 and 2."));
        }

        if self.openai_max_tokens < 1 || self.openai_max_tokens > 128000 {
            return Err(anyhow::anyhow!("OpenAI max tokens must be between 1 and 128000."));
        }

        if self.greeting_replies.is_empty() {
            return Err(anyhow::anyhow!("At least one greeting reply is required."));
        }

        self.tz()?;

        Ok(())
    }

    /// The configured time zone.
    pub fn tz(&self) -> Res<Tz> {
        self.timezone.parse::<Tz>().map_err(|e| anyhow::anyhow!("Invalid time zone `{}`: {e}", self.timezone))
    }

    /// The liveness port, falling back to [`DEFAULT_PORT`].
    pub fn liveness_port(&self) -> u16 {
        resolve_port(self.port.as_deref())
    }
}

/// Parse a port, falling back to [`DEFAULT_PORT`] when missing or invalid.
pub fn resolve_port(value: Option<&str>) -> u16 {
    value.and_then(|v| v.trim().parse::<u16>().ok()).filter(|p| *p != 0).unwrap_or(DEFAULT_PORT)
}

// Tests.
