//! Slash commands.

use tracing::warn;

use crate::routing::Router;

/// Slash commands the bot registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlashCommand {
    Help,
}

impl SlashCommand {
    /// Every registered command.
    pub const ALL: &'static [SlashCommand] = &[SlashCommand::Help];

    pub fn name(&self) -> &'static str {
        match self {
            SlashCommand::Help => "help",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SlashCommand::Help => "Get info about PrismStrap support and resources.",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|command| command.name() == name)
    }
}

/// What to answer a slash command with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReply {
    pub content: String,
    /// Only visible to the invoking user.
    pub ephemeral: bool,
}

/// Answer the slash command `name`; unknown commands get no reply.
pub fn handle_command(name: &str, router: &Router) -> Option<CommandReply> {
    match SlashCommand::parse(name) {
        Some(SlashCommand::Help) => Some(CommandReply {
            content: router.help_text().to_string(),
            ephemeral: true,
        }),
        None => {
            warn!("Unknown slash command: {}", name);
            None
        }
    }
}

// Tests.
