//! Deterministic micro-commands: jokes, coin flips, the time, capabilities.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use rand::{Rng, seq::IndexedRandom};

use crate::base::prompts;

/// A recognized micro-command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MicroCommand {
    Joke,
    CoinFlip,
    Time,
    Capabilities,
}

const TRIGGERS: &[(&str, MicroCommand)] = &[
    ("tell me a joke", MicroCommand::Joke),
    ("tell joke", MicroCommand::Joke),
    ("flip a coin", MicroCommand::CoinFlip),
    ("flip coin", MicroCommand::CoinFlip),
    ("what time is it", MicroCommand::Time),
    ("current time", MicroCommand::Time),
    ("what can you do", MicroCommand::Capabilities),
];

impl MicroCommand {
    /// Detect a micro-command by substring in lowercased `input`.
    pub fn detect(input: &str) -> Option<Self> {
        TRIGGERS.iter().find(|(phrase, _)| input.contains(phrase)).map(|(_, command)| *command)
    }

    /// Produce the reply text.
    pub fn reply<R: Rng>(&self, rng: &mut R, now: DateTime<Utc>, timezone: Tz) -> String {
        match self {
            MicroCommand::Joke => prompts::JOKES.choose(rng).copied().unwrap_or_default().to_string(),
            MicroCommand::CoinFlip => (if rng.random_bool(0.5) { "Heads!" } else { "Tails!" }).to_string(),
            MicroCommand::Time => format_time(now, timezone),
            MicroCommand::Capabilities => prompts::CAPABILITIES_REPLY.to_string(),
        }
    }
}

/// Format as `h:mm AM TZ`, e.g. `3:07 PM EST`.
pub fn format_time(now: DateTime<Utc>, timezone: Tz) -> String {
    let local = now.with_timezone(&timezone);
    format!("It's currently {}.", local.format("%-I:%M %p %Z"))
}

// Tests.
