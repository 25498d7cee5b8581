//! Common result types.

/// Error type used across the bot.
pub type Err = anyhow::Error;
/// Result with the bot's error type.
pub type Res<T> = Result<T, Err>;
/// Result without a value.
pub type Void = Res<()>;
