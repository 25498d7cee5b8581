//! Library root for `prism-bot`.
//!
//! Prism-bot is a Discord assistant for a small set of community channels designed to:
//! - Answer frequently-asked questions from an ordered keyword table
//! - Greet users and handle a few deterministic micro-commands
//! - Fall back to an OpenAI chat completion for everything else
//! - Report gateway liveness over HTTP for hosting platforms
//!
//! The routing decision is a pure function over immutable tables (see [`routing`]).
//! Discord and OpenAI sit behind traits (see [`service`]) so the rest of the
//! bot can be exercised without a live connection.

#[deny(missing_docs)]
pub mod base;
pub mod interaction;
pub mod routing;
pub mod runtime;
pub mod service;

use base::{config::Config, types::Void};
use tracing::info;

/// Public async entry for the binary crate.
///
/// Sets up necessary services and starts the bot runtime:
/// - Creates the runtime context with the LLM and chat clients
/// - Binds the liveness endpoint
/// - Runs the gateway until it ends or a shutdown signal arrives
pub async fn start(config: Config) -> Void {
    info!("Starting prism-bot ...");

    // Initialize the runtime.
    let runtime = runtime::Runtime::new(config).await?;

    // Start the runtime.
    runtime.start().await?;

    Ok(())
}
