//! Service integrations for external APIs and clients.
//!
//! This module contains implementations for various services used by the bot:
//! - Chat services (e.g., Discord)
//! - LLM services (e.g., OpenAI)
//! - The liveness endpoint for hosting platforms
//!
//! Each client service defines both a generic trait and a concrete implementation,
//! allowing for extensibility and easy testing.

pub mod chat;
pub mod health;
pub mod llm;
