//! Core components, types, and utilities for the bot.
//!
//! This module contains fundamental building blocks used throughout the application:
//! - Configuration handling and environment variables.
//! - Persona, guidance, and canned reply text.
//! - Common types and result handling.

pub mod config;
pub mod prompts;
pub mod types;
