//! Event handling and user interactions.
//!
//! This module provides the glue between chat events and the router:
//! - Processing incoming messages (reply context, routing, delivery)
//! - Answering slash commands

pub mod command;
pub mod message;
