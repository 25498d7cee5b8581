pub mod discord;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;

use crate::base::types::{Res, Void};

// Types.

/// A message fetched back from the chat platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedMessage {
    pub author_id: String,
    pub content: String,
}

// Traits.

/// Generic "chat" trait that clients must implement.
///
/// This trait defines the core functionality for interacting with chat platforms
/// like Discord. Implementing this trait allows different chat services to be used
/// with the bot.
#[async_trait]
pub trait GenericChatClient: Send + Sync + 'static {
    /// Get the bot user ID.
    ///
    /// Returns the unique identifier for the bot in the chat platform,
    /// which is used to detect mentions and replies to the bot.
    fn bot_user_id(&self) -> &str;

    /// Start the chat client listener.
    ///
    /// Connects to the platform gateway and processes incoming events until
    /// the connection ends or [`GenericChatClient::shutdown`] is called.
    async fn start(&self) -> Void;

    /// Disconnect from the platform gateway.
    async fn shutdown(&self);

    /// Reply to a message.
    ///
    /// `text` must already fit the platform's per-message limit.
    async fn send_reply(&self, channel_id: &str, message_id: &str, text: &str) -> Void;

    /// Fetch a single message, e.g. the target of a reply.
    async fn fetch_message(&self, channel_id: &str, message_id: &str) -> Res<FetchedMessage>;
}

// Structs.

/// Chat client for the application.
///
/// It is designed to be trivially cloneable, allowing it to be passed around
/// without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct ChatClient {
    inner: Arc<dyn GenericChatClient>,
}

impl Deref for ChatClient {
    type Target = dyn GenericChatClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl ChatClient {
    pub fn new(inner: Arc<dyn GenericChatClient>) -> Self {
        Self { inner }
    }
}
