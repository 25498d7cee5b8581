//! Transport-independent inbound event model.

/// One normalized inbound message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InboundMessage {
    pub message_id: String,
    pub author_id: String,
    pub is_bot_author: bool,
    pub raw_text: String,
    pub channel_id: String,
    pub is_direct_message: bool,
    pub mentions_self: bool,
    pub reply_to_message_id: Option<String>,
}

impl InboundMessage {
    /// Mentioned, or sent in a direct message.
    pub fn is_engaged(&self) -> bool {
        self.mentions_self || self.is_direct_message
    }
}

/// The message an inbound message replies to, as resolved by the chat client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyContext {
    pub author_is_self: bool,
    pub text: String,
}
