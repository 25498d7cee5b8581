//! Handles inbound chat messages: resolve reply context, route, deliver.

use tracing::{Instrument, error, info, instrument, warn};

use crate::{
    base::types::Void,
    routing::{
        Router, RoutingOutcome,
        inbound::{InboundMessage, ReplyContext},
    },
    service::{chat::ChatClient, llm::LlmClient},
};

/// Handles one inbound message end to end.
///
/// Errors never escape: fetch failures skip context stitching, generation
/// failures become the apology reply, and send failures are logged.
#[instrument(skip_all, fields(message_id = %message.message_id, channel_id = %message.channel_id))]
pub async fn handle_message(message: InboundMessage, router: &Router, llm: &LlmClient, chat: &ChatClient) -> RoutingOutcome {
    // Context is only read for engaged messages the router will not drop outright.
    let reply_context = if router.accepts(&message) && message.is_engaged() {
        resolve_reply_context(&message, chat).in_current_span().await
    } else {
        None
    };

    let outcome = router.handle(&message, reply_context.as_ref(), llm).await;

    // Deliver the fragments.
    let result = deliver_internal(&message, &outcome, chat).in_current_span().await;

    // Log any errors.
    if let Err(err) = &result {
        error!("Error while replying: {:#}", err);
    }

    outcome
}

/// Fetch the replied-to message, if any.
#[instrument(skip_all)]
async fn resolve_reply_context(message: &InboundMessage, chat: &ChatClient) -> Option<ReplyContext> {
    let reply_to = message.reply_to_message_id.as_deref()?;

    match chat.fetch_message(&message.channel_id, reply_to).await {
        Ok(fetched) => Some(ReplyContext {
            author_is_self: fetched.author_id == chat.bot_user_id(),
            text: fetched.content,
        }),
        Err(err) => {
            warn!("Could not fetch replied message {}: {:#}", reply_to, err);
            None
        }
    }
}

/// Send each fragment in order; stop at the first failure.
#[instrument(skip_all)]
async fn deliver_internal(message: &InboundMessage, outcome: &RoutingOutcome, chat: &ChatClient) -> Void {
    for (index, fragment) in outcome.fragments.iter().enumerate() {
        chat.send_reply(&message.channel_id, &message.message_id, fragment)
            .await
            .map_err(|e| anyhow::anyhow!("fragment {}/{}: {:#}", index + 1, outcome.fragments.len(), e))?;
    }

    if !outcome.fragments.is_empty() {
        info!("Sent {} reply fragment(s) ({:?}).", outcome.fragments.len(), outcome.kind);
    }

    Ok(())
}
