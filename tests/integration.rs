#![cfg(test)]

use std::{
    collections::BTreeMap,
    net::SocketAddr,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use mockall::{Sequence, mock};
use prism_bot::{
    base::{
        config::{Config, ConfigInner},
        prompts,
        types::{Res, Void},
    },
    interaction::message::handle_message,
    routing::{Router, RoutingKind, inbound::InboundMessage, table::ChannelRole},
    runtime::Runtime,
    service::{
        chat::{ChatClient, FetchedMessage, GenericChatClient},
        health::{HealthServer, Liveness},
        llm::{CompletionRequest, GenericLlmClient, LlmClient},
    },
};
use tokio::sync::oneshot;

// Mocks.

mock! {
    pub Chat {}

    #[async_trait]
    impl GenericChatClient for Chat {
        fn bot_user_id(&self) -> &str;
        async fn start(&self) -> Void;
        async fn shutdown(&self);
        async fn send_reply(&self, channel_id: &str, message_id: &str, text: &str) -> Void;
        async fn fetch_message(&self, channel_id: &str, message_id: &str) -> Res<FetchedMessage>;
    }
}

mock! {
    pub Llm {}

    #[async_trait]
    impl GenericLlmClient for Llm {
        async fn complete(&self, request: &CompletionRequest) -> Res<Option<String>>;
    }
}

const BOT: &str = "42";
const GENERAL: &str = "400";
const SUPPORT: &str = "300";
const DOWNLOADS: &str = "100";

/// Helper function to build a test configuration.
fn test_config() -> Config {
    Config::from(ConfigInner {
        discord_token: "discord-test".to_string(),
        openai_api_key: "sk-test".to_string(),
        channels: BTreeMap::from([
            (DOWNLOADS.to_string(), ChannelRole::Downloads),
            (SUPPORT.to_string(), ChannelRole::Support),
            (GENERAL.to_string(), ChannelRole::General),
        ]),
        ..Default::default()
    })
}

fn test_router() -> Router {
    Router::new(&test_config(), BOT).expect("router should build")
}

/// A chat mock that records every sent fragment.
fn recording_chat() -> (MockChat, Arc<Mutex<Vec<String>>>) {
    let sent = Arc::new(Mutex::new(Vec::new()));
    let sink = sent.clone();

    let mut mock = MockChat::new();
    mock.expect_bot_user_id().return_const(BOT.to_string());
    mock.expect_send_reply().returning(move |_, _, text| {
        sink.lock().unwrap().push(text.to_string());
        Ok(())
    });

    (mock, sent)
}

fn mention(channel_id: &str, text: &str) -> InboundMessage {
    InboundMessage {
        message_id: "9001".to_string(),
        author_id: "7".to_string(),
        raw_text: text.to_string(),
        channel_id: channel_id.to_string(),
        mentions_self: true,
        ..Default::default()
    }
}

fn llm(mock: MockLlm) -> LlmClient {
    LlmClient::new(Arc::new(mock))
}

fn chat(mock: MockChat) -> ChatClient {
    ChatClient::new(Arc::new(mock))
}

#[tokio::test]
async fn test_faq_hit_never_calls_llm() {
    let (chat_mock, sent) = recording_chat();
    let mut llm_mock = MockLlm::new();
    llm_mock.expect_complete().never();

    let outcome = handle_message(mention(GENERAL, "<@42> download"), &test_router(), &llm(llm_mock), &chat(chat_mock)).await;

    assert_eq!(outcome.kind, RoutingKind::HandledByRule);
    assert_eq!(*sent.lock().unwrap(), vec![format!("You can download PrismStrap here: <#{DOWNLOADS}>.")]);
}

#[tokio::test]
async fn test_generation_failure_sends_apology() {
    let (chat_mock, sent) = recording_chat();
    let mut llm_mock = MockLlm::new();
    llm_mock.expect_complete().times(1).returning(|_| Err(anyhow::anyhow!("429 rate limited")));

    let outcome = handle_message(mention(GENERAL, "<@42> explain quantum physics"), &test_router(), &llm(llm_mock), &chat(chat_mock)).await;

    assert_eq!(outcome.kind, RoutingKind::Errored);
    assert_eq!(*sent.lock().unwrap(), vec![prompts::GENERATION_FAILED_REPLY.to_string()]);
}

#[tokio::test]
async fn test_empty_generation_asks_to_rephrase() {
    let (chat_mock, sent) = recording_chat();
    let mut llm_mock = MockLlm::new();
    llm_mock.expect_complete().times(1).returning(|_| Ok(Some("   ".to_string())));

    handle_message(mention(GENERAL, "<@42> hmm"), &test_router(), &llm(llm_mock), &chat(chat_mock)).await;

    assert_eq!(*sent.lock().unwrap(), vec![prompts::EMPTY_COMPLETION_REPLY.to_string()]);
}

#[tokio::test]
async fn test_long_generation_is_chunked_in_order() {
    let text: String = (0..4500).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
    let reply = text.clone();

    let (chat_mock, sent) = recording_chat();
    let mut llm_mock = MockLlm::new();
    llm_mock
        .expect_complete()
        .withf(|request| request.user == "write me an essay" && request.system.ends_with(prompts::SUPPORT_GUIDANCE))
        .times(1)
        .returning(move |_| Ok(Some(reply.clone())));

    let outcome = handle_message(mention(SUPPORT, "<@42> write me an essay"), &test_router(), &llm(llm_mock), &chat(chat_mock)).await;

    let sent = sent.lock().unwrap();
    assert_eq!(outcome.kind, RoutingKind::HandledByGeneration);
    assert_eq!(sent.len(), 3);
    assert!(sent.iter().all(|fragment| fragment.chars().count() <= 1990));
    assert_eq!(sent.concat(), text);
}

#[tokio::test]
async fn test_reply_to_bot_is_stitched() {
    let (mut chat_mock, sent) = recording_chat();
    chat_mock.expect_fetch_message().withf(|channel_id, message_id| channel_id == GENERAL && message_id == "8000").times(1).returning(|_, _| {
        Ok(FetchedMessage {
            author_id: BOT.to_string(),
            content: "Want me to FLIP A COIN?".to_string(),
        })
    });

    let mut llm_mock = MockLlm::new();
    llm_mock.expect_complete().never();

    let message = InboundMessage {
        reply_to_message_id: Some("8000".to_string()),
        ..mention(GENERAL, "<@42> go on then")
    };

    let outcome = handle_message(message, &test_router(), &llm(llm_mock), &chat(chat_mock)).await;

    let sent = sent.lock().unwrap();
    assert_eq!(outcome.kind, RoutingKind::HandledByRule);
    assert!(sent[0] == "Heads!" || sent[0] == "Tails!");
}

#[tokio::test]
async fn test_reply_fetch_failure_is_tolerated() {
    let (mut chat_mock, sent) = recording_chat();
    chat_mock.expect_fetch_message().times(1).returning(|_, _| Err(anyhow::anyhow!("unknown message")));

    let mut llm_mock = MockLlm::new();
    llm_mock.expect_complete().withf(|request| request.user == "thoughts?").times(1).returning(|_| Ok(Some("Sounds good!".to_string())));

    let message = InboundMessage {
        reply_to_message_id: Some("8000".to_string()),
        ..mention(GENERAL, "<@42> thoughts?")
    };

    let outcome = handle_message(message, &test_router(), &llm(llm_mock), &chat(chat_mock)).await;

    assert_eq!(outcome.kind, RoutingKind::HandledByGeneration);
    assert_eq!(*sent.lock().unwrap(), vec!["Sounds good!".to_string()]);
}

#[tokio::test]
async fn test_send_failure_stops_delivery_without_panicking() {
    let mut chat_mock = MockChat::new();
    chat_mock.expect_bot_user_id().return_const(BOT.to_string());
    chat_mock.expect_send_reply().times(1).returning(|_, _, _| Err(anyhow::anyhow!("Missing Permissions")));

    let mut llm_mock = MockLlm::new();
    llm_mock.expect_complete().returning(|_| Ok(Some("x".repeat(3000))));

    let outcome = handle_message(mention(GENERAL, "<@42> tell me a story"), &test_router(), &llm(llm_mock), &chat(chat_mock)).await;

    assert_eq!(outcome.kind, RoutingKind::HandledByGeneration);
    assert_eq!(outcome.fragments.len(), 2);
}

#[tokio::test]
async fn test_bot_messages_are_dropped() {
    let mut chat_mock = MockChat::new();
    chat_mock.expect_bot_user_id().return_const(BOT.to_string());
    chat_mock.expect_send_reply().never();
    chat_mock.expect_fetch_message().never();

    let mut llm_mock = MockLlm::new();
    llm_mock.expect_complete().never();

    let message = InboundMessage {
        is_bot_author: true,
        reply_to_message_id: Some("8000".to_string()),
        ..mention(GENERAL, "<@42> hello")
    };

    let outcome = handle_message(message, &test_router(), &llm(llm_mock), &chat(chat_mock)).await;

    assert_eq!(outcome.kind, RoutingKind::Ignored);
    assert!(outcome.fragments.is_empty());
}

#[tokio::test]
async fn test_unmentioned_greeting_in_gated_channel_is_ignored() {
    let mut chat_mock = MockChat::new();
    chat_mock.expect_bot_user_id().return_const(BOT.to_string());
    chat_mock.expect_send_reply().never();

    let message = InboundMessage {
        mentions_self: false,
        ..mention(DOWNLOADS, "hello")
    };

    let outcome = handle_message(message, &test_router(), &llm(MockLlm::new()), &chat(chat_mock)).await;

    assert_eq!(outcome.kind, RoutingKind::Ignored);
}

#[tokio::test]
async fn test_unlisted_channel_reply_is_not_fetched() {
    let mut chat_mock = MockChat::new();
    chat_mock.expect_bot_user_id().return_const(BOT.to_string());
    chat_mock.expect_fetch_message().never();
    chat_mock.expect_send_reply().never();

    let mut llm_mock = MockLlm::new();
    llm_mock.expect_complete().never();

    let message = InboundMessage {
        reply_to_message_id: Some("8000".to_string()),
        ..mention("999", "<@42> go on then")
    };

    let outcome = handle_message(message, &test_router(), &llm(llm_mock), &chat(chat_mock)).await;

    assert_eq!(outcome.kind, RoutingKind::Ignored);
}

/// A gateway that stays connected until shut down.
#[derive(Default)]
struct IdleGateway {
    shutdowns: AtomicUsize,
}

#[async_trait]
impl GenericChatClient for IdleGateway {
    fn bot_user_id(&self) -> &str {
        BOT
    }

    async fn start(&self) -> Void {
        std::future::pending::<()>().await;
        Ok(())
    }

    async fn shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }

    async fn send_reply(&self, _channel_id: &str, _message_id: &str, _text: &str) -> Void {
        Ok(())
    }

    async fn fetch_message(&self, _channel_id: &str, _message_id: &str) -> Res<FetchedMessage> {
        Err(anyhow::anyhow!("no messages"))
    }
}

fn loopback(server: &HealthServer) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], server.local_addr().expect("bound address").port()))
}

#[tokio::test]
async fn test_runtime_stops_liveness_then_disconnects() {
    let liveness = Liveness::default();
    liveness.set_connected(true);

    let server = HealthServer::bind(0, liveness.clone()).await.expect("bind should succeed");
    let addr = loopback(&server);

    // Records whether the liveness port still accepted connections when the gateway was shut down.
    let accepting_at_shutdown = Arc::new(Mutex::new(None));
    let seen = accepting_at_shutdown.clone();

    let mut chat_mock = MockChat::new();
    let mut seq = Sequence::new();
    chat_mock.expect_start().times(1).in_sequence(&mut seq).returning(|| Err(anyhow::anyhow!("gateway closed")));
    chat_mock.expect_shutdown().times(1).in_sequence(&mut seq).returning(move || {
        *seen.lock().unwrap() = Some(std::net::TcpStream::connect(addr).is_ok());
    });

    let runtime = Runtime {
        config: test_config(),
        llm: llm(MockLlm::new()),
        chat: chat(chat_mock),
        liveness: liveness.clone(),
    };

    let result = runtime.run(server, std::future::pending()).await;

    assert!(result.is_err(), "gateway failure should propagate to the caller");
    assert_eq!(*accepting_at_shutdown.lock().unwrap(), Some(false), "liveness endpoint should stop before the gateway shuts down");
    assert!(!liveness.is_connected());
}

#[tokio::test]
async fn test_runtime_shutdown_signal() {
    let gateway = Arc::new(IdleGateway::default());
    let liveness = Liveness::default();
    liveness.set_connected(true);

    let runtime = Runtime {
        config: test_config(),
        llm: llm(MockLlm::new()),
        chat: ChatClient::new(gateway.clone()),
        liveness: liveness.clone(),
    };

    let server = HealthServer::bind(0, liveness.clone()).await.expect("bind should succeed");
    let addr = loopback(&server);

    let (signal_tx, signal_rx) = oneshot::channel::<()>();
    signal_tx.send(()).expect("receiver is alive");

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        runtime.run(server, async move {
            let _ = signal_rx.await;
        }),
    )
    .await
    .expect("the shutdown signal should end the run");

    assert!(result.is_ok());
    assert_eq!(gateway.shutdowns.load(Ordering::SeqCst), 1);
    assert!(!liveness.is_connected());
    assert!(tokio::net::TcpStream::connect(addr).await.is_err(), "liveness endpoint should be closed");
}
