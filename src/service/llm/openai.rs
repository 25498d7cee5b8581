//! OpenAI chat completion client.
//!
//! Sends the persona as a system message and the user input as a single user
//! message, with bounded output length and a fixed temperature. Each call is
//! wrapped in a timeout; there are no retries.

use std::{sync::Arc, time::Duration};

use async_openai::{
    Client,
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequest,
        CreateChatCompletionRequestArgs,
    },
};
use async_trait::async_trait;
use tokio::time::timeout;
use tracing::{debug, instrument};

use crate::base::{config::Config, types::Res};

use super::{CompletionRequest, GenericLlmClient, LlmClient};

// Extra methods on `LlmClient` applied by the openai implementation.

impl LlmClient {
    pub fn openai(config: &Config) -> Self {
        let client = OpenAiLlmClient::new(config);
        Self { inner: Arc::new(client) }
    }
}

// Specific implementations.

/// OpenAI LLM client implementation.
#[derive(Clone)]
pub struct OpenAiLlmClient {
    client: Client<OpenAIConfig>,
    model: String,
    timeout: Duration,
}

impl OpenAiLlmClient {
    /// Create a new OpenAI LLM client.
    #[instrument(name = "OpenAiLlmClient::new", skip_all)]
    pub fn new(config: &Config) -> Self {
        let mut cfg = OpenAIConfig::new().with_api_key(config.openai_api_key.clone());

        if let Some(base) = config.openai_api_base.as_deref().filter(|b| !b.trim().is_empty()) {
            cfg = cfg.with_api_base(base);
        }

        Self {
            client: Client::with_config(cfg),
            model: config.openai_model.clone(),
            timeout: Duration::from_secs(config.openai_timeout_secs.max(1)),
        }
    }

    /// Build the chat completion request.
    fn build_request(&self, request: &CompletionRequest) -> Res<CreateChatCompletionRequest> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default().content(request.system.clone()).build()?.into(),
            ChatCompletionRequestUserMessageArgs::default().content(request.user.clone()).build()?.into(),
        ];

        Ok(CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .max_completion_tokens(request.max_tokens)
            .temperature(request.temperature)
            .messages(messages)
            .build()?)
    }
}

#[async_trait]
impl GenericLlmClient for OpenAiLlmClient {
    #[instrument(name = "OpenAiLlmClient::complete", skip_all, fields(model = %self.model))]
    async fn complete(&self, request: &CompletionRequest) -> Res<Option<String>> {
        let request = self.build_request(request)?;

        let response = match timeout(self.timeout, self.client.chat().create(request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => return Err(anyhow::anyhow!("OpenAI API call failed: {}", describe_error(&err))),
            Err(_) => return Err(anyhow::anyhow!("OpenAI API call timed out after {}s", self.timeout.as_secs())),
        };

        if let Some(usage) = &response.usage {
            debug!("OpenAI usage: {} prompt, {} completion tokens.", usage.prompt_tokens, usage.completion_tokens);
        }

        Ok(response.choices.into_iter().next().and_then(|choice| choice.message.content))
    }
}

/// Render the status / code detail of an OpenAI error for logs.
fn describe_error(err: &OpenAIError) -> String {
    match err {
        OpenAIError::ApiError(api) => format!("API error (type: {:?}, code: {:?}): {}", api.r#type, api.code, api.message),
        OpenAIError::Reqwest(e) => match e.status() {
            Some(status) => format!("HTTP {status}: {e}"),
            None => format!("transport error: {e}"),
        },
        other => other.to_string(),
    }
}

// Tests.
