pub mod openai;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;

use crate::base::types::Res;

// Types.

/// One completion request: a system instruction plus a single user turn.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Persona and channel guidance.
    pub system: String,
    /// The (stitched, mention-stripped) user input.
    pub user: String,
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
}

// Traits.

/// Generic LLM client trait that clients must implement.
///
/// This trait defines the one call the bot makes to a large language model.
/// Implementing this trait allows different LLM providers to be used with the bot.
#[async_trait]
pub trait GenericLlmClient: Send + Sync + 'static {
    /// Generate a completion.
    ///
    /// Returns `Ok(None)` when the provider answered without any text.
    async fn complete(&self, request: &CompletionRequest) -> Res<Option<String>>;
}

// Structs.

/// LLM client for the application.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct LlmClient {
    inner: Arc<dyn GenericLlmClient>,
}

impl Deref for LlmClient {
    type Target = dyn GenericLlmClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl LlmClient {
    pub fn new(inner: Arc<dyn GenericLlmClient>) -> Self {
        Self { inner }
    }
}
