//! Completion Transport
//!
//! The remote completion endpoint is a black box behind the
//! [`Transport`] trait: it takes one request and returns either the
//! model's literal text content or a failure. Retries, timeouts, and
//! connection management belong to the implementation, never to the
//! core.

use crate::conversation::{ChatTurn, Role};
use anyhow::{Context, Result};
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
};
use async_trait::async_trait;

/// One completion request: a fixed system prompt plus the ordered
/// turns to send, with the sampling parameters for this call.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub history: Vec<ChatTurn>,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// A generic client for one-shot chat completions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends the request and returns the model's literal text reply.
    async fn complete(&self, request: CompletionRequest) -> Result<String>;
}

/// An implementation of `Transport` for any OpenAI-compatible API.
pub struct OpenAIChatTransport {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAIChatTransport {
    /// Creates a new transport for an OpenAI-compatible service.
    ///
    /// # Arguments
    ///
    /// * `config` - The client configuration, including API key and base URL.
    /// * `model` - The model identifier to use for chat completions (e.g., "gpt-4o-mini").
    pub fn new(config: OpenAIConfig, model: String) -> Self {
        Self {
            client: Client::with_config(config),
            model,
        }
    }
}

#[async_trait]
impl Transport for OpenAIChatTransport {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let mut messages: Vec<ChatCompletionRequestMessage> = Vec::with_capacity(
            request.history.len() + 1,
        );
        messages.push(
            ChatCompletionRequestSystemMessageArgs::default()
                .content(request.system_prompt)
                .build()?
                .into(),
        );
        for turn in request.history {
            let message: ChatCompletionRequestMessage = match turn.role {
                Role::User => ChatCompletionRequestUserMessageArgs::default()
                    .content(turn.content)
                    .build()?
                    .into(),
                Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
                    .content(turn.content)
                    .build()?
                    .into(),
            };
            messages.push(message);
        }

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .max_completion_tokens(request.max_tokens)
            .temperature(request.temperature)
            .build()?;

        let response = self.client.chat().create(request).await?;

        response
            .choices
            .first()
            .context("No response choice from model")?
            .message
            .content
            .clone()
            .context("No content in model response")
    }
}
