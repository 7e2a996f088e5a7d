//! Chat-completions client for OpenRouter-compatible endpoints.

use std::future::Future;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tmuxai_core::ChatMessage;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::OpenRouterConfig;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("request canceled")]
    Canceled,

    #[error("no API key configured (set openrouter.api_key or TMUXAI_OPENROUTER_API_KEY)")]
    MissingApiKey,

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("API returned no choices")]
    EmptyResponse,
}

/// Something that turns a conversation into the next assistant reply.
pub trait ModelClient: Send + Sync {
    fn complete(
        &self,
        messages: &[ChatMessage],
        model: &str,
    ) -> impl Future<Output = Result<String, ModelError>> + Send;
}

/// Run `client.complete`, giving up with [`ModelError::Canceled`] as soon as
/// `cancel` fires.
pub async fn complete_or_cancel(
    client: &impl ModelClient,
    messages: &[ChatMessage],
    model: &str,
    cancel: &CancellationToken,
) -> Result<String, ModelError> {
    tokio::select! {
        () = cancel.cancelled() => Err(ModelError::Canceled),
        result = client.complete(messages, model) => result,
    }
}

// ─── Wire types ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: WireMessage,
}

/// Map chat history to API roles: a leading assistant-side message is the
/// system prompt.
pub fn to_wire_messages(messages: &[ChatMessage]) -> Vec<WireMessage> {
    messages
        .iter()
        .enumerate()
        .map(|(i, msg)| {
            let role = match (i, msg.from_user) {
                (_, true) => "user",
                (0, false) => "system",
                (_, false) => "assistant",
            };
            WireMessage {
                role: role.to_string(),
                content: msg.content.clone(),
            }
        })
        .collect()
}

// ─── OpenRouter ───────────────────────────────────────────────────

pub struct OpenRouterClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl OpenRouterClient {
    pub fn new(config: &OpenRouterConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }
}

impl ModelClient for OpenRouterClient {
    async fn complete(&self, messages: &[ChatMessage], model: &str) -> Result<String, ModelError> {
        if self.api_key.is_empty() {
            return Err(ModelError::MissingApiKey);
        }
        let body = CompletionRequest {
            model,
            messages: to_wire_messages(messages),
        };
        info!(count = body.messages.len(), %model, "sending messages to model");

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", "https://github.com/tmuxai/tmuxai")
            .header("X-Title", "TmuxAI")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "chat completion failed");
            return Err(ModelError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: CompletionResponse = resp.json().await?;
        let reply = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or(ModelError::EmptyResponse)?;
        debug!(len = reply.len(), "model replied");
        Ok(reply)
    }
}
