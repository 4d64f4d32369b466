//! Model providers: the outbound LLM call.
//!
//! Every provider implements [`ChatModel`] over the canonical conversation.
//! [`build`] picks the adapter named by [`ProviderConfig::kind`]:
//! - `"anthropic"` → Messages API
//! - `"openai"` → Chat Completions API
//! - `"google"` → Gemini `generateContent`
//!
//! Calls are made once; there is no retry.

pub mod anthropic;
pub mod config;
pub mod google;
pub mod openai;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, info};

use crate::conversation::{ChatRole, ConversationMessage};

pub use config::{ProviderConfig, ProviderKind};

/// Errors returned by a provider call.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Provider authentication failed: {0}")]
    Auth(String),

    #[error("Provider rate limit or quota exceeded: {0}")]
    RateLimited(String),

    #[error("Provider rejected the request: {0}")]
    InvalidRequest(String),

    #[error("Provider error: {0}")]
    Upstream(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Config error: {0}")]
    Config(String),
}

impl ProviderError {
    /// Classify a non-success HTTP response.
    pub fn from_status(provider: &str, status: StatusCode, body: &str) -> Self {
        let message = format!("{provider} returned {status}: {body}");
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::Auth(message),
            StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited(message),
            s if s.is_client_error() => ProviderError::InvalidRequest(message),
            _ => ProviderError::Upstream(message),
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, ProviderError::Auth(_))
    }
}

/// Sampling parameters sent with every call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
    /// Ask the provider for a single JSON object, where supported.
    pub json_mode: bool,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            max_tokens: 4096,
            json_mode: true,
        }
    }
}

/// A full model call: system message first, then the conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub messages: Vec<ConversationMessage>,
    pub params: GenerationParams,
}

impl CompletionRequest {
    /// Split leading system messages from the rest of the conversation.
    ///
    /// Providers that take the system instruction out of band use this.
    pub fn split_system(&self) -> (Option<String>, &[ConversationMessage]) {
        let split = self
            .messages
            .iter()
            .position(|m| m.role != ChatRole::System)
            .unwrap_or(self.messages.len());
        let (system, rest) = self.messages.split_at(split);
        let system = (!system.is_empty()).then(|| {
            system
                .iter()
                .map(|m| m.content.text())
                .collect::<Vec<_>>()
                .join("\n\n")
        });
        (system, rest)
    }
}

/// A language model that turns a conversation into one text payload.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Provider name for logs and health output.
    fn name(&self) -> &str;

    /// Run one completion.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError>;
}

/// Construct the provider named in `config`.
pub fn build(config: &ProviderConfig) -> Result<Arc<dyn ChatModel>, ProviderError> {
    let api_key = config.api_key.clone().ok_or_else(|| {
        ProviderError::Config(format!(
            "{} is required for the {} provider",
            config.kind.api_key_env(),
            config.kind
        ))
    })?;
    let client = Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    let base_url = config
        .base_url
        .clone()
        .unwrap_or_else(|| config.kind.default_base_url().to_string());

    info!(provider = %config.kind, model = %config.model, %base_url, "model provider configured");

    let model: Arc<dyn ChatModel> = match config.kind {
        ProviderKind::Anthropic => Arc::new(anthropic::Anthropic::new(
            client,
            base_url,
            api_key,
            config.model.clone(),
        )),
        ProviderKind::OpenAi => Arc::new(openai::OpenAi::new(
            client,
            base_url,
            api_key,
            config.model.clone(),
        )),
        ProviderKind::Google => Arc::new(google::Google::new(
            client,
            base_url,
            api_key,
            config.model.clone(),
        )),
    };
    Ok(model)
}

/// Send a request and decode a JSON success body, classifying failures.
async fn send_json<T: DeserializeOwned>(
    provider: &str,
    builder: RequestBuilder,
) -> Result<T, ProviderError> {
    let resp = builder.send().await?;
    let status = resp.status();
    debug!(provider, %status, "provider responded");

    if !status.is_success() {
        let body = resp
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());
        return Err(ProviderError::from_status(provider, status, &body));
    }

    resp.json::<T>()
        .await
        .map_err(|e| ProviderError::Upstream(format!("{provider} response parse error: {e}")))
}

/// Join the trailing path onto a base URL without doubling slashes.
fn endpoint(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt;

    #[test]
    fn status_classification() {
        assert!(ProviderError::from_status("x", StatusCode::UNAUTHORIZED, "").is_auth());
        assert!(ProviderError::from_status("x", StatusCode::FORBIDDEN, "").is_auth());
        assert!(matches!(
            ProviderError::from_status("x", StatusCode::TOO_MANY_REQUESTS, ""),
            ProviderError::RateLimited(_)
        ));
        assert!(matches!(
            ProviderError::from_status("x", StatusCode::BAD_REQUEST, ""),
            ProviderError::InvalidRequest(_)
        ));
        assert!(matches!(
            ProviderError::from_status("x", StatusCode::BAD_GATEWAY, ""),
            ProviderError::Upstream(_)
        ));
    }

    #[test]
    fn split_system_separates_leading_instruction() {
        let request = CompletionRequest {
            messages: prompt::assemble(vec![
                ConversationMessage::text(ChatRole::User, "a"),
                ConversationMessage::text(ChatRole::Assistant, "b"),
            ]),
            params: GenerationParams::default(),
        };
        let (system, rest) = request.split_system();
        assert_eq!(system.as_deref(), Some(prompt::SYSTEM_PROMPT));
        assert_eq!(rest.len(), 2);
        assert_eq!(rest[0].role, ChatRole::User);
    }

    #[test]
    fn split_system_without_instruction() {
        let request = CompletionRequest {
            messages: vec![ConversationMessage::text(ChatRole::User, "a")],
            params: GenerationParams::default(),
        };
        let (system, rest) = request.split_system();
        assert!(system.is_none());
        assert_eq!(rest.len(), 1);
    }

    #[test]
    fn endpoint_joins_cleanly() {
        assert_eq!(
            endpoint("https://api.example.com/v1/", "/chat/completions"),
            "https://api.example.com/v1/chat/completions"
        );
    }

    #[test]
    fn build_requires_api_key() {
        let config = ProviderConfig {
            api_key: None,
            ..ProviderConfig::new(ProviderKind::OpenAi)
        };
        let err = build(&config).err().expect("missing key must fail");
        assert!(matches!(err, ProviderError::Config(_)));
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }
}
