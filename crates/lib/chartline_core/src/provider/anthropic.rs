//! Anthropic chat provider.
//!
//! Calls the Messages API (`/v1/messages`). The system instruction travels in
//! the top-level `system` field and images as base64 `source` blocks. The
//! Messages API has no JSON response mode, so text blocks are concatenated
//! and any ```json fence is unwrapped later by the chart pipeline.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{ChatModel, CompletionRequest, ProviderError, endpoint, send_json};
use crate::conversation::{ContentPart, ConversationMessage, MessageContent};

const PROVIDER: &str = "anthropic";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: Vec<AnthropicBlock<'a>>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum AnthropicBlock<'a> {
    Text { text: &'a str },
    Image { source: ImageSource<'a> },
}

#[derive(Serialize)]
struct ImageSource<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    media_type: &'a str,
    data: &'a str,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

#[derive(Deserialize)]
struct AnthropicContent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Messages API client.
pub struct Anthropic {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl Anthropic {
    pub fn new(client: Client, base_url: String, api_key: String, model: String) -> Self {
        Self {
            client,
            base_url,
            api_key,
            model,
        }
    }
}

fn to_message(message: &ConversationMessage) -> AnthropicMessage<'_> {
    let content = match &message.content {
        MessageContent::Text(text) => vec![AnthropicBlock::Text { text }],
        MessageContent::Parts(parts) => parts
            .iter()
            .map(|part| match part {
                ContentPart::Text(text) => AnthropicBlock::Text { text },
                ContentPart::InlineData { data, media_type } => AnthropicBlock::Image {
                    source: ImageSource {
                        kind: "base64",
                        media_type,
                        data,
                    },
                },
            })
            .collect(),
    };
    AnthropicMessage {
        role: message.role.as_str(),
        content,
    }
}

#[async_trait]
impl ChatModel for Anthropic {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        let (system, conversation) = request.split_system();
        let body = AnthropicRequest {
            model: &self.model,
            max_tokens: request.params.max_tokens,
            temperature: request.params.temperature,
            system,
            messages: conversation.iter().map(to_message).collect(),
        };

        let builder = self
            .client
            .post(endpoint(&self.base_url, "v1/messages"))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body);
        let data: AnthropicResponse = send_json(PROVIDER, builder).await?;

        let text: String = data
            .content
            .into_iter()
            .filter(|c| c.kind == "text")
            .filter_map(|c| c.text)
            .collect();
        if text.is_empty() {
            return Err(ProviderError::Upstream(
                "Anthropic returned no text content".to_string(),
            ));
        }
        Ok(text)
    }
}
