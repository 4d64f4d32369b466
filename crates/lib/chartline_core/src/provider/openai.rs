//! OpenAI chat provider.
//!
//! Calls the Chat Completions API (`/chat/completions`) with
//! `response_format: {"type": "json_object"}`. Images are sent as
//! `image_url` parts carrying a data URL.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{ChatModel, CompletionRequest, ProviderError, endpoint, send_json};
use crate::conversation::{ContentPart, ConversationMessage, MessageContent};

const PROVIDER: &str = "openai";

#[derive(Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAIMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct OpenAIMessage<'a> {
    role: &'a str,
    content: OpenAIContent<'a>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum OpenAIContent<'a> {
    Text(&'a str),
    Parts(Vec<OpenAIPart<'a>>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OpenAIPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIReplyMessage,
}

#[derive(Deserialize)]
struct OpenAIReplyMessage {
    content: Option<String>,
}

/// Chat Completions client.
pub struct OpenAi {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAi {
    pub fn new(client: Client, base_url: String, api_key: String, model: String) -> Self {
        Self {
            client,
            base_url,
            api_key,
            model,
        }
    }
}

fn to_message(message: &ConversationMessage) -> OpenAIMessage<'_> {
    let content = match &message.content {
        MessageContent::Text(text) => OpenAIContent::Text(text),
        MessageContent::Parts(parts) => OpenAIContent::Parts(
            parts
                .iter()
                .map(|part| match part {
                    ContentPart::Text(text) => OpenAIPart::Text { text },
                    ContentPart::InlineData { data, media_type } => OpenAIPart::ImageUrl {
                        image_url: ImageUrl {
                            url: format!("data:{media_type};base64,{data}"),
                        },
                    },
                })
                .collect(),
        ),
    };
    OpenAIMessage {
        role: message.role.as_str(),
        content,
    }
}

#[async_trait]
impl ChatModel for OpenAi {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        let body = OpenAIRequest {
            model: &self.model,
            messages: request.messages.iter().map(to_message).collect(),
            temperature: request.params.temperature,
            max_tokens: request.params.max_tokens,
            response_format: request.params.json_mode.then_some(ResponseFormat {
                kind: "json_object",
            }),
        };

        let builder = self
            .client
            .post(endpoint(&self.base_url, "chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&body);
        let data: OpenAIResponse = send_json(PROVIDER, builder).await?;

        data.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ProviderError::Upstream("OpenAI returned no message content".to_string()))
    }
}
