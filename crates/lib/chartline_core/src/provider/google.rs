//! Google Gemini chat provider.
//!
//! Calls `generateContent` with `systemInstruction` and
//! `responseMimeType: application/json`. Images are sent as `inlineData`
//! parts; the assistant role is called `model`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{ChatModel, CompletionRequest, ProviderError, endpoint, send_json};
use crate::conversation::{ChatRole, ContentPart, ConversationMessage, MessageContent};

const PROVIDER: &str = "google";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent<'a>>,
    contents: Vec<GeminiContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum GeminiPart<'a> {
    Text {
        text: std::borrow::Cow<'a, str>,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiReplyContent>,
}

#[derive(Deserialize)]
struct GeminiReplyContent {
    #[serde(default)]
    parts: Vec<GeminiReplyPart>,
}

#[derive(Deserialize)]
struct GeminiReplyPart {
    #[serde(default)]
    text: Option<String>,
}

/// Gemini `generateContent` client.
pub struct Google {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl Google {
    pub fn new(client: Client, base_url: String, api_key: String, model: String) -> Self {
        Self {
            client,
            base_url,
            api_key,
            model,
        }
    }
}

fn to_content(message: &ConversationMessage) -> GeminiContent<'_> {
    let role = match message.role {
        ChatRole::Assistant => "model",
        ChatRole::User | ChatRole::System => "user",
    };
    let parts = match &message.content {
        MessageContent::Text(text) => vec![GeminiPart::Text {
            text: text.as_str().into(),
        }],
        MessageContent::Parts(parts) => parts
            .iter()
            .map(|part| match part {
                ContentPart::Text(text) => GeminiPart::Text {
                    text: text.as_str().into(),
                },
                ContentPart::InlineData { data, media_type } => GeminiPart::InlineData {
                    inline_data: InlineData {
                        mime_type: media_type,
                        data,
                    },
                },
            })
            .collect(),
    };
    GeminiContent {
        role: Some(role),
        parts,
    }
}

#[async_trait]
impl ChatModel for Google {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        let (system, conversation) = request.split_system();
        let body = GeminiRequest {
            system_instruction: system.map(|text| GeminiContent {
                role: None,
                parts: vec![GeminiPart::Text { text: text.into() }],
            }),
            contents: conversation.iter().map(to_content).collect(),
            generation_config: GenerationConfig {
                temperature: request.params.temperature,
                max_output_tokens: request.params.max_tokens,
                response_mime_type: request.params.json_mode.then_some("application/json"),
            },
        };

        let path = format!("v1beta/models/{}:generateContent", self.model);
        let builder = self
            .client
            .post(endpoint(&self.base_url, &path))
            .header("x-goog-api-key", &self.api_key)
            .json(&body);
        let data: GeminiResponse = send_json(PROVIDER, builder).await?;

        let text: String = data
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();
        if text.is_empty() {
            return Err(ProviderError::Upstream(
                "Gemini returned no candidate text".to_string(),
            ));
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assistant_maps_to_model_role() {
        let message = ConversationMessage::text(ChatRole::Assistant, "earlier answer");
        let json = serde_json::to_value(to_content(&message)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"role": "model", "parts": [{"text": "earlier answer"}]})
        );
    }

    #[test]
    fn image_part_becomes_inline_data() {
        let message = ConversationMessage {
            role: ChatRole::User,
            content: MessageContent::Parts(vec![ContentPart::InlineData {
                data: "aGk=".into(),
                media_type: "image/webp".into(),
            }]),
        };
        let json = serde_json::to_value(to_content(&message)).unwrap();
        assert_eq!(
            json["parts"][0],
            serde_json::json!({"inlineData": {"mimeType": "image/webp", "data": "aGk="}})
        );
    }
}
