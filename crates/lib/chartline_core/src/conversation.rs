//! Conversation domain models.
//!
//! [`ChatMessage`] is the caller-supplied shape. [`ConversationMessage`] is
//! what the provider adapters consume: it can carry multi-part content once a
//! file attachment has been spliced in.

use serde::{Deserialize, Serialize};

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Fixed instruction prepended by the prompt assembler. Never accepted
    /// from callers.
    System,
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for ChatRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single caller-supplied chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

/// One part of a multi-part message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    Text(String),
    /// Raw base64 payload plus its media type, forwarded as-is.
    InlineData { data: String, media_type: String },
}

/// Message body as the providers see it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// Concatenated text of all text parts.
    pub fn text(&self) -> String {
        match self {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::Text(text) => Some(text.as_str()),
                    ContentPart::InlineData { .. } => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    /// View the content as a list of parts.
    pub fn parts(&self) -> Vec<ContentPart> {
        match self {
            MessageContent::Text(text) => vec![ContentPart::Text(text.clone())],
            MessageContent::Parts(parts) => parts.clone(),
        }
    }
}

/// A role-tagged message ready for a model call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationMessage {
    pub role: ChatRole,
    pub content: MessageContent,
}

impl ConversationMessage {
    pub fn text(role: ChatRole, text: impl Into<String>) -> Self {
        Self {
            role,
            content: MessageContent::Text(text.into()),
        }
    }
}

impl From<&ChatMessage> for ConversationMessage {
    fn from(message: &ChatMessage) -> Self {
        Self::text(message.role, message.content.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_lowercase() {
        let role: ChatRole = serde_json::from_str("\"assistant\"").unwrap();
        assert_eq!(role, ChatRole::Assistant);
        assert_eq!(serde_json::to_string(&ChatRole::User).unwrap(), "\"user\"");
    }

    #[test]
    fn parts_text_skips_inline_data() {
        let content = MessageContent::Parts(vec![
            ContentPart::InlineData {
                data: "aGk=".into(),
                media_type: "image/png".into(),
            },
            ContentPart::Text("Describe this".into()),
        ]);
        assert_eq!(content.text(), "Describe this");
        assert_eq!(content.parts().len(), 2);
    }
}
