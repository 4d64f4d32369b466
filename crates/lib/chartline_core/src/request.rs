//! Request normalization: turns a raw chat request body into a conversation.
//!
//! Validates the `messages` array and splices an optional file attachment
//! into the last message:
//! - text files are decoded and prepended to the message text
//! - images become an inline-data part followed by the original text

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::conversation::{
    ChatMessage, ChatRole, ContentPart, ConversationMessage, MessageContent,
};

/// Errors raised while normalizing an inbound request.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("Messages array is required")]
    MissingMessages,

    #[error("Invalid message at index {index}: {reason}")]
    InvalidMessage { index: usize, reason: String },

    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("No file data")]
    MissingFileData,

    #[error("Cannot attach a file to an empty conversation")]
    EmptyConversation,

    #[error("{0}")]
    FileProcessing(String),
}

impl RequestError {
    /// True for failures caused by an undecodable attachment.
    pub fn is_file_error(&self) -> bool {
        matches!(self, RequestError::FileProcessing(_))
    }
}

/// A file attached to the last message of a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileAttachment {
    #[serde(default)]
    pub base64: Option<String>,
    #[serde(default)]
    pub media_type: String,
    #[serde(default)]
    pub is_text: bool,
    #[serde(default)]
    pub file_name: String,
}

/// Inbound chat request body.
///
/// `messages` stays untyped until [`build_conversation`], which validates
/// each entry and reports the offending index.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Option<Value>,
    #[serde(default)]
    pub file_data: Option<FileAttachment>,
    /// Model selection hint. Only used for diagnostics; non-string values
    /// are dropped.
    #[serde(default, deserialize_with = "lenient_hint")]
    pub model: Option<String>,
}

fn lenient_hint<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(hint) => Some(hint),
        _ => None,
    })
}

impl ChatRequest {
    /// Decode a request from an arbitrary JSON body.
    ///
    /// A missing or non-array `messages` is reported before any other field
    /// is looked at.
    pub fn from_value(body: Value) -> Result<Self, RequestError> {
        if !body.get("messages").is_some_and(Value::is_array) {
            return Err(RequestError::MissingMessages);
        }
        serde_json::from_value(body).map_err(|e| RequestError::InvalidBody(e.to_string()))
    }
}

/// Validate the request and produce the conversation for the model call.
///
/// The caller's messages are never modified; the last message is replaced by
/// value when a file is attached.
pub fn build_conversation(request: &ChatRequest) -> Result<Vec<ConversationMessage>, RequestError> {
    let messages = parse_messages(request.messages.as_ref())?;
    let mut conversation: Vec<ConversationMessage> =
        messages.iter().map(ConversationMessage::from).collect();

    if let Some(file) = &request.file_data {
        let encoded = file
            .base64
            .as_deref()
            .filter(|b| !b.trim().is_empty())
            .ok_or(RequestError::MissingFileData)?;
        let last = messages.last().ok_or(RequestError::EmptyConversation)?;
        let enriched = attach_file(file, encoded, last)?;
        debug!(
            file_name = %file.file_name,
            media_type = %file.media_type,
            is_text = file.is_text,
            "attached file to last message"
        );
        conversation.pop();
        conversation.push(enriched);
    }

    Ok(conversation)
}

fn parse_messages(raw: Option<&Value>) -> Result<Vec<ChatMessage>, RequestError> {
    let items = raw
        .and_then(Value::as_array)
        .ok_or(RequestError::MissingMessages)?;

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let message: ChatMessage =
                serde_json::from_value(item.clone()).map_err(|e| RequestError::InvalidMessage {
                    index,
                    reason: e.to_string(),
                })?;
            if message.role == ChatRole::System {
                return Err(RequestError::InvalidMessage {
                    index,
                    reason: "role must be \"user\" or \"assistant\"".into(),
                });
            }
            Ok(message)
        })
        .collect()
}

fn attach_file(
    file: &FileAttachment,
    encoded: &str,
    last: &ChatMessage,
) -> Result<ConversationMessage, RequestError> {
    let payload = strip_data_url(encoded);

    if file.is_text {
        let bytes = decode(payload, &file.file_name)?;
        let text = String::from_utf8(bytes).map_err(|_| {
            RequestError::FileProcessing(format!("{} is not valid UTF-8 text", file.file_name))
        })?;
        let content = format!(
            "File contents of {}:\n\n{}\n\n{}",
            file.file_name, text, last.content
        );
        return Ok(ConversationMessage::text(last.role, content));
    }

    if file.media_type.starts_with("image/") {
        // Decoded only to reject corrupt payloads; the raw string is forwarded.
        decode(payload, &file.file_name)?;
        return Ok(ConversationMessage {
            role: last.role,
            content: MessageContent::Parts(vec![
                ContentPart::InlineData {
                    data: payload.to_string(),
                    media_type: file.media_type.clone(),
                },
                ContentPart::Text(last.content.clone()),
            ]),
        });
    }

    Err(RequestError::FileProcessing(format!(
        "Unsupported file type: {}",
        file.media_type
    )))
}

fn decode(payload: &str, file_name: &str) -> Result<Vec<u8>, RequestError> {
    STANDARD
        .decode(payload.trim())
        .map_err(|e| RequestError::FileProcessing(format!("Invalid base64 data in {file_name}: {e}")))
}

/// Browsers often hand over `data:<mime>;base64,<payload>`; keep the payload.
fn strip_data_url(encoded: &str) -> &str {
    if encoded.starts_with("data:")
        && let Some((_, payload)) = encoded.split_once(";base64,")
    {
        return payload;
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(body: Value) -> ChatRequest {
        ChatRequest::from_value(body).expect("valid body")
    }

    #[test]
    fn non_array_messages_rejected() {
        for messages in [json!("hello"), json!({"role": "user"}), json!(42), Value::Null] {
            assert_eq!(
                ChatRequest::from_value(json!({ "messages": messages })).unwrap_err(),
                RequestError::MissingMessages
            );
        }
    }

    #[test]
    fn missing_messages_rejected() {
        assert_eq!(
            ChatRequest::from_value(json!({ "model": "fast" })).unwrap_err(),
            RequestError::MissingMessages
        );
        let req = ChatRequest::default();
        assert_eq!(build_conversation(&req), Err(RequestError::MissingMessages));
    }

    #[test]
    fn messages_checked_before_other_fields() {
        for body in [
            json!({"messages": "hello", "model": 5}),
            json!({"messages": "hello", "fileData": "not an object"}),
        ] {
            assert_eq!(
                ChatRequest::from_value(body).unwrap_err(),
                RequestError::MissingMessages
            );
        }
    }

    #[test]
    fn non_string_model_hint_is_ignored() {
        for model in [json!(5), json!({"name": "fast"}), Value::Null] {
            let req = request(json!({
                "messages": [{"role": "user", "content": "hi"}],
                "model": model
            }));
            assert_eq!(req.model, None);
            assert_eq!(build_conversation(&req).unwrap().len(), 1);
        }
        let req = request(json!({"messages": [], "model": "fast"}));
        assert_eq!(req.model.as_deref(), Some("fast"));
    }

    #[test]
    fn non_object_body_rejected() {
        assert_eq!(
            ChatRequest::from_value(json!([1, 2])).unwrap_err(),
            RequestError::MissingMessages
        );
    }

    #[test]
    fn empty_messages_accepted() {
        let req = request(json!({ "messages": [] }));
        assert!(build_conversation(&req).unwrap().is_empty());
    }

    #[test]
    fn system_role_from_caller_rejected() {
        let req = request(json!({ "messages": [{"role": "system", "content": "x"}] }));
        assert!(matches!(
            build_conversation(&req),
            Err(RequestError::InvalidMessage { index: 0, .. })
        ));
    }

    #[test]
    fn malformed_message_reports_index() {
        let req = request(json!({
            "messages": [
                {"role": "user", "content": "ok"},
                {"role": "user"}
            ]
        }));
        assert!(matches!(
            build_conversation(&req),
            Err(RequestError::InvalidMessage { index: 1, .. })
        ));
    }

    #[test]
    fn plain_messages_pass_through() {
        let req = request(json!({
            "messages": [
                {"role": "user", "content": "Hi"},
                {"role": "assistant", "content": "Hello"},
                {"role": "user", "content": "Chart my spend"}
            ]
        }));
        let conversation = build_conversation(&req).unwrap();
        assert_eq!(conversation.len(), 3);
        assert_eq!(conversation[1].role, ChatRole::Assistant);
        assert_eq!(
            conversation[2].content,
            MessageContent::Text("Chart my spend".into())
        );
    }

    #[test]
    fn text_file_is_prepended_to_last_message() {
        let req = request(json!({
            "messages": [{"role": "user", "content": "Summarize"}],
            "fileData": {
                "base64": STANDARD.encode("Q1 rose 10%"),
                "mediaType": "text/plain",
                "isText": true,
                "fileName": "notes.txt"
            }
        }));
        let conversation = build_conversation(&req).unwrap();
        assert_eq!(
            conversation[0].content,
            MessageContent::Text("File contents of notes.txt:\n\nQ1 rose 10%\n\nSummarize".into())
        );
    }

    #[test]
    fn image_becomes_inline_data_then_text() {
        let encoded = STANDARD.encode([0x89u8, 0x50, 0x4e, 0x47]);
        let req = request(json!({
            "messages": [
                {"role": "user", "content": "first"},
                {"role": "user", "content": "What is in this chart?"}
            ],
            "fileData": {
                "base64": encoded,
                "mediaType": "image/png",
                "isText": false,
                "fileName": "chart.png"
            }
        }));
        let conversation = build_conversation(&req).unwrap();
        assert_eq!(conversation[0].content, MessageContent::Text("first".into()));
        assert_eq!(
            conversation[1].content,
            MessageContent::Parts(vec![
                ContentPart::InlineData {
                    data: encoded,
                    media_type: "image/png".into()
                },
                ContentPart::Text("What is in this chart?".into()),
            ])
        );
    }

    #[test]
    fn data_url_prefix_is_stripped() {
        let encoded = STANDARD.encode("a,b\n1,2");
        let req = request(json!({
            "messages": [{"role": "user", "content": "Plot it"}],
            "fileData": {
                "base64": format!("data:text/csv;base64,{encoded}"),
                "mediaType": "text/csv",
                "isText": true,
                "fileName": "data.csv"
            }
        }));
        let conversation = build_conversation(&req).unwrap();
        assert_eq!(
            conversation[0].content.text(),
            "File contents of data.csv:\n\na,b\n1,2\n\nPlot it"
        );
    }

    #[test]
    fn missing_base64_rejected() {
        let req = request(json!({
            "messages": [{"role": "user", "content": "Summarize"}],
            "fileData": {"mediaType": "text/plain", "isText": true, "fileName": "a.txt"}
        }));
        assert_eq!(build_conversation(&req), Err(RequestError::MissingFileData));
    }

    #[test]
    fn file_on_empty_conversation_rejected() {
        let req = request(json!({
            "messages": [],
            "fileData": {"base64": "aGk=", "mediaType": "text/plain", "isText": true, "fileName": "a.txt"}
        }));
        assert_eq!(build_conversation(&req), Err(RequestError::EmptyConversation));
    }

    #[test]
    fn malformed_base64_is_file_error() {
        let req = request(json!({
            "messages": [{"role": "user", "content": "Summarize"}],
            "fileData": {"base64": "!!not base64!!", "mediaType": "text/plain", "isText": true, "fileName": "a.txt"}
        }));
        let err = build_conversation(&req).unwrap_err();
        assert!(err.is_file_error(), "unexpected error: {err:?}");
    }

    #[test]
    fn non_utf8_text_is_file_error() {
        let req = request(json!({
            "messages": [{"role": "user", "content": "Summarize"}],
            "fileData": {
                "base64": STANDARD.encode([0xffu8, 0xfe, 0xfd]),
                "mediaType": "text/plain",
                "isText": true,
                "fileName": "a.txt"
            }
        }));
        assert!(build_conversation(&req).unwrap_err().is_file_error());
    }

    #[test]
    fn unsupported_media_type_is_file_error() {
        let req = request(json!({
            "messages": [{"role": "user", "content": "Read this"}],
            "fileData": {"base64": "aGk=", "mediaType": "application/pdf", "isText": false, "fileName": "a.pdf"}
        }));
        assert_eq!(
            build_conversation(&req),
            Err(RequestError::FileProcessing("Unsupported file type: application/pdf".into()))
        );
    }
}
