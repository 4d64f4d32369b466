//! Chat request handler: conversation in, narrative plus chart out.
//!
//! `POST /api/chat`:
//! 1. Validates `messages` and splices an optional file into the last message
//! 2. Prepends the chart system prompt
//! 3. Calls the configured model once
//! 4. Normalizes any chart in the reply and returns it with the narrative

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::header;
use axum::response::IntoResponse;
use chartline_core::prompt;
use chartline_core::provider::CompletionRequest;
use chartline_core::reply::ChatReply;
use chartline_core::request::{self, ChatRequest};
use serde_json::Value;
use tracing::{Instrument, debug, info, info_span};
use uuid::Uuid;

use crate::AppState;
use crate::error::{AppError, AppResult};

/// `POST /api/chat`: run one chat turn through the model.
pub async fn chat_handler(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(body) = payload.map_err(|e| AppError::Validation(e.body_text()))?;
    let request = ChatRequest::from_value(body)?;

    let span = info_span!(
        "chat",
        request_id = %Uuid::new_v4(),
        model_hint = request.model.as_deref().unwrap_or("default"),
        provider = state.model.name(),
    );

    let reply = run_chat(&state, &request).instrument(span).await?;

    Ok(([(header::CACHE_CONTROL, "no-store")], Json(reply)))
}

async fn run_chat(state: &AppState, request: &ChatRequest) -> AppResult<ChatReply> {
    let conversation = request::build_conversation(request)?;
    debug!(
        messages = conversation.len(),
        has_file = request.file_data.is_some(),
        "conversation normalized"
    );

    let completion = CompletionRequest {
        messages: prompt::assemble(conversation),
        params: state.params.clone(),
    };
    let raw = state.model.complete(&completion).await?;
    debug!(bytes = raw.len(), "model replied");

    let reply = ChatReply::from_model_output(&raw)?;
    info!(has_chart = reply.has_tool_use, "chat request completed");
    Ok(reply)
}
