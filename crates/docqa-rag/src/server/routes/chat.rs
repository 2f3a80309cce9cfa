//! Chat endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use uuid::Uuid;

use crate::error::Result;
use crate::server::session::Session;
use crate::server::state::AppState;
use crate::types::{ChatRequest, TranscriptResponse};

fn transcript(session: &Session) -> TranscriptResponse {
    TranscriptResponse {
        messages: session.chat.display().to_vec(),
    }
}

/// GET /api/sessions/:id/chat - Current transcript
pub async fn get_transcript(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TranscriptResponse>> {
    let session = state.sessions().get(id)?;
    let session = session.lock().await;
    Ok(Json(transcript(&session)))
}

/// POST /api/sessions/:id/chat - Send a message
///
/// Returns the answer; a blank message is a no-op answered with 204.
pub async fn send_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ChatRequest>,
) -> Result<Response> {
    let session = state.sessions().get(id)?;
    let mut session = session.lock().await;

    if request.message.trim().is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let engine = session.engine()?.clone();
    match session.chat.process_user_input(&engine, &request.message).await? {
        Some(response) => Ok(Json(response).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

/// DELETE /api/sessions/:id/chat - Clear the transcript
pub async fn clear_transcript(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TranscriptResponse>> {
    let session = state.sessions().get(id)?;
    let mut session = session.lock().await;
    session.chat.clear_chat_history();
    Ok(Json(transcript(&session)))
}
