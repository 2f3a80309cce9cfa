//! Single-shot question endpoint

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use uuid::Uuid;

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::QueryRequest;

/// POST /api/sessions/:id/query - Ask the active document a question
///
/// A blank question is answered with 204 and no provider call. Single-shot
/// questions do not touch the chat transcript.
pub async fn query_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<QueryRequest>,
) -> Result<Response> {
    let session = state.sessions().get(id)?;
    let session = session.lock().await;

    if request.is_blank() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    tracing::info!("Query: \"{}\"", request.question.trim());
    let response = session.engine()?.query(&request.question).await?;

    Ok(Json(response).into_response())
}
