//! Session lifecycle and credential endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{Credentials, SessionResponse};

/// POST /api/sessions - Start a session
pub async fn create_session(
    State(state): State<AppState>,
) -> (StatusCode, Json<SessionResponse>) {
    let (_, session) = state.sessions().create();
    let response = session.lock().await.to_response();
    (StatusCode::CREATED, Json(response))
}

/// GET /api/sessions/:id - Session status
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>> {
    let session = state.sessions().get(id)?;
    let session = session.lock().await;
    Ok(Json(session.to_response()))
}

/// DELETE /api/sessions/:id - End a session
pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    if state.sessions().remove(id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::SessionNotFound(id.to_string()))
    }
}

/// PUT /api/sessions/:id/credentials - Set both API keys
///
/// An active document is rebound to the new providers; on any failure the
/// session keeps its previous keys.
pub async fn set_credentials(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<SessionResponse>> {
    let credentials = credentials.validated()?;
    let session = state.sessions().get(id)?;
    let mut session = session.lock().await;

    let providers = state.factory().build(&credentials)?;

    let rebound = match session.active_document() {
        Some(active) => {
            let mut document = active.clone();
            document.engine = state
                .processor(providers.clone())
                .open_engine(&active.summary.collection)?;
            Some(document)
        }
        None => None,
    };

    session.set_credentials(credentials, providers);
    if let Some(document) = rebound {
        session.set_active_document(document);
    }

    tracing::info!("Credentials set for session {}", id);
    Ok(Json(session.to_response()))
}
