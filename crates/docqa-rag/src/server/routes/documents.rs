//! Document upload endpoints

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{Document, DocumentSummary, FileType};

/// POST /api/sessions/:id/document - Upload and index a PDF
///
/// Multipart fields: `file` (required) and `collection` (optional name
/// override). The new document becomes the session's active document, and
/// the transcript is reset, only when processing succeeds.
pub async fn upload_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<DocumentSummary>> {
    let session = state.sessions().get(id)?;
    let mut session = session.lock().await;
    let providers = session.providers()?.clone();

    let mut upload: Option<Document> = None;
    let mut collection: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        Error::Internal(format!("Failed to read multipart field: {}", e))
    })? {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "collection" => {
                let value = field.text().await.map_err(|e| {
                    Error::Internal(format!("Failed to read collection name: {}", e))
                })?;
                let value = value.trim();
                if !value.is_empty() {
                    collection = Some(value.to_string());
                }
            }
            "file" => {
                let filename = field
                    .file_name()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "upload.pdf".to_string());
                let data = field.bytes().await.map_err(|e| {
                    Error::Internal(format!("Failed to read file: {}", e))
                })?;
                upload = Some(Document::new(filename, data));
            }
            other => tracing::debug!("Ignoring multipart field '{}'", other),
        }
    }

    let document = upload
        .ok_or_else(|| Error::Config("multipart field 'file' is required".to_string()))?;
    if document.file_type != FileType::Pdf {
        return Err(Error::UnsupportedFileType(document.filename.clone()));
    }
    if !document.looks_like_pdf() {
        return Err(Error::parse(&document.filename, "file is not a valid PDF"));
    }

    tracing::info!(
        "Session {} uploaded {} ({} bytes)",
        id,
        document.filename,
        document.size()
    );

    let processed = state
        .processor(providers)
        .process_document(&document, collection.as_deref())
        .await?;
    let summary = processed.summary.clone();
    session.set_active_document(processed);
    session.chat.clear_chat_history();

    Ok(Json(summary))
}

/// DELETE /api/sessions/:id/document - Forget the active document
///
/// The transcript goes with it; the collection stays in the store.
pub async fn clear_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    let session = state.sessions().get(id)?;
    let mut session = session.lock().await;

    match session.clear_active_document() {
        Some(_) => {
            session.chat.clear_chat_history();
            Ok(StatusCode::NO_CONTENT)
        }
        None => Err(Error::NoActiveDocument),
    }
}
