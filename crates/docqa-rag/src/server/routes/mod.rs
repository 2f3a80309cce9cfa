//! API routes for the document Q&A server

pub mod chat;
pub mod collections;
pub mod documents;
pub mod query;
pub mod sessions;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        // Session lifecycle
        .route("/sessions", post(sessions::create_session))
        .route(
            "/sessions/:id",
            get(sessions::get_session).delete(sessions::delete_session),
        )
        .route("/sessions/:id/credentials", put(sessions::set_credentials))
        // Upload - with larger body limit for PDFs
        .route(
            "/sessions/:id/document",
            post(documents::upload_document)
                .layer(DefaultBodyLimit::max(max_upload_size))
                .delete(documents::clear_document),
        )
        // Single-shot Q&A
        .route("/sessions/:id/query", post(query::query_document))
        // Chat
        .route(
            "/sessions/:id/chat",
            get(chat::get_transcript)
                .post(chat::send_message)
                .delete(chat::clear_transcript),
        )
        .route("/collections", get(collections::list_collections))
        // Info
        .route("/info", get(info))
}

/// API info endpoint
async fn info() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "name": "docqa-rag",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Upload a PDF and ask questions about it with retrieval-augmented generation",
        "endpoints": {
            "POST /api/sessions": "Start a session",
            "GET /api/sessions/:id": "Session status",
            "DELETE /api/sessions/:id": "End a session",
            "PUT /api/sessions/:id/credentials": "Set Gemini and LlamaParse API keys",
            "POST /api/sessions/:id/document": "Upload and index a PDF (multipart field 'file')",
            "DELETE /api/sessions/:id/document": "Forget the active document",
            "POST /api/sessions/:id/query": "Ask a single question",
            "GET /api/sessions/:id/chat": "Chat transcript",
            "POST /api/sessions/:id/chat": "Send a chat message",
            "DELETE /api/sessions/:id/chat": "Clear the chat transcript",
            "GET /api/collections": "List indexed collections"
        }
    }))
}
