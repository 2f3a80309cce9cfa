//! Collection listing endpoint

use axum::{extract::State, Json};
use serde::Serialize;

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::CollectionInfo;

/// Response for collection list
#[derive(Debug, Serialize)]
pub struct CollectionListResponse {
    pub collections: Vec<CollectionInfo>,
    pub total: usize,
}

/// GET /api/collections - List indexed collections
pub async fn list_collections(
    State(state): State<AppState>,
) -> Result<Json<CollectionListResponse>> {
    let collections = state.store().list_collections()?;
    let total = collections.len();
    Ok(Json(CollectionListResponse { collections, total }))
}
