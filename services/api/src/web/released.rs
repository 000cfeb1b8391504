//! services/api/src/web/released.rs
//!
//! The one public read path: a recipient opening a note after it was released.

use crate::error::ApiError;
use crate::web::extract::{ApiJson, ApiPath};
use crate::web::state::AppState;
use axum::{
    extract::State,
    response::Json,
};
use legacy_notes_core::ports::PortError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UnlockRequest {
    pub access_code: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReleasedNoteResponse {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub attachments: Vec<String>,
    pub folder: String,
}

/// Read a released note, supplying its access code if it has one.
///
/// Unknown, unreleased and wrong-code requests all look the same.
#[utoipa::path(
    post,
    path = "/api/released/{id}/unlock",
    request_body = UnlockRequest,
    params(("id" = Uuid, Path, description = "Note id")),
    responses(
        (status = 200, description = "The note", body = ReleasedNoteResponse),
        (status = 404, description = "Not released, unknown, or wrong code")
    )
)]
pub async fn unlock_released_note_handler(
    State(app_state): State<Arc<AppState>>,
    ApiPath(note_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UnlockRequest>,
) -> Result<Json<ReleasedNoteResponse>, ApiError> {
    let note = app_state.db.get_released_note(note_id).await?;
    if !note.unlocks_with(req.access_code.as_deref()) {
        warn!("Wrong access code for released note {}", note_id);
        return Err(PortError::NotFound(format!("Note {} not found", note_id)).into());
    }

    Ok(Json(ReleasedNoteResponse {
        id: note.id,
        title: note.title,
        content: note.content,
        attachments: note.attachments,
        folder: note.folder,
    }))
}
