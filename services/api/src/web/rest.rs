//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the note endpoints and the master
//! definition for the OpenAPI specification.

use crate::error::ApiError;
use crate::web::extract::{ApiJson, ApiPath};
use crate::web::state::AppState;
use crate::web::{auth, released, settings, uploads};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{DateTime, Utc};
use legacy_notes_core::domain::{NewNote, Note, NoteUpdate};
use legacy_notes_core::validation::{validate_new_note, validate_note};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        list_notes_handler,
        create_note_handler,
        update_note_handler,
        delete_note_handler,
        settings::get_settings_handler,
        settings::update_settings_handler,
        settings::check_in_handler,
        settings::test_reminder_handler,
        uploads::request_upload_url_handler,
        released::unlock_released_note_handler,
        auth::signup_handler,
        auth::login_handler,
        auth::logout_handler,
    ),
    components(
        schemas(
            NoteResponse,
            CreateNoteRequest,
            UpdateNoteRequest,
            settings::SettingsResponse,
            settings::UpdateSettingsRequest,
            settings::MessageResponse,
            uploads::UploadRequest,
            uploads::UploadResponse,
            released::UnlockRequest,
            released::ReleasedNoteResponse,
            auth::SignupRequest,
            auth::LoginRequest,
            auth::AuthResponse,
        )
    ),
    tags(
        (name = "LegacyNotes API", description = "Notes delivered to your people if you stop checking in.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// A note as returned to its owner.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NoteResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub recipient_email: Option<String>,
    pub recipient_phone: Option<String>,
    pub title: String,
    pub content: String,
    pub attachments: Vec<String>,
    pub folder: String,
    pub access_code: Option<String>,
    pub access_hint: Option<String>,
    pub is_released: bool,
    pub created_at: DateTime<Utc>,
    pub last_edited: DateTime<Utc>,
}

impl From<Note> for NoteResponse {
    fn from(note: Note) -> Self {
        Self {
            id: note.id,
            user_id: note.user_id,
            recipient_email: note.recipient_email,
            recipient_phone: note.recipient_phone,
            title: note.title,
            content: note.content,
            attachments: note.attachments,
            folder: note.folder,
            access_code: note.access_code,
            access_hint: note.access_hint,
            is_released: note.is_released,
            created_at: note.created_at,
            last_edited: note.last_edited,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateNoteRequest {
    #[serde(default)]
    pub recipient_email: Option<String>,
    #[serde(default)]
    pub recipient_phone: Option<String>,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub attachments: Vec<String>,
    #[serde(default)]
    pub folder: Option<String>,
    #[serde(default)]
    pub access_code: Option<String>,
    #[serde(default)]
    pub access_hint: Option<String>,
}

impl From<CreateNoteRequest> for NewNote {
    fn from(req: CreateNoteRequest) -> Self {
        NewNote {
            recipient_email: req.recipient_email,
            recipient_phone: req.recipient_phone,
            title: req.title,
            content: req.content,
            attachments: req.attachments,
            folder: req.folder,
            access_code: req.access_code,
            access_hint: req.access_hint,
        }
    }
}

/// Every field is optional; an empty string clears an optional field.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNoteRequest {
    pub recipient_email: Option<String>,
    pub recipient_phone: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub attachments: Option<Vec<String>>,
    pub folder: Option<String>,
    pub access_code: Option<String>,
    pub access_hint: Option<String>,
}

impl From<UpdateNoteRequest> for NoteUpdate {
    fn from(req: UpdateNoteRequest) -> Self {
        NoteUpdate {
            recipient_email: req.recipient_email,
            recipient_phone: req.recipient_phone,
            title: req.title,
            content: req.content,
            attachments: req.attachments,
            folder: req.folder,
            access_code: req.access_code,
            access_hint: req.access_hint,
        }
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// List the caller's notes, oldest first.
#[utoipa::path(
    get,
    path = "/api/notes",
    responses(
        (status = 200, description = "The caller's notes", body = [NoteResponse]),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn list_notes_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Json<Vec<NoteResponse>>, ApiError> {
    let notes = app_state.db.list_notes(user_id).await?;
    Ok(Json(notes.into_iter().map(NoteResponse::from).collect()))
}

/// Create a note. At least one of `recipientEmail` / `recipientPhone` is required.
#[utoipa::path(
    post,
    path = "/api/notes",
    request_body = CreateNoteRequest,
    responses(
        (status = 201, description = "Note created", body = NoteResponse),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn create_note_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    ApiJson(req): ApiJson<CreateNoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let new_note = NewNote::from(req).normalized();
    validate_new_note(&new_note)?;

    let note = app_state.db.create_note(user_id, new_note).await?;
    info!("User {} created note {}", user_id, note.id);
    Ok((StatusCode::CREATED, Json(NoteResponse::from(note))))
}

/// Partially update one of the caller's notes.
#[utoipa::path(
    patch,
    path = "/api/notes/{id}",
    request_body = UpdateNoteRequest,
    params(("id" = Uuid, Path, description = "Note id")),
    responses(
        (status = 200, description = "Note updated", body = NoteResponse),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "No such note owned by the caller")
    )
)]
pub async fn update_note_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    ApiPath(note_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateNoteRequest>,
) -> Result<Json<NoteResponse>, ApiError> {
    let mut note = app_state.db.get_note(user_id, note_id).await?;
    note.apply(req.into(), Utc::now());
    validate_note(&note)?;

    let saved = app_state.db.update_note(&note).await?;
    Ok(Json(NoteResponse::from(saved)))
}

/// Permanently delete one of the caller's notes.
#[utoipa::path(
    delete,
    path = "/api/notes/{id}",
    params(("id" = Uuid, Path, description = "Note id")),
    responses(
        (status = 204, description = "Note deleted"),
        (status = 404, description = "No such note owned by the caller")
    )
)]
pub async fn delete_note_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    ApiPath(note_id): ApiPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    app_state.db.delete_note(user_id, note_id).await?;
    info!("User {} deleted note {}", user_id, note_id);
    Ok(StatusCode::NO_CONTENT)
}
