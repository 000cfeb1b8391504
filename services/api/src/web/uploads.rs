//! services/api/src/web/uploads.rs
//!
//! Hands out pre-signed upload parameters so attachment bytes go straight to
//! object storage and never through this service.

use crate::error::ApiError;
use crate::web::extract::ApiJson;
use crate::web::state::AppState;
use axum::{extract::State, response::Json, Extension};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    pub name: String,
    #[serde(default = "default_content_type")]
    pub content_type: String,
}

fn default_content_type() -> String {
    "application/octet-stream".to_string()
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub url: String,
    pub method: String,
    pub headers: BTreeMap<String, String>,
    /// The value to store in a note's `attachments` once the upload succeeds.
    pub object_path: String,
    pub expires_at: DateTime<Utc>,
}

/// Request a pre-signed URL for uploading one attachment.
#[utoipa::path(
    post,
    path = "/api/uploads/request-url",
    request_body = UploadRequest,
    responses(
        (status = 200, description = "Upload parameters", body = UploadResponse),
        (status = 400, description = "Missing file name")
    )
)]
pub async fn request_upload_url_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    ApiJson(req): ApiJson<UploadRequest>,
) -> Result<Json<UploadResponse>, ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::BadRequest("File name is required".to_string()));
    }

    let target = app_state
        .uploads
        .sign_upload(user_id, &req.name, &req.content_type, Utc::now())?;

    Ok(Json(UploadResponse {
        url: target.url,
        method: target.method,
        headers: target.headers.into_iter().collect(),
        object_path: target.object_path,
        expires_at: target.expires_at,
    }))
}
