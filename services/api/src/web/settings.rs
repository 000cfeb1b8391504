//! services/api/src/web/settings.rs
//!
//! Check-in cadence, the check-in action itself, and the manual test reminder.

use crate::error::ApiError;
use crate::web::extract::ApiJson;
use crate::web::state::AppState;
use axum::{extract::State, response::Json, Extension};
use chrono::{DateTime, Utc};
use legacy_notes_core::domain::{SettingsUpdate, UserSettings};
use legacy_notes_core::status;
use legacy_notes_core::validation::validate_settings_update;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

const TEST_REMINDER_MESSAGE: &str =
    "LegacyNotes test reminder: check-in reminders for your account will be sent to this number.";

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SettingsResponse {
    pub user_id: Uuid,
    pub check_in_frequency_days: i32,
    pub release_delay_days: i32,
    pub last_check_in: DateTime<Utc>,
    pub last_notification_sent: Option<DateTime<Utc>>,
    pub notification_phone: Option<String>,
    pub is_vacation_mode: bool,
    /// One of `active`, `warning`, `released`.
    pub status: String,
    /// When the account becomes overdue without another check-in.
    pub next_warning_at: DateTime<Utc>,
    /// When notes are released without another check-in.
    pub release_at: DateTime<Utc>,
}

impl From<UserSettings> for SettingsResponse {
    fn from(settings: UserSettings) -> Self {
        let next_warning_at = status::warning_at(&settings);
        let release_at = status::release_at(&settings);
        Self {
            user_id: settings.user_id,
            check_in_frequency_days: settings.check_in_frequency_days,
            release_delay_days: settings.release_delay_days,
            last_check_in: settings.last_check_in,
            last_notification_sent: settings.last_notification_sent,
            notification_phone: settings.notification_phone,
            is_vacation_mode: settings.is_vacation_mode,
            status: settings.status.to_string(),
            next_warning_at,
            release_at,
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsRequest {
    pub check_in_frequency_days: Option<i32>,
    pub release_delay_days: Option<i32>,
    pub notification_phone: Option<String>,
    pub is_vacation_mode: Option<bool>,
}

impl From<UpdateSettingsRequest> for SettingsUpdate {
    fn from(req: UpdateSettingsRequest) -> Self {
        SettingsUpdate {
            check_in_frequency_days: req.check_in_frequency_days,
            release_delay_days: req.release_delay_days,
            notification_phone: req.notification_phone,
            is_vacation_mode: req.is_vacation_mode,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

/// Get the caller's settings, creating the defaults on first access.
#[utoipa::path(
    get,
    path = "/api/settings",
    responses(
        (status = 200, description = "Current settings", body = SettingsResponse),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn get_settings_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Json<SettingsResponse>, ApiError> {
    let settings = app_state.db.get_or_create_settings(user_id, Utc::now()).await?;
    Ok(Json(settings.into()))
}

/// Merge the provided fields into the caller's settings.
#[utoipa::path(
    patch,
    path = "/api/settings",
    request_body = UpdateSettingsRequest,
    responses(
        (status = 200, description = "Updated settings", body = SettingsResponse),
        (status = 400, description = "A value is out of range or malformed")
    )
)]
pub async fn update_settings_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    ApiJson(req): ApiJson<UpdateSettingsRequest>,
) -> Result<Json<SettingsResponse>, ApiError> {
    let update = SettingsUpdate::from(req);
    validate_settings_update(&update)?;

    let now = Utc::now();
    let saved = app_state
        .db
        .update_settings_with(user_id, now, &|settings: &mut UserSettings| {
            settings.apply(update.clone(), now);
            settings.status = status::advance(settings, now);
        })
        .await?;
    Ok(Json(saved.into()))
}

/// Confirm activity: restarts the inactivity clock and resets the status to active.
#[utoipa::path(
    post,
    path = "/api/check-in",
    responses(
        (status = 200, description = "Checked in", body = SettingsResponse),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn check_in_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Json<SettingsResponse>, ApiError> {
    let saved = app_state.db.check_in(user_id, Utc::now()).await?;
    info!("User {} checked in", user_id);
    Ok(Json(saved.into()))
}

/// Send a test SMS to the configured notification phone.
#[utoipa::path(
    post,
    path = "/api/settings/test-reminder",
    responses(
        (status = 200, description = "Reminder handed to the SMS provider", body = MessageResponse),
        (status = 400, description = "No notification phone configured"),
        (status = 500, description = "The SMS provider rejected the message")
    )
)]
pub async fn test_reminder_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    let settings = app_state.db.get_or_create_settings(user_id, Utc::now()).await?;
    let phone = settings.notification_phone.ok_or_else(|| {
        ApiError::BadRequest("Add a notification phone number first".to_string())
    })?;

    app_state.sms.send(&phone, TEST_REMINDER_MESSAGE).await?;
    Ok(Json(MessageResponse {
        message: "Test reminder sent".to_string(),
    }))
}
