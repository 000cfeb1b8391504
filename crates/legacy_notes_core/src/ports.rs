//! crates/legacy_notes_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or
//! SMS providers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    DeliveryChannel, NewNote, Note, UploadTarget, User, UserCredentials, UserSettings,
};
use crate::status::Status;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Auth Methods ---
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    // --- Note Management ---
    async fn list_notes(&self, user_id: Uuid) -> PortResult<Vec<Note>>;

    /// Fetches a note only if `user_id` owns it; `NotFound` otherwise.
    async fn get_note(&self, user_id: Uuid, note_id: Uuid) -> PortResult<Note>;

    async fn create_note(&self, user_id: Uuid, note: NewNote) -> PortResult<Note>;

    /// Persists every editable field of `note`, matched on both id and owner.
    async fn update_note(&self, note: &Note) -> PortResult<Note>;

    /// Deletes the note if `user_id` owns it; `NotFound` otherwise.
    async fn delete_note(&self, user_id: Uuid, note_id: Uuid) -> PortResult<()>;

    async fn list_unreleased_notes(&self, user_id: Uuid) -> PortResult<Vec<Note>>;

    /// Records that `channel` of the note needs no further attempts.
    async fn mark_channel_settled(
        &self,
        note_id: Uuid,
        channel: DeliveryChannel,
        at: DateTime<Utc>,
    ) -> PortResult<()>;

    async fn mark_note_released(&self, note_id: Uuid) -> PortResult<()>;

    /// Fetches a note by id only once it has been released.
    async fn get_released_note(&self, note_id: Uuid) -> PortResult<Note>;

    // --- Settings Management ---
    /// Returns the user's settings, inserting the defaults on first access.
    async fn get_or_create_settings(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> PortResult<UserSettings>;

    /// Restarts the inactivity clock and resets the status to active in a
    /// single write, creating the row if needed.
    async fn check_in(&self, user_id: Uuid, now: DateTime<Utc>) -> PortResult<UserSettings>;

    /// Read-modify-write of the user's settings row under a row lock, so
    /// concurrent writers can't lose each other's changes.
    async fn update_settings_with(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
        change: &(dyn for<'s> Fn(&'s mut UserSettings) + Send + Sync),
    ) -> PortResult<UserSettings>;

    /// Writes the fields the release job owns (`status` and
    /// `last_notification_sent`), but only if the row still matches `seen`.
    ///
    /// Returns `false` when a check-in or settings change landed after `seen`
    /// was read; nothing is written in that case.
    async fn save_job_progress(
        &self,
        seen: &UserSettings,
        status: Status,
        last_notification_sent: Option<DateTime<Utc>>,
    ) -> PortResult<bool>;

    async fn list_settings(&self) -> PortResult<Vec<UserSettings>>;
}

/// Outbound SMS.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// Sends `message` to `phone_number`. An unconfigured provider is a no-op.
    async fn send(&self, phone_number: &str, message: &str) -> PortResult<()>;
}

/// Outbound email.
#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> PortResult<()>;
}

/// Produces pre-signed parameters for uploading an attachment to object storage.
pub trait UploadSigner: Send + Sync {
    fn sign_upload(
        &self,
        user_id: Uuid,
        file_name: &str,
        content_type: &str,
        now: DateTime<Utc>,
    ) -> PortResult<UploadTarget>;
}
