//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use legacy_notes_core::domain::{
    DeliveryChannel, NewNote, Note, User, UserCredentials, UserSettings, DEFAULT_FOLDER,
};
use legacy_notes_core::ports::{DatabaseService, PortError, PortResult};
use legacy_notes_core::Status;
use sqlx::{FromRow, PgExecutor, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

/// Inserts the default settings row unless the user already has one.
async fn insert_default_settings<'e, E: PgExecutor<'e>>(
    executor: E,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> PortResult<()> {
    let defaults = UserSettings::defaults(user_id, now);
    sqlx::query(
        "INSERT INTO user_settings (user_id, check_in_frequency_days, release_delay_days, \
         last_check_in, is_vacation_mode, status) VALUES ($1, $2, $3, $4, $5, $6) \
         ON CONFLICT (user_id) DO NOTHING",
    )
    .bind(defaults.user_id)
    .bind(defaults.check_in_frequency_days)
    .bind(defaults.release_delay_days)
    .bind(defaults.last_check_in)
    .bind(defaults.is_vacation_mode)
    .bind(defaults.status.as_str())
    .execute(executor)
    .await
    .map_err(unexpected)?;
    Ok(())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

const NOTE_COLUMNS: &str = "id, user_id, recipient_email, recipient_phone, title, content, \
     attachments, folder, access_code, access_hint, is_released, email_settled_at, \
     sms_settled_at, created_at, last_edited";

const SETTINGS_COLUMNS: &str = "user_id, check_in_frequency_days, release_delay_days, \
     last_check_in, last_notification_sent, notification_phone, is_vacation_mode, status";

#[derive(FromRow)]
struct UserRecord {
    user_id: Uuid,
    email: Option<String>,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            user_id: self.user_id,
            email: self.email,
        }
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    user_id: Uuid,
    email: String,
    hashed_password: String,
}

#[derive(FromRow)]
struct NoteRecord {
    id: Uuid,
    user_id: Uuid,
    recipient_email: Option<String>,
    recipient_phone: Option<String>,
    title: String,
    content: String,
    attachments: Vec<String>,
    folder: String,
    access_code: Option<String>,
    access_hint: Option<String>,
    is_released: bool,
    email_settled_at: Option<DateTime<Utc>>,
    sms_settled_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    last_edited: DateTime<Utc>,
}
impl NoteRecord {
    fn to_domain(self) -> Note {
        Note {
            id: self.id,
            user_id: self.user_id,
            recipient_email: self.recipient_email,
            recipient_phone: self.recipient_phone,
            title: self.title,
            content: self.content,
            attachments: self.attachments,
            folder: self.folder,
            access_code: self.access_code,
            access_hint: self.access_hint,
            is_released: self.is_released,
            email_settled_at: self.email_settled_at,
            sms_settled_at: self.sms_settled_at,
            created_at: self.created_at,
            last_edited: self.last_edited,
        }
    }
}

#[derive(FromRow)]
struct SettingsRecord {
    user_id: Uuid,
    check_in_frequency_days: i32,
    release_delay_days: i32,
    last_check_in: DateTime<Utc>,
    last_notification_sent: Option<DateTime<Utc>>,
    notification_phone: Option<String>,
    is_vacation_mode: bool,
    status: String,
}
impl SettingsRecord {
    fn to_domain(self) -> PortResult<UserSettings> {
        let status = self
            .status
            .parse::<Status>()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(UserSettings {
            user_id: self.user_id,
            check_in_frequency_days: self.check_in_frequency_days,
            release_delay_days: self.release_delay_days,
            last_check_in: self.last_check_in,
            last_notification_sent: self.last_notification_sent,
            notification_phone: self.notification_phone,
            is_vacation_mode: self.is_vacation_mode,
            status,
        })
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (user_id, email, hashed_password) VALUES ($1, $2, $3) \
             RETURNING user_id, email",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                PortError::Validation("An account with this email already exists".to_string())
            }
            _ => unexpected(e),
        })?;
        Ok(record.to_domain())
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT user_id, email, hashed_password FROM users \
             WHERE email = $1 AND hashed_password IS NOT NULL",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("User {} not found", email)),
            _ => unexpected(e),
        })?;
        Ok(UserCredentials {
            user_id: record.user_id,
            email: record.email,
            hashed_password: record.hashed_password,
        })
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let user_id: Option<Uuid> = sqlx::query_scalar(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > NOW()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        user_id.ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn list_notes(&self, user_id: Uuid) -> PortResult<Vec<Note>> {
        let records = sqlx::query_as::<_, NoteRecord>(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes WHERE user_id = $1 ORDER BY created_at ASC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_note(&self, user_id: Uuid, note_id: Uuid) -> PortResult<Note> {
        let record = sqlx::query_as::<_, NoteRecord>(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes WHERE id = $1 AND user_id = $2"
        ))
        .bind(note_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("Note {} not found", note_id)),
            _ => unexpected(e),
        })?;
        Ok(record.to_domain())
    }

    async fn create_note(&self, user_id: Uuid, note: NewNote) -> PortResult<Note> {
        let record = sqlx::query_as::<_, NoteRecord>(&format!(
            "INSERT INTO notes (id, user_id, recipient_email, recipient_phone, title, content, \
             attachments, folder, access_code, access_hint) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {NOTE_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(note.recipient_email)
        .bind(note.recipient_phone)
        .bind(note.title)
        .bind(note.content)
        .bind(note.attachments)
        .bind(note.folder.unwrap_or_else(|| DEFAULT_FOLDER.to_string()))
        .bind(note.access_code)
        .bind(note.access_hint)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn update_note(&self, note: &Note) -> PortResult<Note> {
        let record = sqlx::query_as::<_, NoteRecord>(&format!(
            "UPDATE notes SET recipient_email = $3, recipient_phone = $4, title = $5, \
             content = $6, attachments = $7, folder = $8, access_code = $9, access_hint = $10, \
             last_edited = $11 \
             WHERE id = $1 AND user_id = $2 RETURNING {NOTE_COLUMNS}"
        ))
        .bind(note.id)
        .bind(note.user_id)
        .bind(&note.recipient_email)
        .bind(&note.recipient_phone)
        .bind(&note.title)
        .bind(&note.content)
        .bind(&note.attachments)
        .bind(&note.folder)
        .bind(&note.access_code)
        .bind(&note.access_hint)
        .bind(note.last_edited)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        record
            .map(NoteRecord::to_domain)
            .ok_or_else(|| PortError::NotFound(format!("Note {} not found", note.id)))
    }

    async fn delete_note(&self, user_id: Uuid, note_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM notes WHERE id = $1 AND user_id = $2")
            .bind(note_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Note {} not found", note_id)));
        }
        Ok(())
    }

    async fn list_unreleased_notes(&self, user_id: Uuid) -> PortResult<Vec<Note>> {
        let records = sqlx::query_as::<_, NoteRecord>(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes WHERE user_id = $1 AND NOT is_released \
             ORDER BY created_at ASC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn mark_channel_settled(
        &self,
        note_id: Uuid,
        channel: DeliveryChannel,
        at: DateTime<Utc>,
    ) -> PortResult<()> {
        let column = match channel {
            DeliveryChannel::Email => "email_settled_at",
            DeliveryChannel::Sms => "sms_settled_at",
        };
        let result = sqlx::query(&format!("UPDATE notes SET {column} = $2 WHERE id = $1"))
            .bind(note_id)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Note {} not found", note_id)));
        }
        Ok(())
    }

    async fn mark_note_released(&self, note_id: Uuid) -> PortResult<()> {
        sqlx::query("UPDATE notes SET is_released = TRUE WHERE id = $1")
            .bind(note_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn get_released_note(&self, note_id: Uuid) -> PortResult<Note> {
        let record = sqlx::query_as::<_, NoteRecord>(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes WHERE id = $1 AND is_released"
        ))
        .bind(note_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        record
            .map(NoteRecord::to_domain)
            .ok_or_else(|| PortError::NotFound(format!("Note {} not found", note_id)))
    }

    async fn get_or_create_settings(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> PortResult<UserSettings> {
        insert_default_settings(&self.pool, user_id, now).await?;

        let record = sqlx::query_as::<_, SettingsRecord>(&format!(
            "SELECT {SETTINGS_COLUMNS} FROM user_settings WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        record.to_domain()
    }

    async fn check_in(&self, user_id: Uuid, now: DateTime<Utc>) -> PortResult<UserSettings> {
        let defaults = UserSettings::defaults(user_id, now);
        let record = sqlx::query_as::<_, SettingsRecord>(&format!(
            "INSERT INTO user_settings (user_id, check_in_frequency_days, release_delay_days, \
             last_check_in, is_vacation_mode, status) VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (user_id) DO UPDATE SET \
             last_check_in = EXCLUDED.last_check_in, status = EXCLUDED.status \
             RETURNING {SETTINGS_COLUMNS}"
        ))
        .bind(defaults.user_id)
        .bind(defaults.check_in_frequency_days)
        .bind(defaults.release_delay_days)
        .bind(defaults.last_check_in)
        .bind(defaults.is_vacation_mode)
        .bind(Status::Active.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        record.to_domain()
    }

    async fn update_settings_with(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
        change: &(dyn for<'s> Fn(&'s mut UserSettings) + Send + Sync),
    ) -> PortResult<UserSettings> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        insert_default_settings(&mut *tx, user_id, now).await?;

        let mut settings = sqlx::query_as::<_, SettingsRecord>(&format!(
            "SELECT {SETTINGS_COLUMNS} FROM user_settings WHERE user_id = $1 FOR UPDATE"
        ))
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(unexpected)?
        .to_domain()?;
        change(&mut settings);

        let record = sqlx::query_as::<_, SettingsRecord>(&format!(
            "UPDATE user_settings SET check_in_frequency_days = $2, release_delay_days = $3, \
             last_check_in = $4, last_notification_sent = $5, notification_phone = $6, \
             is_vacation_mode = $7, status = $8 \
             WHERE user_id = $1 RETURNING {SETTINGS_COLUMNS}"
        ))
        .bind(user_id)
        .bind(settings.check_in_frequency_days)
        .bind(settings.release_delay_days)
        .bind(settings.last_check_in)
        .bind(settings.last_notification_sent)
        .bind(&settings.notification_phone)
        .bind(settings.is_vacation_mode)
        .bind(settings.status.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;
        record.to_domain()
    }

    async fn save_job_progress(
        &self,
        seen: &UserSettings,
        status: Status,
        last_notification_sent: Option<DateTime<Utc>>,
    ) -> PortResult<bool> {
        let result = sqlx::query(
            "UPDATE user_settings SET status = $2, last_notification_sent = $3 \
             WHERE user_id = $1 AND status = $4 AND last_check_in = $5 \
             AND check_in_frequency_days = $6 AND release_delay_days = $7 \
             AND NOT is_vacation_mode \
             AND last_notification_sent IS NOT DISTINCT FROM $8",
        )
        .bind(seen.user_id)
        .bind(status.as_str())
        .bind(last_notification_sent)
        .bind(seen.status.as_str())
        .bind(seen.last_check_in)
        .bind(seen.check_in_frequency_days)
        .bind(seen.release_delay_days)
        .bind(seen.last_notification_sent)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(result.rows_affected() == 1)
    }

    async fn list_settings(&self) -> PortResult<Vec<UserSettings>> {
        let records = sqlx::query_as::<_, SettingsRecord>(&format!(
            "SELECT {SETTINGS_COLUMNS} FROM user_settings"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(SettingsRecord::to_domain).collect()
    }
}
