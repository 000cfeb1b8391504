//! services/api/src/adapters/memory.rs
//!
//! An in-process implementation of the `DatabaseService` port. Used by the
//! integration tests and handy for running the service without PostgreSQL.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use legacy_notes_core::domain::{
    DeliveryChannel, NewNote, Note, User, UserCredentials, UserSettings, DEFAULT_FOLDER,
};
use legacy_notes_core::ports::{DatabaseService, PortError, PortResult};
use legacy_notes_core::Status;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, UserCredentials>,
    auth_sessions: HashMap<String, (Uuid, DateTime<Utc>)>,
    // Insertion order doubles as creation order.
    notes: Vec<Note>,
    settings: HashMap<Uuid, UserSettings>,
}

#[derive(Default)]
pub struct InMemoryDb {
    tables: RwLock<Tables>,
}

impl InMemoryDb {
    pub fn new() -> Self {
        Self::default()
    }
}

fn note_not_found(note_id: Uuid) -> PortError {
    PortError::NotFound(format!("Note {} not found", note_id))
}

/// The columns `save_job_progress` conditions on in the SQL adapter.
fn unchanged_since(stored: &UserSettings, seen: &UserSettings) -> bool {
    stored.status == seen.status
        && stored.last_check_in == seen.last_check_in
        && stored.check_in_frequency_days == seen.check_in_frequency_days
        && stored.release_delay_days == seen.release_delay_days
        && !stored.is_vacation_mode
        && stored.last_notification_sent == seen.last_notification_sent
}

#[async_trait]
impl DatabaseService for InMemoryDb {
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == email) {
            return Err(PortError::Validation(
                "An account with this email already exists".to_string(),
            ));
        }
        let user_id = Uuid::new_v4();
        tables.users.insert(
            user_id,
            UserCredentials {
                user_id,
                email: email.to_string(),
                hashed_password: hashed_password.to_string(),
            },
        );
        Ok(User {
            user_id,
            email: Some(email.to_string()),
        })
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        self.tables
            .read()
            .await
            .users
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", email)))
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        self.tables
            .write()
            .await
            .auth_sessions
            .insert(session_id.to_string(), (user_id, expires_at));
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        match self.tables.read().await.auth_sessions.get(session_id) {
            Some((user_id, expires_at)) if *expires_at > Utc::now() => Ok(*user_id),
            _ => Err(PortError::Unauthorized),
        }
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.tables.write().await.auth_sessions.remove(session_id);
        Ok(())
    }

    async fn list_notes(&self, user_id: Uuid) -> PortResult<Vec<Note>> {
        Ok(self
            .tables
            .read()
            .await
            .notes
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn get_note(&self, user_id: Uuid, note_id: Uuid) -> PortResult<Note> {
        self.tables
            .read()
            .await
            .notes
            .iter()
            .find(|n| n.id == note_id && n.user_id == user_id)
            .cloned()
            .ok_or_else(|| note_not_found(note_id))
    }

    async fn create_note(&self, user_id: Uuid, note: NewNote) -> PortResult<Note> {
        let now = Utc::now();
        let created = Note {
            id: Uuid::new_v4(),
            user_id,
            recipient_email: note.recipient_email,
            recipient_phone: note.recipient_phone,
            title: note.title,
            content: note.content,
            attachments: note.attachments,
            folder: note.folder.unwrap_or_else(|| DEFAULT_FOLDER.to_string()),
            access_code: note.access_code,
            access_hint: note.access_hint,
            is_released: false,
            email_settled_at: None,
            sms_settled_at: None,
            created_at: now,
            last_edited: now,
        };
        self.tables.write().await.notes.push(created.clone());
        Ok(created)
    }

    async fn update_note(&self, note: &Note) -> PortResult<Note> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .notes
            .iter_mut()
            .find(|n| n.id == note.id && n.user_id == note.user_id)
            .ok_or_else(|| note_not_found(note.id))?;
        // Identity, ownership and delivery state are not editable.
        *stored = Note {
            id: stored.id,
            user_id: stored.user_id,
            is_released: stored.is_released,
            email_settled_at: stored.email_settled_at,
            sms_settled_at: stored.sms_settled_at,
            created_at: stored.created_at,
            ..note.clone()
        };
        Ok(stored.clone())
    }

    async fn delete_note(&self, user_id: Uuid, note_id: Uuid) -> PortResult<()> {
        let mut tables = self.tables.write().await;
        let before = tables.notes.len();
        tables
            .notes
            .retain(|n| !(n.id == note_id && n.user_id == user_id));
        if tables.notes.len() == before {
            return Err(note_not_found(note_id));
        }
        Ok(())
    }

    async fn list_unreleased_notes(&self, user_id: Uuid) -> PortResult<Vec<Note>> {
        Ok(self
            .tables
            .read()
            .await
            .notes
            .iter()
            .filter(|n| n.user_id == user_id && !n.is_released)
            .cloned()
            .collect())
    }

    async fn mark_channel_settled(
        &self,
        note_id: Uuid,
        channel: DeliveryChannel,
        at: DateTime<Utc>,
    ) -> PortResult<()> {
        let mut tables = self.tables.write().await;
        let note = tables
            .notes
            .iter_mut()
            .find(|n| n.id == note_id)
            .ok_or_else(|| note_not_found(note_id))?;
        match channel {
            DeliveryChannel::Email => note.email_settled_at = Some(at),
            DeliveryChannel::Sms => note.sms_settled_at = Some(at),
        }
        Ok(())
    }

    async fn mark_note_released(&self, note_id: Uuid) -> PortResult<()> {
        if let Some(note) = self
            .tables
            .write()
            .await
            .notes
            .iter_mut()
            .find(|n| n.id == note_id)
        {
            note.is_released = true;
        }
        Ok(())
    }

    async fn get_released_note(&self, note_id: Uuid) -> PortResult<Note> {
        self.tables
            .read()
            .await
            .notes
            .iter()
            .find(|n| n.id == note_id && n.is_released)
            .cloned()
            .ok_or_else(|| note_not_found(note_id))
    }

    async fn get_or_create_settings(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> PortResult<UserSettings> {
        Ok(self
            .tables
            .write()
            .await
            .settings
            .entry(user_id)
            .or_insert_with(|| UserSettings::defaults(user_id, now))
            .clone())
    }

    async fn check_in(&self, user_id: Uuid, now: DateTime<Utc>) -> PortResult<UserSettings> {
        self.update_settings_with(user_id, now, &|settings: &mut UserSettings| {
            settings.check_in(now)
        })
        .await
    }

    async fn update_settings_with(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
        change: &(dyn for<'s> Fn(&'s mut UserSettings) + Send + Sync),
    ) -> PortResult<UserSettings> {
        let mut tables = self.tables.write().await;
        let settings = tables
            .settings
            .entry(user_id)
            .or_insert_with(|| UserSettings::defaults(user_id, now));
        change(settings);
        Ok(settings.clone())
    }

    async fn save_job_progress(
        &self,
        seen: &UserSettings,
        status: Status,
        last_notification_sent: Option<DateTime<Utc>>,
    ) -> PortResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.settings.get_mut(&seen.user_id) {
            Some(stored) if unchanged_since(stored, seen) => {
                stored.status = status;
                stored.last_notification_sent = last_notification_sent;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_settings(&self) -> PortResult<Vec<UserSettings>> {
        Ok(self.tables.read().await.settings.values().cloned().collect())
    }
}
