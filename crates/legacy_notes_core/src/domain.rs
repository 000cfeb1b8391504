//! crates/legacy_notes_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use crate::status::Status;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Folder assigned to notes that don't name one.
pub const DEFAULT_FOLDER: &str = "General";

pub const DEFAULT_CHECK_IN_FREQUENCY_DAYS: i32 = 30;
pub const DEFAULT_RELEASE_DELAY_DAYS: i32 = 7;

// Represents a user - used throughout app
#[derive(Debug, Clone)]
pub struct User {
    pub user_id: Uuid,
    pub email: Option<String>,
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
}

/// A private message waiting to be delivered to its recipients on release.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
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
    /// When the email channel was settled: delivered, or rejected for good.
    pub email_settled_at: Option<DateTime<Utc>>,
    /// Same as `email_settled_at`, for the SMS channel.
    pub sms_settled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub last_edited: DateTime<Utc>,
}

/// A way of reaching a note's recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryChannel {
    Email,
    Sms,
}

impl DeliveryChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryChannel::Email => "email",
            DeliveryChannel::Sms => "sms",
        }
    }
}

impl std::fmt::Display for DeliveryChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Note {
    /// Merges a partial update into this note and bumps `last_edited`.
    ///
    /// Blank strings clear optional fields, so a client can remove a phone
    /// number by sending `""`.
    pub fn apply(&mut self, update: NoteUpdate, now: DateTime<Utc>) {
        if let Some(email) = update.recipient_email {
            self.recipient_email = non_blank(Some(email));
        }
        if let Some(phone) = update.recipient_phone {
            self.recipient_phone = non_blank(Some(phone));
        }
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(content) = update.content {
            self.content = content;
        }
        if let Some(attachments) = update.attachments {
            self.attachments = attachments;
        }
        if let Some(folder) = update.folder {
            self.folder = folder_or_default(Some(folder));
        }
        if let Some(code) = update.access_code {
            self.access_code = non_blank(Some(code));
        }
        if let Some(hint) = update.access_hint {
            self.access_hint = non_blank(Some(hint));
        }
        self.last_edited = now;
    }

    /// Channels that have a recipient and haven't been settled yet, paired
    /// with the address to deliver to.
    pub fn pending_deliveries(&self) -> Vec<(DeliveryChannel, &str)> {
        let mut pending = Vec::new();
        if let (Some(email), None) = (&self.recipient_email, self.email_settled_at) {
            pending.push((DeliveryChannel::Email, email.as_str()));
        }
        if let (Some(phone), None) = (&self.recipient_phone, self.sms_settled_at) {
            pending.push((DeliveryChannel::Sms, phone.as_str()));
        }
        pending
    }

    pub fn is_protected(&self) -> bool {
        self.access_code.is_some()
    }

    /// Checks a recipient-supplied code. Notes without a code are open.
    pub fn unlocks_with(&self, code: Option<&str>) -> bool {
        match &self.access_code {
            None => true,
            Some(expected) => code.map(str::trim) == Some(expected.as_str()),
        }
    }
}

/// The fields a user supplies when creating a note.
#[derive(Debug, Clone, Default)]
pub struct NewNote {
    pub recipient_email: Option<String>,
    pub recipient_phone: Option<String>,
    pub title: String,
    pub content: String,
    pub attachments: Vec<String>,
    pub folder: Option<String>,
    pub access_code: Option<String>,
    pub access_hint: Option<String>,
}

impl NewNote {
    /// Trims optional text fields, turning blanks into `None`, and fills in
    /// the default folder.
    pub fn normalized(self) -> Self {
        Self {
            recipient_email: non_blank(self.recipient_email),
            recipient_phone: non_blank(self.recipient_phone),
            folder: Some(folder_or_default(self.folder)),
            access_code: non_blank(self.access_code),
            access_hint: non_blank(self.access_hint),
            ..self
        }
    }
}

/// A partial note update; `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct NoteUpdate {
    pub recipient_email: Option<String>,
    pub recipient_phone: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub attachments: Option<Vec<String>>,
    pub folder: Option<String>,
    pub access_code: Option<String>,
    pub access_hint: Option<String>,
}

/// Per-user check-in configuration and the last evaluated status.
#[derive(Debug, Clone, PartialEq)]
pub struct UserSettings {
    pub user_id: Uuid,
    pub check_in_frequency_days: i32,
    pub release_delay_days: i32,
    pub last_check_in: DateTime<Utc>,
    pub last_notification_sent: Option<DateTime<Utc>>,
    pub notification_phone: Option<String>,
    pub is_vacation_mode: bool,
    pub status: Status,
}

impl UserSettings {
    /// The row created the first time a user's settings are touched.
    pub fn defaults(user_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            check_in_frequency_days: DEFAULT_CHECK_IN_FREQUENCY_DAYS,
            release_delay_days: DEFAULT_RELEASE_DELAY_DAYS,
            last_check_in: now,
            last_notification_sent: None,
            notification_phone: None,
            is_vacation_mode: false,
            status: Status::Active,
        }
    }

    /// Records user activity: the inactivity clock restarts and the status
    /// returns to active regardless of where it was.
    pub fn check_in(&mut self, now: DateTime<Utc>) {
        self.last_check_in = now;
        self.status = Status::Active;
    }

    /// Merges a partial update. Leaving vacation mode restarts the clock so
    /// the time spent away doesn't count as inactivity.
    pub fn apply(&mut self, update: SettingsUpdate, now: DateTime<Utc>) {
        if let Some(days) = update.check_in_frequency_days {
            self.check_in_frequency_days = days;
        }
        if let Some(days) = update.release_delay_days {
            self.release_delay_days = days;
        }
        if let Some(phone) = update.notification_phone {
            self.notification_phone = non_blank(Some(phone));
        }
        if let Some(vacation) = update.is_vacation_mode {
            if self.is_vacation_mode && !vacation {
                self.last_check_in = now;
            }
            self.is_vacation_mode = vacation;
        }
    }
}

/// A partial settings update; `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct SettingsUpdate {
    pub check_in_frequency_days: Option<i32>,
    pub release_delay_days: Option<i32>,
    pub notification_phone: Option<String>,
    pub is_vacation_mode: Option<bool>,
}

/// Parameters a client needs to upload an attachment straight to object storage.
#[derive(Debug, Clone)]
pub struct UploadTarget {
    pub url: String,
    pub method: String,
    pub headers: Vec<(String, String)>,
    pub object_path: String,
    pub expires_at: DateTime<Utc>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn folder_or_default(folder: Option<String>) -> String {
    non_blank(folder).unwrap_or_else(|| DEFAULT_FOLDER.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_note(now: DateTime<Utc>) -> Note {
        Note {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            recipient_email: Some("a@b.com".to_string()),
            recipient_phone: None,
            title: "Hi".to_string(),
            content: "hello".to_string(),
            attachments: vec![],
            folder: DEFAULT_FOLDER.to_string(),
            access_code: None,
            access_hint: None,
            is_released: false,
            email_settled_at: None,
            sms_settled_at: None,
            created_at: now,
            last_edited: now,
        }
    }

    #[test]
    fn new_note_normalization_blanks_and_folder() {
        let note = NewNote {
            recipient_email: Some("  ".to_string()),
            recipient_phone: Some(" +15551234 ".to_string()),
            folder: Some("".to_string()),
            access_code: Some("".to_string()),
            ..Default::default()
        }
        .normalized();

        assert_eq!(note.recipient_email, None);
        assert_eq!(note.recipient_phone.as_deref(), Some("+15551234"));
        assert_eq!(note.folder.as_deref(), Some(DEFAULT_FOLDER));
        assert_eq!(note.access_code, None);
    }

    #[test]
    fn note_apply_only_touches_given_fields() {
        let now = Utc::now();
        let mut note = sample_note(now);
        let later = now + Duration::minutes(5);

        note.apply(
            NoteUpdate {
                content: Some("updated".to_string()),
                recipient_phone: Some("+15550000".to_string()),
                ..Default::default()
            },
            later,
        );

        assert_eq!(note.title, "Hi");
        assert_eq!(note.content, "updated");
        assert_eq!(note.recipient_email.as_deref(), Some("a@b.com"));
        assert_eq!(note.recipient_phone.as_deref(), Some("+15550000"));
        assert_eq!(note.last_edited, later);
        assert_eq!(note.created_at, now);
    }

    #[test]
    fn access_code_check() {
        let mut note = sample_note(Utc::now());
        assert!(note.unlocks_with(None));

        note.access_code = Some("1234".to_string());
        assert!(note.is_protected());
        assert!(note.unlocks_with(Some(" 1234 ")));
        assert!(!note.unlocks_with(Some("4321")));
        assert!(!note.unlocks_with(None));
    }

    #[test]
    fn pending_deliveries_skip_settled_channels() {
        let now = Utc::now();
        let mut note = sample_note(now);
        note.recipient_phone = Some("+15550001111".to_string());
        assert_eq!(
            note.pending_deliveries(),
            vec![
                (DeliveryChannel::Email, "a@b.com"),
                (DeliveryChannel::Sms, "+15550001111")
            ]
        );

        note.email_settled_at = Some(now);
        assert_eq!(
            note.pending_deliveries(),
            vec![(DeliveryChannel::Sms, "+15550001111")]
        );
    }

    #[test]
    fn check_in_resets_from_released() {
        let start = Utc::now() - Duration::days(100);
        let mut settings = UserSettings::defaults(Uuid::new_v4(), start);
        settings.status = Status::Released;

        let now = Utc::now();
        settings.check_in(now);

        assert_eq!(settings.status, Status::Active);
        assert_eq!(settings.last_check_in, now);
    }

    #[test]
    fn settings_apply_preserves_unspecified_fields() {
        let now = Utc::now();
        let mut settings = UserSettings::defaults(Uuid::new_v4(), now);
        settings.notification_phone = Some("+15551111".to_string());

        settings.apply(
            SettingsUpdate {
                release_delay_days: Some(14),
                ..Default::default()
            },
            now,
        );

        assert_eq!(settings.release_delay_days, 14);
        assert_eq!(settings.check_in_frequency_days, DEFAULT_CHECK_IN_FREQUENCY_DAYS);
        assert_eq!(settings.notification_phone.as_deref(), Some("+15551111"));
    }

    #[test]
    fn leaving_vacation_restarts_the_clock() {
        let start = Utc::now() - Duration::days(60);
        let mut settings = UserSettings::defaults(Uuid::new_v4(), start);
        settings.is_vacation_mode = true;

        let now = Utc::now();
        settings.apply(
            SettingsUpdate {
                is_vacation_mode: Some(false),
                ..Default::default()
            },
            now,
        );

        assert!(!settings.is_vacation_mode);
        assert_eq!(settings.last_check_in, now);
    }

    #[test]
    fn entering_vacation_keeps_the_clock() {
        let start = Utc::now() - Duration::days(3);
        let mut settings = UserSettings::defaults(Uuid::new_v4(), start);

        settings.apply(
            SettingsUpdate {
                is_vacation_mode: Some(true),
                ..Default::default()
            },
            Utc::now(),
        );

        assert!(settings.is_vacation_mode);
        assert_eq!(settings.last_check_in, start);
    }
}
