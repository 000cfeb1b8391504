//! crates/legacy_notes_core/src/validation.rs
//!
//! Boundary checks for user input. Every failure is a `PortError::Validation`
//! carrying the message shown to the user.

use crate::domain::{NewNote, Note, SettingsUpdate};
use crate::ports::{PortError, PortResult};
use regex::Regex;
use std::ops::RangeInclusive;
use std::sync::OnceLock;

pub const CHECK_IN_FREQUENCY_RANGE: RangeInclusive<i32> = 1..=365;
pub const RELEASE_DELAY_RANGE: RangeInclusive<i32> = 1..=90;
pub const MAX_ATTACHMENTS: usize = 15;

const MISSING_RECIPIENT: &str = "Either recipient email or phone number must be provided";

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
    })
}

fn phone_regex() -> &'static Regex {
    static PHONE: OnceLock<Regex> = OnceLock::new();
    PHONE.get_or_init(|| Regex::new(r"^\+?[1-9][0-9]{6,14}$").expect("phone pattern is valid"))
}

/// E.164-style check. Spaces, dashes, dots and parentheses are ignored.
pub fn is_valid_phone(phone: &str) -> bool {
    let digits: String = phone
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '.' | '(' | ')'))
        .collect();
    phone_regex().is_match(&digits)
}

/// Validates a normalized `NewNote`.
pub fn validate_new_note(note: &NewNote) -> PortResult<()> {
    check_note_fields(
        &note.title,
        note.recipient_email.as_deref(),
        note.recipient_phone.as_deref(),
        &note.attachments,
    )
}

/// Validates a note after a partial update has been merged into it.
pub fn validate_note(note: &Note) -> PortResult<()> {
    check_note_fields(
        &note.title,
        note.recipient_email.as_deref(),
        note.recipient_phone.as_deref(),
        &note.attachments,
    )
}

fn check_note_fields(
    title: &str,
    email: Option<&str>,
    phone: Option<&str>,
    attachments: &[String],
) -> PortResult<()> {
    if title.trim().is_empty() {
        return Err(PortError::Validation("Title is required".to_string()));
    }
    if email.is_none() && phone.is_none() {
        return Err(PortError::Validation(MISSING_RECIPIENT.to_string()));
    }
    if let Some(email) = email {
        if !email_regex().is_match(email) {
            return Err(PortError::Validation("Invalid email".to_string()));
        }
    }
    if let Some(phone) = phone {
        if !is_valid_phone(phone) {
            return Err(PortError::Validation("Invalid phone number".to_string()));
        }
    }
    if attachments.len() > MAX_ATTACHMENTS {
        return Err(PortError::Validation(format!(
            "A note can have at most {} attachments",
            MAX_ATTACHMENTS
        )));
    }
    Ok(())
}

/// Range-checks the numeric fields of a settings update and the phone format.
pub fn validate_settings_update(update: &SettingsUpdate) -> PortResult<()> {
    if let Some(phone) = update.notification_phone.as_deref().map(str::trim) {
        if !phone.is_empty() && !is_valid_phone(phone) {
            return Err(PortError::Validation("Invalid phone number".to_string()));
        }
    }
    if let Some(days) = update.check_in_frequency_days {
        if !CHECK_IN_FREQUENCY_RANGE.contains(&days) {
            return Err(PortError::Validation(format!(
                "Check-in frequency must be between {} and {} days",
                CHECK_IN_FREQUENCY_RANGE.start(),
                CHECK_IN_FREQUENCY_RANGE.end()
            )));
        }
    }
    if let Some(days) = update.release_delay_days {
        if !RELEASE_DELAY_RANGE.contains(&days) {
            return Err(PortError::Validation(format!(
                "Release delay must be between {} and {} days",
                RELEASE_DELAY_RANGE.start(),
                RELEASE_DELAY_RANGE.end()
            )));
        }
    }
    Ok(())
}
