//! crates/legacy_notes_core/src/status.rs
//!
//! The inactivity state machine. `evaluate` is a pure function of the stored
//! settings and a reference time, so the release job can call it as often as
//! it likes without side effects.

use crate::domain::UserSettings;
use chrono::{DateTime, Duration, Utc};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Active,
    Warning,
    Released,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Active => "active",
            Status::Warning => "warning",
            Status::Released => "released",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for Status {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Status::Active),
            "warning" => Ok(Status::Warning),
            "released" => Ok(Status::Released),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// The instant after which a user who hasn't checked in is overdue.
pub fn warning_at(settings: &UserSettings) -> DateTime<Utc> {
    settings.last_check_in + Duration::days(i64::from(settings.check_in_frequency_days))
}

/// The instant after which an overdue user's notes are released.
pub fn release_at(settings: &UserSettings) -> DateTime<Utc> {
    warning_at(settings) + Duration::days(i64::from(settings.release_delay_days))
}

/// Derives the status as of `now`.
///
/// Vacation mode freezes the machine: the stored status is returned as-is.
pub fn evaluate(settings: &UserSettings, now: DateTime<Utc>) -> Status {
    if settings.is_vacation_mode {
        return settings.status;
    }
    if now <= warning_at(settings) {
        Status::Active
    } else if now <= release_at(settings) {
        Status::Warning
    } else {
        Status::Released
    }
}

/// The status a stored row should move to as of `now`.
///
/// `released` is sticky: only a check-in leaves it, so changing the cadence
/// after release can't quietly reopen the switch.
pub fn advance(settings: &UserSettings, now: DateTime<Utc>) -> Status {
    match settings.status {
        Status::Released => Status::Released,
        _ => evaluate(settings, now),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn settings_checked_in_at(last_check_in: DateTime<Utc>) -> UserSettings {
        let mut s = UserSettings::defaults(Uuid::new_v4(), last_check_in);
        s.check_in_frequency_days = 30;
        s.release_delay_days = 7;
        s
    }

    #[test]
    fn fresh_check_in_is_active() {
        let now = Utc::now();
        let s = settings_checked_in_at(now);
        assert_eq!(evaluate(&s, now), Status::Active);
    }

    #[test]
    fn window_boundaries() {
        let start = Utc::now();
        let s = settings_checked_in_at(start);

        assert_eq!(evaluate(&s, start + Duration::days(30)), Status::Active);
        assert_eq!(
            evaluate(&s, start + Duration::days(30) + Duration::seconds(1)),
            Status::Warning
        );
        assert_eq!(evaluate(&s, start + Duration::days(37)), Status::Warning);
        assert_eq!(
            evaluate(&s, start + Duration::days(37) + Duration::seconds(1)),
            Status::Released
        );
    }

    #[test]
    fn vacation_mode_freezes_status() {
        let start = Utc::now() - Duration::days(365);
        let mut s = settings_checked_in_at(start);
        s.is_vacation_mode = true;
        s.status = Status::Active;

        assert_eq!(evaluate(&s, Utc::now()), Status::Active);

        s.status = Status::Warning;
        assert_eq!(evaluate(&s, Utc::now()), Status::Warning);
    }

    #[test]
    fn evaluation_ignores_stored_status() {
        let start = Utc::now();
        let mut s = settings_checked_in_at(start);
        s.status = Status::Released;

        let at = start + Duration::days(1);
        assert_eq!(evaluate(&s, at), Status::Active);
        assert_eq!(evaluate(&s, at), evaluate(&s, at));
    }

    #[test]
    fn released_is_sticky_until_check_in() {
        let start = Utc::now();
        let mut s = settings_checked_in_at(start);
        s.status = Status::Released;

        let at = start + Duration::days(1);
        assert_eq!(advance(&s, at), Status::Released);

        s.check_in(at);
        assert_eq!(advance(&s, at), Status::Active);
    }

    #[test]
    fn advance_moves_through_warning() {
        let start = Utc::now();
        let s = settings_checked_in_at(start);
        assert_eq!(advance(&s, start + Duration::days(31)), Status::Warning);
        assert_eq!(advance(&s, start + Duration::days(40)), Status::Released);
    }

    #[test]
    fn status_round_trips_through_text() {
        for status in [Status::Active, Status::Warning, Status::Released] {
            assert_eq!(status.as_str().parse::<Status>().unwrap(), status);
        }
        assert!("paused".parse::<Status>().is_err());
    }
}
