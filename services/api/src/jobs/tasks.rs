//! Release job task implementations

use crate::web::state::AppState;
use chrono::{DateTime, Utc};
use legacy_notes_core::domain::{DeliveryChannel, Note, UserSettings};
use legacy_notes_core::ports::{PortError, PortResult};
use legacy_notes_core::status::{self, Status};
use tracing::{error, info, warn};

/// What one pass over all users did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub evaluated: usize,
    pub transitions: usize,
    pub reminders_sent: usize,
    /// Overdue users with no phone to remind.
    pub reminders_skipped: usize,
    pub notes_released: usize,
    pub failures: usize,
}

/// Evaluates every user as of `now`, persists status changes, sends warning
/// reminders and delivers the notes of released users.
///
/// The job never writes a whole settings row: every write is conditioned on
/// the row it read, so a check-in landing mid-cycle always wins.
/// A failure for one user is logged and counted; the rest of the cycle goes on.
pub async fn run_release_cycle(state: &AppState, now: DateTime<Utc>) -> PortResult<CycleReport> {
    let mut report = CycleReport::default();

    for settings in state.db.list_settings().await? {
        report.evaluated += 1;
        let user_id = settings.user_id;
        if let Err(e) = process_user(state, settings, now, &mut report).await {
            report.failures += 1;
            error!("Release cycle failed for user {}: {}", user_id, e);
        }
    }

    Ok(report)
}

async fn process_user(
    state: &AppState,
    mut settings: UserSettings,
    now: DateTime<Utc>,
    report: &mut CycleReport,
) -> PortResult<()> {
    if settings.is_vacation_mode {
        return Ok(());
    }

    let next = status::advance(&settings, now);
    if next != settings.status {
        let written = state
            .db
            .save_job_progress(&settings, next, settings.last_notification_sent)
            .await?;
        if !written {
            info!("Settings of user {} changed during the cycle, skipping", settings.user_id);
            return Ok(());
        }
        info!("User {} moved from {} to {}", settings.user_id, settings.status, next);
        settings.status = next;
        report.transitions += 1;
    }

    let current = settings.status;
    match current {
        Status::Active => Ok(()),
        Status::Warning => send_reminder(state, settings, now, report).await,
        Status::Released => deliver_notes(state, &settings, now, report).await,
    }
}

/// One reminder per inactivity episode: anything sent after the current
/// warning instant already covers it.
fn needs_reminder(settings: &UserSettings) -> bool {
    settings
        .last_notification_sent
        .map_or(true, |sent| sent <= status::warning_at(settings))
}

async fn send_reminder(
    state: &AppState,
    settings: UserSettings,
    now: DateTime<Utc>,
    report: &mut CycleReport,
) -> PortResult<()> {
    if !needs_reminder(&settings) {
        return Ok(());
    }
    let Some(phone) = settings.notification_phone.clone() else {
        // Marking the episode as handled keeps this to one warning per episode.
        if state
            .db
            .save_job_progress(&settings, settings.status, Some(now))
            .await?
        {
            warn!(
                "User {} is overdue but has no notification phone",
                settings.user_id
            );
            report.reminders_skipped += 1;
        }
        return Ok(());
    };

    state.sms.send(&phone, &reminder_message(&settings)).await?;
    report.reminders_sent += 1;

    let recorded = state
        .db
        .save_job_progress(&settings, settings.status, Some(now))
        .await?;
    if !recorded {
        info!(
            "User {} checked in while being reminded, not recording the reminder",
            settings.user_id
        );
    }
    Ok(())
}

/// Whether the row still shows the release episode `seen` belongs to.
async fn still_released(
    state: &AppState,
    seen: &UserSettings,
    now: DateTime<Utc>,
) -> PortResult<bool> {
    let current = state.db.get_or_create_settings(seen.user_id, now).await?;
    Ok(current.status == Status::Released
        && !current.is_vacation_mode
        && current.last_check_in == seen.last_check_in)
}

/// Delivers every unreleased note, re-checking before each one that the user
/// hasn't checked in meanwhile.
async fn deliver_notes(
    state: &AppState,
    settings: &UserSettings,
    now: DateTime<Utc>,
    report: &mut CycleReport,
) -> PortResult<()> {
    let notes = state.db.list_unreleased_notes(settings.user_id).await?;

    for note in notes {
        if !still_released(state, settings, now).await? {
            info!("User {} checked in, stopping delivery", settings.user_id);
            break;
        }
        if deliver_note(state, &note, now, report).await? {
            state.db.mark_note_released(note.id).await?;
            report.notes_released += 1;
            info!("Released note {} of user {}", note.id, settings.user_id);
        }
    }
    Ok(())
}

/// Sends the note on each channel not yet settled. A channel settles when it
/// is accepted or rejected for good; transient failures are retried next
/// cycle without touching the channels that already went out.
///
/// Returns whether every channel is now settled.
async fn deliver_note(
    state: &AppState,
    note: &Note,
    now: DateTime<Utc>,
    report: &mut CycleReport,
) -> PortResult<bool> {
    let body = release_message(note, &state.config.public_base_url);
    let mut settled = true;

    for (channel, address) in note.pending_deliveries() {
        let outcome = match channel {
            DeliveryChannel::Email => {
                let subject = format!("A note for you: {}", note.title);
                state.mailer.send(address, &subject, &body).await
            }
            DeliveryChannel::Sms => state.sms.send(address, &body).await,
        };

        match outcome {
            Ok(()) => {
                state.db.mark_channel_settled(note.id, channel, now).await?;
            }
            Err(PortError::Validation(reason)) => {
                report.failures += 1;
                error!(
                    "Giving up on {} delivery of note {}: {}",
                    channel, note.id, reason
                );
                state.db.mark_channel_settled(note.id, channel, now).await?;
            }
            Err(e) => {
                report.failures += 1;
                settled = false;
                error!(
                    "{} delivery of note {} failed, will retry: {}",
                    channel, note.id, e
                );
            }
        }
    }
    Ok(settled)
}

pub fn reminder_message(settings: &UserSettings) -> String {
    format!(
        "LegacyNotes: you haven't checked in for over {} days. Check in before {} or your notes will be released.",
        settings.check_in_frequency_days,
        status::release_at(settings).format("%Y-%m-%d %H:%M UTC")
    )
}

/// The text sent to a recipient. Code-protected notes only carry the title,
/// the hint and a link to unlock them.
pub fn release_message(note: &Note, public_base_url: &str) -> String {
    if note.is_protected() {
        let hint = note.access_hint.as_deref().unwrap_or("No hint provided");
        return format!(
            "{}\n\nSomeone left you a private note on LegacyNotes. It is protected by an access code.\nHint: {}\nOpen it at {}/released/{}",
            note.title, hint, public_base_url, note.id
        );
    }

    let mut body = format!("{}\n\n{}", note.title, note.content);
    if !note.attachments.is_empty() {
        body.push_str("\n\nAttachments:");
        for url in &note.attachments {
            body.push_str("\n- ");
            body.push_str(url);
        }
    }
    body
}
