//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use legacy_notes_core::ports::{DatabaseService, MailSender, NotificationSender, UploadSigner};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all
/// handlers and to the release job.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub config: Arc<Config>,
    pub sms: Arc<dyn NotificationSender>,
    pub mailer: Arc<dyn MailSender>,
    pub uploads: Arc<dyn UploadSigner>,
}
