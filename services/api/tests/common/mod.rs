//! Shared fixtures: an `AppState` over the in-memory store with recording
//! SMS and mail senders.

#![allow(dead_code)]

use api_lib::adapters::{HmacUploadSigner, InMemoryDb};
use api_lib::config::Config;
use api_lib::web::state::AppState;
use async_trait::async_trait;
use chrono::Utc;
use legacy_notes_core::ports::{
    DatabaseService, MailSender, NotificationSender, PortError, PortResult,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

#[derive(Default)]
pub struct RecordingSms {
    pub sent: Mutex<Vec<(String, String)>>,
    pub fail: AtomicBool,
    pub reject: AtomicBool,
    /// A user to check in the next time a message goes out, simulating a
    /// check-in that lands while the provider call is in flight.
    pub check_in_during_send: Mutex<Option<(Arc<dyn DatabaseService>, Uuid)>>,
}

impl RecordingSms {
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Makes the provider refuse every message for good, like Twilio does
    /// for an unroutable number.
    pub fn set_rejecting(&self, reject: bool) {
        self.reject.store(reject, Ordering::SeqCst);
    }

    pub fn check_in_on_next_send(&self, db: Arc<dyn DatabaseService>, user_id: Uuid) {
        *self.check_in_during_send.lock().unwrap() = Some((db, user_id));
    }
}

#[async_trait]
impl NotificationSender for RecordingSms {
    async fn send(&self, phone_number: &str, message: &str) -> PortResult<()> {
        let check_in = self.check_in_during_send.lock().unwrap().take();
        if let Some((db, user_id)) = check_in {
            db.check_in(user_id, Utc::now()).await?;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("provider unavailable".to_string()));
        }
        if self.reject.load(Ordering::SeqCst) {
            return Err(PortError::Validation(format!(
                "{} is not a mobile number",
                phone_number
            )));
        }
        self.sent
            .lock()
            .unwrap()
            .push((phone_number.to_string(), message.to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingMail {
    pub sent: Mutex<Vec<(String, String, String)>>,
}

impl RecordingMail {
    pub fn sent(&self) -> Vec<(String, String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailSender for RecordingMail {
    async fn send(&self, to: &str, subject: &str, body: &str) -> PortResult<()> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), subject.to_string(), body.to_string()));
        Ok(())
    }
}

pub struct Harness {
    pub state: Arc<AppState>,
    pub db: Arc<InMemoryDb>,
    pub sms: Arc<RecordingSms>,
    pub mail: Arc<RecordingMail>,
}

pub fn test_config() -> Config {
    Config::from_lookup(|key| match key {
        "DATABASE_URL" => Some("postgres://unused".to_string()),
        "PUBLIC_BASE_URL" => Some("https://legacy.example".to_string()),
        _ => None,
    })
    .expect("test config is valid")
}

pub fn harness() -> Harness {
    let db = Arc::new(InMemoryDb::new());
    let sms = Arc::new(RecordingSms::default());
    let mail = Arc::new(RecordingMail::default());
    let state = Arc::new(AppState {
        db: db.clone(),
        config: Arc::new(test_config()),
        sms: sms.clone(),
        mailer: mail.clone(),
        uploads: Arc::new(HmacUploadSigner::new(
            "https://storage.example".to_string(),
            b"test-key".to_vec(),
        )),
    });
    Harness {
        state,
        db,
        sms,
        mail,
    }
}
