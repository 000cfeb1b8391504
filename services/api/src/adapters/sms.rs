//! services/api/src/adapters/sms.rs
//!
//! Twilio implementation of the `NotificationSender` port, talking to the
//! Messages REST endpoint with `reqwest`.

use crate::config::TwilioConfig;
use async_trait::async_trait;
use legacy_notes_core::ports::{NotificationSender, PortError, PortResult};
use tracing::{info, warn};

const TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01";

pub struct TwilioSmsAdapter {
    client: reqwest::Client,
    config: Option<TwilioConfig>,
}

impl TwilioSmsAdapter {
    /// A `None` config yields an adapter that logs and drops every message.
    pub fn new(client: reqwest::Client, config: Option<TwilioConfig>) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl NotificationSender for TwilioSmsAdapter {
    async fn send(&self, phone_number: &str, message: &str) -> PortResult<()> {
        let Some(config) = &self.config else {
            warn!(
                "Twilio client not initialized, dropping SMS to {}. Check your environment variables.",
                phone_number
            );
            return Ok(());
        };

        let url = format!(
            "{}/Accounts/{}/Messages.json",
            TWILIO_API_BASE, config.account_sid
        );
        let params = [
            ("To", phone_number),
            ("From", config.from_phone.as_str()),
            ("Body", message),
        ];

        let response = self
            .client
            .post(url)
            .basic_auth(&config.account_sid, Some(&config.auth_token))
            .form(&params)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("SMS to {} failed: {}", phone_number, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = format!("SMS to {} rejected with {}: {}", phone_number, status, body);
            return Err(rejection_error(status, message));
        }

        info!("SMS sent to {}", phone_number);
        Ok(())
    }
}

/// A 4xx other than 429 means Twilio will never accept this message (bad
/// number, unverified recipient), so it is reported as a validation error.
fn rejection_error(status: reqwest::StatusCode, message: String) -> PortError {
    if status.is_client_error() && status != reqwest::StatusCode::TOO_MANY_REQUESTS {
        PortError::Validation(message)
    } else {
        PortError::Unexpected(message)
    }
}
