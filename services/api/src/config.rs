//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Twilio credentials. All three must be present for SMS to be sent.
#[derive(Clone, Debug)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_phone: String,
}

/// SMTP settings for mailing released notes.
#[derive(Clone, Debug)]
pub struct EmailConfig {
    pub smtp_url: String,
    pub from_address: String,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub allowed_origin: String,
    pub public_base_url: String,
    pub release_check_interval: Duration,
    pub twilio: Option<TwilioConfig>,
    pub email: Option<EmailConfig>,
    pub upload_base_url: String,
    pub upload_signing_key: Option<String>,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Server and Database Settings ---
        let bind_address_str = var("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url =
            var("DATABASE_URL").ok_or_else(|| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = var("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let allowed_origin =
            var("ALLOWED_ORIGIN").unwrap_or_else(|| "http://localhost:3000".to_string());
        let public_base_url = var("PUBLIC_BASE_URL")
            .unwrap_or_else(|| "http://localhost:3000".to_string())
            .trim_end_matches('/')
            .to_string();

        // --- Release Job ---
        let interval_secs = match var("RELEASE_CHECK_INTERVAL_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| {
                    ConfigError::InvalidValue(
                        "RELEASE_CHECK_INTERVAL_SECS".to_string(),
                        format!("'{}' is not a positive number of seconds", raw),
                    )
                })?,
            None => 3600,
        };

        // --- Notification Providers (optional) ---
        let twilio = match (
            var("TWILIO_ACCOUNT_SID"),
            var("TWILIO_AUTH_TOKEN"),
            var("TWILIO_PHONE_NUMBER"),
        ) {
            (Some(account_sid), Some(auth_token), Some(from_phone)) => Some(TwilioConfig {
                account_sid,
                auth_token,
                from_phone,
            }),
            _ => None,
        };

        let email = var("SMTP_URL").map(|smtp_url| EmailConfig {
            smtp_url,
            from_address: var("EMAIL_FROM")
                .unwrap_or_else(|| "LegacyNotes <no-reply@localhost>".to_string()),
        });

        // --- Attachment Uploads ---
        let upload_base_url = var("UPLOAD_BASE_URL")
            .unwrap_or_else(|| "http://localhost:9000/uploads".to_string())
            .trim_end_matches('/')
            .to_string();
        let upload_signing_key = var("UPLOAD_SIGNING_KEY");

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            allowed_origin,
            public_base_url,
            release_check_interval: Duration::from_secs(interval_secs),
            twilio,
            email,
            upload_base_url,
            upload_signing_key,
        })
    }
}
