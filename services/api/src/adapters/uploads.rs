//! services/api/src/adapters/uploads.rs
//!
//! Issues pre-signed PUT URLs for attachment uploads. The object store
//! recomputes the HMAC over `PUT\n{object_path}\n{expires}` to accept them.

use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use legacy_notes_core::domain::UploadTarget;
use legacy_notes_core::ports::{PortError, PortResult, UploadSigner};
use rand::RngCore;
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

const UPLOAD_URL_TTL_MINUTES: i64 = 15;

pub struct HmacUploadSigner {
    base_url: String,
    key: Vec<u8>,
}

impl HmacUploadSigner {
    pub fn new(base_url: String, key: Vec<u8>) -> Self {
        Self { base_url, key }
    }

    /// Uses the configured key, or a random one that only lives as long as
    /// this process.
    pub fn from_optional_key(base_url: String, key: Option<String>) -> Self {
        let key = match key {
            Some(key) => key.into_bytes(),
            None => {
                let mut bytes = vec![0u8; 32];
                rand::thread_rng().fill_bytes(&mut bytes);
                bytes
            }
        };
        Self::new(base_url, key)
    }

    fn signature(&self, object_path: &str, expires: i64) -> PortResult<String> {
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|e| PortError::Unexpected(format!("Invalid signing key: {}", e)))?;
        mac.update(format!("PUT\n{}\n{}", object_path, expires).as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

/// Keeps the extension but drops everything else a client put in the name.
fn sanitized_extension(file_name: &str) -> Option<String> {
    let (_, ext) = file_name.rsplit_once('.')?;
    let ext: String = ext
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(10)
        .collect::<String>()
        .to_ascii_lowercase();
    (!ext.is_empty()).then_some(ext)
}

impl UploadSigner for HmacUploadSigner {
    fn sign_upload(
        &self,
        user_id: Uuid,
        file_name: &str,
        content_type: &str,
        now: DateTime<Utc>,
    ) -> PortResult<UploadTarget> {
        let object_path = match sanitized_extension(file_name) {
            Some(ext) => format!("/objects/uploads/{}/{}.{}", user_id, Uuid::new_v4(), ext),
            None => format!("/objects/uploads/{}/{}", user_id, Uuid::new_v4()),
        };
        let expires_at = now + Duration::minutes(UPLOAD_URL_TTL_MINUTES);
        let expires = expires_at.timestamp();
        let signature = self.signature(&object_path, expires)?;

        let url = format!(
            "{}{}?expires={}&signature={}",
            self.base_url,
            object_path,
            expires,
            urlencoding::encode(&signature)
        );

        Ok(UploadTarget {
            url,
            method: "PUT".to_string(),
            headers: vec![("Content-Type".to_string(), content_type.to_string())],
            object_path,
            expires_at,
        })
    }
}
