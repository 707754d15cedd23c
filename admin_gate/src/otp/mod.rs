//! One-time-code fallback for the possession step.
//!
//! A 6-digit numeric code is dispatched through the mail collaborator and
//! held for five minutes, keyed by recipient. Only a SHA-256 digest of the
//! code is stored; the plain code exists nowhere server-side after dispatch.
//! Expired and mismatched codes fail identically.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::SystemTime;
use std::{env, sync::LazyLock};
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::email;
use crate::storage::{CacheData, GENERIC_CACHE_STORE};
use crate::utils::{base64url_encode, gen_random_u32};

const OTP_PREFIX: &str = "otp";

/// Whether the one-time-code path is offered at all. The passkey path and
/// this fallback are configured alternatives, never silently merged.
pub static OTP_ENABLED: LazyLock<bool> = LazyLock::new(|| {
    env::var("OTP_ENABLED")
        .map(|v| v.parse::<bool>().unwrap_or(false))
        .unwrap_or(false)
});

pub(crate) static OTP_CODE_TTL: LazyLock<u64> = LazyLock::new(|| {
    env::var("OTP_CODE_TTL")
        .map(|v| v.parse::<u64>().unwrap_or(300))
        .unwrap_or(300)
});

#[derive(Debug, Error)]
pub enum OtpError {
    /// Missing, expired, or mismatched code; deliberately indistinct
    #[error("Invalid or expired code")]
    Invalid,

    /// The mail collaborator failed; the code was not delivered
    #[error("Delivery failed: {0}")]
    Delivery(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Crypto error: {0}")]
    Crypto(String),
}

#[derive(Clone, Serialize, Deserialize, Debug)]
struct StoredCode {
    code_hash: String,
    issued_at: u64,
}

impl From<StoredCode> for CacheData {
    fn from(code: StoredCode) -> Self {
        Self {
            value: serde_json::to_string(&code).expect("Failed to serialize StoredCode"),
            expires_at: chrono::Utc::now() + chrono::Duration::seconds(*OTP_CODE_TTL as i64),
        }
    }
}

impl TryFrom<CacheData> for StoredCode {
    type Error = OtpError;

    fn try_from(data: CacheData) -> Result<Self, Self::Error> {
        serde_json::from_str(&data.value).map_err(|e| OtpError::Storage(e.to_string()))
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn hash_code(code: &str) -> String {
    let digest = Sha256::digest(code.as_bytes());
    base64url_encode(digest.to_vec()).unwrap_or_default()
}

fn generate_code() -> Result<String, OtpError> {
    gen_random_u32(100_000, 1_000_000)
        .map(|n| n.to_string())
        .map_err(|e| OtpError::Crypto(e.to_string()))
}

async fn store_code(recipient: &str, code: &str) -> Result<(), OtpError> {
    let stored = StoredCode {
        code_hash: hash_code(code),
        issued_at: unix_now(),
    };

    GENERIC_CACHE_STORE
        .lock()
        .await
        .put_with_ttl(OTP_PREFIX, recipient, stored.into(), *OTP_CODE_TTL as usize)
        .await
        .map_err(|e| OtpError::Storage(e.to_string()))
}

async fn remove_code(recipient: &str) -> Result<(), OtpError> {
    GENERIC_CACHE_STORE
        .lock()
        .await
        .remove(OTP_PREFIX, recipient)
        .await
        .map_err(|e| OtpError::Storage(e.to_string()))
}

/// Generates, stores and dispatches a fresh code for the recipient. A new
/// code supersedes any pending one for the same recipient.
pub(crate) async fn send_one_time_code(recipient: &str) -> Result<(), OtpError> {
    let code = generate_code()?;
    store_code(recipient, &code).await?;

    let body = format!(
        "Your one-time admin login code is: {code}\n\nIt expires in {} minutes.",
        *OTP_CODE_TTL / 60
    );
    email::send_mail(recipient, "Your admin login code", &body)
        .await
        .map_err(|e| {
            tracing::error!("One-time code delivery to {} failed: {}", recipient, e);
            OtpError::Delivery(e.to_string())
        })?;

    tracing::info!("One-time code dispatched to {}", recipient);
    Ok(())
}

/// Single-use verification. Success consumes the stored code; an expired
/// entry is removed on sight. Mismatch leaves it in place until expiry.
pub(crate) async fn verify_one_time_code(recipient: &str, code: &str) -> Result<(), OtpError> {
    let data = GENERIC_CACHE_STORE
        .lock()
        .await
        .get(OTP_PREFIX, recipient)
        .await
        .map_err(|e| OtpError::Storage(e.to_string()))?;

    let Some(data) = data else {
        return Err(OtpError::Invalid);
    };

    let stored: StoredCode = data.try_into()?;
    if unix_now().saturating_sub(stored.issued_at) > *OTP_CODE_TTL {
        remove_code(recipient).await?;
        return Err(OtpError::Invalid);
    }

    let submitted_hash = hash_code(code);
    let matches: bool = submitted_hash
        .as_bytes()
        .ct_eq(stored.code_hash.as_bytes())
        .into();
    if !matches {
        return Err(OtpError::Invalid);
    }

    remove_code(recipient).await?;
    Ok(())
}
