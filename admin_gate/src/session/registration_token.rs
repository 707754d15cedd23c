//! Short-lived bearer tokens gating credential-registration operations.
//!
//! A token is minted only after a correct PIN check. It authorizes the
//! registration-ceremony endpoints and the credential-management surface,
//! nothing else; it is not a session.

use serde::{Deserialize, Serialize};
use std::time::SystemTime;

use super::config::REGISTRATION_TOKEN_TTL;
use super::errors::SessionError;
use crate::storage::{CacheData, GENERIC_CACHE_STORE};
use crate::utils::gen_random_string;

const TOKEN_PREFIX: &str = "reg_token";

#[derive(Clone, Serialize, Deserialize, Debug)]
struct TokenRecord {
    issued_at: u64,
}

impl From<TokenRecord> for CacheData {
    fn from(record: TokenRecord) -> Self {
        Self {
            value: serde_json::to_string(&record).expect("Failed to serialize TokenRecord"),
            expires_at: chrono::Utc::now()
                + chrono::Duration::seconds(*REGISTRATION_TOKEN_TTL as i64),
        }
    }
}

impl TryFrom<CacheData> for TokenRecord {
    type Error = SessionError;

    fn try_from(data: CacheData) -> Result<Self, Self::Error> {
        serde_json::from_str(&data.value).map_err(|e| SessionError::Storage(e.to_string()))
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Mints a fresh opaque bearer token recording its issuance time.
pub(crate) async fn issue_registration_token() -> Result<String, SessionError> {
    let token = gen_random_string(32)?;
    let record = TokenRecord {
        issued_at: unix_now(),
    };

    GENERIC_CACHE_STORE
        .lock()
        .await
        .put_with_ttl(
            TOKEN_PREFIX,
            &token,
            record.into(),
            *REGISTRATION_TOKEN_TTL as usize,
        )
        .await
        .map_err(|e| SessionError::Storage(e.to_string()))?;

    Ok(token)
}

/// Valid iff the token is known and younger than the configured window.
/// Entries found expired are deleted on check.
pub(crate) async fn validate_registration_token(token: &str) -> Result<bool, SessionError> {
    if token.is_empty() {
        return Ok(false);
    }

    let data = GENERIC_CACHE_STORE
        .lock()
        .await
        .get(TOKEN_PREFIX, token)
        .await
        .map_err(|e| SessionError::Storage(e.to_string()))?;

    let Some(data) = data else {
        return Ok(false);
    };

    let record: TokenRecord = data.try_into()?;
    if unix_now().saturating_sub(record.issued_at) > *REGISTRATION_TOKEN_TTL {
        GENERIC_CACHE_STORE
            .lock()
            .await
            .remove(TOKEN_PREFIX, token)
            .await
            .map_err(|e| SessionError::Storage(e.to_string()))?;
        return Ok(false);
    }

    Ok(true)
}
