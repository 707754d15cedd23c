use std::time::SystemTime;

use crate::passkey::config::PASSKEY_CHALLENGE_TIMEOUT;
use crate::passkey::errors::PasskeyError;
use crate::passkey::types::StoredChallenge;
use crate::storage::GENERIC_CACHE_STORE;
use crate::utils::gen_random_string;

/// Ceremony context keys. One administrative principal, so the keys are
/// fixed: a fresh challenge for the same context supersedes the previous one.
pub(super) const REGISTRATION_CONTEXT: (&str, &str) = ("regi_challenge", "admin");
pub(super) const AUTHENTICATION_CONTEXT: (&str, &str) = ("auth_challenge", "login");

pub(super) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Generates a fresh random challenge and caches it under the context key.
pub(super) async fn issue_challenge(context: (&str, &str)) -> Result<String, PasskeyError> {
    let challenge = gen_random_string(32)?;
    let stored = StoredChallenge {
        challenge: challenge.clone(),
        timestamp: unix_now(),
        ttl: *PASSKEY_CHALLENGE_TIMEOUT as u64,
    };

    GENERIC_CACHE_STORE
        .lock()
        .await
        .put_with_ttl(
            context.0,
            context.1,
            stored.into(),
            *PASSKEY_CHALLENGE_TIMEOUT as usize,
        )
        .await
        .map_err(|e| PasskeyError::Storage(e.to_string()))?;

    tracing::debug!("Issued challenge for context {}:{}", context.0, context.1);

    Ok(challenge)
}

/// Removes and returns the pending challenge for a context.
///
/// The entry is consumed on the first call regardless of the eventual
/// ceremony outcome; a second call for the same pending ceremony fails.
pub(super) async fn take_challenge(context: (&str, &str)) -> Result<StoredChallenge, PasskeyError> {
    let data = {
        let mut store = GENERIC_CACHE_STORE.lock().await;
        let data = store
            .get(context.0, context.1)
            .await
            .map_err(|e| PasskeyError::Storage(e.to_string()))?;
        store
            .remove(context.0, context.1)
            .await
            .map_err(|e| PasskeyError::Storage(e.to_string()))?;
        data
    };

    let stored: StoredChallenge = data
        .ok_or(PasskeyError::Challenge(
            "Challenge expired or missing".to_string(),
        ))?
        .try_into()?;

    let age = unix_now().saturating_sub(stored.timestamp);
    let timeout = stored.ttl.min(*PASSKEY_CHALLENGE_TIMEOUT as u64);
    if age > timeout {
        tracing::warn!("Challenge expired after {} seconds (timeout: {})", age, timeout);
        return Err(PasskeyError::Challenge(
            "Challenge expired or missing".to_string(),
        ));
    }

    Ok(stored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::CacheData;
    use crate::test_utils::init_test_environment;

    #[tokio::test]
    async fn test_issue_then_take_challenge() {
        init_test_environment().await;
        let context = ("regi_challenge", "take_test");

        let challenge = issue_challenge(context).await.unwrap();
        let stored = take_challenge(context).await.unwrap();

        assert_eq!(stored.challenge, challenge);
    }

    #[tokio::test]
    async fn test_take_challenge_is_single_use() {
        init_test_environment().await;
        let context = ("regi_challenge", "single_use_test");

        issue_challenge(context).await.unwrap();
        take_challenge(context).await.unwrap();

        // Second take must fail: the entry was consumed by the first one
        let result = take_challenge(context).await;
        assert!(matches!(result, Err(PasskeyError::Challenge(_))));
    }

    #[tokio::test]
    async fn test_take_missing_challenge() {
        init_test_environment().await;
        let result = take_challenge(("auth_challenge", "never_issued")).await;
        assert!(matches!(result, Err(PasskeyError::Challenge(_))));
    }

    #[tokio::test]
    async fn test_expired_challenge_rejected_and_consumed() {
        init_test_environment().await;
        let context = ("auth_challenge", "expired_test");

        let stored = StoredChallenge {
            challenge: "stale".to_string(),
            timestamp: unix_now() - 400,
            ttl: 60,
        };
        // Long cache-level TTL so only the challenge timestamp decides
        let data = CacheData {
            value: serde_json::to_string(&stored).unwrap(),
            expires_at: chrono::Utc::now() + chrono::Duration::hours(1),
        };
        GENERIC_CACHE_STORE
            .lock()
            .await
            .put_with_ttl(context.0, context.1, data, 3600)
            .await
            .unwrap();

        let result = take_challenge(context).await;
        assert!(matches!(result, Err(PasskeyError::Challenge(_))));

        // Consumed even though it failed
        let again = take_challenge(context).await;
        assert!(matches!(again, Err(PasskeyError::Challenge(_))));
    }

    #[tokio::test]
    async fn test_newer_challenge_supersedes_older() {
        init_test_environment().await;
        let context = ("regi_challenge", "supersede_test");

        let first = issue_challenge(context).await.unwrap();
        let second = issue_challenge(context).await.unwrap();
        assert_ne!(first, second);

        let stored = take_challenge(context).await.unwrap();
        assert_eq!(stored.challenge, second);
    }
}
