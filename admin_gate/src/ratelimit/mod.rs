//! Fixed-window lockout tracking for authentication attempts.
//!
//! Counters live in the generic cache store keyed by `(scope, client)`, so a
//! Redis-backed deployment shares lockout state across instances. This is a
//! fixed-window counter, not sliding: bursts exactly at window boundaries are
//! an accepted imprecision.

use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use thiserror::Error;

use crate::storage::{CacheData, GENERIC_CACHE_STORE};

const LOCKOUT_PREFIX: &str = "lockout";

#[derive(Debug, Error)]
pub enum RateLimitError {
    /// Threshold reached; all attempts rejected until the countdown elapses
    #[error("Locked: retry in {remaining_secs} seconds")]
    Limited { remaining_secs: u64 },

    #[error("Storage error: {0}")]
    Storage(String),
}

/// A fixed-window failure counter parameterized by `(limit, window)`.
#[derive(Clone, Copy, Debug)]
pub(crate) struct FixedWindowLimiter {
    scope: &'static str,
    limit: u32,
    window_secs: u64,
}

/// Secret and human-check attempts share one counter: 3 strikes, then a
/// 30-second lockout.
pub(crate) const SECRET_LIMITER: FixedWindowLimiter = FixedWindowLimiter {
    scope: "secret",
    limit: 3,
    window_secs: 30,
};

/// Ceremony-finish and one-time-code attempts: 5 strikes within 5 minutes.
pub(crate) const CEREMONY_LIMITER: FixedWindowLimiter = FixedWindowLimiter {
    scope: "ceremony",
    limit: 5,
    window_secs: 300,
};

#[derive(Clone, Serialize, Deserialize, Debug, Default)]
struct WindowState {
    failure_count: u32,
    window_start: u64,
}

impl From<WindowState> for CacheData {
    fn from(state: WindowState) -> Self {
        Self {
            value: serde_json::to_string(&state).expect("Failed to serialize WindowState"),
            expires_at: chrono::Utc::now() + chrono::Duration::seconds(3600),
        }
    }
}

impl TryFrom<CacheData> for WindowState {
    type Error = RateLimitError;

    fn try_from(data: CacheData) -> Result<Self, Self::Error> {
        serde_json::from_str(&data.value).map_err(|e| RateLimitError::Storage(e.to_string()))
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

impl FixedWindowLimiter {
    fn key(&self, client: &str) -> String {
        format!("{}:{}", self.scope, client)
    }

    async fn load(&self, client: &str) -> Result<Option<WindowState>, RateLimitError> {
        let data = GENERIC_CACHE_STORE
            .lock()
            .await
            .get(LOCKOUT_PREFIX, &self.key(client))
            .await
            .map_err(|e| RateLimitError::Storage(e.to_string()))?;
        data.map(WindowState::try_from).transpose()
    }

    async fn save(&self, client: &str, state: WindowState) -> Result<(), RateLimitError> {
        GENERIC_CACHE_STORE
            .lock()
            .await
            .put_with_ttl(
                LOCKOUT_PREFIX,
                &self.key(client),
                state.into(),
                self.window_secs as usize,
            )
            .await
            .map_err(|e| RateLimitError::Storage(e.to_string()))
    }

    /// Rejects with the remaining countdown when the client has exhausted its
    /// attempts inside the current window. Called before any real work.
    pub(crate) async fn enforce(&self, client: &str) -> Result<(), RateLimitError> {
        let now = unix_now();
        let Some(state) = self.load(client).await? else {
            return Ok(());
        };

        if now.saturating_sub(state.window_start) > self.window_secs {
            // Window elapsed; counters reset lazily on the next failure
            return Ok(());
        }

        if state.failure_count >= self.limit {
            let remaining = (state.window_start + self.window_secs).saturating_sub(now);
            return Err(RateLimitError::Limited {
                remaining_secs: remaining.max(1),
            });
        }

        Ok(())
    }

    /// Records a failed attempt. Returns the countdown when this failure
    /// tripped the lockout; the countdown restarts from now so the client
    /// serves the full window.
    pub(crate) async fn record_failure(&self, client: &str) -> Result<Option<u64>, RateLimitError> {
        let now = unix_now();
        let mut state = self.load(client).await?.unwrap_or_default();

        if state.window_start == 0 || now.saturating_sub(state.window_start) > self.window_secs {
            state = WindowState {
                failure_count: 0,
                window_start: now,
            };
        }

        state.failure_count += 1;
        let tripped = state.failure_count >= self.limit;
        if tripped {
            state.window_start = now;
            tracing::warn!(
                "Lockout tripped for scope {} (client {}): {} failures",
                self.scope,
                client,
                state.failure_count
            );
        }

        self.save(client, state).await?;

        Ok(tripped.then_some(self.window_secs))
    }

    pub(crate) async fn clear(&self, client: &str) -> Result<(), RateLimitError> {
        GENERIC_CACHE_STORE
            .lock()
            .await
            .remove(LOCKOUT_PREFIX, &self.key(client))
            .await
            .map_err(|e| RateLimitError::Storage(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::init_test_environment;

    const TEST_LIMITER: FixedWindowLimiter = FixedWindowLimiter {
        scope: "test",
        limit: 3,
        window_secs: 30,
    };

    #[tokio::test]
    async fn test_enforce_allows_fresh_client() {
        init_test_environment().await;
        assert!(TEST_LIMITER.enforce("fresh_client").await.is_ok());
    }

    #[tokio::test]
    async fn test_lockout_after_limit_failures() {
        init_test_environment().await;
        let client = "locked_client";

        assert_eq!(TEST_LIMITER.record_failure(client).await.unwrap(), None);
        assert_eq!(TEST_LIMITER.record_failure(client).await.unwrap(), None);
        // Third failure trips the lockout with the full countdown
        assert_eq!(TEST_LIMITER.record_failure(client).await.unwrap(), Some(30));

        let result = TEST_LIMITER.enforce(client).await;
        match result {
            Err(RateLimitError::Limited { remaining_secs }) => {
                assert!(remaining_secs > 0 && remaining_secs <= 30);
            }
            other => panic!("Expected Limited, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_clients_are_isolated() {
        init_test_environment().await;

        for _ in 0..3 {
            TEST_LIMITER.record_failure("noisy_client").await.unwrap();
        }

        assert!(TEST_LIMITER.enforce("noisy_client").await.is_err());
        assert!(TEST_LIMITER.enforce("quiet_client").await.is_ok());
    }

    #[tokio::test]
    async fn test_clear_resets_counter() {
        init_test_environment().await;
        let client = "cleared_client";

        for _ in 0..3 {
            TEST_LIMITER.record_failure(client).await.unwrap();
        }
        assert!(TEST_LIMITER.enforce(client).await.is_err());

        TEST_LIMITER.clear(client).await.unwrap();
        assert!(TEST_LIMITER.enforce(client).await.is_ok());
    }

    #[tokio::test]
    async fn test_elapsed_window_resets_lazily() {
        init_test_environment().await;
        let client = "stale_window_client";

        // Seed a tripped window that started long ago
        let state = WindowState {
            failure_count: 3,
            window_start: unix_now() - 120,
        };
        TEST_LIMITER.save(client, state).await.unwrap();

        // The window elapsed, so attempts flow again
        assert!(TEST_LIMITER.enforce(client).await.is_ok());

        // And the next failure starts a fresh count
        assert_eq!(TEST_LIMITER.record_failure(client).await.unwrap(), None);
    }
}
