use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Data stored in the cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheData {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl CacheData {
    pub(crate) fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_cache_data_serialization_roundtrip() {
        let data = CacheData {
            value: "test value".to_string(),
            expires_at: Utc::now() + Duration::hours(1),
        };

        let json = serde_json::to_string(&data).expect("Failed to serialize CacheData");
        let back: CacheData = serde_json::from_str(&json).expect("Failed to deserialize CacheData");

        assert_eq!(back.value, data.value);
        assert_eq!(back.expires_at, data.expires_at);
    }

    #[test]
    fn test_cache_data_expiry() {
        let live = CacheData {
            value: "live".to_string(),
            expires_at: Utc::now() + Duration::minutes(5),
        };
        let dead = CacheData {
            value: "dead".to_string(),
            expires_at: Utc::now() - Duration::seconds(1),
        };

        assert!(!live.is_expired());
        assert!(dead.is_expired());
    }
}
