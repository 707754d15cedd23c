use thiserror::Error;

use crate::utils::UtilError;

#[derive(Debug, Error)]
pub enum SessionError {
    /// Error accessing the session or token store
    #[error("Storage error: {0}")]
    Storage(String),

    /// Error building or reading the session cookie
    #[error("Cookie error: {0}")]
    Cookie(String),

    /// Error from utility operations
    #[error("Utils error: {0}")]
    Utils(#[from] UtilError),

    /// Error from JSON serialization/deserialization
    #[error("Serde error: {0}")]
    SerdeJson(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SessionError::Storage("cache down".to_string());
        assert_eq!(err.to_string(), "Storage error: cache down");
    }

    #[test]
    fn test_error_is_sync_and_send() {
        fn assert_sync_send<T: Sync + Send>() {}
        assert_sync_send::<SessionError>();
    }
}
