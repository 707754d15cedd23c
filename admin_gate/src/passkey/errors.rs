use thiserror::Error;

use crate::utils::UtilError;

/// Errors that can occur during WebAuthn/Passkey operations.
#[derive(Debug, Error)]
pub enum PasskeyError {
    /// Error with the cryptographic challenge used in the ceremony:
    /// missing, expired, or already consumed
    #[error("Invalid challenge: {0}")]
    Challenge(String),

    /// Error during the authentication process
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Error during the registration process
    #[error("Registration error: {0}")]
    Registration(String),

    /// The ceremony response's claimed origin or relying-party identity does
    /// not match the configured acceptable set
    #[error("Origin or relying-party mismatch: {0}")]
    OriginMismatch(String),

    /// New signature counter not greater than the stored one; the credential
    /// may have been cloned
    #[error("Replay suspected: {0}")]
    Replay(String),

    /// Stored public key normalizes to empty bytes
    #[error("Corrupted credential: {0}")]
    CorruptedCredential(String),

    /// Error accessing or modifying stored passkey data
    #[error("Storage error: {0}")]
    Storage(String),

    /// Error validating the client data JSON from the browser
    #[error("Invalid client data: {0}")]
    ClientData(String),

    /// Error parsing or validating the authenticator data structure
    #[error("Invalid authenticator data: {0}")]
    AuthenticatorData(String),

    /// Error during cryptographic verification of assertions
    #[error("Verification error: {0}")]
    Verification(String),

    /// Error when a requested resource (e.g., credential) is not found
    #[error("Not found error: {0}")]
    NotFound(String),

    /// Error with improperly formatted data
    #[error("Invalid format: {0}")]
    Format(String),

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
        let err = PasskeyError::Challenge("consumed".to_string());
        assert_eq!(err.to_string(), "Invalid challenge: consumed");

        let err = PasskeyError::Replay("counter 3 <= 3".to_string());
        assert_eq!(err.to_string(), "Replay suspected: counter 3 <= 3");

        let err = PasskeyError::OriginMismatch("https://evil.example".to_string());
        assert_eq!(
            err.to_string(),
            "Origin or relying-party mismatch: https://evil.example"
        );
    }

    #[test]
    fn test_error_is_sync_and_send() {
        fn assert_sync_send<T: Sync + Send>() {}
        assert_sync_send::<PasskeyError>();
    }
}
