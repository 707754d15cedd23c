//! Error taxonomy for the authentication state machine.
//!
//! No variant reveals which factor failed beyond this taxonomy; wrong PIN,
//! wrong one-time code and wrong human-check answer all surface as
//! `InvalidSecret`.

use thiserror::Error;

use crate::email::EmailError;
use crate::otp::OtpError;
use crate::passkey::PasskeyError;
use crate::ratelimit::RateLimitError;
use crate::session::SessionError;
use crate::utils::UtilError;

#[derive(Debug, Error)]
pub enum GateError {
    /// Wrong PIN, one-time code, or human-check answer
    #[error("Invalid credentials")]
    InvalidSecret,

    /// Attempt threshold exceeded; all input rejected until the countdown
    /// elapses
    #[error("Locked: retry in {remaining_secs} seconds")]
    Locked { remaining_secs: u64 },

    /// Ceremony state lost or already consumed; restart from the begin step
    #[error("Challenge expired or missing")]
    ChallengeExpiredOrMissing,

    /// Claimed origin or relying-party identity outside the acceptable set
    #[error("Origin or relying-party mismatch")]
    OriginMismatch,

    /// Signature counter did not increase; possible cloned credential
    #[error("Replay suspected")]
    ReplaySuspected,

    /// Stored public key normalizes to empty bytes
    #[error("Corrupted credential: {0}")]
    CorruptedCredential(String),

    /// Missing or expired bearer token on a gated operation
    #[error("Unauthorized")]
    Unauthorized,

    /// The mail collaborator failed; retry sending, not verifying
    #[error("Delivery failed: {0}")]
    DeliveryFailed(String),

    /// Authentication cannot begin with zero registered credentials
    #[error("No passkeys registered")]
    NoCredentialsRegistered,

    /// The referenced credential does not exist
    #[error("Credential not found")]
    CredentialNotFound,

    /// Generic bucket for all other ceremony rejections
    #[error("Ceremony rejected")]
    CeremonyRejected,

    /// Store or connectivity failure; surfaced without retry guidance
    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<PasskeyError> for GateError {
    fn from(err: PasskeyError) -> Self {
        let mapped = match &err {
            PasskeyError::Challenge(_) => Self::ChallengeExpiredOrMissing,
            PasskeyError::OriginMismatch(msg) => {
                // A forged or misdirected ceremony response, not an ordinary
                // user mistake
                tracing::error!("Security violation: origin/identity mismatch: {}", msg);
                Self::OriginMismatch
            }
            PasskeyError::Replay(msg) => {
                tracing::error!("Security violation: {}", msg);
                Self::ReplaySuspected
            }
            PasskeyError::CorruptedCredential(msg) => Self::CorruptedCredential(msg.clone()),
            PasskeyError::NotFound(_) => Self::CredentialNotFound,
            PasskeyError::Storage(msg) => Self::Storage(msg.clone()),
            _ => Self::CeremonyRejected,
        };
        tracing::debug!("Passkey error: {}", err);
        mapped
    }
}

impl From<RateLimitError> for GateError {
    fn from(err: RateLimitError) -> Self {
        match err {
            RateLimitError::Limited { remaining_secs } => Self::Locked { remaining_secs },
            RateLimitError::Storage(msg) => Self::Storage(msg),
        }
    }
}

impl From<SessionError> for GateError {
    fn from(err: SessionError) -> Self {
        tracing::error!("Session error: {}", err);
        Self::Storage(err.to_string())
    }
}

impl From<OtpError> for GateError {
    fn from(err: OtpError) -> Self {
        match err {
            OtpError::Invalid => Self::InvalidSecret,
            OtpError::Delivery(msg) => {
                tracing::error!("One-time code delivery failed: {}", msg);
                Self::DeliveryFailed(msg)
            }
            OtpError::Storage(msg) | OtpError::Crypto(msg) => Self::Storage(msg),
        }
    }
}

impl From<EmailError> for GateError {
    fn from(err: EmailError) -> Self {
        Self::DeliveryFailed(err.to_string())
    }
}

impl From<UtilError> for GateError {
    fn from(err: UtilError) -> Self {
        Self::Storage(err.to_string())
    }
}
