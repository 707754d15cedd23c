//! Secret, one-time-code and human-check steps of the login state machine.

use http::HeaderMap;
use subtle::ConstantTimeEq;

use crate::config::ADMIN_PIN;
use crate::email::send_security_alert;
use crate::otp;
use crate::passkey::CredentialStore;
use crate::ratelimit::{CEREMONY_LIMITER, SECRET_LIMITER};
use crate::session::{issue_registration_token, new_session_header};

use super::errors::GateError;
use super::types::{ClientId, HumanCheck, VerifySecretSuccess};

/// Constant-time comparison of a submitted secret against the configured one.
pub(super) fn secret_matches(candidate: &str) -> bool {
    let expected = ADMIN_PIN.as_bytes();
    let candidate = candidate.as_bytes();
    // ct_eq requires equal lengths; a length mismatch can only leak what the
    // client already knows about its own input
    candidate.len() == expected.len() && bool::from(candidate.ct_eq(expected))
}

/// Records a failure in the shared secret-step counter and reports either
/// the fresh lockout or a generic rejection.
pub(super) async fn fail_secret_step<T>(client: &ClientId) -> Result<T, GateError> {
    match SECRET_LIMITER.record_failure(client.as_str()).await? {
        Some(remaining_secs) => Err(GateError::Locked { remaining_secs }),
        None => Err(GateError::InvalidSecret),
    }
}

/// Step 1: shared-secret verification.
///
/// While locked, every attempt is rejected with the countdown regardless of
/// correctness. On success a registration bearer token is minted and the
/// caller learns how many credentials already exist.
pub async fn verify_secret_core(
    client: &ClientId,
    secret: &str,
) -> Result<VerifySecretSuccess, GateError> {
    SECRET_LIMITER.enforce(client.as_str()).await?;

    if !secret_matches(secret) {
        return fail_secret_step(client).await;
    }

    let registration_token = issue_registration_token().await?;
    let passkey_count = CredentialStore::count_credentials().await?;

    tracing::debug!("Secret verified; {} credential(s) on record", passkey_count);

    Ok(VerifySecretSuccess {
        registration_token,
        passkey_count,
    })
}

/// Step 2 (fallback path): dispatch a one-time code to the recipient.
pub async fn send_one_time_code_core(recipient: &str) -> Result<(), GateError> {
    otp::send_one_time_code(recipient).await?;
    Ok(())
}

/// Step 2 (fallback path): single-use code verification. Expired and
/// mismatched codes fail identically; failures count toward the ceremony
/// lockout window.
pub async fn verify_one_time_code_core(
    client: &ClientId,
    recipient: &str,
    code: &str,
) -> Result<(), GateError> {
    CEREMONY_LIMITER.enforce(client.as_str()).await?;

    match otp::verify_one_time_code(recipient, code).await {
        Ok(()) => {
            CEREMONY_LIMITER.clear(client.as_str()).await?;
            Ok(())
        }
        Err(otp::OtpError::Invalid) => {
            match CEREMONY_LIMITER.record_failure(client.as_str()).await? {
                Some(remaining_secs) => Err(GateError::Locked { remaining_secs }),
                None => Err(GateError::InvalidSecret),
            }
        }
        Err(e) => Err(e.into()),
    }
}

/// Fresh arithmetic challenge for step 3.
pub fn generate_human_check() -> Result<HumanCheck, GateError> {
    Ok(HumanCheck::generate()?)
}

/// Step 3: human verification, the terminal step.
///
/// Mismatches count toward the same lockout counter as the secret step. On
/// success the counter clears, an admin session is issued, and a best-effort
/// security alert goes out.
pub async fn verify_human_check_core(
    client: &ClientId,
    answer: i64,
    expected: i64,
) -> Result<HeaderMap, GateError> {
    SECRET_LIMITER.enforce(client.as_str()).await?;

    if answer != expected {
        return fail_secret_step(client).await;
    }

    SECRET_LIMITER.clear(client.as_str()).await?;

    let headers = new_session_header().await?;
    send_security_alert("admin-login", client.as_str()).await;

    tracing::info!("Admin login completed for client {}", client);

    Ok(headers)
}
