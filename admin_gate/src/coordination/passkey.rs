//! Token-gated ceremony operations and credential management.

use crate::email::send_security_alert;
use crate::passkey::{
    AuthenticationOptions, AuthenticatorResponse, CredentialStore, CredentialSummary,
    PasskeyError, RegisterCredential, RegistrationOptions, finish_authentication,
    finish_registration, start_authentication, start_registration,
};
use crate::ratelimit::CEREMONY_LIMITER;
use crate::session::validate_registration_token;

use super::errors::GateError;
use super::login::{fail_secret_step, secret_matches};
use super::types::ClientId;

async fn require_registration_token(bearer_token: Option<&str>) -> Result<(), GateError> {
    let token = bearer_token.ok_or(GateError::Unauthorized)?;
    if !validate_registration_token(token).await? {
        tracing::warn!("Rejected gated operation: missing or expired bearer token");
        return Err(GateError::Unauthorized);
    }
    Ok(())
}

/// Begins a registration ceremony. Requires a live registration bearer token
/// minted by a recent correct PIN check.
pub async fn handle_start_registration_core(
    bearer_token: Option<&str>,
) -> Result<RegistrationOptions, GateError> {
    require_registration_token(bearer_token).await?;
    Ok(start_registration().await?)
}

/// Finishes a registration ceremony and records the new credential.
pub async fn handle_finish_registration_core(
    client: &ClientId,
    reg_data: &RegisterCredential,
) -> Result<CredentialSummary, GateError> {
    let credential = finish_registration(reg_data).await?;
    send_security_alert("passkey-registered", client.as_str()).await;
    Ok(CredentialSummary::from(&credential))
}

/// Begins an authentication ceremony, failing fast with a descriptive status
/// when nothing is registered.
pub async fn handle_start_authentication_core() -> Result<AuthenticationOptions, GateError> {
    match start_authentication().await {
        Ok(options) => Ok(options),
        Err(PasskeyError::NotFound(_)) => Err(GateError::NoCredentialsRegistered),
        Err(e) => Err(e.into()),
    }
}

/// Finishes an authentication ceremony. Failed attempts count toward the
/// client's ceremony lockout window; a success clears it.
pub async fn handle_finish_authentication_core(
    client: &ClientId,
    auth_response: &AuthenticatorResponse,
) -> Result<CredentialSummary, GateError> {
    CEREMONY_LIMITER.enforce(client.as_str()).await?;

    match finish_authentication(auth_response).await {
        Ok(credential) => {
            CEREMONY_LIMITER.clear(client.as_str()).await?;
            Ok(CredentialSummary::from(&credential))
        }
        Err(e) => {
            // The next attempt gets the Locked status if this one tripped it
            if let Err(limit_err) = CEREMONY_LIMITER.record_failure(client.as_str()).await {
                tracing::error!("Could not record ceremony failure: {}", limit_err);
            }
            Err(e.into())
        }
    }
}

/// Lists registered credentials. Token-gated: the listing reveals credential
/// ids, which only a PIN-proven caller may see.
pub async fn list_credentials_core(
    bearer_token: Option<&str>,
) -> Result<Vec<CredentialSummary>, GateError> {
    require_registration_token(bearer_token).await?;

    let credentials = CredentialStore::get_all_credentials().await?;
    Ok(credentials.iter().map(CredentialSummary::from).collect())
}

/// Deletes a credential. Destructive, so the shared secret must be re-proven
/// even though a bearer token is already held; a wrong secret counts toward
/// the lockout and removes nothing.
pub async fn delete_credential_core(
    client: &ClientId,
    bearer_token: Option<&str>,
    credential_id: &str,
    secret: &str,
) -> Result<(), GateError> {
    require_registration_token(bearer_token).await?;

    if !secret_matches(secret) {
        tracing::warn!("Credential deletion rejected: secret re-proof failed");
        return fail_secret_step(client).await;
    }

    if !CredentialStore::delete_credential(credential_id).await? {
        return Err(GateError::CredentialNotFound);
    }

    send_security_alert("passkey-deleted", client.as_str()).await;
    tracing::info!("Deleted credential {}", credential_id);

    Ok(())
}
