use ring::{digest, signature::UnparsedPublicKey};

use super::challenge::{AUTHENTICATION_CONTEXT, issue_challenge, take_challenge};

use crate::passkey::config::{
    ORIGINS, PASSKEY_RP_ID, PASSKEY_TIMEOUT, PASSKEY_USER_VERIFICATION,
};
use crate::passkey::errors::PasskeyError;
use crate::passkey::storage::CredentialStore;
use crate::passkey::types::{
    AdminCredential, AllowCredential, AuthenticationOptions, AuthenticatorResponse,
};
use crate::utils::base64url_decode;

/// Begins an authentication ceremony.
///
/// Fails fast when no credentials are registered; there is nothing a client
/// could present.
pub(crate) async fn start_authentication() -> Result<AuthenticationOptions, PasskeyError> {
    let credentials = CredentialStore::get_all_credentials().await?;
    if credentials.is_empty() {
        return Err(PasskeyError::NotFound(
            "No passkeys registered".to_string(),
        ));
    }

    let allow_credentials = credentials
        .iter()
        .map(|credential| AllowCredential {
            type_: "public-key".to_string(),
            id: credential.credential_id.clone(),
        })
        .collect();

    let challenge = issue_challenge(AUTHENTICATION_CONTEXT).await?;

    let options = AuthenticationOptions {
        challenge,
        timeout: (*PASSKEY_TIMEOUT) * 1000, // Convert seconds to milliseconds
        rp_id: PASSKEY_RP_ID.to_string(),
        allow_credentials,
        user_verification: PASSKEY_USER_VERIFICATION.to_string(),
    };

    tracing::debug!("Auth options: {:?}", options);

    Ok(options)
}

/// Finishes an authentication ceremony against a stored credential.
///
/// The pending challenge is consumed first, exactly once regardless of
/// outcome. On success the credential's signature counter is advanced via a
/// partial-field update; every rejection path leaves the store untouched.
pub(crate) async fn finish_authentication(
    auth_response: &AuthenticatorResponse,
) -> Result<AdminCredential, PasskeyError> {
    let stored_challenge = take_challenge(AUTHENTICATION_CONTEXT).await?;

    let client_data = ParsedClientData::from_base64(&auth_response.response.client_data_json)?;
    client_data.verify(&stored_challenge.challenge, "webauthn.get")?;

    let auth_data = AuthenticatorData::from_base64(&auth_response.response.authenticator_data)?;
    auth_data.verify()?;

    let stored_credential = CredentialStore::get_credential(&auth_response.id)
        .await?
        .ok_or_else(|| {
            tracing::warn!("Authentication with unknown credential id");
            PasskeyError::NotFound("Credential not found".to_string())
        })?;

    let public_key = base64url_decode(&stored_credential.public_key)
        .map_err(|e| PasskeyError::Format(format!("Invalid public key: {e}")))?;
    if public_key.is_empty() {
        return Err(PasskeyError::CorruptedCredential(format!(
            "Stored public key for credential {} is empty; delete the credential and register again",
            stored_credential.credential_id
        )));
    }

    verify_counter(&auth_data, &stored_credential)?;
    verify_signature(auth_response, &client_data, &auth_data, &public_key)?;

    CredentialStore::update_credential_counter(
        &stored_credential.credential_id,
        auth_data.counter,
    )
    .await?;

    tracing::info!(
        "Authenticated with credential {} (counter {} -> {})",
        stored_credential.credential_id,
        stored_credential.counter,
        auth_data.counter
    );

    Ok(stored_credential)
}

pub(super) struct ParsedClientData {
    pub(super) challenge: String,
    pub(super) origin: String,
    pub(super) type_: String,
    pub(super) raw_data: Vec<u8>,
}

impl ParsedClientData {
    pub(super) fn from_base64(client_data_json: &str) -> Result<Self, PasskeyError> {
        let raw_data = base64url_decode(client_data_json)
            .map_err(|e| PasskeyError::Format(format!("Failed to decode: {e}")))?;

        let data_str = String::from_utf8(raw_data.clone())
            .map_err(|e| PasskeyError::Format(format!("Invalid UTF-8: {e}")))?;

        let data: serde_json::Value = serde_json::from_str(&data_str)
            .map_err(|e| PasskeyError::Format(format!("Invalid JSON: {e}")))?;

        let challenge = data["challenge"]
            .as_str()
            .ok_or_else(|| PasskeyError::ClientData("Missing challenge".into()))?
            .to_string();

        Ok(Self {
            challenge,
            origin: data["origin"]
                .as_str()
                .ok_or_else(|| PasskeyError::ClientData("Missing origin".into()))?
                .to_string(),
            type_: data["type"]
                .as_str()
                .ok_or_else(|| PasskeyError::ClientData("Missing type".into()))?
                .to_string(),
            raw_data,
        })
    }

    /// Verifies challenge equality, origin membership and ceremony type.
    pub(super) fn verify(
        &self,
        stored_challenge: &str,
        expected_type: &str,
    ) -> Result<(), PasskeyError> {
        if self.challenge != stored_challenge {
            return Err(PasskeyError::Challenge("Challenge mismatch".to_string()));
        }

        if !ORIGINS.iter().any(|origin| *origin == self.origin) {
            tracing::warn!("Ceremony response claimed origin {}", self.origin);
            return Err(PasskeyError::OriginMismatch(format!(
                "Origin {} is not in the acceptable set",
                self.origin
            )));
        }

        if self.type_ != expected_type {
            return Err(PasskeyError::ClientData(format!(
                "Invalid type. Expected '{}', Got: {}",
                expected_type, self.type_
            )));
        }

        Ok(())
    }
}

/// Flags for AuthenticatorData as defined in WebAuthn spec Level 2
mod auth_data_flags {
    /// User Present (UP) - Bit 0
    pub(super) const UP: u8 = 1 << 0;
    /// User Verified (UV) - Bit 2
    pub(super) const UV: u8 = 1 << 2;
}

pub(super) struct AuthenticatorData {
    pub(super) rp_id_hash: Vec<u8>,
    pub(super) flags: u8,
    pub(super) counter: u32,
    pub(super) raw_data: Vec<u8>,
}

impl AuthenticatorData {
    /// Parse base64url-encoded authenticator data
    /// Format (minimum 37 bytes):
    /// - RP ID Hash (32 bytes)
    /// - Flags (1 byte)
    /// - Counter (4 bytes)
    pub(super) fn from_base64(auth_data: &str) -> Result<Self, PasskeyError> {
        let data = base64url_decode(auth_data)
            .map_err(|e| PasskeyError::Format(format!("Failed to decode: {e}")))?;

        if data.len() < 37 {
            return Err(PasskeyError::AuthenticatorData(
                "Authenticator data too short".to_string(),
            ));
        }

        Ok(Self {
            rp_id_hash: data[..32].to_vec(),
            flags: data[32],
            counter: u32::from_be_bytes([data[33], data[34], data[35], data[36]]),
            raw_data: data,
        })
    }

    fn is_user_present(&self) -> bool {
        (self.flags & auth_data_flags::UP) != 0
    }

    fn is_user_verified(&self) -> bool {
        (self.flags & auth_data_flags::UV) != 0
    }

    fn verify(&self) -> Result<(), PasskeyError> {
        // Verify rpIdHash matches SHA-256 hash of rpId
        let expected_hash = digest::digest(&digest::SHA256, PASSKEY_RP_ID.as_bytes());
        if self.rp_id_hash != expected_hash.as_ref() {
            tracing::warn!("Assertion carried an RP ID hash for a different relying party");
            return Err(PasskeyError::OriginMismatch(
                "RP ID hash mismatch".to_string(),
            ));
        }

        if !self.is_user_present() {
            return Err(PasskeyError::Authentication("User not present".to_string()));
        }

        if *PASSKEY_USER_VERIFICATION == "required" && !self.is_user_verified() {
            return Err(PasskeyError::AuthenticatorData(format!(
                "User verification required but flag not set. Flags: {:02x}",
                self.flags
            )));
        }

        Ok(())
    }
}

/// Rejects any assertion whose counter has not strictly increased.
///
/// A stale or repeated counter means the signature may come from a cloned
/// authenticator. The credential is kept for operator review, never
/// auto-deleted.
fn verify_counter(
    auth_data: &AuthenticatorData,
    stored_credential: &AdminCredential,
) -> Result<(), PasskeyError> {
    if auth_data.counter <= stored_credential.counter {
        tracing::warn!(
            "Possible credential cloning for {}: received counter {}, stored {}",
            stored_credential.credential_id,
            auth_data.counter,
            stored_credential.counter
        );
        return Err(PasskeyError::Replay(format!(
            "Signature counter did not increase (received {}, stored {})",
            auth_data.counter, stored_credential.counter
        )));
    }

    Ok(())
}

fn verify_signature(
    auth_response: &AuthenticatorResponse,
    client_data: &ParsedClientData,
    auth_data: &AuthenticatorData,
    public_key: &[u8],
) -> Result<(), PasskeyError> {
    let verification_algorithm = &ring::signature::ECDSA_P256_SHA256_ASN1;
    let unparsed_public_key = UnparsedPublicKey::new(verification_algorithm, public_key);

    let signature = base64url_decode(&auth_response.response.signature)
        .map_err(|e| PasskeyError::Format(format!("Invalid signature: {e}")))?;

    // Signed data is authenticator_data || SHA256(client_data)
    let client_data_hash = digest::digest(&digest::SHA256, &client_data.raw_data);
    let mut signed_data = Vec::new();
    signed_data.extend_from_slice(&auth_data.raw_data);
    signed_data.extend_from_slice(client_data_hash.as_ref());

    match unparsed_public_key.verify(&signed_data, &signature) {
        Ok(_) => {
            tracing::debug!("Signature verification successful");
            Ok(())
        }
        Err(e) => {
            tracing::warn!("Signature verification failed: {:?}", e);
            Err(PasskeyError::Verification(
                "Signature verification failed".to_string(),
            ))
        }
    }
}
