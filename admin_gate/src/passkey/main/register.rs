use chrono::Utc;
use ciborium::value::Value as CborValue;
use ring::digest;

use super::auth::ParsedClientData;
use super::challenge::{REGISTRATION_CONTEXT, issue_challenge, take_challenge};

use crate::passkey::config::{
    ADMIN_PRINCIPAL_ID, PASSKEY_ATTESTATION, PASSKEY_AUTHENTICATOR_ATTACHMENT,
    PASSKEY_RP_ID, PASSKEY_RP_NAME, PASSKEY_TIMEOUT, PASSKEY_USER_VERIFICATION,
};
use crate::passkey::errors::PasskeyError;
use crate::passkey::storage::CredentialStore;
use crate::passkey::types::{
    AdminCredential, AuthenticatorSelection, PubKeyCredParam, PublicKeyCredentialUserEntity,
    RegisterCredential, RegistrationOptions, RelyingParty,
};
use crate::utils::{base64url_decode, base64url_encode};

/// Begins a registration ceremony for the administrative principal.
///
/// Issues a fresh challenge under the fixed registration context and returns
/// the ceremony parameters for the client's platform authenticator.
pub(crate) async fn start_registration() -> Result<RegistrationOptions, PasskeyError> {
    let challenge = issue_challenge(REGISTRATION_CONTEXT).await?;

    let options = RegistrationOptions {
        challenge,
        rp: RelyingParty {
            name: PASSKEY_RP_NAME.to_string(),
            id: PASSKEY_RP_ID.to_string(),
        },
        user: PublicKeyCredentialUserEntity {
            id: base64url_encode(ADMIN_PRINCIPAL_ID.as_bytes().to_vec())?,
            name: ADMIN_PRINCIPAL_ID.to_string(),
            display_name: "Administrator".to_string(),
        },
        pub_key_cred_params: vec![
            PubKeyCredParam {
                type_: "public-key".to_string(),
                alg: -7,
            },
            PubKeyCredParam {
                type_: "public-key".to_string(),
                alg: -257,
            },
        ],
        authenticator_selection: AuthenticatorSelection {
            authenticator_attachment: PASSKEY_AUTHENTICATOR_ATTACHMENT.to_string(),
            user_verification: PASSKEY_USER_VERIFICATION.to_string(),
        },
        timeout: (*PASSKEY_TIMEOUT) * 1000, // Convert seconds to milliseconds
        attestation: PASSKEY_ATTESTATION.to_string(),
    };

    tracing::debug!("Registration options: {:?}", options);

    Ok(options)
}

/// Finishes the registration ceremony and appends the new credential.
///
/// The pending challenge is consumed up front, exactly once regardless of
/// outcome. The store is not mutated on any rejection path.
pub(crate) async fn finish_registration(
    reg_data: &RegisterCredential,
) -> Result<AdminCredential, PasskeyError> {
    let stored_challenge = take_challenge(REGISTRATION_CONTEXT).await?;

    let client_data = ParsedClientData::from_base64(&reg_data.response.client_data_json)?;
    client_data.verify(&stored_challenge.challenge, "webauthn.create")?;

    let attestation = parse_attestation_object(&reg_data.response.attestation_object)?;
    tracing::debug!("Attestation format: {}", attestation.fmt);
    let attested = parse_attested_credential_data(&attestation.auth_data)?;

    // The credential id embedded in authenticator data must match the one the
    // client claims at the top level.
    let claimed_id = base64url_decode(&reg_data.raw_id)
        .map_err(|e| PasskeyError::Format(format!("Invalid credential id: {e}")))?;
    if claimed_id != attested.credential_id {
        return Err(PasskeyError::Registration(
            "Credential id mismatch between response and authenticator data".to_string(),
        ));
    }

    let now = Utc::now();
    let credential = AdminCredential {
        credential_id: reg_data.raw_id.clone(),
        public_key: base64url_encode(attested.public_key)?,
        counter: attested.counter,
        transports: reg_data.response.transports.clone().unwrap_or_default(),
        device_label: label_for_device_hint(reg_data.device_hint.as_deref()),
        created_at: now,
        updated_at: now,
    };

    CredentialStore::store_credential(&credential).await?;

    tracing::info!(
        "Registered credential {} ({})",
        credential.credential_id,
        credential.device_label
    );

    Ok(credential)
}

/// Classifies the registering device from client-declared environment
/// metadata. A guess for the credential list, nothing more.
fn label_for_device_hint(hint: Option<&str>) -> String {
    let Some(hint) = hint else {
        return "Unknown device".to_string();
    };
    let lowered = hint.to_lowercase();
    let label = if lowered.contains("iphone") || lowered.contains("ipad") || lowered.contains("ios")
    {
        "iOS device"
    } else if lowered.contains("mac") {
        "macOS device"
    } else if lowered.contains("android") {
        "Android device"
    } else if lowered.contains("windows") {
        "Windows device"
    } else if lowered.contains("linux") {
        "Linux device"
    } else {
        "Unknown device"
    };
    label.to_string()
}

pub(super) struct AttestationObject {
    pub(super) fmt: String,
    pub(super) auth_data: Vec<u8>,
}

pub(super) struct AttestedCredentialData {
    pub(super) credential_id: Vec<u8>,
    pub(super) public_key: Vec<u8>,
    pub(super) counter: u32,
}

fn parse_attestation_object(attestation_base64: &str) -> Result<AttestationObject, PasskeyError> {
    let attestation_bytes = base64url_decode(attestation_base64)
        .map_err(|e| PasskeyError::Format(format!("Failed to decode attestation object: {e}")))?;

    let attestation_cbor: CborValue = ciborium::de::from_reader(&attestation_bytes[..])
        .map_err(|e| PasskeyError::Format(format!("Invalid CBOR data: {e}")))?;

    let CborValue::Map(map) = attestation_cbor else {
        return Err(PasskeyError::Format(
            "Invalid attestation format".to_string(),
        ));
    };

    let mut fmt = None;
    let mut auth_data = None;

    for (key, value) in map {
        if let CborValue::Text(k) = key {
            match k.as_str() {
                "fmt" => {
                    if let CborValue::Text(f) = value {
                        fmt = Some(f);
                    }
                }
                "authData" => {
                    if let CborValue::Bytes(data) = value {
                        auth_data = Some(data);
                    }
                }
                _ => {}
            }
        }
    }

    match (fmt, auth_data) {
        (Some(fmt), Some(auth_data)) => {
            if fmt != "none" {
                // Self/none attestation only; statement verification for other
                // formats is out of scope for a single-admin deployment.
                tracing::debug!("Skipping attestation statement verification for fmt {}", fmt);
            }
            Ok(AttestationObject { fmt, auth_data })
        }
        _ => Err(PasskeyError::Format(
            "Missing required attestation data".to_string(),
        )),
    }
}

/// Parses attested credential data out of registration authenticator data.
///
/// Layout: rpIdHash (32) | flags (1) | counter (4) | aaguid (16) |
/// credentialIdLength (2) | credentialId | COSE public key (CBOR).
fn parse_attested_credential_data(
    auth_data: &[u8],
) -> Result<AttestedCredentialData, PasskeyError> {
    if auth_data.len() < 55 {
        return Err(PasskeyError::AuthenticatorData(
            "Authenticator data too short".to_string(),
        ));
    }

    let expected_hash = digest::digest(&digest::SHA256, PASSKEY_RP_ID.as_bytes());
    if &auth_data[..32] != expected_hash.as_ref() {
        return Err(PasskeyError::OriginMismatch(
            "RP ID hash mismatch in registration data".to_string(),
        ));
    }

    let flags = auth_data[32];
    if flags & 0x40 == 0 {
        return Err(PasskeyError::AuthenticatorData(
            "No attested credential data present".to_string(),
        ));
    }

    let counter = u32::from_be_bytes([auth_data[33], auth_data[34], auth_data[35], auth_data[36]]);

    let id_len = u16::from_be_bytes([auth_data[53], auth_data[54]]) as usize;
    if auth_data.len() < 55 + id_len {
        return Err(PasskeyError::AuthenticatorData(
            "Credential id extends past authenticator data".to_string(),
        ));
    }
    let credential_id = auth_data[55..55 + id_len].to_vec();

    let public_key = extract_cose_public_key(&auth_data[55 + id_len..])?;

    Ok(AttestedCredentialData {
        credential_id,
        public_key,
        counter,
    })
}

/// Extracts an EC2 P-256 key from a COSE key map and returns the uncompressed
/// SEC1 point (0x04 || x || y) — the canonical stored representation.
fn extract_cose_public_key(cose_bytes: &[u8]) -> Result<Vec<u8>, PasskeyError> {
    let cose: CborValue = ciborium::de::from_reader(cose_bytes)
        .map_err(|e| PasskeyError::Format(format!("Invalid COSE key CBOR: {e}")))?;

    let CborValue::Map(map) = cose else {
        return Err(PasskeyError::Format("COSE key is not a map".to_string()));
    };

    let mut kty = None;
    let mut alg = None;
    let mut x = None;
    let mut y = None;

    for (key, value) in map {
        let CborValue::Integer(k) = key else { continue };
        match i128::from(k) {
            1 => {
                if let CborValue::Integer(v) = value {
                    kty = Some(i128::from(v));
                }
            }
            3 => {
                if let CborValue::Integer(v) = value {
                    alg = Some(i128::from(v));
                }
            }
            -2 => {
                if let CborValue::Bytes(v) = value {
                    x = Some(v);
                }
            }
            -3 => {
                if let CborValue::Bytes(v) = value {
                    y = Some(v);
                }
            }
            _ => {}
        }
    }

    if kty != Some(2) {
        return Err(PasskeyError::Registration(
            "Unsupported COSE key type (EC2 required)".to_string(),
        ));
    }
    if alg != Some(-7) {
        return Err(PasskeyError::Registration(
            "Unsupported COSE algorithm (ES256 required)".to_string(),
        ));
    }

    match (x, y) {
        (Some(x), Some(y)) if x.len() == 32 && y.len() == 32 => {
            let mut point = Vec::with_capacity(65);
            point.push(0x04);
            point.extend_from_slice(&x);
            point.extend_from_slice(&y);
            Ok(point)
        }
        _ => Err(PasskeyError::Registration(
            "Malformed EC2 coordinates in COSE key".to_string(),
        )),
    }
}
