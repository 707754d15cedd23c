use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::PasskeyError;
use crate::storage::CacheData;
use crate::utils::base64url_decode;

/// Stored credential information for a registered passkey.
///
/// One row per passkey held by the single administrative principal. Contains
/// everything needed to verify later authentication ceremonies: the public
/// key, the credential id, and the signature counter.
#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct AdminCredential {
    /// Credential ID assigned by the authenticator (base64url)
    pub credential_id: String,
    /// Canonical public key bytes (base64url); empty when the stored record
    /// could not be normalized
    pub public_key: String,
    /// Signature counter; must strictly increase between authentications
    pub counter: u32,
    /// Transport hints declared at registration, informational only
    pub transports: Vec<String>,
    /// Human-readable device classification from the registering client
    pub device_label: String,
    /// When the credential was registered
    pub created_at: DateTime<Utc>,
    /// When the credential was last updated (counter bumps included)
    pub updated_at: DateTime<Utc>,
}

/// Listing view of a credential, safe to hand to clients.
#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct CredentialSummary {
    pub id: String,
    pub label: String,
    pub transports: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&AdminCredential> for CredentialSummary {
    fn from(credential: &AdminCredential) -> Self {
        Self {
            id: credential.credential_id.clone(),
            label: credential.device_label.clone(),
            transports: credential.transports.clone(),
            created_at: credential.created_at,
        }
    }
}

/// A pending ceremony challenge, cached under its context key until consumed.
#[derive(Clone, Serialize, Deserialize, Debug)]
pub(super) struct StoredChallenge {
    pub(super) challenge: String,
    pub(super) timestamp: u64,
    pub(super) ttl: u64,
}

impl From<StoredChallenge> for CacheData {
    fn from(data: StoredChallenge) -> Self {
        Self {
            value: serde_json::to_string(&data).expect("Failed to serialize StoredChallenge"),
            expires_at: chrono::Utc::now() + chrono::Duration::seconds(data.ttl as i64),
        }
    }
}

impl TryFrom<CacheData> for StoredChallenge {
    type Error = PasskeyError;

    fn try_from(data: CacheData) -> Result<Self, Self::Error> {
        serde_json::from_str(&data.value).map_err(|e| PasskeyError::Storage(e.to_string()))
    }
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct RelyingParty {
    pub name: String,
    pub id: String,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct PublicKeyCredentialUserEntity {
    pub id: String,
    pub name: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct PubKeyCredParam {
    #[serde(rename = "type")]
    pub type_: String,
    pub alg: i32,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorSelection {
    pub authenticator_attachment: String,
    pub user_verification: String,
}

/// Ceremony parameters returned by `start_registration`.
#[derive(Clone, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationOptions {
    pub challenge: String,
    pub rp: RelyingParty,
    pub user: PublicKeyCredentialUserEntity,
    pub pub_key_cred_params: Vec<PubKeyCredParam>,
    pub authenticator_selection: AuthenticatorSelection,
    pub timeout: u32,
    pub attestation: String,
}

/// Ceremony parameters returned by `start_authentication`.
#[derive(Clone, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationOptions {
    pub challenge: String,
    pub timeout: u32,
    pub rp_id: String,
    pub allow_credentials: Vec<AllowCredential>,
    pub user_verification: String,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct AllowCredential {
    #[serde(rename = "type")]
    pub type_: String,
    pub id: String,
}

/// Completed registration ceremony response submitted by the client.
#[derive(Clone, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RegisterCredential {
    pub id: String,
    pub raw_id: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub response: AttestationResponse,
    /// Client-declared environment metadata used to derive the device label
    #[serde(default)]
    pub device_hint: Option<String>,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AttestationResponse {
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: String,
    pub attestation_object: String,
    #[serde(default)]
    pub transports: Option<Vec<String>>,
}

/// Completed authentication ceremony response submitted by the client.
#[derive(Clone, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorResponse {
    pub id: String,
    pub raw_id: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub response: AssertionResponse,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AssertionResponse {
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: String,
    pub authenticator_data: String,
    pub signature: String,
    #[serde(default)]
    pub user_handle: Option<String>,
}

/// Collapses the stored public-key representation to canonical bytes.
///
/// The durable store may hold the key as plain base64url, as a JSON number
/// array, or as a JSON object carrying a `data` array (legacy serializations
/// written by earlier revisions of the admin record). All type sniffing
/// happens here, at the storage boundary.
pub(crate) fn normalize_public_key(raw: &str) -> Result<Vec<u8>, PasskeyError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        let value: serde_json::Value = serde_json::from_str(trimmed)
            .map_err(|e| PasskeyError::Format(format!("Unparseable public key record: {e}")))?;
        return bytes_from_json(&value);
    }

    base64url_decode(trimmed)
        .map_err(|e| PasskeyError::Format(format!("Invalid public key encoding: {e}")))
}

fn bytes_from_json(value: &serde_json::Value) -> Result<Vec<u8>, PasskeyError> {
    match value {
        serde_json::Value::Array(items) => items
            .iter()
            .map(|n| {
                n.as_u64()
                    .filter(|b| *b <= u8::MAX as u64)
                    .map(|b| b as u8)
                    .ok_or_else(|| {
                        PasskeyError::Format("Public key array contains non-byte value".to_string())
                    })
            })
            .collect(),
        serde_json::Value::Object(map) => match map.get("data") {
            Some(data) => bytes_from_json(data),
            None => Err(PasskeyError::Format(
                "Public key object has no data field".to_string(),
            )),
        },
        serde_json::Value::String(s) => base64url_decode(s)
            .map_err(|e| PasskeyError::Format(format!("Invalid public key encoding: {e}"))),
        _ => Err(PasskeyError::Format(
            "Unsupported public key representation".to_string(),
        )),
    }
}
