//! Shared fixtures for integration tests: environment setup and a software
//! authenticator that produces real ECDSA P-256 ceremony responses.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use ciborium::value::{Integer, Value as CborValue};
use ring::digest;
use ring::rand::{SecureRandom, SystemRandom};
use ring::signature::{ECDSA_P256_SHA256_ASN1_SIGNING, EcdsaKeyPair, KeyPair};
use std::sync::Once;

use admin_gate::{
    AssertionResponse, AttestationResponse, AuthenticatorResponse, RegisterCredential,
};

pub async fn init_test_environment() {
    static ENV_INIT: Once = Once::new();
    ENV_INIT.call_once(|| {
        if dotenvy::from_filename(".env_test").is_err() {
            dotenvy::dotenv().ok();
        }

        if let Ok(url) = std::env::var("GENERIC_DATA_STORE_URL") {
            if let Some(path) = url.strip_prefix("sqlite:") {
                let _ = std::fs::remove_file(path);
            }
        }
    });

    admin_gate::init()
        .await
        .expect("Failed to initialize admin gate for tests");
}

pub fn test_origin() -> String {
    std::env::var("ORIGIN").unwrap_or_else(|_| "https://example.com".to_string())
}

pub fn test_rp_id() -> String {
    url_host(&test_origin())
}

fn url_host(origin: &str) -> String {
    origin
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .split([':', '/'])
        .next()
        .unwrap()
        .to_string()
}

fn b64(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// A software authenticator holding one P-256 keypair. Produces ceremony
/// responses indistinguishable, at the protocol level, from a platform
/// authenticator's.
pub struct TestAuthenticator {
    key: EcdsaKeyPair,
    rng: SystemRandom,
    pub credential_id: Vec<u8>,
}

impl TestAuthenticator {
    pub fn new() -> Self {
        let rng = SystemRandom::new();
        let pkcs8 = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, &rng)
            .expect("Failed to generate P-256 key");
        let key = EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, pkcs8.as_ref(), &rng)
            .expect("Failed to load P-256 key");

        let mut credential_id = vec![0u8; 16];
        rng.fill(&mut credential_id).unwrap();

        Self {
            key,
            rng,
            credential_id,
        }
    }

    pub fn credential_id_b64(&self) -> String {
        b64(&self.credential_id)
    }

    /// Uncompressed SEC1 point, 65 bytes.
    fn public_key_point(&self) -> Vec<u8> {
        self.key.public_key().as_ref().to_vec()
    }

    fn client_data(type_: &str, challenge: &str, origin: &str) -> Vec<u8> {
        serde_json::json!({
            "type": type_,
            "challenge": challenge,
            "origin": origin,
        })
        .to_string()
        .into_bytes()
    }

    fn cose_public_key(&self) -> Vec<u8> {
        let point = self.public_key_point();
        let cose = CborValue::Map(vec![
            (
                CborValue::Integer(Integer::from(1)),
                CborValue::Integer(Integer::from(2)),
            ),
            (
                CborValue::Integer(Integer::from(3)),
                CborValue::Integer(Integer::from(-7)),
            ),
            (
                CborValue::Integer(Integer::from(-1)),
                CborValue::Integer(Integer::from(1)),
            ),
            (
                CborValue::Integer(Integer::from(-2)),
                CborValue::Bytes(point[1..33].to_vec()),
            ),
            (
                CborValue::Integer(Integer::from(-3)),
                CborValue::Bytes(point[33..65].to_vec()),
            ),
        ]);
        let mut bytes = Vec::new();
        ciborium::ser::into_writer(&cose, &mut bytes).unwrap();
        bytes
    }

    fn registration_auth_data(&self, rp_id: &str, counter: u32) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(digest::digest(&digest::SHA256, rp_id.as_bytes()).as_ref());
        data.push(0x45); // UP | UV | AT
        data.extend_from_slice(&counter.to_be_bytes());
        data.extend_from_slice(&[0u8; 16]); // aaguid
        data.extend_from_slice(&(self.credential_id.len() as u16).to_be_bytes());
        data.extend_from_slice(&self.credential_id);
        data.extend_from_slice(&self.cose_public_key());
        data
    }

    fn assertion_auth_data(rp_id: &str, counter: u32) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(digest::digest(&digest::SHA256, rp_id.as_bytes()).as_ref());
        data.push(0x05); // UP | UV
        data.extend_from_slice(&counter.to_be_bytes());
        data
    }

    /// A completed registration ceremony response for the given challenge.
    pub fn registration_response(
        &self,
        challenge: &str,
        origin: &str,
        rp_id: &str,
        device_hint: &str,
    ) -> RegisterCredential {
        let client_data = Self::client_data("webauthn.create", challenge, origin);

        let attestation = CborValue::Map(vec![
            (
                CborValue::Text("fmt".to_string()),
                CborValue::Text("none".to_string()),
            ),
            (
                CborValue::Text("attStmt".to_string()),
                CborValue::Map(vec![]),
            ),
            (
                CborValue::Text("authData".to_string()),
                CborValue::Bytes(self.registration_auth_data(rp_id, 0)),
            ),
        ]);
        let mut attestation_bytes = Vec::new();
        ciborium::ser::into_writer(&attestation, &mut attestation_bytes).unwrap();

        RegisterCredential {
            id: self.credential_id_b64(),
            raw_id: self.credential_id_b64(),
            type_: "public-key".to_string(),
            response: AttestationResponse {
                client_data_json: b64(&client_data),
                attestation_object: b64(&attestation_bytes),
                transports: Some(vec!["internal".to_string()]),
            },
            device_hint: Some(device_hint.to_string()),
        }
    }

    /// A completed, correctly signed authentication ceremony response
    /// reporting the given counter.
    pub fn authentication_response(
        &self,
        challenge: &str,
        origin: &str,
        rp_id: &str,
        counter: u32,
    ) -> AuthenticatorResponse {
        let client_data = Self::client_data("webauthn.get", challenge, origin);
        let auth_data = Self::assertion_auth_data(rp_id, counter);

        let mut signed = Vec::new();
        signed.extend_from_slice(&auth_data);
        signed.extend_from_slice(digest::digest(&digest::SHA256, &client_data).as_ref());

        let signature = self.key.sign(&self.rng, &signed).unwrap();

        AuthenticatorResponse {
            id: self.credential_id_b64(),
            raw_id: self.credential_id_b64(),
            type_: "public-key".to_string(),
            response: AssertionResponse {
                client_data_json: b64(&client_data),
                authenticator_data: b64(&auth_data),
                signature: b64(signature.as_ref()),
                user_handle: None,
            },
        }
    }
}
