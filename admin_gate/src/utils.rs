use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use http::header::{HeaderMap, SET_COOKIE};
use ring::rand::SecureRandom;
use thiserror::Error;

pub(crate) fn base64url_decode(input: &str) -> Result<Vec<u8>, UtilError> {
    let decoded = URL_SAFE_NO_PAD
        .decode(input)
        .map_err(|_| UtilError::Format("Failed to decode base64url".to_string()))?;
    Ok(decoded)
}

pub(crate) fn base64url_encode(input: Vec<u8>) -> Result<String, UtilError> {
    Ok(URL_SAFE_NO_PAD.encode(input))
}

pub fn gen_random_string(len: usize) -> Result<String, UtilError> {
    let rng = ring::rand::SystemRandom::new();
    let mut bytes = vec![0u8; len];
    rng.fill(&mut bytes)
        .map_err(|_| UtilError::Crypto("Failed to generate random string".to_string()))?;
    let encoded = base64url_encode(bytes)
        .map_err(|_| UtilError::Crypto("Failed to encode random string".to_string()))?;
    Ok(encoded)
}

/// Random integer in `[low, high)`.
pub(crate) fn gen_random_u32(low: u32, high: u32) -> Result<u32, UtilError> {
    debug_assert!(low < high);
    let rng = ring::rand::SystemRandom::new();
    let mut bytes = [0u8; 4];
    rng.fill(&mut bytes)
        .map_err(|_| UtilError::Crypto("Failed to generate random integer".to_string()))?;
    let span = high - low;
    Ok(low + u32::from_be_bytes(bytes) % span)
}

pub(crate) fn header_set_cookie(
    headers: &mut HeaderMap,
    name: String,
    value: String,
    _expires_at: DateTime<Utc>,
    max_age: i64,
) -> Result<&HeaderMap, UtilError> {
    let cookie =
        format!("{name}={value}; SameSite=Lax; Secure; HttpOnly; Path=/; Max-Age={max_age}");
    headers.append(
        SET_COOKIE,
        cookie
            .parse()
            .map_err(|_| UtilError::Cookie("Failed to parse cookie".to_string()))?,
    );
    Ok(headers)
}

#[derive(Debug, Error, Clone)]
pub enum UtilError {
    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Cookie error: {0}")]
    Cookie(String),

    #[error("Invalid format: {0}")]
    Format(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base64url_roundtrip() {
        let bytes = vec![0u8, 1, 2, 253, 254, 255];
        let encoded = base64url_encode(bytes.clone()).unwrap();
        assert!(!encoded.contains('='));
        assert_eq!(base64url_decode(&encoded).unwrap(), bytes);
    }

    #[test]
    fn test_base64url_decode_rejects_invalid() {
        let result = base64url_decode("not!!valid@@");
        assert!(matches!(result, Err(UtilError::Format(_))));
    }

    #[test]
    fn test_gen_random_string_length_and_uniqueness() {
        let a = gen_random_string(32).unwrap();
        let b = gen_random_string(32).unwrap();
        // 32 bytes base64url-encoded without padding is 43 characters
        assert_eq!(a.len(), 43);
        assert_ne!(a, b);
    }

    #[test]
    fn test_gen_random_u32_in_range() {
        for _ in 0..100 {
            let n = gen_random_u32(10, 30).unwrap();
            assert!((10..30).contains(&n));
        }
    }

    #[test]
    fn test_header_set_cookie_attributes() {
        let mut headers = HeaderMap::new();
        header_set_cookie(
            &mut headers,
            "admin_gate_session".to_string(),
            "abc".to_string(),
            Utc::now(),
            3600,
        )
        .unwrap();

        let cookie = headers.get(SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.starts_with("admin_gate_session=abc"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=3600"));
    }
}
