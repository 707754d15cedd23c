//! Admin sessions issued after the final login step.
//!
//! Sessions are bounded by `ADMIN_SESSION_EXPIRY`; an unbounded admin
//! session would outlive the lockout protections that guard its creation.

use chrono::{DateTime, Duration, Utc};
use headers::HeaderMapExt;
use http::header::HeaderMap;
use serde::{Deserialize, Serialize};

use super::config::{ADMIN_SESSION_EXPIRY, SESSION_COOKIE_NAME};
use super::errors::SessionError;
use crate::storage::{CacheData, GENERIC_CACHE_STORE};
use crate::utils::{gen_random_string, header_set_cookie};

const SESSION_PREFIX: &str = "session";

#[derive(Clone, Serialize, Deserialize, Debug)]
struct StoredSession {
    expires_at: DateTime<Utc>,
    ttl: u64,
}

impl From<StoredSession> for CacheData {
    fn from(session: StoredSession) -> Self {
        Self {
            value: serde_json::to_string(&session).expect("Failed to serialize StoredSession"),
            expires_at: session.expires_at,
        }
    }
}

impl TryFrom<CacheData> for StoredSession {
    type Error = SessionError;

    fn try_from(data: CacheData) -> Result<Self, Self::Error> {
        serde_json::from_str(&data.value).map_err(|e| SessionError::Storage(e.to_string()))
    }
}

/// Creates a fresh admin session and returns the Set-Cookie headers for it.
pub(crate) async fn new_session_header() -> Result<HeaderMap, SessionError> {
    let session_id = gen_random_string(32)?;
    let max_age = *ADMIN_SESSION_EXPIRY;
    let expires_at = Utc::now() + Duration::seconds(max_age as i64);

    let stored_session = StoredSession {
        expires_at,
        ttl: max_age,
    };

    GENERIC_CACHE_STORE
        .lock()
        .await
        .put_with_ttl(
            SESSION_PREFIX,
            &session_id,
            stored_session.into(),
            max_age as usize,
        )
        .await
        .map_err(|e| SessionError::Storage(e.to_string()))?;

    let mut headers = HeaderMap::new();
    header_set_cookie(
        &mut headers,
        SESSION_COOKIE_NAME.to_string(),
        session_id,
        expires_at,
        max_age as i64,
    )?;

    Ok(headers)
}

/// True when the request carries a live admin session cookie.
pub async fn is_authenticated(headers: &HeaderMap) -> Result<bool, SessionError> {
    let Some(session_id) = get_session_id_from_headers(headers) else {
        return Ok(false);
    };

    let data = GENERIC_CACHE_STORE
        .lock()
        .await
        .get(SESSION_PREFIX, &session_id)
        .await
        .map_err(|e| SessionError::Storage(e.to_string()))?;

    match data {
        Some(data) => {
            let session: StoredSession = data.try_into()?;
            Ok(session.expires_at > Utc::now())
        }
        None => Ok(false),
    }
}

/// Expires the session cookie and removes the stored session.
pub async fn prepare_logout_response(headers: &HeaderMap) -> Result<HeaderMap, SessionError> {
    if let Some(session_id) = get_session_id_from_headers(headers) {
        GENERIC_CACHE_STORE
            .lock()
            .await
            .remove(SESSION_PREFIX, &session_id)
            .await
            .map_err(|e| SessionError::Storage(e.to_string()))?;
    }

    let mut response_headers = HeaderMap::new();
    header_set_cookie(
        &mut response_headers,
        SESSION_COOKIE_NAME.to_string(),
        "expired".to_string(),
        Utc::now() - Duration::seconds(86400),
        -86400,
    )?;

    Ok(response_headers)
}

fn get_session_id_from_headers(headers: &HeaderMap) -> Option<String> {
    let cookies: headers::Cookie = headers.typed_get()?;
    cookies
        .get(SESSION_COOKIE_NAME.as_str())
        .map(|v| v.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::init_test_environment;
    use http::header::{COOKIE, SET_COOKIE};

    fn request_headers_from_session(session_headers: &HeaderMap) -> HeaderMap {
        let set_cookie = session_headers
            .get(SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        let pair = set_cookie.split(';').next().unwrap().to_string();

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, pair.parse().unwrap());
        headers
    }

    #[tokio::test]
    async fn test_new_session_validates() {
        init_test_environment().await;

        let session_headers = new_session_header().await.unwrap();
        let request_headers = request_headers_from_session(&session_headers);

        assert!(is_authenticated(&request_headers).await.unwrap());
    }

    #[tokio::test]
    async fn test_no_cookie_is_unauthenticated() {
        init_test_environment().await;
        assert!(!is_authenticated(&HeaderMap::new()).await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_session_id_is_unauthenticated() {
        init_test_environment().await;

        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            format!("{}=forged_session_id", SESSION_COOKIE_NAME.as_str())
                .parse()
                .unwrap(),
        );

        assert!(!is_authenticated(&headers).await.unwrap());
    }

    #[tokio::test]
    async fn test_logout_invalidates_session() {
        init_test_environment().await;

        let session_headers = new_session_header().await.unwrap();
        let request_headers = request_headers_from_session(&session_headers);
        assert!(is_authenticated(&request_headers).await.unwrap());

        let logout_headers = prepare_logout_response(&request_headers).await.unwrap();
        let logout_cookie = logout_headers.get(SET_COOKIE).unwrap().to_str().unwrap();
        assert!(logout_cookie.contains("Max-Age=-86400"));

        assert!(!is_authenticated(&request_headers).await.unwrap());
    }
}
