use axum::Json;
use axum::response::{IntoResponse, Response};
use http::StatusCode;

use admin_gate::GateError;

/// Response wrapper mapping the gate taxonomy onto HTTP statuses. Bodies
/// carry only the taxonomy-level message, never which factor failed.
pub struct ApiError(GateError);

impl From<GateError> for ApiError {
    fn from(err: GateError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            GateError::InvalidSecret
            | GateError::ChallengeExpiredOrMissing
            | GateError::OriginMismatch
            | GateError::CeremonyRejected => StatusCode::BAD_REQUEST,
            GateError::Locked { .. } => StatusCode::TOO_MANY_REQUESTS,
            GateError::ReplaySuspected | GateError::Unauthorized => StatusCode::UNAUTHORIZED,
            GateError::CorruptedCredential(_) => StatusCode::UNPROCESSABLE_ENTITY,
            GateError::DeliveryFailed(_) => StatusCode::BAD_GATEWAY,
            GateError::NoCredentialsRegistered | GateError::CredentialNotFound => {
                StatusCode::NOT_FOUND
            }
            GateError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = match &self.0 {
            GateError::Locked { remaining_secs } => serde_json::json!({
                "success": false,
                "error": self.0.to_string(),
                "remainingSeconds": remaining_secs,
            }),
            // Do not leak store internals to clients
            GateError::Storage(_) => serde_json::json!({
                "success": false,
                "error": "Internal error",
            }),
            _ => serde_json::json!({
                "success": false,
                "error": self.0.to_string(),
            }),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: GateError) -> StatusCode {
        ApiError(err).into_response().status()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_of(GateError::InvalidSecret), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(GateError::Locked { remaining_secs: 30 }),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(status_of(GateError::Unauthorized), StatusCode::UNAUTHORIZED);
        assert_eq!(
            status_of(GateError::ReplaySuspected),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(GateError::NoCredentialsRegistered),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(GateError::DeliveryFailed("relay".to_string())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(GateError::Storage("db".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
