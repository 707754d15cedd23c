use axum::Json;
use axum::extract::Path;
use axum_extra::TypedHeader;
use axum_extra::headers::{Authorization, authorization::Bearer};
use http::HeaderMap;
use serde::{Deserialize, Serialize};

use admin_gate::{
    AuthenticationOptions, AuthenticatorResponse, ClientId, CredentialSummary, HumanCheck,
    RegisterCredential, RegistrationOptions, delete_credential_core, generate_human_check,
    handle_finish_authentication_core, handle_finish_registration_core,
    handle_start_authentication_core, handle_start_registration_core, list_credentials_core,
    prepare_logout_response, send_one_time_code_core, verify_human_check_core,
    verify_one_time_code_core, verify_secret_core,
};

use super::config::ADMIN_OTP_RECIPIENT;
use super::errors::ApiError;

/// Lockout identity of the caller. Proxied deployments forward the address;
/// otherwise callers share the fallback bucket.
pub(super) fn client_id(headers: &HeaderMap) -> ClientId {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string());

    let real_ip = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string());

    ClientId::new(
        forwarded
            .or(real_ip)
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "unknown".to_string()),
    )
}

fn bearer(auth: &Option<TypedHeader<Authorization<Bearer>>>) -> Option<&str> {
    auth.as_ref()
        .map(|TypedHeader(Authorization(bearer))| bearer.token())
}

#[derive(Deserialize)]
pub(super) struct VerifyPinRequest {
    pin: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct VerifyPinResponse {
    success: bool,
    registration_token: String,
    passkey_count: usize,
}

pub(super) async fn verify_pin(
    headers: HeaderMap,
    Json(request): Json<VerifyPinRequest>,
) -> Result<Json<VerifyPinResponse>, ApiError> {
    let client = client_id(&headers);
    let success = verify_secret_core(&client, &request.pin).await?;

    Ok(Json(VerifyPinResponse {
        success: true,
        registration_token: success.registration_token,
        passkey_count: success.passkey_count,
    }))
}

#[derive(Deserialize)]
pub(super) struct SendOtpRequest {
    email: Option<String>,
}

#[derive(Serialize)]
pub(super) struct StatusResponse {
    success: bool,
}

pub(super) async fn send_otp(
    Json(request): Json<SendOtpRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    let recipient = request
        .email
        .or_else(|| ADMIN_OTP_RECIPIENT.clone())
        .ok_or(admin_gate::GateError::DeliveryFailed(
            "No recipient configured".to_string(),
        ))?;

    send_one_time_code_core(&recipient).await?;
    Ok(Json(StatusResponse { success: true }))
}

#[derive(Deserialize)]
pub(super) struct VerifyOtpRequest {
    email: Option<String>,
    code: String,
}

pub(super) async fn verify_otp(
    headers: HeaderMap,
    Json(request): Json<VerifyOtpRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    let client = client_id(&headers);
    let recipient = request
        .email
        .or_else(|| ADMIN_OTP_RECIPIENT.clone())
        .unwrap_or_else(|| "admin".to_string());

    verify_one_time_code_core(&client, &recipient, &request.code).await?;
    Ok(Json(StatusResponse { success: true }))
}

pub(super) async fn human_check() -> Result<Json<HumanCheck>, ApiError> {
    Ok(Json(generate_human_check()?))
}

#[derive(Deserialize)]
pub(super) struct VerifyHumanRequest {
    answer: i64,
    expected: i64,
}

pub(super) async fn verify_human(
    headers: HeaderMap,
    Json(request): Json<VerifyHumanRequest>,
) -> Result<(HeaderMap, Json<StatusResponse>), ApiError> {
    let client = client_id(&headers);
    let session_headers =
        verify_human_check_core(&client, request.answer, request.expected).await?;

    Ok((session_headers, Json(StatusResponse { success: true })))
}

pub(super) async fn register_challenge(
    auth: Option<TypedHeader<Authorization<Bearer>>>,
) -> Result<Json<RegistrationOptions>, ApiError> {
    let options = handle_start_registration_core(bearer(&auth)).await?;
    Ok(Json(options))
}

#[derive(Serialize)]
pub(super) struct RegisterVerifyResponse {
    success: bool,
    credential: CredentialSummary,
}

pub(super) async fn register_verify(
    headers: HeaderMap,
    Json(reg_data): Json<RegisterCredential>,
) -> Result<Json<RegisterVerifyResponse>, ApiError> {
    let client = client_id(&headers);
    let credential = handle_finish_registration_core(&client, &reg_data).await?;

    Ok(Json(RegisterVerifyResponse {
        success: true,
        credential,
    }))
}

pub(super) async fn login_challenge() -> Result<Json<AuthenticationOptions>, ApiError> {
    let options = handle_start_authentication_core().await?;
    Ok(Json(options))
}

pub(super) async fn login_verify(
    headers: HeaderMap,
    Json(auth_response): Json<AuthenticatorResponse>,
) -> Result<Json<StatusResponse>, ApiError> {
    let client = client_id(&headers);
    handle_finish_authentication_core(&client, &auth_response).await?;
    Ok(Json(StatusResponse { success: true }))
}

pub(super) async fn list_credentials(
    auth: Option<TypedHeader<Authorization<Bearer>>>,
) -> Result<Json<Vec<CredentialSummary>>, ApiError> {
    let credentials = list_credentials_core(bearer(&auth)).await?;
    Ok(Json(credentials))
}

#[derive(Deserialize)]
pub(super) struct DeleteCredentialRequest {
    pin: String,
}

pub(super) async fn delete_credential(
    headers: HeaderMap,
    Path(credential_id): Path<String>,
    auth: Option<TypedHeader<Authorization<Bearer>>>,
    Json(request): Json<DeleteCredentialRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    let client = client_id(&headers);
    delete_credential_core(&client, bearer(&auth), &credential_id, &request.pin).await?;
    Ok(Json(StatusResponse { success: true }))
}

pub(super) async fn logout(
    headers: HeaderMap,
) -> Result<(HeaderMap, Json<StatusResponse>), ApiError> {
    let response_headers = prepare_logout_response(&headers)
        .await
        .map_err(|e| admin_gate::GateError::Storage(e.to_string()))?;

    Ok((response_headers, Json(StatusResponse { success: true })))
}
