//! admin-gate - layered admin authentication for a personal portfolio site
//!
//! This crate drives a client through a multi-factor login protocol: a
//! shared PIN, a possession factor (platform passkey ceremony, or a one-time
//! code dispatched by mail as the configured fallback), and an arithmetic
//! human check, with attempt-based lockout around every step. Short-lived
//! bearer tokens minted by the PIN check gate the credential-registration
//! and management operations.

mod config;
mod coordination;
mod email;
mod otp;
mod passkey;
mod ratelimit;
mod session;
mod storage;
mod utils;

#[cfg(test)]
mod test_utils;

// The state machine operations
pub use coordination::{
    delete_credential_core, generate_human_check, handle_finish_authentication_core,
    handle_finish_registration_core, handle_start_authentication_core,
    handle_start_registration_core, list_credentials_core, send_one_time_code_core,
    verify_human_check_core, verify_one_time_code_core, verify_secret_core,
};

pub use coordination::{
    ClientId, GateError, HumanCheck, LoginFlowState, MathOp, VerifySecretSuccess,
};

pub use passkey::{
    AdminCredential, AllowCredential, AssertionResponse, AttestationResponse,
    AuthenticationOptions, AuthenticatorResponse, CredentialStore, CredentialSummary,
    PasskeyError, RegisterCredential, RegistrationOptions,
};

pub use session::{
    SESSION_COOKIE_NAME, SessionError, is_authenticated, prepare_logout_response,
};

pub use config::ADMIN_GATE_ROUTE_PREFIX;
pub use otp::OTP_ENABLED;

/// Initialize the underlying stores (cache, database, credential table).
pub async fn init() -> Result<(), Box<dyn std::error::Error>> {
    storage::init().await?;
    passkey::init().await?;
    Ok(())
}
