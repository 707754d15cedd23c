mod config;
mod errors;
mod main;
mod storage;
mod types;

pub use errors::PasskeyError;
pub use storage::CredentialStore;
pub use types::{
    AdminCredential, AllowCredential, AssertionResponse, AttestationResponse,
    AuthenticationOptions, AuthenticatorResponse, CredentialSummary, RegisterCredential,
    RegistrationOptions,
};

pub(crate) use main::{
    finish_authentication, finish_registration, start_authentication, start_registration,
};

/// Initialize the passkey credential store (creates tables when missing).
pub(crate) async fn init() -> Result<(), PasskeyError> {
    CredentialStore::init().await
}
