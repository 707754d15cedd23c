//! The authentication state machine: PIN, possession (passkey or one-time
//! code), human check, and the credential-management surface the bearer
//! token gates.

mod errors;
mod login;
mod passkey;
mod types;

pub use errors::GateError;
pub use types::{ClientId, HumanCheck, LoginFlowState, MathOp, VerifySecretSuccess};

pub use login::{
    generate_human_check, send_one_time_code_core, verify_human_check_core,
    verify_one_time_code_core, verify_secret_core,
};
pub use passkey::{
    delete_credential_core, handle_finish_authentication_core, handle_finish_registration_core,
    handle_start_authentication_core, handle_start_registration_core, list_credentials_core,
};
