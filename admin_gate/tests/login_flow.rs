//! End-to-end login protocol tests: PIN through passkey ceremonies to the
//! human check, plus challenge-reuse and replay rejection.

mod common;

use serial_test::serial;

use admin_gate::{
    ClientId, GateError, HumanCheck, LoginFlowState, MathOp, delete_credential_core,
    handle_finish_authentication_core, handle_finish_registration_core,
    handle_start_authentication_core, handle_start_registration_core, list_credentials_core,
    verify_human_check_core, verify_secret_core,
};
use common::{TestAuthenticator, init_test_environment, test_origin, test_rp_id};

const PIN: &str = "842091";

/// Removes every registered credential so a test starts from zero.
async fn clear_credentials(client: &ClientId) {
    let success = verify_secret_core(client, PIN).await.unwrap();
    let token = success.registration_token;
    let listing = list_credentials_core(Some(&token)).await.unwrap();
    for credential in listing {
        delete_credential_core(client, Some(&token), &credential.id, PIN)
            .await
            .unwrap();
    }
}

#[tokio::test]
#[serial]
async fn full_login_flow_round_trip() {
    init_test_environment().await;
    let client = ClientId::new("203.0.113.10");
    clear_credentials(&client).await;

    // Step 1: correct PIN mints a token and reports zero credentials
    let success = verify_secret_core(&client, PIN).await.unwrap();
    assert_eq!(success.passkey_count, 0);
    let token = success.registration_token;

    // Begin registration with the bearer token
    let options = handle_start_registration_core(Some(&token)).await.unwrap();
    assert_eq!(options.rp.id, test_rp_id());

    // Complete the ceremony out-of-band and submit the response
    let authenticator = TestAuthenticator::new();
    let reg_response = authenticator.registration_response(
        &options.challenge,
        &test_origin(),
        &test_rp_id(),
        "Macintosh; Intel Mac OS X 10_15_7",
    );
    let registered = handle_finish_registration_core(&client, &reg_response)
        .await
        .unwrap();
    assert_eq!(registered.id, authenticator.credential_id_b64());
    assert_eq!(registered.label, "macOS device");

    // The new credential shows up in the listing
    let listing = list_credentials_core(Some(&token)).await.unwrap();
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].id, authenticator.credential_id_b64());
    assert_eq!(listing[0].transports, vec!["internal"]);

    // Subsequent login: authentication references that one credential
    let auth_options = handle_start_authentication_core().await.unwrap();
    assert_eq!(auth_options.allow_credentials.len(), 1);
    assert_eq!(
        auth_options.allow_credentials[0].id,
        authenticator.credential_id_b64()
    );

    let auth_response = authenticator.authentication_response(
        &auth_options.challenge,
        &test_origin(),
        &test_rp_id(),
        1,
    );
    let authenticated = handle_finish_authentication_core(&client, &auth_response)
        .await
        .unwrap();
    assert_eq!(authenticated.id, authenticator.credential_id_b64());

    // Step 3: human check issues the admin session
    let check = HumanCheck::from_parts(17, 4, MathOp::Mul);
    assert_eq!(check.expected, 68);
    let headers = verify_human_check_core(&client, 68, check.expected)
        .await
        .unwrap();
    assert!(headers.contains_key(http::header::SET_COOKIE));

    // The client-side mirror of what just happened
    let state = LoginFlowState::AwaitingSecret
        .advance()
        .advance()
        .advance();
    assert!(state.is_terminal());
}

#[tokio::test]
#[serial]
async fn consumed_challenge_cannot_be_reused() {
    init_test_environment().await;
    let client = ClientId::new("203.0.113.11");
    clear_credentials(&client).await;

    let success = verify_secret_core(&client, PIN).await.unwrap();
    let token = success.registration_token;

    let options = handle_start_registration_core(Some(&token)).await.unwrap();
    let authenticator = TestAuthenticator::new();
    let reg_response = authenticator.registration_response(
        &options.challenge,
        &test_origin(),
        &test_rp_id(),
        "Windows NT 10.0",
    );

    handle_finish_registration_core(&client, &reg_response)
        .await
        .unwrap();

    // The same response a second time: the challenge was consumed
    let result = handle_finish_registration_core(&client, &reg_response).await;
    assert!(matches!(result, Err(GateError::ChallengeExpiredOrMissing)));
}

#[tokio::test]
#[serial]
async fn stale_counter_is_rejected_as_replay() {
    init_test_environment().await;
    let client = ClientId::new("203.0.113.12");
    clear_credentials(&client).await;

    let success = verify_secret_core(&client, PIN).await.unwrap();
    let token = success.registration_token;

    // Register, then authenticate up to counter 5
    let options = handle_start_registration_core(Some(&token)).await.unwrap();
    let authenticator = TestAuthenticator::new();
    let reg_response = authenticator.registration_response(
        &options.challenge,
        &test_origin(),
        &test_rp_id(),
        "iPhone",
    );
    handle_finish_registration_core(&client, &reg_response)
        .await
        .unwrap();

    let auth_options = handle_start_authentication_core().await.unwrap();
    let response = authenticator.authentication_response(
        &auth_options.challenge,
        &test_origin(),
        &test_rp_id(),
        5,
    );
    handle_finish_authentication_core(&client, &response)
        .await
        .unwrap();

    // A validly signed assertion with a stale counter must be rejected
    let auth_options = handle_start_authentication_core().await.unwrap();
    let stale = authenticator.authentication_response(
        &auth_options.challenge,
        &test_origin(),
        &test_rp_id(),
        3,
    );
    let result = handle_finish_authentication_core(&client, &stale).await;
    assert!(matches!(result, Err(GateError::ReplaySuspected)));

    // The stored counter was not regressed by the replay attempt: counter 4
    // is still stale, counter 6 still works
    let auth_options = handle_start_authentication_core().await.unwrap();
    let still_stale = authenticator.authentication_response(
        &auth_options.challenge,
        &test_origin(),
        &test_rp_id(),
        4,
    );
    let result = handle_finish_authentication_core(&client, &still_stale).await;
    assert!(matches!(result, Err(GateError::ReplaySuspected)));

    let auth_options = handle_start_authentication_core().await.unwrap();
    let fresh = authenticator.authentication_response(
        &auth_options.challenge,
        &test_origin(),
        &test_rp_id(),
        6,
    );
    handle_finish_authentication_core(&client, &fresh)
        .await
        .unwrap();
}

#[tokio::test]
#[serial]
async fn authentication_with_no_credentials_fails_fast() {
    init_test_environment().await;
    let client = ClientId::new("203.0.113.13");
    clear_credentials(&client).await;

    let result = handle_start_authentication_core().await;
    assert!(matches!(result, Err(GateError::NoCredentialsRegistered)));
}

#[tokio::test]
#[serial]
async fn wrong_signature_is_rejected_without_counter_update() {
    init_test_environment().await;
    let client = ClientId::new("203.0.113.14");
    clear_credentials(&client).await;

    let success = verify_secret_core(&client, PIN).await.unwrap();
    let token = success.registration_token;

    let options = handle_start_registration_core(Some(&token)).await.unwrap();
    let authenticator = TestAuthenticator::new();
    let reg_response = authenticator.registration_response(
        &options.challenge,
        &test_origin(),
        &test_rp_id(),
        "Android 14",
    );
    handle_finish_registration_core(&client, &reg_response)
        .await
        .unwrap();

    // Sign with a different key: same credential id, wrong possession
    let impostor = TestAuthenticator::new();
    let auth_options = handle_start_authentication_core().await.unwrap();
    let mut forged = impostor.authentication_response(
        &auth_options.challenge,
        &test_origin(),
        &test_rp_id(),
        1,
    );
    forged.id = authenticator.credential_id_b64();
    forged.raw_id = authenticator.credential_id_b64();

    let result = handle_finish_authentication_core(&client, &forged).await;
    assert!(matches!(result, Err(GateError::CeremonyRejected)));

    // The real authenticator still works at counter 1: nothing was updated
    let auth_options = handle_start_authentication_core().await.unwrap();
    let genuine = authenticator.authentication_response(
        &auth_options.challenge,
        &test_origin(),
        &test_rp_id(),
        1,
    );
    handle_finish_authentication_core(&client, &genuine)
        .await
        .unwrap();
}
