use std::{env, sync::LazyLock};

pub static SESSION_COOKIE_NAME: LazyLock<String> = LazyLock::new(|| {
    env::var("SESSION_COOKIE_NAME").unwrap_or_else(|_| "admin_gate_session".to_string())
});

/// Lifetime of the admin session issued after the final login step, in
/// seconds. Admin sessions are deliberately bounded.
pub(crate) static ADMIN_SESSION_EXPIRY: LazyLock<u64> = LazyLock::new(|| {
    env::var("ADMIN_SESSION_EXPIRY")
        .map(|v| v.parse::<u64>().unwrap_or(3600))
        .unwrap_or(3600)
});

/// Lifetime of a registration bearer token, in seconds.
pub(super) static REGISTRATION_TOKEN_TTL: LazyLock<u64> = LazyLock::new(|| {
    env::var("REGISTRATION_TOKEN_TTL")
        .map(|v| v.parse::<u64>().unwrap_or(300))
        .unwrap_or(300)
});
