use std::{env, sync::LazyLock};

/// HTTP endpoint of the mail-dispatch collaborator. When unset, delivery
/// attempts fail with a distinct status instead of silently succeeding.
pub(super) static EMAIL_API_URL: LazyLock<Option<String>> =
    LazyLock::new(|| env::var("EMAIL_API_URL").ok());

pub(super) static EMAIL_API_TOKEN: LazyLock<Option<String>> =
    LazyLock::new(|| env::var("EMAIL_API_TOKEN").ok());

/// Recipient of post-login security alerts. Alerts are skipped when unset.
pub(super) static SECURITY_ALERT_RECIPIENT: LazyLock<Option<String>> =
    LazyLock::new(|| env::var("SECURITY_ALERT_RECIPIENT").ok());

pub(super) static EMAIL_TIMEOUT_SECS: LazyLock<u64> = LazyLock::new(|| {
    env::var("EMAIL_TIMEOUT_SECS")
        .map(|v| v.parse::<u64>().unwrap_or(10))
        .unwrap_or(10)
});
