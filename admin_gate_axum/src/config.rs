use std::{env, sync::LazyLock};

/// Default recipient for one-time codes when the request names none.
pub(super) static ADMIN_OTP_RECIPIENT: LazyLock<Option<String>> =
    LazyLock::new(|| env::var("ADMIN_OTP_RECIPIENT").ok());
