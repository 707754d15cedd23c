use std::sync::LazyLock;

use crate::storage::DB_TABLE_PREFIX;

/// Table holding the administrative principal's registered credentials.
pub(super) static DB_TABLE_ADMIN_CREDENTIALS: LazyLock<String> =
    LazyLock::new(|| format!("{}admin_credentials", DB_TABLE_PREFIX.as_str()));
