//! Shared test initialization.
//!
//! Loads `.env_test` (falling back to `.env`) exactly once, clears the
//! test database file, and initializes the global stores.

use std::sync::Once;

pub(crate) async fn init_test_environment() {
    static ENV_INIT: Once = Once::new();
    ENV_INIT.call_once(|| {
        if dotenvy::from_filename(".env_test").is_err() {
            dotenvy::dotenv().ok();
        }

        // Start from a clean database file; tables are recreated on init
        if let Ok(url) = std::env::var("GENERIC_DATA_STORE_URL") {
            if let Some(path) = url.strip_prefix("sqlite:") {
                let _ = std::fs::remove_file(path);
            }
        }
    });

    if let Err(e) = crate::storage::init().await {
        panic!("Failed to initialize storage for tests: {e}");
    }
    if let Err(e) = crate::passkey::init().await {
        panic!("Failed to initialize credential store for tests: {e}");
    }
}
