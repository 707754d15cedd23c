use crate::passkey::errors::PasskeyError;
use crate::passkey::types::AdminCredential;
use crate::storage::GENERIC_DATA_STORE;

use super::postgres;
use super::sqlite;

/// Durable store for the administrative principal's credentials.
///
/// Each mutation is a single-statement write; the counter update touches only
/// the counter and updated_at columns so concurrent field updates never
/// clobber each other.
pub struct CredentialStore;

impl CredentialStore {
    pub async fn init() -> Result<(), PasskeyError> {
        let store = GENERIC_DATA_STORE.lock().await;

        if let Some(pool) = store.as_sqlite() {
            sqlite::create_tables_sqlite(pool).await
        } else if let Some(pool) = store.as_postgres() {
            postgres::create_tables_postgres(pool).await
        } else {
            Err(PasskeyError::Storage("Unsupported database type".into()))
        }
    }

    pub(crate) async fn store_credential(credential: &AdminCredential) -> Result<(), PasskeyError> {
        let store = GENERIC_DATA_STORE.lock().await;

        if let Some(pool) = store.as_sqlite() {
            sqlite::store_credential_sqlite(pool, credential).await
        } else if let Some(pool) = store.as_postgres() {
            postgres::store_credential_postgres(pool, credential).await
        } else {
            Err(PasskeyError::Storage("Unsupported database type".into()))
        }
    }

    pub(crate) async fn get_credential(
        credential_id: &str,
    ) -> Result<Option<AdminCredential>, PasskeyError> {
        let store = GENERIC_DATA_STORE.lock().await;

        if let Some(pool) = store.as_sqlite() {
            sqlite::get_credential_sqlite(pool, credential_id).await
        } else if let Some(pool) = store.as_postgres() {
            postgres::get_credential_postgres(pool, credential_id).await
        } else {
            Err(PasskeyError::Storage("Unsupported database type".into()))
        }
    }

    pub(crate) async fn get_all_credentials() -> Result<Vec<AdminCredential>, PasskeyError> {
        let store = GENERIC_DATA_STORE.lock().await;

        if let Some(pool) = store.as_sqlite() {
            sqlite::get_all_credentials_sqlite(pool).await
        } else if let Some(pool) = store.as_postgres() {
            postgres::get_all_credentials_postgres(pool).await
        } else {
            Err(PasskeyError::Storage("Unsupported database type".into()))
        }
    }

    pub(crate) async fn count_credentials() -> Result<usize, PasskeyError> {
        Ok(Self::get_all_credentials().await?.len())
    }

    pub(crate) async fn update_credential_counter(
        credential_id: &str,
        counter: u32,
    ) -> Result<(), PasskeyError> {
        let store = GENERIC_DATA_STORE.lock().await;

        if let Some(pool) = store.as_sqlite() {
            sqlite::update_credential_counter_sqlite(pool, credential_id, counter).await
        } else if let Some(pool) = store.as_postgres() {
            postgres::update_credential_counter_postgres(pool, credential_id, counter).await
        } else {
            Err(PasskeyError::Storage("Unsupported database type".into()))
        }
    }

    /// Returns true when a row was actually removed.
    pub(crate) async fn delete_credential(credential_id: &str) -> Result<bool, PasskeyError> {
        let store = GENERIC_DATA_STORE.lock().await;

        if let Some(pool) = store.as_sqlite() {
            sqlite::delete_credential_sqlite(pool, credential_id).await
        } else if let Some(pool) = store.as_postgres() {
            postgres::delete_credential_postgres(pool, credential_id).await
        } else {
            Err(PasskeyError::Storage("Unsupported database type".into()))
        }
    }
}

/// Maps raw columns to an `AdminCredential`, collapsing whatever
/// serialization the public key was persisted in to the canonical base64url
/// form. A key that cannot be normalized loads as empty and is rejected as
/// corrupted at authentication time rather than failing the whole listing.
pub(super) fn credential_from_columns(
    credential_id: String,
    raw_public_key: String,
    counter: i64,
    transports_json: String,
    device_label: String,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
) -> AdminCredential {
    let public_key = match crate::passkey::types::normalize_public_key(&raw_public_key) {
        Ok(bytes) => crate::utils::base64url_encode(bytes).unwrap_or_default(),
        Err(e) => {
            tracing::warn!("Could not normalize public key for {}: {}", credential_id, e);
            String::new()
        }
    };

    let transports = serde_json::from_str(&transports_json).unwrap_or_else(|e| {
        tracing::warn!("Unparseable transports for {}: {}", credential_id, e);
        Vec::new()
    });

    AdminCredential {
        credential_id,
        public_key,
        counter: counter as u32,
        transports,
        device_label,
        created_at,
        updated_at,
    }
}
