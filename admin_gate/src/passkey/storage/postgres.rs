use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row};

use crate::passkey::errors::PasskeyError;
use crate::passkey::types::AdminCredential;

use super::config::DB_TABLE_ADMIN_CREDENTIALS;
use super::store::credential_from_columns;

// PostgreSQL implementations
pub(super) async fn create_tables_postgres(pool: &Pool<Postgres>) -> Result<(), PasskeyError> {
    let table = DB_TABLE_ADMIN_CREDENTIALS.as_str();

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
            credential_id TEXT PRIMARY KEY NOT NULL,
            public_key TEXT NOT NULL,
            counter BIGINT NOT NULL DEFAULT 0,
            transports TEXT NOT NULL DEFAULT '[]',
            device_label TEXT NOT NULL DEFAULT '',
            created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#
    ))
    .execute(pool)
    .await
    .map_err(|e| PasskeyError::Storage(e.to_string()))?;

    Ok(())
}

pub(super) async fn store_credential_postgres(
    pool: &Pool<Postgres>,
    credential: &AdminCredential,
) -> Result<(), PasskeyError> {
    let table = DB_TABLE_ADMIN_CREDENTIALS.as_str();
    let transports = serde_json::to_string(&credential.transports)
        .map_err(|e| PasskeyError::Storage(e.to_string()))?;

    sqlx::query(&format!(
        r#"
        INSERT INTO {table}
            (credential_id, public_key, counter, transports, device_label, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (credential_id) DO UPDATE SET
            public_key = EXCLUDED.public_key,
            counter = EXCLUDED.counter,
            transports = EXCLUDED.transports,
            device_label = EXCLUDED.device_label,
            updated_at = EXCLUDED.updated_at
        "#
    ))
    .bind(&credential.credential_id)
    .bind(&credential.public_key)
    .bind(credential.counter as i64)
    .bind(transports)
    .bind(&credential.device_label)
    .bind(credential.created_at)
    .bind(credential.updated_at)
    .execute(pool)
    .await
    .map_err(|e| PasskeyError::Storage(e.to_string()))?;

    Ok(())
}

pub(super) async fn get_credential_postgres(
    pool: &Pool<Postgres>,
    credential_id: &str,
) -> Result<Option<AdminCredential>, PasskeyError> {
    let table = DB_TABLE_ADMIN_CREDENTIALS.as_str();

    let row = sqlx::query(&format!(
        "SELECT credential_id, public_key, counter, transports, device_label, created_at, updated_at \
         FROM {table} WHERE credential_id = $1"
    ))
    .bind(credential_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| PasskeyError::Storage(e.to_string()))?;

    row.map(credential_from_row).transpose()
}

pub(super) async fn get_all_credentials_postgres(
    pool: &Pool<Postgres>,
) -> Result<Vec<AdminCredential>, PasskeyError> {
    let table = DB_TABLE_ADMIN_CREDENTIALS.as_str();

    let rows = sqlx::query(&format!(
        "SELECT credential_id, public_key, counter, transports, device_label, created_at, updated_at \
         FROM {table} ORDER BY created_at"
    ))
    .fetch_all(pool)
    .await
    .map_err(|e| PasskeyError::Storage(e.to_string()))?;

    rows.into_iter().map(credential_from_row).collect()
}

pub(super) async fn update_credential_counter_postgres(
    pool: &Pool<Postgres>,
    credential_id: &str,
    counter: u32,
) -> Result<(), PasskeyError> {
    let table = DB_TABLE_ADMIN_CREDENTIALS.as_str();

    sqlx::query(&format!(
        "UPDATE {table} SET counter = $1, updated_at = $2 WHERE credential_id = $3"
    ))
    .bind(counter as i64)
    .bind(Utc::now())
    .bind(credential_id)
    .execute(pool)
    .await
    .map_err(|e| PasskeyError::Storage(e.to_string()))?;

    Ok(())
}

pub(super) async fn delete_credential_postgres(
    pool: &Pool<Postgres>,
    credential_id: &str,
) -> Result<bool, PasskeyError> {
    let table = DB_TABLE_ADMIN_CREDENTIALS.as_str();

    let result = sqlx::query(&format!("DELETE FROM {table} WHERE credential_id = $1"))
        .bind(credential_id)
        .execute(pool)
        .await
        .map_err(|e| PasskeyError::Storage(e.to_string()))?;

    Ok(result.rows_affected() > 0)
}

fn credential_from_row(row: sqlx::postgres::PgRow) -> Result<AdminCredential, PasskeyError> {
    let credential_id: String = row
        .try_get("credential_id")
        .map_err(|e| PasskeyError::Storage(e.to_string()))?;
    let public_key: String = row
        .try_get("public_key")
        .map_err(|e| PasskeyError::Storage(e.to_string()))?;
    let counter: i64 = row
        .try_get("counter")
        .map_err(|e| PasskeyError::Storage(e.to_string()))?;
    let transports: String = row
        .try_get("transports")
        .map_err(|e| PasskeyError::Storage(e.to_string()))?;
    let device_label: String = row
        .try_get("device_label")
        .map_err(|e| PasskeyError::Storage(e.to_string()))?;
    let created_at: DateTime<Utc> = row
        .try_get("created_at")
        .map_err(|e| PasskeyError::Storage(e.to_string()))?;
    let updated_at: DateTime<Utc> = row
        .try_get("updated_at")
        .map_err(|e| PasskeyError::Storage(e.to_string()))?;

    Ok(credential_from_columns(
        credential_id,
        public_key,
        counter,
        transports,
        device_label,
        created_at,
        updated_at,
    ))
}
