//! Repository for the `instance_settings` key/value table.

use sqlx::PgPool;

/// Setting key for the export artifact storage budget in bytes.
/// Missing or `<= 0` means governing is disabled.
pub const EXPORT_STORAGE_BUDGET_KEY: &str = "export_storage_budget_bytes";

/// Provides typed access to instance-wide settings.
pub struct SettingsRepo;

impl SettingsRepo {
    /// Read a setting as an `i64`. Unset or unparsable values read as `None`.
    pub async fn get_i64(pool: &PgPool, key: &str) -> Result<Option<i64>, sqlx::Error> {
        let value = sqlx::query_scalar::<_, String>(
            "SELECT value FROM instance_settings WHERE key = $1",
        )
        .bind(key)
        .fetch_optional(pool)
        .await?;
        Ok(value.and_then(|v| v.trim().parse().ok()))
    }

    /// Upsert a setting value.
    pub async fn set(pool: &PgPool, key: &str, value: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO instance_settings (key, value) VALUES ($1, $2) \
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()",
        )
        .bind(key)
        .bind(value)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// The export storage budget in bytes; `0` when unset (unlimited).
    pub async fn export_storage_budget(pool: &PgPool) -> Result<i64, sqlx::Error> {
        Ok(Self::get_i64(pool, EXPORT_STORAGE_BUDGET_KEY)
            .await?
            .unwrap_or(0))
    }
}
