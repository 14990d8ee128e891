//! Repository for the `system_settings` key/value table.

use labelkit_core::timing::{
    TimeLimits, DEFAULT_TIME_LIMIT_SECS, SETTING_MAX_ANNOTATION_TIME, SETTING_MAX_REWORK_TIME,
};
use sqlx::PgPool;

/// Provides typed access to system settings.
pub struct SettingsRepo;

impl SettingsRepo {
    /// Raw value of one setting, if present.
    pub async fn get(pool: &PgPool, key: &str) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar("SELECT value FROM system_settings WHERE key = $1")
            .bind(key)
            .fetch_optional(pool)
            .await
    }

    /// Upsert one setting.
    pub async fn set(pool: &PgPool, key: &str, value: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO system_settings (key, value)
             VALUES ($1, $2)
             ON CONFLICT (key) DO UPDATE
             SET value = EXCLUDED.value, updated_at = NOW()",
        )
        .bind(key)
        .bind(value)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Load the two time caps, falling back to the default for a
    /// missing or unparseable row.
    pub async fn time_limits(pool: &PgPool) -> Result<TimeLimits, sqlx::Error> {
        let max_annotation_secs = Self::get(pool, SETTING_MAX_ANNOTATION_TIME)
            .await?
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TIME_LIMIT_SECS);
        let max_rework_secs = Self::get(pool, SETTING_MAX_REWORK_TIME)
            .await?
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TIME_LIMIT_SECS);
        Ok(TimeLimits {
            max_annotation_secs,
            max_rework_secs,
        })
    }
}
