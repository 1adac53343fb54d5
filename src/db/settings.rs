use super::DBClient;
use crate::models::Setting;
use std::collections::HashMap;

/// Flat name/value site configuration. Callers read the values they care
/// about; nothing in here interprets them.
pub trait SettingsExt {
    async fn get_settings(&self) -> Result<Vec<Setting>, sqlx::Error>;

    async fn get_setting(&self, name: &str) -> Result<Option<Setting>, sqlx::Error>;

    /// Upsert every entry in one transaction; either all of the submitted
    /// values land or none do.
    async fn upsert_settings(&self, settings: &HashMap<String, String>)
    -> Result<(), sqlx::Error>;
}

impl SettingsExt for DBClient {
    async fn get_settings(&self) -> Result<Vec<Setting>, sqlx::Error> {
        sqlx::query_as::<_, Setting>("SELECT name, value FROM settings ORDER BY name")
            .fetch_all(&self.pool)
            .await
    }

    async fn get_setting(&self, name: &str) -> Result<Option<Setting>, sqlx::Error> {
        sqlx::query_as::<_, Setting>("SELECT name, value FROM settings WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
    }

    async fn upsert_settings(
        &self,
        settings: &HashMap<String, String>,
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        for (name, value) in settings {
            sqlx::query(
                r#"
                INSERT INTO settings (name, value)
                VALUES ($1, $2)
                ON CONFLICT (name) DO UPDATE SET value = EXCLUDED.value
                "#,
            )
            .bind(name)
            .bind(value)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(())
    }
}
