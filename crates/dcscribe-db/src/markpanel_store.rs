//! Mark panel persistence.
//!
//! Visibility is stored as two columns, `coalition` and `group_id`, with
//! `-1` meaning "not scoped"; both at `-1` is a globally visible mark.

use async_trait::async_trait;
use dcscribe_types::MarkPanel;
use sqlx::PgPool;

use crate::error::DbError;
use crate::table::Table;

/// Operations on the `markpanels` table.
#[derive(Debug, Clone)]
pub struct MarkPanelStore {
    pool: PgPool,
}

impl MarkPanelStore {
    /// Create a new mark panel store bound to a connection pool.
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Table<MarkPanel> for MarkPanelStore {
    async fn truncate(&self) -> Result<(), DbError> {
        sqlx::query("TRUNCATE TABLE markpanels")
            .execute(&self.pool)
            .await?;
        tracing::debug!("Truncated markpanels");
        Ok(())
    }

    async fn upsert(&self, panels: &[MarkPanel]) -> Result<(), DbError> {
        if panels.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        for panel in panels {
            sqlx::query(
                r"INSERT INTO markpanels
                  (id, time, latitude, longitude, text, initiator, coalition, group_id, updated_at)
                  VALUES ($1, $2, $3, $4, $5, $6, $7, $8, now())
                  ON CONFLICT (id) DO UPDATE SET
                    time = EXCLUDED.time,
                    latitude = EXCLUDED.latitude,
                    longitude = EXCLUDED.longitude,
                    text = EXCLUDED.text,
                    initiator = EXCLUDED.initiator,
                    coalition = EXCLUDED.coalition,
                    group_id = EXCLUDED.group_id,
                    updated_at = EXCLUDED.updated_at",
            )
            .bind(i64::from(panel.id))
            .bind(panel.time)
            .bind(panel.position.latitude)
            .bind(panel.position.longitude)
            .bind(&panel.text)
            .bind(panel.initiator.as_deref())
            .bind(panel.visibility.coalition_column())
            .bind(panel.visibility.group_column())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::debug!(count = panels.len(), "Upserted markpanels");
        Ok(())
    }

    async fn delete(&self, ids: &[u32]) -> Result<(), DbError> {
        if ids.is_empty() {
            return Ok(());
        }

        let ids: Vec<i64> = ids.iter().copied().map(i64::from).collect();
        sqlx::query("DELETE FROM markpanels WHERE id = ANY($1)")
            .bind(&ids)
            .execute(&self.pool)
            .await?;

        tracing::debug!(count = ids.len(), "Deleted markpanels");
        Ok(())
    }
}
