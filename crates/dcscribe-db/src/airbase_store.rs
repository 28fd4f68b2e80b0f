//! Airbase persistence, keyed by airbase name.

use async_trait::async_trait;
use dcscribe_types::Airbase;
use sqlx::PgPool;

use crate::error::DbError;
use crate::table::Table;

/// Operations on the `airbases` table.
#[derive(Debug, Clone)]
pub struct AirbaseStore {
    pool: PgPool,
}

impl AirbaseStore {
    /// Create a new airbase store bound to a connection pool.
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Table<Airbase> for AirbaseStore {
    async fn truncate(&self) -> Result<(), DbError> {
        sqlx::query("TRUNCATE TABLE airbases")
            .execute(&self.pool)
            .await?;
        tracing::debug!("Truncated airbases");
        Ok(())
    }

    async fn upsert(&self, airbases: &[Airbase]) -> Result<(), DbError> {
        if airbases.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        for airbase in airbases {
            let symbology = &airbase.symbology;
            sqlx::query(
                r"INSERT INTO airbases
                  (name, callsign, latitude, longitude, altitude, category, airbase_type, coalition,
                   sidc, standard_identity, symbol_set, status, entity, entity_type, entity_subtype,
                   updated_at)
                  VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, now())
                  ON CONFLICT (name) DO UPDATE SET
                    callsign = EXCLUDED.callsign,
                    latitude = EXCLUDED.latitude,
                    longitude = EXCLUDED.longitude,
                    altitude = EXCLUDED.altitude,
                    category = EXCLUDED.category,
                    airbase_type = EXCLUDED.airbase_type,
                    coalition = EXCLUDED.coalition,
                    sidc = EXCLUDED.sidc,
                    standard_identity = EXCLUDED.standard_identity,
                    symbol_set = EXCLUDED.symbol_set,
                    status = EXCLUDED.status,
                    entity = EXCLUDED.entity,
                    entity_type = EXCLUDED.entity_type,
                    entity_subtype = EXCLUDED.entity_subtype,
                    updated_at = EXCLUDED.updated_at",
            )
            .bind(&airbase.name)
            .bind(&airbase.callsign)
            .bind(airbase.position.latitude)
            .bind(airbase.position.longitude)
            .bind(airbase.altitude)
            .bind(airbase.category.as_raw())
            .bind(&airbase.airbase_type)
            .bind(airbase.coalition.as_raw())
            .bind(symbology.to_string())
            .bind(i16::from(symbology.standard_identity.code()))
            .bind(i16::from(symbology.symbol_set.code()))
            .bind(i16::from(symbology.status.code()))
            .bind(i16::from(symbology.entity.code()))
            .bind(i16::from(symbology.entity_type.get()))
            .bind(i16::from(symbology.entity_subtype.get()))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::debug!(count = airbases.len(), "Upserted airbases");
        Ok(())
    }

    async fn delete(&self, names: &[String]) -> Result<(), DbError> {
        if names.is_empty() {
            return Ok(());
        }

        sqlx::query("DELETE FROM airbases WHERE name = ANY($1)")
            .bind(names)
            .execute(&self.pool)
            .await?;

        tracing::debug!(count = names.len(), "Deleted airbases");
        Ok(())
    }
}
