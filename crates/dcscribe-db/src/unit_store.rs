//! Unit persistence.
//!
//! Units are upserted in batches from the unit accumulator. Every upsert
//! rewrites the symbology columns so a changed coalition or type is always
//! reflected in the rendered symbol.

use async_trait::async_trait;
use dcscribe_types::Unit;
use sqlx::PgPool;

use crate::error::DbError;
use crate::table::Table;

/// Operations on the `units` table.
#[derive(Debug, Clone)]
pub struct UnitStore {
    pool: PgPool,
}

impl UnitStore {
    /// Create a new unit store bound to a connection pool.
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Table<Unit> for UnitStore {
    async fn truncate(&self) -> Result<(), DbError> {
        sqlx::query("TRUNCATE TABLE units")
            .execute(&self.pool)
            .await?;
        tracing::debug!("Truncated units");
        Ok(())
    }

    async fn upsert(&self, units: &[Unit]) -> Result<(), DbError> {
        if units.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        for unit in units {
            let symbology = &unit.symbology;
            sqlx::query(
                r"INSERT INTO units
                  (id, name, callsign, player_name, group_name, coalition, unit_type,
                   latitude, longitude, altitude, heading, speed,
                   sidc, standard_identity, symbol_set, status, entity, entity_type, entity_subtype,
                   updated_at)
                  VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
                          $13, $14, $15, $16, $17, $18, $19, now())
                  ON CONFLICT (id) DO UPDATE SET
                    name = EXCLUDED.name,
                    callsign = EXCLUDED.callsign,
                    player_name = EXCLUDED.player_name,
                    group_name = EXCLUDED.group_name,
                    coalition = EXCLUDED.coalition,
                    unit_type = EXCLUDED.unit_type,
                    latitude = EXCLUDED.latitude,
                    longitude = EXCLUDED.longitude,
                    altitude = EXCLUDED.altitude,
                    heading = EXCLUDED.heading,
                    speed = EXCLUDED.speed,
                    sidc = EXCLUDED.sidc,
                    standard_identity = EXCLUDED.standard_identity,
                    symbol_set = EXCLUDED.symbol_set,
                    status = EXCLUDED.status,
                    entity = EXCLUDED.entity,
                    entity_type = EXCLUDED.entity_type,
                    entity_subtype = EXCLUDED.entity_subtype,
                    updated_at = EXCLUDED.updated_at",
            )
            .bind(i64::from(unit.id))
            .bind(&unit.name)
            .bind(unit.callsign.as_deref())
            .bind(unit.player_name.as_deref())
            .bind(unit.group_name.as_deref())
            .bind(unit.coalition.as_raw())
            .bind(&unit.unit_type)
            .bind(unit.position.latitude)
            .bind(unit.position.longitude)
            .bind(unit.altitude)
            .bind(unit.heading)
            .bind(unit.speed)
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

        tracing::debug!(count = units.len(), "Upserted units");
        Ok(())
    }

    async fn delete(&self, ids: &[u32]) -> Result<(), DbError> {
        if ids.is_empty() {
            return Ok(());
        }

        let ids: Vec<i64> = ids.iter().copied().map(i64::from).collect();
        let result = sqlx::query("DELETE FROM units WHERE id = ANY($1)")
            .bind(&ids)
            .execute(&self.pool)
            .await?;

        tracing::debug!(
            requested = ids.len(),
            deleted = result.rows_affected(),
            "Deleted units"
        );
        Ok(())
    }
}
