//! Expansion snapshot persistence

use super::{ExpansionStore, PgStore};
use crate::{
    models::{Code, ExpansionSnapshot, StoredExpansion},
    Error, Result,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use std::collections::HashSet;
use uuid::Uuid;

#[async_trait]
impl ExpansionStore for PgStore {
    async fn expansion_already_exists(&self, version_uuid: Uuid) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM value_set_expansions WHERE value_set_version_uuid = $1)",
        )
        .bind(version_uuid)
        .fetch_one(self.pool())
        .await
        .map_err(Error::Database)?;

        Ok(exists)
    }

    async fn load_current_expansion(
        &self,
        version_uuid: Uuid,
    ) -> Result<Option<StoredExpansion>> {
        let header = sqlx::query(
            "SELECT uuid, timestamp
             FROM value_set_expansions
             WHERE value_set_version_uuid = $1
             ORDER BY timestamp DESC, sequence DESC
             LIMIT 1",
        )
        .bind(version_uuid)
        .fetch_optional(self.pool())
        .await
        .map_err(Error::Database)?;

        let Some(header) = header else {
            return Ok(None);
        };

        let expansion_uuid: Uuid = header.try_get("uuid")?;
        let timestamp: DateTime<Utc> = header.try_get("timestamp")?;

        let rows = sqlx::query(
            "SELECT system, version, code, display
             FROM value_set_expansion_members
             WHERE expansion_uuid = $1",
        )
        .bind(expansion_uuid)
        .fetch_all(self.pool())
        .await
        .map_err(Error::Database)?;

        let codes = rows
            .iter()
            .map(|row| -> Result<Code> {
                Ok(Code::new(
                    row.try_get::<String, _>("system")?,
                    row.try_get::<String, _>("version")?,
                    row.try_get::<String, _>("code")?,
                    row.try_get::<String, _>("display")?,
                ))
            })
            .collect::<Result<HashSet<Code>>>()?;

        tracing::debug!(
            version_uuid = %version_uuid,
            expansion_uuid = %expansion_uuid,
            size = codes.len(),
            "Loaded current expansion"
        );

        Ok(Some(StoredExpansion {
            snapshot: ExpansionSnapshot {
                uuid: expansion_uuid,
                value_set_version_uuid: version_uuid,
                timestamp,
                size: codes.len(),
            },
            codes,
        }))
    }

    async fn save_expansion(
        &self,
        version_uuid: Uuid,
        codes: &HashSet<Code>,
    ) -> Result<ExpansionSnapshot> {
        let expansion_uuid = Uuid::new_v4();

        let mut systems = Vec::with_capacity(codes.len());
        let mut versions = Vec::with_capacity(codes.len());
        let mut values = Vec::with_capacity(codes.len());
        let mut displays = Vec::with_capacity(codes.len());
        for code in codes {
            systems.push(code.system().to_string());
            versions.push(code.version().to_string());
            values.push(code.code().to_string());
            displays.push(code.display().to_string());
        }

        // Header and members commit together or not at all
        let mut tx = self.pool().begin().await.map_err(Error::Database)?;

        let timestamp = sqlx::query_scalar::<_, DateTime<Utc>>(
            "INSERT INTO value_set_expansions (uuid, value_set_version_uuid, timestamp)
             VALUES ($1, $2, NOW())
             RETURNING timestamp",
        )
        .bind(expansion_uuid)
        .bind(version_uuid)
        .fetch_one(&mut *tx)
        .await
        .map_err(Error::Database)?;

        if !codes.is_empty() {
            sqlx::query(
                "INSERT INTO value_set_expansion_members
                    (expansion_uuid, system, version, code, display)
                 SELECT $1, t.system, t.version, t.code, t.display
                 FROM UNNEST($2::text[], $3::text[], $4::text[], $5::text[])
                      AS t(system, version, code, display)",
            )
            .bind(expansion_uuid)
            .bind(&systems)
            .bind(&versions)
            .bind(&values)
            .bind(&displays)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        }

        tx.commit().await.map_err(Error::Database)?;

        tracing::info!(
            version_uuid = %version_uuid,
            expansion_uuid = %expansion_uuid,
            size = codes.len(),
            "Saved expansion snapshot"
        );

        Ok(ExpansionSnapshot {
            uuid: expansion_uuid,
            value_set_version_uuid: version_uuid,
            timestamp,
            size: codes.len(),
        })
    }

    async fn list_snapshots(&self, version_uuid: Uuid) -> Result<Vec<ExpansionSnapshot>> {
        let rows = sqlx::query(
            "SELECT e.uuid, e.timestamp, COUNT(m.expansion_uuid) AS size
             FROM value_set_expansions e
             LEFT JOIN value_set_expansion_members m ON m.expansion_uuid = e.uuid
             WHERE e.value_set_version_uuid = $1
             GROUP BY e.uuid, e.timestamp, e.sequence
             ORDER BY e.timestamp DESC, e.sequence DESC",
        )
        .bind(version_uuid)
        .fetch_all(self.pool())
        .await
        .map_err(Error::Database)?;

        rows.iter()
            .map(|row| -> Result<ExpansionSnapshot> {
                let size: i64 = row.try_get("size")?;
                Ok(ExpansionSnapshot {
                    uuid: row.try_get("uuid")?,
                    value_set_version_uuid: version_uuid,
                    timestamp: row.try_get("timestamp")?,
                    size: usize::try_from(size).unwrap_or_default(),
                })
            })
            .collect()
    }
}
