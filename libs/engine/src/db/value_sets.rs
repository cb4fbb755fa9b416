//! Value set, version, rule and terminology version lookups

use super::{PgStore, ValueSetStore};
use crate::{
    models::{
        ExtensionalMemberRecord, RuleRecord, TerminologyVersion, ValueSet, ValueSetType,
        ValueSetVersionRecord, VersionStatus,
    },
    Error, Result,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::Row;
use uuid::Uuid;

#[async_trait]
impl ValueSetStore for PgStore {
    async fn find_version(&self, version_uuid: Uuid) -> Result<Option<ValueSetVersionRecord>> {
        let row = sqlx::query(
            "SELECT v.uuid, v.version, v.status, v.effective_start, v.effective_end,
                    v.description AS version_description,
                    s.uuid AS value_set_uuid, s.name, s.title, s.publisher, s.contact,
                    s.description, s.immutable, s.experimental, s.purpose, s.type
             FROM value_set_versions v
             JOIN value_sets s ON s.uuid = v.value_set_uuid
             WHERE v.uuid = $1",
        )
        .bind(version_uuid)
        .fetch_optional(self.pool())
        .await
        .map_err(Error::Database)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let value_set_type: String = row.try_get("type")?;
        let status: String = row.try_get("status")?;

        let value_set = ValueSet {
            uuid: row.try_get("value_set_uuid")?,
            name: row.try_get("name")?,
            title: row.try_get("title")?,
            publisher: row.try_get("publisher")?,
            contact: row.try_get("contact")?,
            description: row.try_get("description")?,
            immutable: row.try_get("immutable")?,
            experimental: row.try_get("experimental")?,
            purpose: row.try_get("purpose")?,
            value_set_type: value_set_type.parse::<ValueSetType>()?,
        };

        Ok(Some(ValueSetVersionRecord {
            uuid: row.try_get("uuid")?,
            value_set,
            version: row.try_get("version")?,
            status: status.parse::<VersionStatus>()?,
            effective_start: row.try_get::<Option<NaiveDate>, _>("effective_start")?,
            effective_end: row.try_get::<Option<NaiveDate>, _>("effective_end")?,
            description: row.try_get("version_description")?,
        }))
    }

    async fn find_rules(&self, version_uuid: Uuid) -> Result<Vec<RuleRecord>> {
        let rows = sqlx::query(
            "SELECT uuid, position, description, property, operator, value, include,
                    terminology_version_uuid
             FROM value_set_rules
             WHERE value_set_version_uuid = $1
             ORDER BY position, uuid",
        )
        .bind(version_uuid)
        .fetch_all(self.pool())
        .await
        .map_err(Error::Database)?;

        rows.iter()
            .map(|row| -> Result<RuleRecord> {
                Ok(RuleRecord {
                    uuid: row.try_get("uuid")?,
                    position: row.try_get("position")?,
                    description: row.try_get("description")?,
                    property: row.try_get("property")?,
                    operator: row.try_get("operator")?,
                    value: row.try_get("value")?,
                    include: row.try_get("include")?,
                    terminology_version_uuid: row.try_get("terminology_version_uuid")?,
                })
            })
            .collect()
    }

    async fn find_extensional_members(
        &self,
        version_uuid: Uuid,
    ) -> Result<Vec<ExtensionalMemberRecord>> {
        let rows = sqlx::query(
            "SELECT code, display, terminology_version_uuid
             FROM extensional_members
             WHERE value_set_version_uuid = $1
             ORDER BY id",
        )
        .bind(version_uuid)
        .fetch_all(self.pool())
        .await
        .map_err(Error::Database)?;

        rows.iter()
            .map(|row| -> Result<ExtensionalMemberRecord> {
                Ok(ExtensionalMemberRecord {
                    code: row.try_get("code")?,
                    display: row.try_get("display")?,
                    terminology_version_uuid: row.try_get("terminology_version_uuid")?,
                })
            })
            .collect()
    }

    async fn find_terminology(
        &self,
        terminology_version_uuid: Uuid,
    ) -> Result<Option<TerminologyVersion>> {
        let row = sqlx::query(
            "SELECT uuid, terminology, version, fhir_uri
             FROM terminology_versions
             WHERE uuid = $1",
        )
        .bind(terminology_version_uuid)
        .fetch_optional(self.pool())
        .await
        .map_err(Error::Database)?;

        row.map(|row| -> Result<TerminologyVersion> {
            Ok(TerminologyVersion {
                uuid: row.try_get("uuid")?,
                terminology: row.try_get("terminology")?,
                version: row.try_get("version")?,
                fhir_uri: row.try_get("fhir_uri")?,
            })
        })
        .transpose()
    }
}
