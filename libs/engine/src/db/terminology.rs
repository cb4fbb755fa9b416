//! Terminology content queries - generic concepts, SNOMED CT and RxNorm

use super::{ConceptStore, PgStore, RxNormStore, SnomedStore};
use crate::{
    models::{
        rxnorm::{RXNORM_SAB, SYNONYM_TERM_TYPES},
        ConceptRow, RelColumn, RelationshipLabel, RxNormAnchor, RxNormAtom,
    },
    Error, Result,
};
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

/// SNOMED CT description type of the fully specified name
pub const FSN_TYPE_ID: &str = "900000000000003001";

fn concept_rows(rows: &[PgRow]) -> Result<Vec<ConceptRow>> {
    rows.iter()
        .map(|row| -> Result<ConceptRow> {
            Ok(ConceptRow {
                code: row.try_get("code")?,
                display: row.try_get("display")?,
            })
        })
        .collect()
}

fn atom_rows(rows: &[PgRow]) -> Result<Vec<RxNormAtom>> {
    rows.iter()
        .map(|row| -> Result<RxNormAtom> {
            Ok(RxNormAtom {
                rxcui: row.try_get("rxcui")?,
                rxaui: row.try_get("rxaui")?,
                sab: row.try_get("sab")?,
                tty: row.try_get("tty")?,
                name: row.try_get("str")?,
            })
        })
        .collect()
}

fn synonym_term_types() -> Vec<String> {
    SYNONYM_TERM_TYPES.iter().map(|t| t.to_string()).collect()
}

#[async_trait]
impl ConceptStore for PgStore {
    async fn find_concepts(&self, terminology: Uuid, codes: &[String]) -> Result<Vec<ConceptRow>> {
        if codes.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query(
            "SELECT code, display
             FROM terminology_concepts
             WHERE terminology_version_uuid = $1 AND code = ANY($2)",
        )
        .bind(terminology)
        .bind(codes)
        .fetch_all(self.pool())
        .await
        .map_err(Error::Database)?;

        concept_rows(&rows)
    }

    async fn find_children(
        &self,
        terminology: Uuid,
        parents: &[String],
    ) -> Result<Vec<ConceptRow>> {
        if parents.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query(
            "SELECT DISTINCT c.code, c.display
             FROM terminology_hierarchy h
             JOIN terminology_concepts c
               ON c.terminology_version_uuid = h.terminology_version_uuid
              AND c.code = h.child_code
             WHERE h.terminology_version_uuid = $1 AND h.parent_code = ANY($2)",
        )
        .bind(terminology)
        .bind(parents)
        .fetch_all(self.pool())
        .await
        .map_err(Error::Database)?;

        concept_rows(&rows)
    }

    async fn find_by_property(
        &self,
        terminology: Uuid,
        property: &str,
        values: &[String],
    ) -> Result<Vec<ConceptRow>> {
        if values.is_empty() {
            return Ok(Vec::new());
        }
        // Property values are stored either as a scalar or as an array of strings
        let rows = sqlx::query(
            "SELECT code, display
             FROM terminology_concepts
             WHERE terminology_version_uuid = $1
               AND (properties ->> $2 = ANY($3)
                    OR (jsonb_typeof(properties -> $2) = 'array'
                        AND (properties -> $2) ?| $3))",
        )
        .bind(terminology)
        .bind(property)
        .bind(values)
        .fetch_all(self.pool())
        .await
        .map_err(Error::Database)?;

        concept_rows(&rows)
    }
}

#[async_trait]
impl SnomedStore for PgStore {
    async fn find_active_concepts(
        &self,
        release: Uuid,
        ids: &[String],
    ) -> Result<Vec<ConceptRow>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query(
            "SELECT DISTINCT ON (c.id) c.id AS code, d.term AS display
             FROM snomed_concepts c
             JOIN snomed_descriptions d
               ON d.terminology_version_uuid = c.terminology_version_uuid
              AND d.concept_id = c.id AND d.active AND d.type_id = $3
             WHERE c.terminology_version_uuid = $1 AND c.id = ANY($2) AND c.active
             ORDER BY c.id, d.id",
        )
        .bind(release)
        .bind(ids)
        .bind(FSN_TYPE_ID)
        .fetch_all(self.pool())
        .await
        .map_err(Error::Database)?;

        concept_rows(&rows)
    }

    async fn find_is_a_children(
        &self,
        release: Uuid,
        parents: &[String],
        is_a_type: &str,
    ) -> Result<Vec<ConceptRow>> {
        if parents.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query(
            "SELECT DISTINCT ON (c.id) c.id AS code, d.term AS display
             FROM snomed_relationships r
             JOIN snomed_concepts c
               ON c.terminology_version_uuid = r.terminology_version_uuid
              AND c.id = r.source_id AND c.active
             JOIN snomed_descriptions d
               ON d.terminology_version_uuid = c.terminology_version_uuid
              AND d.concept_id = c.id AND d.active AND d.type_id = $4
             WHERE r.terminology_version_uuid = $1
               AND r.destination_id = ANY($2) AND r.type_id = $3 AND r.active
             ORDER BY c.id, d.id",
        )
        .bind(release)
        .bind(parents)
        .bind(is_a_type)
        .bind(FSN_TYPE_ID)
        .fetch_all(self.pool())
        .await
        .map_err(Error::Database)?;

        concept_rows(&rows)
    }

    async fn find_refset_members(
        &self,
        release: Uuid,
        refset_id: &str,
    ) -> Result<Vec<ConceptRow>> {
        let rows = sqlx::query(
            "SELECT DISTINCT ON (c.id) c.id AS code, d.term AS display
             FROM snomed_refset_members m
             JOIN snomed_concepts c
               ON c.terminology_version_uuid = m.terminology_version_uuid
              AND c.id = m.referenced_component_id AND c.active
             JOIN snomed_descriptions d
               ON d.terminology_version_uuid = c.terminology_version_uuid
              AND d.concept_id = c.id AND d.active AND d.type_id = $3
             WHERE m.terminology_version_uuid = $1 AND m.refset_id = $2 AND m.active
             ORDER BY c.id, d.id",
        )
        .bind(release)
        .bind(refset_id)
        .bind(FSN_TYPE_ID)
        .fetch_all(self.pool())
        .await
        .map_err(Error::Database)?;

        concept_rows(&rows)
    }
}

const ATOMS_BY_SOURCE: &str = "SELECT rxcui, rxaui, sab, tty, str
     FROM rxnconso
     WHERE sab = ANY($1) AND tty <> ALL($2) AND suppress = 'N'";

const ATOMS_BY_TERM_TYPE: &str = "SELECT rxcui, rxaui, sab, tty, str
     FROM rxnconso
     WHERE sab = $1 AND tty = ANY($2) AND tty <> ALL($3) AND suppress = 'N'";

const ATOMS_BY_CONCEPT: &str = "SELECT rxcui, rxaui, sab, tty, str
     FROM rxnconso
     WHERE rxcui = ANY($1) AND tty <> ALL($2) AND suppress = 'N'";

// An rxnrel row states the relationship of the second concept to the first,
// so the related concepts are read from rxcui2.
const RELATED_BY_REL_FROM_CONCEPT: &str = "SELECT DISTINCT c.rxcui, c.rxaui, c.sab, c.tty, c.str
     FROM rxnrel r
     JOIN rxnconso c ON c.rxcui = r.rxcui2
     WHERE r.rxcui1 = $1 AND r.rel = $2
       AND c.sab = $3 AND c.tty <> ALL($4) AND c.suppress = 'N'";

const RELATED_BY_RELA_FROM_CONCEPT: &str = "SELECT DISTINCT c.rxcui, c.rxaui, c.sab, c.tty, c.str
     FROM rxnrel r
     JOIN rxnconso c ON c.rxcui = r.rxcui2
     WHERE r.rxcui1 = $1 AND r.rela = $2
       AND c.sab = $3 AND c.tty <> ALL($4) AND c.suppress = 'N'";

const RELATED_BY_REL_FROM_ATOM: &str = "SELECT DISTINCT c.rxcui, c.rxaui, c.sab, c.tty, c.str
     FROM rxnrel r
     JOIN rxnconso a ON a.rxaui = r.rxaui2
     JOIN rxnconso c ON c.rxcui = a.rxcui
     WHERE r.rxaui1 = $1 AND r.rel = $2
       AND c.sab = $3 AND c.tty <> ALL($4) AND c.suppress = 'N'";

const RELATED_BY_RELA_FROM_ATOM: &str = "SELECT DISTINCT c.rxcui, c.rxaui, c.sab, c.tty, c.str
     FROM rxnrel r
     JOIN rxnconso a ON a.rxaui = r.rxaui2
     JOIN rxnconso c ON c.rxcui = a.rxcui
     WHERE r.rxaui1 = $1 AND r.rela = $2
       AND c.sab = $3 AND c.tty <> ALL($4) AND c.suppress = 'N'";

fn related_atoms_query(anchor: &RxNormAnchor, column: RelColumn) -> &'static str {
    match (anchor, column) {
        (RxNormAnchor::Concept(_), RelColumn::Rel) => RELATED_BY_REL_FROM_CONCEPT,
        (RxNormAnchor::Concept(_), RelColumn::Rela) => RELATED_BY_RELA_FROM_CONCEPT,
        (RxNormAnchor::Atom(_), RelColumn::Rel) => RELATED_BY_REL_FROM_ATOM,
        (RxNormAnchor::Atom(_), RelColumn::Rela) => RELATED_BY_RELA_FROM_ATOM,
    }
}

#[async_trait]
impl RxNormStore for PgStore {
    async fn find_atoms_by_source(&self, sabs: &[String]) -> Result<Vec<RxNormAtom>> {
        if sabs.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query(ATOMS_BY_SOURCE)
            .bind(sabs)
            .bind(synonym_term_types())
            .fetch_all(self.pool())
            .await
            .map_err(Error::Database)?;

        atom_rows(&rows)
    }

    async fn find_atoms_by_term_type(&self, ttys: &[String]) -> Result<Vec<RxNormAtom>> {
        if ttys.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query(ATOMS_BY_TERM_TYPE)
            .bind(RXNORM_SAB)
            .bind(ttys)
            .bind(synonym_term_types())
            .fetch_all(self.pool())
            .await
            .map_err(Error::Database)?;

        atom_rows(&rows)
    }

    async fn find_concept_atoms(&self, rxcuis: &[String]) -> Result<Vec<RxNormAtom>> {
        if rxcuis.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query(ATOMS_BY_CONCEPT)
            .bind(rxcuis)
            .bind(synonym_term_types())
            .fetch_all(self.pool())
            .await
            .map_err(Error::Database)?;

        atom_rows(&rows)
    }

    async fn find_related_atoms(
        &self,
        anchor: &RxNormAnchor,
        label: RelationshipLabel,
    ) -> Result<Vec<RxNormAtom>> {
        let rows = sqlx::query(related_atoms_query(anchor, label.column))
            .bind(anchor.id())
            .bind(label.label)
            .bind(RXNORM_SAB)
            .bind(synonym_term_types())
            .fetch_all(self.pool())
            .await
            .map_err(Error::Database)?;

        atom_rows(&rows)
    }
}
