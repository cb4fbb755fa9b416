//! Data access traits used by the rule evaluators and the expansion orchestrator
//!
//! [`PgStore`](super::PgStore) implements every trait against Postgres;
//! [`MemoryStore`](super::MemoryStore) implements them in process.

use crate::{
    models::{
        Code, ConceptRow, ExpansionSnapshot, ExtensionalMemberRecord, RelationshipLabel,
        RuleRecord, RxNormAnchor, RxNormAtom, StoredExpansion, TerminologyVersion,
        ValueSetVersionRecord,
    },
    Result,
};
use async_trait::async_trait;
use std::collections::HashSet;
use uuid::Uuid;

/// Value set definitions: versions, their rules and explicit members
#[async_trait]
pub trait ValueSetStore: Send + Sync {
    /// Version row joined with its owning value set
    ///
    /// # Returns
    /// * `Ok(None)` - No version with this uuid
    async fn find_version(&self, version_uuid: Uuid) -> Result<Option<ValueSetVersionRecord>>;

    /// Rules bound to a version, ordered by position
    async fn find_rules(&self, version_uuid: Uuid) -> Result<Vec<RuleRecord>>;

    /// Stored membership rows of an extensional version
    async fn find_extensional_members(
        &self,
        version_uuid: Uuid,
    ) -> Result<Vec<ExtensionalMemberRecord>>;

    async fn find_terminology(
        &self,
        terminology_version_uuid: Uuid,
    ) -> Result<Option<TerminologyVersion>>;
}

/// Concept and hierarchy tables of ICD-10 style and other generic code systems
///
/// Every lookup is scoped to one terminology release.
#[async_trait]
pub trait ConceptStore: Send + Sync {
    /// Concepts whose code is in `codes`; unknown codes are skipped
    async fn find_concepts(
        &self,
        terminology: Uuid,
        codes: &[String],
    ) -> Result<Vec<ConceptRow>>;

    /// Direct children of every code in `parents`
    async fn find_children(
        &self,
        terminology: Uuid,
        parents: &[String],
    ) -> Result<Vec<ConceptRow>>;

    /// Concepts whose `property` value is one of `values`
    async fn find_by_property(
        &self,
        terminology: Uuid,
        property: &str,
        values: &[String],
    ) -> Result<Vec<ConceptRow>>;
}

/// Local SNOMED CT release tables
///
/// Every query reads a single release, identified by the terminology
/// version uuid the rule points at.
#[async_trait]
pub trait SnomedStore: Send + Sync {
    /// Active concepts among `ids`, displayed by their FSN
    async fn find_active_concepts(&self, release: Uuid, ids: &[String])
        -> Result<Vec<ConceptRow>>;

    /// Active concepts that are the source of an active `is_a_type`
    /// relationship targeting one of `parents`, displayed by their FSN
    async fn find_is_a_children(
        &self,
        release: Uuid,
        parents: &[String],
        is_a_type: &str,
    ) -> Result<Vec<ConceptRow>>;

    /// Active members of a reference set
    async fn find_refset_members(&self, release: Uuid, refset_id: &str)
        -> Result<Vec<ConceptRow>>;
}

/// RxNorm `rxnconso` and `rxnrel` tables
///
/// Implementations exclude synonym term types and suppressed atoms; the
/// evaluator reduces the remaining atoms to one per RXCUI and takes the
/// display from [`RxNormStore::find_concept_atoms`].
#[async_trait]
pub trait RxNormStore: Send + Sync {
    async fn find_atoms_by_source(&self, sabs: &[String]) -> Result<Vec<RxNormAtom>>;

    async fn find_atoms_by_term_type(&self, ttys: &[String]) -> Result<Vec<RxNormAtom>>;

    /// Every atom of the given concepts, whatever its source vocabulary
    async fn find_concept_atoms(&self, rxcuis: &[String]) -> Result<Vec<RxNormAtom>>;

    /// Atoms of the concepts related to `anchor` through `label`
    async fn find_related_atoms(
        &self,
        anchor: &RxNormAnchor,
        label: RelationshipLabel,
    ) -> Result<Vec<RxNormAtom>>;
}

/// Append-only expansion snapshots
#[async_trait]
pub trait ExpansionStore: Send + Sync {
    /// True iff at least one snapshot exists for the version, regardless of age
    async fn expansion_already_exists(&self, version_uuid: Uuid) -> Result<bool>;

    /// Members of the most recent snapshot of the version
    ///
    /// # Returns
    /// * `Ok(None)` - No snapshot exists
    async fn load_current_expansion(&self, version_uuid: Uuid)
        -> Result<Option<StoredExpansion>>;

    /// Persist `codes` as a new snapshot
    ///
    /// Writes the header and every member atomically. Earlier snapshots are
    /// never touched.
    async fn save_expansion(
        &self,
        version_uuid: Uuid,
        codes: &HashSet<Code>,
    ) -> Result<ExpansionSnapshot>;

    /// Snapshot headers of a version, newest first
    async fn list_snapshots(&self, version_uuid: Uuid) -> Result<Vec<ExpansionSnapshot>>;
}

/// Expression-language delegation to an external terminology server
#[async_trait]
pub trait TerminologyQueryService: Send + Sync {
    /// Concepts matching an ECL expression
    ///
    /// # Errors
    /// * `TerminologyService` - The server was unreachable, answered with a
    ///   non-success status or returned a malformed payload
    async fn query_expression(&self, expression: &str) -> Result<Vec<ConceptRow>>;
}
