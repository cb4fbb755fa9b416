//! In-process implementation of every store trait
//!
//! Used by tests and by tooling that expands value sets from fixtures. Query
//! counters make cache behaviour observable.

use super::{ConceptStore, ExpansionStore, RxNormStore, SnomedStore, ValueSetStore};
use crate::{
    models::{
        rxnorm::RXNORM_SAB, Code, ConceptRow, ExpansionSnapshot, ExtensionalMemberRecord,
        RelColumn, RelationshipLabel, RuleRecord, RxNormAnchor, RxNormAtom, StoredExpansion,
        TerminologyVersion, ValueSetVersionRecord,
    },
    Result,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// One `rxnrel` row: the relationship of the second concept to the first
#[derive(Debug, Clone, Default)]
pub struct RxNormRelationship {
    pub rxcui1: String,
    pub rxaui1: Option<String>,
    pub rel: String,
    pub rela: Option<String>,
    pub rxcui2: String,
}

#[derive(Debug, Clone, Default)]
struct Concept {
    display: String,
    properties: HashMap<String, Vec<String>>,
}

#[derive(Debug, Clone)]
struct SnomedConcept {
    fsn: String,
    active: bool,
}

#[derive(Debug, Clone)]
struct Snapshot {
    header: ExpansionSnapshot,
    codes: HashSet<Code>,
}

#[derive(Debug, Default)]
struct MemoryData {
    terminologies: HashMap<Uuid, TerminologyVersion>,
    versions: HashMap<Uuid, ValueSetVersionRecord>,
    rules: HashMap<Uuid, Vec<RuleRecord>>,
    members: HashMap<Uuid, Vec<ExtensionalMemberRecord>>,
    concepts: HashMap<Uuid, BTreeMap<String, Concept>>,
    edges: HashMap<Uuid, BTreeSet<(String, String)>>,
    // Keyed by (release, concept id)
    snomed_concepts: BTreeMap<(Uuid, String), SnomedConcept>,
    // (release, source, destination, type)
    snomed_relationships: Vec<(Uuid, String, String, String)>,
    refsets: HashMap<(Uuid, String), BTreeSet<String>>,
    atoms: Vec<RxNormAtom>,
    suppressed: HashSet<String>,
    relationships: Vec<RxNormRelationship>,
    // Insertion order breaks timestamp ties
    snapshots: Vec<Snapshot>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Mutex<MemoryData>,
    terminology_queries: AtomicUsize,
    terminology_lookups: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn data(&self) -> MutexGuard<'_, MemoryData> {
        self.data.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn count_query(&self) {
        self.terminology_queries.fetch_add(1, Ordering::SeqCst);
    }

    /// Number of concept, SNOMED CT and RxNorm queries served
    pub fn terminology_queries(&self) -> usize {
        self.terminology_queries.load(Ordering::SeqCst)
    }

    /// Number of terminology version records looked up
    pub fn terminology_lookups(&self) -> usize {
        self.terminology_lookups.load(Ordering::SeqCst)
    }

    pub fn reset_counters(&self) {
        self.terminology_queries.store(0, Ordering::SeqCst);
        self.terminology_lookups.store(0, Ordering::SeqCst);
    }

    // Value set definitions

    pub fn add_terminology(&self, terminology: TerminologyVersion) {
        self.data().terminologies.insert(terminology.uuid, terminology);
    }

    pub fn add_version(&self, version: ValueSetVersionRecord) {
        self.data().versions.insert(version.uuid, version);
    }

    pub fn add_rule(&self, version_uuid: Uuid, rule: RuleRecord) {
        let mut data = self.data();
        let rules = data.rules.entry(version_uuid).or_default();
        rules.push(rule);
        rules.sort_by(|a, b| a.position.cmp(&b.position).then(a.uuid.cmp(&b.uuid)));
    }

    pub fn remove_rules(&self, version_uuid: Uuid) {
        self.data().rules.remove(&version_uuid);
    }

    /// Later rows for an already listed `(terminology, code)` are ignored,
    /// as the unique constraint on `extensional_members` would reject them.
    pub fn add_extensional_member(&self, version_uuid: Uuid, member: ExtensionalMemberRecord) {
        let mut data = self.data();
        let members = data.members.entry(version_uuid).or_default();
        let listed = members.iter().any(|m| {
            m.terminology_version_uuid == member.terminology_version_uuid && m.code == member.code
        });
        if !listed {
            members.push(member);
        }
    }

    // Generic concepts

    pub fn add_concept(&self, terminology: Uuid, code: &str, display: &str) {
        self.data()
            .concepts
            .entry(terminology)
            .or_default()
            .entry(code.to_string())
            .or_default()
            .display = display.to_string();
    }

    pub fn add_concept_property(&self, terminology: Uuid, code: &str, property: &str, value: &str) {
        self.data()
            .concepts
            .entry(terminology)
            .or_default()
            .entry(code.to_string())
            .or_default()
            .properties
            .entry(property.to_string())
            .or_default()
            .push(value.to_string());
    }

    pub fn add_edge(&self, terminology: Uuid, parent: &str, child: &str) {
        self.data()
            .edges
            .entry(terminology)
            .or_default()
            .insert((parent.to_string(), child.to_string()));
    }

    // SNOMED CT

    pub fn add_snomed_concept(&self, release: Uuid, id: &str, fsn: &str, active: bool) {
        self.data().snomed_concepts.insert(
            (release, id.to_string()),
            SnomedConcept {
                fsn: fsn.to_string(),
                active,
            },
        );
    }

    pub fn add_snomed_relationship(
        &self,
        release: Uuid,
        source: &str,
        destination: &str,
        type_id: &str,
    ) {
        self.data().snomed_relationships.push((
            release,
            source.to_string(),
            destination.to_string(),
            type_id.to_string(),
        ));
    }

    pub fn add_refset_member(&self, release: Uuid, refset_id: &str, concept_id: &str) {
        self.data()
            .refsets
            .entry((release, refset_id.to_string()))
            .or_default()
            .insert(concept_id.to_string());
    }

    // RxNorm

    pub fn add_rxnorm_atom(&self, atom: RxNormAtom) {
        self.data().atoms.push(atom);
    }

    pub fn suppress_rxnorm_atom(&self, rxaui: &str) {
        self.data().suppressed.insert(rxaui.to_string());
    }

    pub fn add_rxnorm_relationship(&self, relationship: RxNormRelationship) {
        self.data().relationships.push(relationship);
    }

    // Snapshots

    /// Store a snapshot with an explicit timestamp
    pub fn insert_snapshot_at(
        &self,
        version_uuid: Uuid,
        timestamp: DateTime<Utc>,
        codes: HashSet<Code>,
    ) -> ExpansionSnapshot {
        let header = ExpansionSnapshot {
            uuid: Uuid::new_v4(),
            value_set_version_uuid: version_uuid,
            timestamp,
            size: codes.len(),
        };
        self.data().snapshots.push(Snapshot {
            header: header.clone(),
            codes,
        });
        header
    }

    /// Members of a snapshot, current or not
    pub fn snapshot_codes(&self, expansion_uuid: Uuid) -> Option<HashSet<Code>> {
        self.data()
            .snapshots
            .iter()
            .find(|s| s.header.uuid == expansion_uuid)
            .map(|s| s.codes.clone())
    }

    pub fn snapshot_count(&self, version_uuid: Uuid) -> usize {
        self.data()
            .snapshots
            .iter()
            .filter(|s| s.header.value_set_version_uuid == version_uuid)
            .count()
    }
}

fn active_fsn(data: &MemoryData, release: Uuid, id: &str) -> Option<ConceptRow> {
    data.snomed_concepts
        .get(&(release, id.to_string()))
        .filter(|c| c.active)
        .map(|c| ConceptRow::new(id, c.fsn.clone()))
}

fn eligible_atoms<'a>(
    data: &'a MemoryData,
    filter: impl Fn(&RxNormAtom) -> bool + 'a,
) -> impl Iterator<Item = RxNormAtom> + 'a {
    data.atoms
        .iter()
        .filter(move |atom| !atom.is_synonym() && !data.suppressed.contains(&atom.rxaui))
        .filter(move |atom| filter(*atom))
        .cloned()
}

#[async_trait]
impl ValueSetStore for MemoryStore {
    async fn find_version(&self, version_uuid: Uuid) -> Result<Option<ValueSetVersionRecord>> {
        Ok(self.data().versions.get(&version_uuid).cloned())
    }

    async fn find_rules(&self, version_uuid: Uuid) -> Result<Vec<RuleRecord>> {
        Ok(self
            .data()
            .rules
            .get(&version_uuid)
            .cloned()
            .unwrap_or_default())
    }

    async fn find_extensional_members(
        &self,
        version_uuid: Uuid,
    ) -> Result<Vec<ExtensionalMemberRecord>> {
        Ok(self
            .data()
            .members
            .get(&version_uuid)
            .cloned()
            .unwrap_or_default())
    }

    async fn find_terminology(
        &self,
        terminology_version_uuid: Uuid,
    ) -> Result<Option<TerminologyVersion>> {
        self.terminology_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .data()
            .terminologies
            .get(&terminology_version_uuid)
            .cloned())
    }
}

#[async_trait]
impl ConceptStore for MemoryStore {
    async fn find_concepts(&self, terminology: Uuid, codes: &[String]) -> Result<Vec<ConceptRow>> {
        self.count_query();
        let data = self.data();
        let Some(concepts) = data.concepts.get(&terminology) else {
            return Ok(Vec::new());
        };
        let wanted: BTreeSet<&String> = codes.iter().collect();
        Ok(wanted
            .into_iter()
            .filter_map(|code| {
                concepts
                    .get(code)
                    .map(|c| ConceptRow::new(code.clone(), c.display.clone()))
            })
            .collect())
    }

    async fn find_children(
        &self,
        terminology: Uuid,
        parents: &[String],
    ) -> Result<Vec<ConceptRow>> {
        self.count_query();
        let data = self.data();
        let (Some(edges), Some(concepts)) =
            (data.edges.get(&terminology), data.concepts.get(&terminology))
        else {
            return Ok(Vec::new());
        };
        let parents: HashSet<&String> = parents.iter().collect();
        let children: BTreeSet<&String> = edges
            .iter()
            .filter(|(parent, _)| parents.contains(parent))
            .map(|(_, child)| child)
            .collect();
        Ok(children
            .into_iter()
            .filter_map(|code| {
                concepts
                    .get(code)
                    .map(|c| ConceptRow::new(code.clone(), c.display.clone()))
            })
            .collect())
    }

    async fn find_by_property(
        &self,
        terminology: Uuid,
        property: &str,
        values: &[String],
    ) -> Result<Vec<ConceptRow>> {
        self.count_query();
        let data = self.data();
        let Some(concepts) = data.concepts.get(&terminology) else {
            return Ok(Vec::new());
        };
        Ok(concepts
            .iter()
            .filter(|(_, c)| {
                c.properties
                    .get(property)
                    .is_some_and(|stored| stored.iter().any(|v| values.contains(v)))
            })
            .map(|(code, c)| ConceptRow::new(code.clone(), c.display.clone()))
            .collect())
    }
}

#[async_trait]
impl SnomedStore for MemoryStore {
    async fn find_active_concepts(
        &self,
        release: Uuid,
        ids: &[String],
    ) -> Result<Vec<ConceptRow>> {
        self.count_query();
        let data = self.data();
        let ids: BTreeSet<&String> = ids.iter().collect();
        Ok(ids
            .into_iter()
            .filter_map(|id| active_fsn(&data, release, id))
            .collect())
    }

    async fn find_is_a_children(
        &self,
        release: Uuid,
        parents: &[String],
        is_a_type: &str,
    ) -> Result<Vec<ConceptRow>> {
        self.count_query();
        let data = self.data();
        let sources: BTreeSet<&String> = data
            .snomed_relationships
            .iter()
            .filter(|(r, _, destination, type_id)| {
                *r == release && type_id == is_a_type && parents.contains(destination)
            })
            .map(|(_, source, _, _)| source)
            .collect();
        Ok(sources
            .into_iter()
            .filter_map(|id| active_fsn(&data, release, id))
            .collect())
    }

    async fn find_refset_members(
        &self,
        release: Uuid,
        refset_id: &str,
    ) -> Result<Vec<ConceptRow>> {
        self.count_query();
        let data = self.data();
        let Some(members) = data.refsets.get(&(release, refset_id.to_string())) else {
            return Ok(Vec::new());
        };
        Ok(members
            .iter()
            .filter_map(|id| active_fsn(&data, release, id))
            .collect())
    }
}

#[async_trait]
impl RxNormStore for MemoryStore {
    async fn find_atoms_by_source(&self, sabs: &[String]) -> Result<Vec<RxNormAtom>> {
        self.count_query();
        let data = self.data();
        Ok(eligible_atoms(&data, |atom| sabs.contains(&atom.sab)).collect())
    }

    async fn find_atoms_by_term_type(&self, ttys: &[String]) -> Result<Vec<RxNormAtom>> {
        self.count_query();
        let data = self.data();
        Ok(eligible_atoms(&data, |atom| {
            atom.sab == RXNORM_SAB && ttys.contains(&atom.tty)
        })
        .collect())
    }

    async fn find_concept_atoms(&self, rxcuis: &[String]) -> Result<Vec<RxNormAtom>> {
        self.count_query();
        let data = self.data();
        Ok(eligible_atoms(&data, |atom| rxcuis.contains(&atom.rxcui)).collect())
    }

    async fn find_related_atoms(
        &self,
        anchor: &RxNormAnchor,
        label: RelationshipLabel,
    ) -> Result<Vec<RxNormAtom>> {
        self.count_query();
        let data = self.data();
        let related: HashSet<String> = data
            .relationships
            .iter()
            .filter(|r| match anchor {
                RxNormAnchor::Concept(rxcui) => &r.rxcui1 == rxcui,
                RxNormAnchor::Atom(rxaui) => r.rxaui1.as_deref() == Some(rxaui.as_str()),
            })
            .filter(|r| match label.column {
                RelColumn::Rel => r.rel == label.label,
                RelColumn::Rela => r.rela.as_deref() == Some(label.label),
            })
            .map(|r| r.rxcui2.clone())
            .collect();
        Ok(eligible_atoms(&data, |atom| {
            atom.sab == RXNORM_SAB && related.contains(&atom.rxcui)
        })
        .collect())
    }
}

#[async_trait]
impl ExpansionStore for MemoryStore {
    async fn expansion_already_exists(&self, version_uuid: Uuid) -> Result<bool> {
        Ok(self.snapshot_count(version_uuid) > 0)
    }

    async fn load_current_expansion(
        &self,
        version_uuid: Uuid,
    ) -> Result<Option<StoredExpansion>> {
        let data = self.data();
        let current = data
            .snapshots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.header.value_set_version_uuid == version_uuid)
            .max_by_key(|(index, s)| (s.header.timestamp, *index))
            .map(|(_, s)| StoredExpansion {
                snapshot: s.header.clone(),
                codes: s.codes.clone(),
            });
        Ok(current)
    }

    async fn save_expansion(
        &self,
        version_uuid: Uuid,
        codes: &HashSet<Code>,
    ) -> Result<ExpansionSnapshot> {
        Ok(self.insert_snapshot_at(version_uuid, Utc::now(), codes.clone()))
    }

    async fn list_snapshots(&self, version_uuid: Uuid) -> Result<Vec<ExpansionSnapshot>> {
        let data = self.data();
        let mut snapshots: Vec<(usize, ExpansionSnapshot)> = data
            .snapshots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.header.value_set_version_uuid == version_uuid)
            .map(|(index, s)| (index, s.header.clone()))
            .collect();
        snapshots.sort_by(|(ia, a), (ib, b)| b.timestamp.cmp(&a.timestamp).then(ib.cmp(ia)));
        Ok(snapshots.into_iter().map(|(_, s)| s).collect())
    }
}
