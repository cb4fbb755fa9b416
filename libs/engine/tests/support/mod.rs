//! Shared fixtures: an in-memory store, a scripted ECL service and builders
//! for value sets, versions and rules.

use async_trait::async_trait;
use lexicon_engine::{
    config::EngineConfig,
    models::{
        ConceptRow, ExtensionalMemberRecord, RuleRecord, TerminologyVersion, ValueSet,
        ValueSetType, ValueSetVersionRecord, VersionStatus,
    },
    EngineContext, LookupCache, MemoryStore, Result, TerminologyQueryService,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

pub const SNOMED_URI: &str = "http://snomed.info/sct";
pub const RXNORM_URI: &str = "http://www.nlm.nih.gov/research/umls/rxnorm";
pub const ICD10CM_URI: &str = "http://hl7.org/fhir/sid/icd-10-cm";

pub const IS_A: &str = "116680003";
pub const DIABETES: &str = "73211009";

/// ECL service answering from a fixed expression table
#[derive(Default)]
pub struct ScriptedQueryService {
    answers: Mutex<HashMap<String, Vec<ConceptRow>>>,
    calls: AtomicUsize,
    failing: AtomicBool,
}

impl ScriptedQueryService {
    pub fn answer(&self, expression: &str, rows: &[(&str, &str)]) {
        self.answers.lock().unwrap().insert(
            expression.to_string(),
            rows.iter()
                .map(|(code, display)| ConceptRow::new(*code, *display))
                .collect(),
        );
    }

    pub fn fail_with_status(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TerminologyQueryService for ScriptedQueryService {
    async fn query_expression(&self, expression: &str) -> Result<Vec<ConceptRow>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(lexicon_ecl_client::Error::Status {
                status: 503,
                url: format!("http://terminology.test/concepts?ecl={expression}"),
            }
            .into());
        }
        Ok(self
            .answers
            .lock()
            .unwrap()
            .get(expression)
            .cloned()
            .unwrap_or_default())
    }
}

pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub ecl: Arc<ScriptedQueryService>,
    pub ctx: EngineContext,
    pub snomed: TerminologyVersion,
    pub rxnorm: TerminologyVersion,
    pub icd10cm: TerminologyVersion,
    positions: Mutex<HashMap<Uuid, i32>>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let ecl = Arc::new(ScriptedQueryService::default());
        let cache = Arc::new(LookupCache::new(64, Duration::from_secs(300)));
        let ctx = EngineContext::from_store(store.clone(), cache, config)
            .with_query_service(ecl.clone());

        let snomed = terminology("SNOMED CT", "20240301", SNOMED_URI);
        let rxnorm = terminology("RxNorm", "2024-03-04", RXNORM_URI);
        let icd10cm = terminology("ICD-10 CM", "2024", ICD10CM_URI);
        for release in [&snomed, &rxnorm, &icd10cm] {
            store.add_terminology(release.clone());
        }

        Self {
            store,
            ecl,
            ctx,
            snomed,
            rxnorm,
            icd10cm,
            positions: Mutex::new(HashMap::new()),
        }
    }

    /// Register a value set with a single version and return the version uuid
    pub fn version(&self, name: &str, value_set_type: ValueSetType) -> Uuid {
        let record = ValueSetVersionRecord {
            uuid: Uuid::new_v4(),
            value_set: ValueSet {
                uuid: Uuid::new_v4(),
                name: name.to_string(),
                title: Some(name.replace('-', " ")),
                publisher: Some("Clinical Terminology Team".to_string()),
                contact: None,
                description: None,
                immutable: false,
                experimental: false,
                purpose: None,
                value_set_type,
            },
            version: 1,
            status: VersionStatus::Active,
            effective_start: None,
            effective_end: None,
            description: None,
        };
        let uuid = record.uuid;
        self.store.add_version(record);
        uuid
    }

    pub fn include(
        &self,
        version: Uuid,
        terminology: &TerminologyVersion,
        property: &str,
        operator: &str,
        value: &str,
    ) -> Uuid {
        self.rule(version, terminology, property, operator, value, true)
    }

    pub fn exclude(
        &self,
        version: Uuid,
        terminology: &TerminologyVersion,
        property: &str,
        operator: &str,
        value: &str,
    ) -> Uuid {
        self.rule(version, terminology, property, operator, value, false)
    }

    fn rule(
        &self,
        version: Uuid,
        terminology: &TerminologyVersion,
        property: &str,
        operator: &str,
        value: &str,
        include: bool,
    ) -> Uuid {
        let position = self.next_position(version);
        let record = RuleRecord {
            uuid: Uuid::new_v4(),
            position,
            description: None,
            property: property.to_string(),
            operator: operator.to_string(),
            value: value.to_string(),
            include,
            terminology_version_uuid: terminology.uuid,
        };
        let uuid = record.uuid;
        self.store.add_rule(version, record);
        uuid
    }

    fn next_position(&self, version: Uuid) -> i32 {
        let mut positions = self.positions.lock().unwrap();
        let next = positions.entry(version).or_insert(0);
        *next += 1;
        *next
    }

    pub fn member(&self, version: Uuid, terminology: &TerminologyVersion, code: &str, display: &str) {
        self.store.add_extensional_member(
            version,
            ExtensionalMemberRecord {
                code: code.to_string(),
                display: display.to_string(),
                terminology_version_uuid: terminology.uuid,
            },
        );
    }

    /// A small ICD-10-CM tree rooted at E11
    pub fn seed_icd10cm_diabetes(&self) {
        let t = self.icd10cm.uuid;
        for (code, display) in [
            ("E10", "Type 1 diabetes mellitus"),
            ("E11", "Type 2 diabetes mellitus"),
            ("E11.6", "Type 2 diabetes mellitus with other specified complications"),
            ("E11.65", "Type 2 diabetes mellitus with hyperglycemia"),
            ("E11.9", "Type 2 diabetes mellitus without complications"),
        ] {
            self.store.add_concept(t, code, display);
        }
        self.store.add_edge(t, "E11", "E11.6");
        self.store.add_edge(t, "E11", "E11.9");
        self.store.add_edge(t, "E11.6", "E11.65");
    }

    /// Diabetes concepts with an is-a hierarchy and one reference set
    pub fn seed_snomed_diabetes(&self, refset: &str) {
        let release = self.snomed.uuid;
        for (id, fsn) in [
            (DIABETES, "Diabetes mellitus (disorder)"),
            ("44054006", "Diabetes mellitus type 2 (disorder)"),
            ("46635009", "Diabetes mellitus type 1 (disorder)"),
            ("237599002", "Insulin treated type 2 diabetes mellitus (disorder)"),
        ] {
            self.store.add_snomed_concept(release, id, fsn, true);
        }
        self.store.add_snomed_relationship(release, "44054006", DIABETES, IS_A);
        self.store.add_snomed_relationship(release, "46635009", DIABETES, IS_A);
        self.store.add_snomed_relationship(release, "237599002", "44054006", IS_A);

        self.store.add_refset_member(release, refset, "44054006");
        self.store.add_refset_member(release, refset, "237599002");
    }
}

pub fn terminology(name: &str, version: &str, uri: &str) -> TerminologyVersion {
    TerminologyVersion {
        uuid: Uuid::new_v4(),
        terminology: name.to_string(),
        version: version.to_string(),
        fhir_uri: uri.to_string(),
    }
}
