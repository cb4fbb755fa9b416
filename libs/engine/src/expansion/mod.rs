//! Value set version orchestration
//!
//! [`ValueSetVersion::expand`] is the entry point. Intensional versions reuse
//! the current persisted snapshot unless a recompute is forced; a recompute
//! evaluates every rule, applies the set algebra in [`algebra`] and appends a
//! new snapshot. Extensional versions are materialized from their stored
//! members and never persisted as snapshots.

pub mod algebra;
pub mod serialize;

use crate::{
    context::EngineContext,
    metrics,
    models::{
        Code, ExpansionSnapshot, ValueSet, ValueSetType, ValueSetVersionRecord, VersionStatus,
    },
    rules::Rule,
    Error, Result,
};
use chrono::NaiveDate;
use futures::{stream, StreamExt, TryStreamExt};
use std::collections::{BTreeMap, HashSet};
use std::time::Instant;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct ValueSetVersion {
    pub uuid: Uuid,
    pub value_set: ValueSet,
    pub version: i32,
    pub status: VersionStatus,
    pub effective_start: Option<NaiveDate>,
    pub effective_end: Option<NaiveDate>,
    pub description: Option<String>,
    /// Rules keyed by terminology name
    rules: BTreeMap<String, Vec<Rule>>,
    expansion: HashSet<Code>,
    expanded: bool,
    snapshot: Option<ExpansionSnapshot>,
    /// Explicit members keyed by `(system, version)`
    extensional_codes: BTreeMap<(String, String), Vec<Code>>,
}

impl From<ValueSetVersionRecord> for ValueSetVersion {
    fn from(record: ValueSetVersionRecord) -> Self {
        Self {
            uuid: record.uuid,
            value_set: record.value_set,
            version: record.version,
            status: record.status,
            effective_start: record.effective_start,
            effective_end: record.effective_end,
            description: record.description,
            rules: BTreeMap::new(),
            expansion: HashSet::new(),
            expanded: false,
            snapshot: None,
            extensional_codes: BTreeMap::new(),
        }
    }
}

impl ValueSetVersion {
    /// Load a version and its value set. Rules and members load lazily.
    pub async fn load(ctx: &EngineContext, uuid: Uuid) -> Result<Self> {
        let record = ctx
            .value_sets
            .find_version(uuid)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Value set version {uuid}")))?;
        Ok(Self::from(record))
    }

    pub fn value_set_type(&self) -> ValueSetType {
        self.value_set.value_set_type
    }

    /// Load whatever defines membership: rules or explicit members.
    pub async fn load_definition(&mut self, ctx: &EngineContext) -> Result<()> {
        match self.value_set_type() {
            ValueSetType::Intensional => self.load_rules(ctx).await,
            ValueSetType::Extensional => self.load_extensional_codes(ctx).await.map(|_| ()),
        }
    }

    /// Load the version's rules grouped by terminology name.
    pub async fn load_rules(&mut self, ctx: &EngineContext) -> Result<()> {
        let records = ctx.value_sets.find_rules(self.uuid).await?;

        let mut rules: BTreeMap<String, Vec<Rule>> = BTreeMap::new();
        for record in records {
            let terminology = ctx.terminology(record.terminology_version_uuid).await?;
            rules
                .entry(terminology.terminology.clone())
                .or_default()
                .push(Rule::new(record, terminology));
        }

        tracing::debug!(
            version_uuid = %self.uuid,
            terminologies = rules.len(),
            rules = rules.values().map(Vec::len).sum::<usize>(),
            "Loaded rules"
        );

        self.rules = rules;
        Ok(())
    }

    pub fn rules(&self) -> &BTreeMap<String, Vec<Rule>> {
        &self.rules
    }

    /// Include rules per terminology; every terminology with rules has an entry.
    pub fn include_rules(&self) -> BTreeMap<&String, Vec<&Rule>> {
        self.partition_rules(true)
    }

    /// Exclude rules per terminology; every terminology with rules has an entry.
    pub fn exclude_rules(&self) -> BTreeMap<&String, Vec<&Rule>> {
        self.partition_rules(false)
    }

    fn partition_rules(&self, include: bool) -> BTreeMap<&String, Vec<&Rule>> {
        self.rules
            .iter()
            .map(|(terminology, rules)| {
                (
                    terminology,
                    rules.iter().filter(|r| r.include == include).collect(),
                )
            })
            .collect()
    }

    /// Reject rule sets where a terminology has no include rule.
    pub fn validate_rules(&self) -> Result<()> {
        for (terminology, includes) in self.include_rules() {
            if includes.is_empty() {
                return Err(Error::MissingIncludeRule {
                    terminology: terminology.clone(),
                });
            }
        }
        Ok(())
    }

    /// Evaluate every rule, combine the results and, for intensional value
    /// sets, persist them as a new snapshot.
    pub async fn create_expansion(&mut self, ctx: &EngineContext) -> Result<()> {
        if self.value_set_type() == ValueSetType::Extensional {
            return Err(Error::Validation(format!(
                "Value set version {} is extensional; its members are not computed",
                self.uuid
            )));
        }
        // Rules may have been edited since the last load
        self.load_rules(ctx).await?;
        self.validate_rules()?;

        let concurrency = ctx.config.rule_concurrency.max(1);
        let mut contributions = Vec::with_capacity(self.rules.len());

        for (terminology, rules) in self.rules.iter_mut() {
            let results: Vec<HashSet<Code>> = stream::iter(rules.iter())
                .map(|rule| rule.evaluate(ctx))
                .buffered(concurrency)
                .try_collect()
                .await?;
            for (rule, codes) in rules.iter_mut().zip(results) {
                rule.set_results(codes);
            }

            let includes: Vec<&HashSet<Code>> =
                rules.iter().filter(|r| r.include).map(Rule::results).collect();
            let excludes: Vec<&HashSet<Code>> =
                rules.iter().filter(|r| !r.include).map(Rule::results).collect();
            let contribution = algebra::combine_terminology(terminology, &includes, &excludes)?;

            tracing::debug!(
                version_uuid = %self.uuid,
                terminology = %terminology,
                includes = includes.len(),
                excludes = excludes.len(),
                count = contribution.len(),
                "Terminology combined"
            );
            contributions.push(contribution);
        }

        self.expansion = algebra::union_all(contributions);
        self.expanded = true;
        self.snapshot = Some(ctx.expansions.save_expansion(self.uuid, &self.expansion).await?);
        Ok(())
    }

    /// Materialize the version's membership.
    ///
    /// Without `force_new` an existing snapshot is returned verbatim; rule or
    /// terminology changes since it was taken are not visible until a forced
    /// recompute. With `force_new` the rules are evaluated again and a new
    /// snapshot is appended.
    #[tracing::instrument(skip(self, ctx), fields(version_uuid = %self.uuid, value_set = %self.value_set.name))]
    pub async fn expand(&mut self, ctx: &EngineContext, force_new: bool) -> Result<&HashSet<Code>> {
        let started = Instant::now();
        let value_set_type = self.value_set_type();

        let outcome = self.expand_inner(ctx, force_new).await;
        let elapsed = started.elapsed().as_secs_f64();

        match outcome {
            Ok(source) => {
                metrics::record_expansion(
                    value_set_type.as_str(),
                    source,
                    "success",
                    elapsed,
                    self.expansion.len(),
                );
                tracing::info!(
                    source,
                    count = self.expansion.len(),
                    elapsed_ms = (elapsed * 1000.0) as u64,
                    "Expansion ready"
                );
                Ok(&self.expansion)
            }
            Err(e) => {
                metrics::record_expansion(value_set_type.as_str(), "none", e.kind(), elapsed, 0);
                tracing::error!(error = %e, retryable = e.is_retryable(), "Expansion failed");
                Err(e)
            }
        }
    }

    async fn expand_inner(&mut self, ctx: &EngineContext, force_new: bool) -> Result<&'static str> {
        if self.value_set_type() == ValueSetType::Extensional {
            self.load_extensional_codes(ctx).await?;
            self.expansion = self.extensional_codes.values().flatten().cloned().collect();
            self.expanded = true;
            return Ok("extensional");
        }

        if !force_new && ctx.expansions.expansion_already_exists(self.uuid).await? {
            if let Some(stored) = ctx.expansions.load_current_expansion(self.uuid).await? {
                self.expansion = stored.codes;
                self.snapshot = Some(stored.snapshot);
                self.expanded = true;
                return Ok("cache");
            }
        }

        self.create_expansion(ctx).await?;
        Ok("computed")
    }

    /// Load explicit members grouped by `(system, version)`. Returns the member count.
    pub async fn load_extensional_codes(&mut self, ctx: &EngineContext) -> Result<usize> {
        let members = ctx.value_sets.find_extensional_members(self.uuid).await?;
        let count = members.len();

        let mut grouped: BTreeMap<(String, String), Vec<Code>> = BTreeMap::new();
        for member in members {
            let terminology = ctx.terminology(member.terminology_version_uuid).await?;
            grouped
                .entry((terminology.fhir_uri.clone(), terminology.version.clone()))
                .or_default()
                .push(terminology.code(member.code, member.display));
        }

        self.extensional_codes = grouped;
        Ok(count)
    }

    pub fn extensional_codes(&self) -> &BTreeMap<(String, String), Vec<Code>> {
        &self.extensional_codes
    }

    /// Codes of the last expansion; empty until [`expand`](Self::expand) runs
    pub fn expansion(&self) -> &HashSet<Code> {
        &self.expansion
    }

    /// Whether an expansion has been computed or loaded, even an empty one
    pub fn has_expansion(&self) -> bool {
        self.expanded
    }

    /// Snapshot the current expansion was loaded from or saved as
    pub fn snapshot(&self) -> Option<&ExpansionSnapshot> {
        self.snapshot.as_ref()
    }
}
